//! CMake's own configure-time message blocks.
//!
//! ```text
//! CMake Warning (dev) at CMakeLists.txt:14 (message):
//!   I am a warning!
//! Call Stack (most recent call first):
//!   cmake/helpers.cmake:3 (include)
//!   CMakeLists.txt:20 (helper)
//!
//!
//! -- Configuring done
//! ```
//!
//! A block ends on its second consecutive blank line, a `--` status line, or
//! the start of the next block. Call stack frames become related entries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic, RawRelated};
use crate::e_linematcher::{LineMatch, LineMatcher};

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CMake (.*?)(?: \(dev\))? at (.*?):(\d+) ?\((.*?)\):?").expect("cmake header regex")
});
static FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  (.*):(\d+) \((\w+)\)$").expect("cmake call stack regex"));

const CALL_STACK: &str = "Call Stack (most recent call first):";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Diag,
    Stack,
}

/// `Warning`, `Deprecation Warning` and `Warning (dev)` are warnings;
/// `Error`, `Deprecation Error` and `Internal Error` are errors.
fn severity_for(level: &str) -> &'static str {
    if level.contains("Error") {
        "error"
    } else {
        "warning"
    }
}

pub struct CMakeParser {
    state: State,
    blank_lines: usize,
    pending: Option<RawDiagnostic>,
}

impl Default for CMakeParser {
    fn default() -> Self {
        CMakeParser {
            state: State::Init,
            blank_lines: 0,
            pending: None,
        }
    }
}

impl CMakeParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&mut self) -> Option<RawDiagnostic> {
        self.state = State::Init;
        self.blank_lines = 0;
        let mut diag = self.pending.take()?;
        diag.message = diag.message.trim().to_string();
        log::debug!("cmake: committed {}", diag);
        Some(diag)
    }

    fn start(&mut self, line: &str) -> Option<LineMatch> {
        let caps = HEADER.captures(line)?;
        let finished = self.commit();
        let lineno = one_less(&caps[3]);
        let source = format!("CMake ({})", &caps[4]);
        self.pending = Some(RawDiagnostic::new(
            &source,
            &caps[2],
            Range::rest_of_line(lineno, 0),
            severity_for(&caps[1]),
            String::new(),
        ));
        self.state = State::Diag;
        Some(LineMatch::claimed_with(finished))
    }
}

impl LineMatcher for CMakeParser {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        if let Some(m) = self.start(line) {
            log::trace!("cmake: {}", line);
            return m;
        }
        if self.state == State::Init {
            return LineMatch::not_mine();
        }
        if line.starts_with("--") {
            return LineMatch::rejected_with(self.commit());
        }
        if line.trim().is_empty() {
            // Blank lines stay visible to every grammar; here they only count.
            self.blank_lines += 1;
            if self.blank_lines >= 2 {
                return LineMatch::rejected_with(self.commit());
            }
            if self.state == State::Diag {
                if let Some(diag) = self.pending.as_mut() {
                    diag.message.push('\n');
                }
            }
            return LineMatch::not_mine();
        }
        self.blank_lines = 0;
        match self.state {
            State::Diag if line.starts_with(CALL_STACK) => {
                self.state = State::Stack;
            }
            State::Diag => {
                if let Some(diag) = self.pending.as_mut() {
                    diag.message.push_str(line.strip_prefix("  ").unwrap_or(line));
                    diag.message.push('\n');
                }
            }
            State::Stack => {
                if let (Some(caps), Some(diag)) = (FRAME.captures(line), self.pending.as_mut()) {
                    diag.related.push(RawRelated {
                        file: caps[1].to_string(),
                        location: Range::rest_of_line(one_less(&caps[2]), 0),
                        message: format!("In call to '{}' here", &caps[3]),
                    });
                }
            }
            State::Init => {}
        }
        LineMatch::claimed()
    }

    fn flush(&mut self) -> Option<RawDiagnostic> {
        self.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> Vec<RawDiagnostic> {
        let mut p = CMakeParser::new();
        let mut out: Vec<RawDiagnostic> = lines
            .iter()
            .filter_map(|l| p.parse_line(l).diagnostic)
            .collect();
        out.extend(p.flush());
        out
    }

    #[test]
    fn test_warning_block_commits_on_second_blank() {
        let diags = feed(&["CMake Warning at CMakeLists.txt:14 (message):", "  I am a warning!", "", "", ""]);
        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.file, "CMakeLists.txt");
        assert_eq!(d.location.start.line, 13);
        assert_eq!(d.severity, "warning");
        assert_eq!(d.source, "CMake (message)");
        assert_eq!(d.message, "I am a warning!");
    }

    #[test]
    fn test_single_blank_keeps_paragraphs() {
        let diags = feed(&[
            "CMake Error at CMakeLists.txt:3 (find_package):",
            "  Could not find a package configuration file.",
            "",
            "  Add the installation prefix to CMAKE_PREFIX_PATH.",
            "",
            "",
        ]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, "error");
        assert_eq!(
            diags[0].message,
            "Could not find a package configuration file.\n\nAdd the installation prefix to CMAKE_PREFIX_PATH."
        );
    }

    #[test]
    fn test_call_stack_becomes_related() {
        let diags = feed(&[
            "CMake Warning (dev) at cmake/helpers.cmake:7 (message):",
            "  deprecated helper",
            "Call Stack (most recent call first):",
            "  cmake/helpers.cmake:3 (include)",
            "  CMakeLists.txt:20 (helper)",
            "This warning is for project developers.  Use -Wno-dev to suppress it.",
            "",
            "",
        ]);
        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.source, "CMake (message)");
        assert_eq!(d.related.len(), 2);
        assert_eq!(d.related[1].file, "CMakeLists.txt");
        assert_eq!(d.related[1].location.start.line, 19);
        assert_eq!(d.related[1].message, "In call to 'helper' here");
    }

    #[test]
    fn test_status_line_commits() {
        let mut p = CMakeParser::new();
        p.parse_line("CMake Deprecation Warning at CMakeLists.txt:1 (cmake_minimum_required):");
        p.parse_line("  Compatibility with CMake < 3.5 will be removed.");
        let m = p.parse_line("-- The C compiler identification is GNU 13.2.0");
        assert!(!m.matched);
        let d = m.diagnostic.expect("committed");
        assert_eq!(d.severity, "warning");
        assert_eq!(d.message, "Compatibility with CMake < 3.5 will be removed.");
    }

    #[test]
    fn test_truncated_block_flushes() {
        let diags = feed(&["CMake Error at CMakeLists.txt:9 (add_executable):", "  Cannot find source file:"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Cannot find source file:");
    }

    #[test]
    fn test_idle_lines_are_not_mine() {
        let mut p = CMakeParser::new();
        assert_eq!(p.parse_line("-- Configuring done"), LineMatch::not_mine());
        assert_eq!(p.parse_line("  indented"), LineMatch::not_mine());
        assert_eq!(p.parse_line(""), LineMatch::not_mine());
    }
}
