//! GCC / Clang style diagnostics.
//!
//! ```text
//! main.cpp: In function 'int main()':
//! main.cpp:4:26: fatal error: some_header.h: No such file or directory
//!     4 | #include "some_header.h"
//!       |          ^~~~~~~~~~~~~~~
//! main.cpp:2:5: note: declared here
//! ```
//!
//! A diagnostic is held until the next diagnostic, a blank line, or a line
//! that is not GCC's, so that trailing `note:` lines and template
//! backtraces can be attached as related information.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::e_diagnostic::{is_known_severity_word, one_less, Range, RawDiagnostic, RawRelated};
use crate::e_linematcher::{LineMatch, LineMatcher};
use crate::grammars::gnuld;

pub const SOURCE: &str = "GCC";

static LOCATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?):(\d+):(\d+):\s+(?:(fatal|catastrophic)\s+)?(\w+)(?:\s+(fatale))?\s?:\s+(.*)$")
        .expect("gcc located regex")
});
static LINE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?):(\d+):\s+(?:(fatal|catastrophic)\s+)?(\w+)(?:\s+(fatale))?\s?:\s+(.*)$")
        .expect("gcc line-only regex")
});
static TOOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s:]+):\s+(?:(fatal|catastrophic)\s+)?(\w+)(?:\s+(fatale))?\s?:\s+(.*)$")
        .expect("gcc tool regex")
});
static INSTANTIATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?): (In instantiation of .+)$").expect("gcc instantiation regex"));
static REQUIRED_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?):(\d+):(\d+):\s+(required from .+)$").expect("gcc required-from regex")
});
static BACKTRACE_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"note:\s+\((.*backtrace-limit.*)\)").expect("gcc backtrace regex"));
static CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:In file included|\s+) from .*[:,]|.*?: (?:In|At) .*:)$")
        .expect("gcc context regex")
});
static SOURCE_ECHO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d*\s+\|(?:\s|$)|^\s*\^[~^]*\s*$").expect("gcc echo regex"));

struct Heading {
    file: String,
    line: String,
    column: String,
    severity: String,
    message: String,
}

fn severity_text(caps: &Captures, prefix: usize, word: usize, suffix: usize) -> String {
    let mut severity = String::new();
    if let Some(p) = caps.get(prefix) {
        severity.push_str(p.as_str());
        severity.push(' ');
    }
    severity.push_str(&caps[word]);
    if let Some(s) = caps.get(suffix) {
        severity.push(' ');
        severity.push_str(s.as_str());
    }
    severity
}

fn parse_heading(line: &str) -> Option<Heading> {
    if let Some(caps) = LOCATED.captures(line) {
        return Some(Heading {
            file: caps[1].to_string(),
            line: caps[2].to_string(),
            column: caps[3].to_string(),
            severity: severity_text(&caps, 4, 5, 6),
            message: caps[7].to_string(),
        });
    }
    // Without a column only recognised severity words are trusted; the
    // shape is too close to linker and make output otherwise.
    if let Some(caps) = LINE_ONLY.captures(line) {
        let severity = severity_text(&caps, 3, 4, 5);
        if is_known_severity_word(&severity) {
            return Some(Heading {
                file: caps[1].to_string(),
                line: caps[2].to_string(),
                column: "1".to_string(),
                severity,
                message: caps[6].to_string(),
            });
        }
    }
    if let Some(caps) = TOOL.captures(line) {
        let severity = severity_text(&caps, 2, 3, 4);
        if is_known_severity_word(&severity) && !gnuld::is_linker_tool(&caps[1]) {
            return Some(Heading {
                file: caps[1].to_string(),
                line: "1".to_string(),
                column: "1".to_string(),
                severity,
                message: caps[5].to_string(),
            });
        }
    }
    None
}

struct PendingTemplate {
    file: String,
    root_instantiation: String,
    required_from: Vec<RawRelated>,
}

#[derive(Default)]
pub struct GccParser {
    pending: Option<RawDiagnostic>,
    template: Option<PendingTemplate>,
}

impl GccParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineMatcher for GccParser {
    fn name(&self) -> &'static str {
        "gcc"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        if line.trim().is_empty() {
            return LineMatch::rejected_with(self.pending.take());
        }
        if gnuld::is_make_line(line) || gnuld::is_linker_prefixed(line) {
            return LineMatch::rejected_with(self.pending.take());
        }

        if let Some(caps) = INSTANTIATION.captures(line) {
            log::trace!("gcc: template backtrace start: {}", line);
            self.template = Some(PendingTemplate {
                file: caps[1].to_string(),
                root_instantiation: caps[2].to_string(),
                required_from: Vec::new(),
            });
            return LineMatch::claimed_with(self.pending.take());
        }
        if let Some(template) = self.template.as_mut() {
            if let Some(caps) = REQUIRED_FROM.captures(line) {
                let lineno = one_less(&caps[2]);
                template.required_from.push(RawRelated {
                    file: caps[1].to_string(),
                    location: Range::rest_of_line(lineno, one_less(&caps[3])),
                    message: caps[4].to_string(),
                });
                return LineMatch::claimed();
            }
        }

        if let Some(caps) = BACKTRACE_LIMIT.captures(line) {
            if let Some(prev) = self.pending.as_mut() {
                if let Some(first) = prev.related.first().cloned() {
                    prev.related.push(RawRelated {
                        message: caps[1].to_string(),
                        ..first
                    });
                    return LineMatch::claimed();
                }
            }
        }

        if let Some(heading) = parse_heading(line) {
            let lineno = one_less(&heading.line);
            let location = Range::rest_of_line(lineno, one_less(&heading.column));
            if heading.severity == "note" {
                if let Some(prev) = self.pending.as_mut() {
                    prev.related.push(RawRelated {
                        file: heading.file,
                        location,
                        message: heading.message,
                    });
                    return LineMatch::claimed();
                }
            }
            let mut diag = RawDiagnostic::new(
                SOURCE,
                heading.file.clone(),
                location,
                heading.severity,
                heading.message,
            );
            if let Some(template) = self.template.take() {
                diag.related.push(RawRelated {
                    file: template.file,
                    location,
                    message: template.root_instantiation,
                });
                diag.related.extend(template.required_from);
            }
            log::trace!("gcc: diagnostic heading: {}", line);
            let previous = self.pending.replace(diag);
            return LineMatch::claimed_with(previous);
        }

        if CONTEXT.is_match(line) {
            return LineMatch::claimed_with(self.pending.take());
        }
        if self.pending.is_some() && SOURCE_ECHO.is_match(line) {
            return LineMatch::claimed();
        }
        if line.trim() == "compilation terminated." {
            return LineMatch::claimed_with(self.pending.take());
        }
        LineMatch::rejected_with(self.pending.take())
    }

    fn flush(&mut self) -> Option<RawDiagnostic> {
        self.template = None;
        self.pending.take()
    }
}
