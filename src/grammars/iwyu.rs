//! include-what-you-use suggestions.
//!
//! ```text
//! src/main.cpp should add these lines:
//! #include <string>
//!
//! src/main.cpp should remove these lines:
//! - #include <map>  // lines 3-3
//!
//! The full include-list for src/main.cpp:
//! #include <string>
//! #include <vector>  // for vector
//! ---
//! ```
//!
//! The add section becomes one warning and the full list one note, both on
//! the first line of the file. Every removal is its own warning on the
//! lines iwyu cites.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Position, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "iwyu";

const SENTINEL: &str = "---";

static ADD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*) should add these lines:$").expect("iwyu add regex"));
static REMOVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*) should remove these lines:$").expect("iwyu remove regex"));
static FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^The full include-list for (.*):$").expect("iwyu full regex"));
static REMOVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- (.*?)\s+// lines (\d+)-(\d+)$").expect("iwyu removal entry regex")
});

enum Section {
    Idle,
    Add { file: String, lines: Vec<String> },
    Remove { file: String },
    Full { file: String, lines: Vec<String> },
}

fn whole_file_start() -> Range {
    Range::rest_of_line(0, 0)
}

pub struct IwyuParser {
    section: Section,
}

impl Default for IwyuParser {
    fn default() -> Self {
        IwyuParser {
            section: Section::Idle,
        }
    }
}

impl IwyuParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the current section, producing its diagnostic when it had a body.
    fn close_section(&mut self) -> Option<RawDiagnostic> {
        match std::mem::replace(&mut self.section, Section::Idle) {
            Section::Add { file, lines } if !lines.is_empty() => Some(RawDiagnostic::new(
                SOURCE,
                file,
                whole_file_start(),
                "warning",
                format!("Add these lines:\n{}", lines.join("\n")),
            )),
            Section::Full { file, lines } if !lines.is_empty() => Some(RawDiagnostic::new(
                SOURCE,
                file,
                whole_file_start(),
                "note",
                format!("The full include-list:\n{}", lines.join("\n")),
            )),
            _ => None,
        }
    }

    fn open_section(line: &str) -> Option<Section> {
        if let Some(caps) = ADD.captures(line) {
            return Some(Section::Add {
                file: caps[1].to_string(),
                lines: Vec::new(),
            });
        }
        if let Some(caps) = REMOVE.captures(line) {
            return Some(Section::Remove {
                file: caps[1].to_string(),
            });
        }
        FULL.captures(line).map(|caps| Section::Full {
            file: caps[1].to_string(),
            lines: Vec::new(),
        })
    }
}

impl LineMatcher for IwyuParser {
    fn name(&self) -> &'static str {
        "iwyu"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        if let Some(section) = Self::open_section(line) {
            log::trace!("iwyu: {}", line);
            let finished = self.close_section();
            self.section = section;
            return LineMatch::claimed_with(finished);
        }
        if line.trim().is_empty() {
            return LineMatch::rejected_with(self.close_section());
        }
        if line.trim() == SENTINEL {
            if matches!(self.section, Section::Idle) {
                return LineMatch::not_mine();
            }
            return LineMatch::claimed_with(self.close_section());
        }
        match &mut self.section {
            Section::Idle => LineMatch::not_mine(),
            Section::Add { lines, .. } | Section::Full { lines, .. } => {
                lines.push(line.trim_end().to_string());
                LineMatch::claimed()
            }
            Section::Remove { file } => match REMOVAL.captures(line) {
                Some(caps) => {
                    let start = one_less(&caps[2]);
                    let end = one_less(&caps[3]);
                    let range = Range {
                        start: Position::new(start, 0),
                        end: Position::new(end, Position::REST_OF_LINE),
                    };
                    LineMatch::emit(RawDiagnostic::new(
                        SOURCE,
                        file.clone(),
                        range,
                        "warning",
                        format!("Remove this line: {}", &caps[1]),
                    ))
                }
                None => LineMatch::claimed(),
            },
        }
    }

    fn flush(&mut self) -> Option<RawDiagnostic> {
        self.close_section()
    }
}
