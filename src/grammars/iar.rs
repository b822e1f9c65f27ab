//! IAR Embedded Workbench diagnostics.
//!
//! ```text
//! "C:\proj\main.c",12  Error[Pe020]: identifier "x" is undefined
//!           x = 1;
//!           ^
//! Fatal error[Pe1696]: cannot open source file "missing.h"
//!             searched: "C:\proj\inc\"
//! Fatal error detected, aborting.
//! ```
//!
//! Indented lines extend the message. A blank line or the fatal sentinel
//! finishes the block; anything else ends it without being consumed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "IAR";

const FATAL_SENTINEL: &str = "Fatal error detected, aborting.";

static LOCATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^"(?P<file>.*)",(?P<line>\d+)\s+(?P<sev>Fatal error|Error|Warning|Remark)\[(?P<code>\w+)\]:\s*(?P<msg>.*)$"#,
    )
    .expect("iar located regex")
});
static FILELESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<sev>Fatal error|Error|Warning|Remark)\[(?P<code>\w+)\]:\s*(?P<msg>.*)$")
        .expect("iar file-less regex")
});

#[derive(Default)]
pub struct IarParser {
    pending: Option<RawDiagnostic>,
}

impl IarParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_header(line: &str) -> Option<RawDiagnostic> {
        let (caps, file, lineno) = if let Some(caps) = LOCATED.captures(line) {
            let file = caps["file"].to_string();
            let lineno = one_less(&caps["line"]);
            (caps, file, lineno)
        } else {
            // Nothing to anchor to: the tool itself is the reference.
            (FILELESS.captures(line)?, "iccarm".to_string(), 0)
        };
        Some(
            RawDiagnostic::new(
                SOURCE,
                file,
                Range::rest_of_line(lineno, 0),
                caps["sev"].to_lowercase(),
                caps["msg"].trim_end(),
            )
            .with_code(Some(caps["code"].to_string())),
        )
    }
}

impl LineMatcher for IarParser {
    fn name(&self) -> &'static str {
        "iar"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        if line.trim() == FATAL_SENTINEL {
            return match self.pending.take() {
                Some(diag) => LineMatch::emit(diag),
                None => LineMatch::claimed(),
            };
        }
        if let Some(diag) = Self::parse_header(line) {
            log::trace!("iar: {}", line);
            return LineMatch::claimed_with(self.pending.replace(diag));
        }
        if line.trim().is_empty() {
            return LineMatch::rejected_with(self.pending.take());
        }
        match self.pending.as_mut() {
            Some(pending) if line.starts_with(' ') || line.starts_with('\t') => {
                pending.message.push('\n');
                pending.message.push_str(line.trim());
                LineMatch::claimed()
            }
            _ => LineMatch::rejected_with(self.pending.take()),
        }
    }

    fn flush(&mut self) -> Option<RawDiagnostic> {
        self.pending.take()
    }
}
