//! Green Hills (GHS MULTI) compiler diagnostics.
//!
//! ```text
//! "C:\src\main.c", line 12 (col. 5): error #20: identifier "x" is undefined
//!       x = 1;
//!       ^
//! "main.c", At end of source: warning #12-D: parsing restarts here
//! ```
//!
//! Indented lines following a header belong to it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "GHS";

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^"(?P<file>.*)",\s+(?:line\s+(?P<line>\d+)\s+\(col\.\s+(?P<col>\d+)\)|At end of source):\s+(?:fatal )?(?P<sev>remark|warning|error)\s+(?P<msg>.*)$"#,
    )
    .expect("ghs header regex")
});
static CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?P<code>[\w-]+):\s*(?P<msg>.*)$").expect("ghs code regex"));

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

#[derive(Default)]
pub struct GhsParser {
    pending: Option<RawDiagnostic>,
}

impl GhsParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_header(line: &str) -> Option<RawDiagnostic> {
        let caps = HEADER.captures(line)?;
        // "At end of source" carries no position.
        let lineno = caps.name("line").map_or(0, |m| one_less(m.as_str()));
        let col = caps.name("col").map_or(0, |m| one_less(m.as_str()));
        let raw_msg = &caps["msg"];
        let (code, message) = match CODE.captures(raw_msg) {
            Some(c) => (Some(c["code"].to_string()), c["msg"].to_string()),
            None => (None, raw_msg.to_string()),
        };
        Some(
            RawDiagnostic::new(
                SOURCE,
                &caps["file"],
                Range::new(lineno, col, lineno, col),
                &caps["sev"],
                message,
            )
            .with_code(code),
        )
    }
}

impl LineMatcher for GhsParser {
    fn name(&self) -> &'static str {
        "ghs"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        if let Some(diag) = Self::parse_header(line) {
            log::trace!("ghs: {}", line);
            let previous = self.pending.replace(diag);
            return LineMatch::claimed_with(previous);
        }
        if line.trim().is_empty() {
            return LineMatch::rejected_with(self.pending.take());
        }
        match self.pending.as_mut() {
            Some(pending) if is_continuation(line) => {
                pending.message.push('\n');
                pending.message.push_str(line.trim_end());
                LineMatch::claimed()
            }
            _ => LineMatch::rejected_with(self.pending.take()),
        }
    }

    fn flush(&mut self) -> Option<RawDiagnostic> {
        self.pending.take()
    }
}
