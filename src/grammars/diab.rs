//! Wind River Diab compiler diagnostics, one per line.
//!
//! ```text
//! "main.c", line 5: error (dcc:1525): identifier x not declared
//! "main.c", catastrophic error (dcc:1001): cannot open input file
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "DIAB";

static DIAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^"(?P<file>.*)",\s+(?:line\s+(?P<line>\d+):\s+)?(?P<sev>info|warning|(?:fatal |catastrophic )?error)\s+\((?P<code>.*)\):\s+(?P<msg>.*)$"#,
    )
    .expect("diab regex")
});

#[derive(Default)]
pub struct DiabParser;

impl DiabParser {
    pub fn new() -> Self {
        DiabParser
    }
}

impl LineMatcher for DiabParser {
    fn name(&self) -> &'static str {
        "diab"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        let Some(caps) = DIAB.captures(line) else {
            return LineMatch::not_mine();
        };
        log::trace!("diab: {}", line);
        let lineno = caps.name("line").map_or(0, |m| one_less(m.as_str()));
        LineMatch::emit(
            RawDiagnostic::new(
                SOURCE,
                &caps["file"],
                Range::rest_of_line(lineno, 0),
                &caps["sev"],
                &caps["msg"],
            )
            .with_code(Some(caps["code"].to_string())),
        )
    }
}
