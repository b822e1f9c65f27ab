//! MSVC compiler and linker diagnostics, including MSBuild's `12>` prefixes.
//!
//! ```text
//! 12>C:\src\main.cpp(42,7): error C2065: 'x': undeclared identifier [C:\build\app.vcxproj]
//! main.obj : error LNK2019: unresolved external symbol _foo referenced in function _main
//! LINK : fatal error LNK1104: cannot open file 'foo.lib'
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "MSVC";

static COMPILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:\d+>)?\s*(?P<file>[^\s>].*?)\((?P<loc>\d+|\d+,\d+|\d+,\d+,\d+,\d+)\)\s*:\s+(?P<sev>(?:fatal )?error|warning|info)\s+(?P<code>\w{1,2}\d+)\s*:\s*(?P<msg>.*)$",
    )
    .expect("msvc compile regex")
});
static TOOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:\d+>)?\s*(?P<file>(?:[A-Za-z]:)?[^\s>:][^:]*?)\s*:\s+(?:Command line )?(?P<sev>(?:fatal )?error|warning)\s+(?P<code>[A-Z]{1,3}\d+)\s*:\s*(?P<msg>.*)$",
    )
    .expect("msvc tool regex")
});
static PROJECT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+\[[^\[\]]+\.(?:vcxproj|csproj|vbproj|proj|targets)\]$")
        .expect("msvc project suffix regex")
});

fn location_of(loc: &str) -> Range {
    let parts: Vec<u32> = loc.split(',').map(one_less).collect();
    match parts.as_slice() {
        [line, col] => Range::new(*line, *col, *line, *col),
        [l0, c0, l1, c1] => Range::new(*l0, *c0, *l1, *c1),
        [line, ..] => Range::rest_of_line(*line, 0),
        [] => Range::rest_of_line(0, 0),
    }
}

#[derive(Default)]
pub struct MsvcParser;

impl MsvcParser {
    pub fn new() -> Self {
        MsvcParser
    }
}

impl LineMatcher for MsvcParser {
    fn name(&self) -> &'static str {
        "msvc"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        let line = PROJECT_SUFFIX.replace(line, "");
        if let Some(caps) = COMPILE.captures(&line) {
            log::trace!("msvc: {}", line);
            let diag = RawDiagnostic::new(
                SOURCE,
                caps["file"].trim(),
                location_of(&caps["loc"]),
                &caps["sev"],
                &caps["msg"],
            )
            .with_code(Some(caps["code"].to_string()));
            return LineMatch::emit(diag);
        }
        if let Some(caps) = TOOL.captures(&line) {
            log::trace!("msvc (tool): {}", line);
            let diag = RawDiagnostic::new(
                SOURCE,
                caps["file"].trim(),
                Range::rest_of_line(0, 0),
                &caps["sev"],
                &caps["msg"],
            )
            .with_code(Some(caps["code"].to_string()));
            return LineMatch::emit(diag);
        }
        LineMatch::not_mine()
    }
}
