//! GNU ld (and friends: gold, lld, mold, collect2) diagnostics.
//!
//! Surface forms handled, all single line:
//!
//! ```text
//! /usr/bin/ld: main.c:5: undefined reference to `foo'
//! ld.exe: main.o:main.c:5: undefined reference to `foo'
//! main.c:(.text+0x1e): undefined reference to `bar'
//! /usr/bin/ld: cannot find -lfoo: No such file or directory
//! /usr/bin/ld: warning: libz.so.1, needed by libpng.so, not found
//! collect2: error: ld returned 1 exit status
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{one_less, Range, RawDiagnostic};
use crate::e_linematcher::{LineMatch, LineMatcher};

pub const SOURCE: &str = "Link";

const LINKER_NAMES: &str =
    r"(?:[\w.+-]*-)?(?:ld(?:\.(?:bfd|gold|lld|mold))?|ld64\.lld|lld|lld-link|mold|collect2)";

static LINKER_TOOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:[A-Za-z]:)?(?:.*[/\\])?{}(?:\.exe)?$",
        LINKER_NAMES
    ))
    .expect("gnuld tool regex")
});
static LINKER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<tool>(?:[A-Za-z]:)?(?:[^\s:]*[/\\])?{}(?:\.exe)?):\s+(?P<rest>.*)$",
        LINKER_NAMES
    ))
    .expect("gnuld prefix regex")
});
static MAKE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[^\s:]*[/\\])?(?:g|mingw32-)?make(?:\.exe)?(?:\[\d+\])?:")
        .expect("make regex")
});
static IN_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:.+?:\s+)?in function [`'].*[`']:$").expect("gnuld in-function regex")
});
static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<obj>[^\s:]+\.(?:o|obj)):)?(?P<file>(?:[A-Za-z]:)?[^:()]+)(?:\([^)]*\))?:\([^)]*\):\s*(?P<msg>.+)$",
    )
    .expect("gnuld section regex")
});
static LOCATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<obj>[^\s:]+\.(?:o|obj|a|lib)(?:\([^)]*\))?):)?(?P<file>(?:[A-Za-z]:)?[^:]+):(?P<line>\d+)\s?:\s+(?:(?P<sev>error|warning)\b\s*:?\s+)?(?P<msg>.*[^\]])$",
    )
    .expect("gnuld located regex")
});
static TOOL_MESSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<sev>fatal error|error|warning)\b\s*:?\s+)?(?P<msg>.+)$")
        .expect("gnuld tool message regex")
});
// Heads of compiler diagnostics; when one follows `file:line:` without a
// linker or object prefix the line belongs to the compiler grammar.
static COMPILER_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:fatal error|catastrophic error|error|warning|note|remark|erreur|avertissement|remarque)\s?:",
    )
    .expect("gnuld compiler keyword regex")
});

/// `true` for `ld`, `/usr/bin/ld`, `x86_64-linux-gnu-ld.bfd`, `ld.exe`, `collect2`...
pub fn is_linker_tool(name: &str) -> bool {
    LINKER_TOOL.is_match(name)
}

/// `true` when the line starts with a linker executable followed by `: `.
pub fn is_linker_prefixed(line: &str) -> bool {
    LINKER_PREFIX.is_match(line)
}

/// `true` for `make: ***`, `make[2]: Leaving directory`, `mingw32-make.exe[1]:`...
pub fn is_make_line(line: &str) -> bool {
    MAKE_LINE.is_match(line)
}

fn tool_basename(tool: &str) -> &str {
    tool.rsplit(['/', '\\']).next().unwrap_or(tool)
}

#[derive(Default)]
pub struct GnuLdParser;

impl GnuLdParser {
    pub fn new() -> Self {
        GnuLdParser
    }

    fn parse_body(&self, body: &str, tool: Option<&str>) -> Option<RawDiagnostic> {
        if let Some(caps) = SECTION.captures(body) {
            let file = caps["file"].trim().to_string();
            return Some(RawDiagnostic::new(
                SOURCE,
                file,
                Range::rest_of_line(0, 0),
                "error",
                caps["msg"].to_string(),
            ));
        }
        if let Some(caps) = LOCATED.captures(body) {
            let prefixed = tool.is_some() || caps.name("obj").is_some();
            let msg = &caps["msg"];
            if !prefixed && (caps.name("sev").is_some() || COMPILER_KEYWORD.is_match(msg)) {
                return None;
            }
            let severity = caps.name("sev").map_or("error", |m| m.as_str());
            return Some(RawDiagnostic::new(
                SOURCE,
                caps["file"].trim().to_string(),
                Range::rest_of_line(one_less(&caps["line"]), 0),
                severity,
                msg.to_string(),
            ));
        }
        let tool = tool?;
        let caps = TOOL_MESSAGE.captures(body)?;
        let severity = caps.name("sev").map_or("error", |m| m.as_str());
        Some(RawDiagnostic::new(
            SOURCE,
            tool_basename(tool),
            Range::rest_of_line(0, 0),
            severity,
            caps["msg"].to_string(),
        ))
    }
}

impl LineMatcher for GnuLdParser {
    fn name(&self) -> &'static str {
        "gnuld"
    }

    fn parse_line(&mut self, line: &str) -> LineMatch {
        // Recursive make output can look exactly like `file:line: message`.
        if is_make_line(line) {
            return LineMatch::not_mine();
        }
        let (tool, body) = match LINKER_PREFIX.captures(line) {
            Some(caps) => (
                Some(caps.name("tool").map_or("", |m| m.as_str()).to_string()),
                caps.name("rest").map_or("", |m| m.as_str()).to_string(),
            ),
            None => (None, line.to_string()),
        };
        if IN_FUNCTION.is_match(&body) {
            return if tool.is_some() {
                LineMatch::claimed()
            } else {
                LineMatch::not_mine()
            };
        }
        match self.parse_body(&body, tool.as_deref()) {
            Some(diag) => {
                log::trace!("gnuld: {}", line);
                LineMatch::emit(diag)
            }
            None => LineMatch::not_mine(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> LineMatch {
        GnuLdParser::new().parse_line(line)
    }

    fn diag(line: &str) -> RawDiagnostic {
        parse(line)
            .diagnostic
            .unwrap_or_else(|| panic!("no diagnostic for {:?}", line))
    }

    #[test]
    fn test_plain_file_line() {
        let d = diag("main.c:5: undefined reference to `foo'");
        assert_eq!(d.file, "main.c");
        assert_eq!(d.location.start.line, 4);
        assert_eq!(d.severity, "error");
        assert_eq!(d.source, "Link");
    }

    #[test]
    fn test_linker_prefix_with_and_without_exe() {
        for line in [
            "/usr/bin/ld: main.c:5: undefined reference to `foo'",
            "C:\\mingw\\bin\\ld.exe: main.c:5: undefined reference to `foo'",
            "x86_64-linux-gnu-ld.bfd: main.c:5: undefined reference to `foo'",
        ] {
            let d = diag(line);
            assert_eq!(d.file, "main.c", "{}", line);
            assert_eq!(d.location.start.line, 4);
            assert_eq!(d.message, "undefined reference to `foo'");
        }
    }

    #[test]
    fn test_object_prefix() {
        let d = diag("ld: main.o:main.c:12: multiple definition of `x'");
        assert_eq!(d.file, "main.c");
        assert_eq!(d.location.start.line, 11);
        let d = diag("main.o:src/util.c:3: first defined here");
        assert_eq!(d.file, "src/util.c");
    }

    #[test]
    fn test_severity_with_and_without_colon() {
        let d = diag("ld: foo.c:10: warning: relocation in read-only section");
        assert_eq!(d.severity, "warning");
        assert_eq!(d.message, "relocation in read-only section");
        let d = diag("ld: foo.c:10: warning relocation in read-only section");
        assert_eq!(d.severity, "warning");
        assert_eq!(d.message, "relocation in read-only section");
    }

    #[test]
    fn test_section_form() {
        let d = diag("main.c:(.text+0x1e): undefined reference to `bar'");
        assert_eq!(d.file, "main.c");
        assert_eq!(d.location.start.line, 0);
        let d = diag("/usr/bin/ld: libfoo.a(foo.o):(.text+0x4): undefined reference to `baz'");
        assert_eq!(d.file, "libfoo.a");
    }

    #[test]
    fn test_tool_level_messages() {
        let d = diag("/usr/bin/ld: cannot find -lfoo: No such file or directory");
        assert_eq!(d.file, "ld");
        assert_eq!(d.severity, "error");
        assert_eq!(d.message, "cannot find -lfoo: No such file or directory");
        let d = diag("collect2: error: ld returned 1 exit status");
        assert_eq!(d.file, "collect2");
        assert_eq!(d.message, "ld returned 1 exit status");
        let d = diag("ld.exe: warning: cannot find entry symbol _start");
        assert_eq!(d.file, "ld.exe");
        assert_eq!(d.severity, "warning");
    }

    #[test]
    fn test_in_function_context_is_claimed_silently() {
        let m = parse("/usr/bin/ld: /tmp/ccAbc.o: in function `main':");
        assert!(m.matched);
        assert!(m.diagnostic.is_none());
    }

    #[test]
    fn test_rejects_compiler_diagnostics() {
        assert!(!parse("foo.c:12:5: error: expected ';'").matched);
        assert!(!parse("foo.c:12: error: expected ';'").matched);
        assert!(!parse("foo.c:12: note: previous definition").matched);
        assert!(!parse("foo.c:12: unused variable [-Wunused-variable]").matched);
    }

    #[test]
    fn test_rejects_make_lines() {
        assert!(!parse("make[2]: *** [CMakeFiles/app.dir/build.make:97: app] Error 1").matched);
        assert!(!parse("make[1]: *** [Makefile:84: all] Error 2").matched);
        assert!(!parse("mingw32-make.exe[2]: Leaving directory 'C:/build'").matched);
    }

    #[test]
    fn test_tool_names() {
        assert!(is_linker_tool("ld"));
        assert!(is_linker_tool("/usr/bin/ld.gold"));
        assert!(is_linker_tool("C:\\tools\\ld.exe"));
        assert!(is_linker_tool("collect2"));
        assert!(!is_linker_tool("cc1plus"));
        assert!(!is_linker_tool("build"));
    }
}
