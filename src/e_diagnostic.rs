//! Raw diagnostic model shared by every toolchain grammar.
//!
//! A [`RawDiagnostic`] is what a grammar emits: the file reference exactly as
//! the toolchain printed it, a zero-based [`Range`], the severity text as
//! printed, and the message. Nothing here touches the filesystem.

use std::fmt;

/// A zero-based line/column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    /// Column sentinel meaning "to the end of the line".
    pub const REST_OF_LINE: u32 = u32::MAX;

    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Range {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }

    /// A point at `line:character` that extends to the end of that line.
    pub fn rest_of_line(line: u32, character: u32) -> Self {
        Range::new(line, character, line, Position::REST_OF_LINE)
    }
}

/// Convert a 1-based number printed by a toolchain into a 0-based index.
///
/// Unparsable text and `0` both map to `0`.
pub fn one_less(num: &str) -> u32 {
    num.trim().parse::<u32>().unwrap_or(0).saturating_sub(1)
}

/// Tri-level classification used by severity-aware consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
}

impl DiagnosticSeverity {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Information => "info",
        }
    }

    pub fn is_error(self) -> bool {
        self == DiagnosticSeverity::Error
    }
}

// Localised keywords are data: add a locale by extending these tables.
const ERROR_WORDS: &[&str] = &[
    "error",
    "fatal error",
    "catastrophic error",
    "erreur",
    "erreur fatale",
];
const WARNING_WORDS: &[&str] = &["warning", "avertissement"];
const INFORMATION_WORDS: &[&str] = &["note", "info", "remark", "remarque"];
const ERROR_PREFIXES: &[&str] = &["fatal", "catastrophic"];

/// Map free-text severity to a [`DiagnosticSeverity`].
///
/// Exact table hits win, then `fatal*`/`catastrophic*` prefixes, then
/// substring checks for `error`/`warning`. Anything else is unclassified.
pub fn classify_severity(severity: &str) -> Option<DiagnosticSeverity> {
    let s = severity.trim().to_lowercase();
    if ERROR_WORDS.contains(&s.as_str()) {
        return Some(DiagnosticSeverity::Error);
    }
    if WARNING_WORDS.contains(&s.as_str()) {
        return Some(DiagnosticSeverity::Warning);
    }
    if INFORMATION_WORDS.contains(&s.as_str()) {
        return Some(DiagnosticSeverity::Information);
    }
    if ERROR_PREFIXES.iter().any(|p| s.starts_with(p)) {
        return Some(DiagnosticSeverity::Error);
    }
    if s.contains("error") || s.contains("erreur") {
        return Some(DiagnosticSeverity::Error);
    }
    if s.contains("warning") {
        return Some(DiagnosticSeverity::Warning);
    }
    None
}

/// Every word any table knows about, used by grammars that must only
/// accept a recognised severity.
pub fn is_known_severity_word(word: &str) -> bool {
    let w = word.trim().to_lowercase();
    ERROR_WORDS
        .iter()
        .chain(WARNING_WORDS)
        .chain(INFORMATION_WORDS)
        .any(|k| *k == w)
}

/// Secondary location attached to a diagnostic (notes, call stacks,
/// template instantiation backtraces).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRelated {
    pub file: String,
    pub location: Range,
    pub message: String,
}

/// A toolchain-reported problem, keyed by the textual file reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDiagnostic {
    pub file: String,
    pub location: Range,
    pub severity: String,
    pub message: String,
    pub code: Option<String>,
    pub source: String,
    pub related: Vec<RawRelated>,
}

impl RawDiagnostic {
    pub fn new(
        source: &str,
        file: impl Into<String>,
        location: Range,
        severity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RawDiagnostic {
            file: file.into(),
            location,
            severity: severity.into(),
            message: message.into(),
            code: None,
            source: source.to_string(),
            related: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code.filter(|c| !c.is_empty());
        self
    }

    pub fn classification(&self) -> Option<DiagnosticSeverity> {
        classify_severity(&self.severity)
    }

    /// The tuple two diagnostics must share to count as the same report.
    pub fn identity(&self) -> (String, String, Range, String) {
        (
            self.source.clone(),
            self.file.clone(),
            self.location,
            self.message.clone(),
        )
    }
}

impl fmt::Display for RawDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file,
            self.location.start.line + 1,
            self.location.start.character + 1,
            self.severity
        )?;
        if let Some(code) = &self.code {
            write!(f, " {}", code)?;
        }
        write!(f, ": [{}] {}", self.source, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_less() {
        assert_eq!(one_less("1"), 0);
        assert_eq!(one_less("42"), 41);
        assert_eq!(one_less("0"), 0);
        assert_eq!(one_less("junk"), 0);
    }

    #[test]
    fn test_classify_known_words() {
        assert_eq!(classify_severity("error"), Some(DiagnosticSeverity::Error));
        assert_eq!(
            classify_severity("fatal error"),
            Some(DiagnosticSeverity::Error)
        );
        assert_eq!(
            classify_severity("catastrophic error"),
            Some(DiagnosticSeverity::Error)
        );
        assert_eq!(
            classify_severity("warning"),
            Some(DiagnosticSeverity::Warning)
        );
        assert_eq!(
            classify_severity("note"),
            Some(DiagnosticSeverity::Information)
        );
        assert_eq!(
            classify_severity("remark"),
            Some(DiagnosticSeverity::Information)
        );
    }

    #[test]
    fn test_classify_localised_and_prefixes() {
        assert_eq!(classify_severity("erreur"), Some(DiagnosticSeverity::Error));
        assert_eq!(
            classify_severity("avertissement"),
            Some(DiagnosticSeverity::Warning)
        );
        assert_eq!(
            classify_severity("Fatal Error"),
            Some(DiagnosticSeverity::Error)
        );
        assert_eq!(
            classify_severity("catastrophic failure"),
            Some(DiagnosticSeverity::Error)
        );
        assert_eq!(
            classify_severity("linker error"),
            Some(DiagnosticSeverity::Error)
        );
    }

    #[test]
    fn test_classify_unknown_is_none() {
        assert_eq!(classify_severity("something"), None);
        assert_eq!(classify_severity(""), None);
    }

    #[test]
    fn test_display_is_one_based() {
        let diag = RawDiagnostic::new(
            "GCC",
            "main.c",
            Range::rest_of_line(9, 4),
            "error",
            "expected ';'",
        );
        assert_eq!(diag.to_string(), "main.c:10:5: error: [GCC] expected ';'");
    }
}
