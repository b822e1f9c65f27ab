use crate::e_diagnostic::RawDiagnostic;

/// Outcome of feeding one physical line to a grammar.
///
/// | `matched` | `diagnostic` | meaning |
/// |---|---|---|
/// | false | None | line is not ours, nothing was pending |
/// | false | Some | line is not ours, but it ended the block we were holding |
/// | true  | None | line claimed (started or extended a block) |
/// | true  | Some | line claimed and a diagnostic was finalized |
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineMatch {
    pub matched: bool,
    pub diagnostic: Option<RawDiagnostic>,
}

impl LineMatch {
    pub fn not_mine() -> Self {
        LineMatch::default()
    }

    pub fn claimed() -> Self {
        LineMatch {
            matched: true,
            diagnostic: None,
        }
    }

    pub fn emit(diagnostic: RawDiagnostic) -> Self {
        LineMatch {
            matched: true,
            diagnostic: Some(diagnostic),
        }
    }

    /// Claim the line, handing back whatever was pending (if anything).
    pub fn claimed_with(pending: Option<RawDiagnostic>) -> Self {
        LineMatch {
            matched: true,
            diagnostic: pending,
        }
    }

    /// Reject the line, handing back whatever it terminated (if anything).
    pub fn rejected_with(pending: Option<RawDiagnostic>) -> Self {
        LineMatch {
            matched: false,
            diagnostic: pending,
        }
    }
}

/// A stateful recognizer for one toolchain's diagnostic text.
///
/// Implementations are created fresh per run and fed one line at a time.
/// They never fail: a line they do not understand is simply not theirs.
pub trait LineMatcher: Send {
    /// Registry key, lower case (`"gcc"`, `"msvc"`, ...).
    fn name(&self) -> &'static str;

    fn parse_line(&mut self, line: &str) -> LineMatch;

    /// End of stream: finalize anything still accumulating.
    fn flush(&mut self) -> Option<RawDiagnostic> {
        None
    }
}
