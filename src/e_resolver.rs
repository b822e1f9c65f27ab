//! Anchor raw diagnostics to files on disk.
//!
//! Relative references are tried against each base directory in order and
//! fall back to the first one. Diagnostics that name no source file at all
//! (a linker, an object file, a library) are projected onto a generated
//! `linkerrors.txt`, one block per diagnostic, so that every one of them
//! gets its own line.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::e_diagnostic::{Position, Range, RawDiagnostic};

pub const LINKER_ERRORS_FILE: &str = "linkerrors.txt";

/// Lines before the message in each pseudo-file block.
const HEADER_LINES: u32 = 3;

/// Extensions that never name a source file.
const BINARY_EXTENSIONS: &[&str] = &["o", "obj", "a", "lib", "so", "dll", "exe", "dylib"];

static WINDOWS_ABSOLUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z]:[\\/]|\\\\)").expect("windows absolute path regex"));

/// `true` for object files, libraries and executables: `main.obj`,
/// `libfoo.a`, `out/app.exe`. These never name a source file.
pub fn has_binary_extension(file: &str) -> bool {
    Path::new(file.trim())
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| BINARY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// `true` for a bare name with no directory and no extension, such as
/// `ld`, `LINK`, `collect2` or `Makefile`. It may be a tool or a real file.
pub fn is_bare_name(file: &str) -> bool {
    let trimmed = file.trim();
    let has_dir = trimmed.contains('/') || trimmed.contains('\\');
    !trimmed.is_empty() && !has_dir && Path::new(trimmed).extension().is_none()
}

/// `true` for references that may have no source file behind them.
/// Bare names are only projected when no base directory has them.
pub fn is_file_less(file: &str) -> bool {
    file.trim().is_empty() || has_binary_extension(file) || is_bare_name(file)
}

/// Label for a pseudo-file block. Tool-level compiler errors
/// (`cc1plus: fatal error`, `ninja: error`) end up there too.
fn block_title(diag: &RawDiagnostic) -> &'static str {
    let is_link = diag.source == crate::grammars::gnuld::SOURCE
        || diag.code.as_deref().is_some_and(|c| c.starts_with("LNK"));
    if is_link {
        "Linker error"
    } else {
        "Build error"
    }
}

fn is_absolute(file: &str) -> bool {
    Path::new(file).is_absolute() || WINDOWS_ABSOLUTE.is_match(file)
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelated {
    pub path: PathBuf,
    pub location: Range,
    pub message: String,
}

/// A [`RawDiagnostic`] plus the file it is shown against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiagnostic {
    pub diagnostic: RawDiagnostic,
    pub path: PathBuf,
    /// Where in `path` to show it; differs from the raw location only for
    /// diagnostics projected onto the linker-errors file.
    pub location: Range,
    pub related: Vec<ResolvedRelated>,
    pub synthetic: bool,
}

impl fmt::Display for ResolvedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: [{}] {}",
            self.path.display(),
            self.location.start.line + 1,
            self.location.start.character + 1,
            self.diagnostic.severity,
            self.diagnostic.source,
            self.diagnostic.message
        )
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    linker_errors_dir: PathBuf,
}

impl Default for PathResolver {
    fn default() -> Self {
        PathResolver::new(std::env::temp_dir().join("cmake-e"))
    }
}

impl PathResolver {
    pub fn new(linker_errors_dir: impl Into<PathBuf>) -> Self {
        PathResolver {
            linker_errors_dir: linker_errors_dir.into(),
        }
    }

    pub fn linker_errors_path(&self) -> PathBuf {
        self.linker_errors_dir.join(LINKER_ERRORS_FILE)
    }

    /// First `<base>/<file>` that exists, in `base_dirs` order.
    fn find_existing(&self, file: &str, base_dirs: &[PathBuf]) -> anyhow::Result<Option<PathBuf>> {
        for base in base_dirs {
            let candidate = normalize(&base.join(file));
            let exists = candidate
                .try_exists()
                .with_context(|| format!("checking {}", candidate.display()))?;
            if exists {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Resolve one textual reference against `base_dirs`.
    pub fn resolve_path(&self, file: &str, base_dirs: &[PathBuf]) -> anyhow::Result<PathBuf> {
        let file = file.trim();
        if is_absolute(file) {
            return Ok(PathBuf::from(file));
        }
        if let Some(found) = self.find_existing(file, base_dirs)? {
            return Ok(found);
        }
        match base_dirs.first() {
            Some(first) => Ok(normalize(&first.join(file))),
            None => {
                let cwd = std::env::current_dir().context("reading current directory")?;
                Ok(normalize(&cwd.join(file)))
            }
        }
    }

    /// Resolve a full batch. The linker-errors file is rewritten from
    /// scratch every time, so repeated calls give identical results.
    pub fn resolve(
        &self,
        diagnostics: &[RawDiagnostic],
        base_dirs: &[PathBuf],
    ) -> anyhow::Result<Vec<ResolvedDiagnostic>> {
        let linker_path = self.linker_errors_path();
        let mut pseudo = String::new();
        let mut next_line: u32 = 0;
        let mut orphans = 0usize;
        let mut resolved = Vec::with_capacity(diagnostics.len());

        for diag in diagnostics {
            let related = diag
                .related
                .iter()
                .map(|r| {
                    Ok(ResolvedRelated {
                        path: self.resolve_path(&r.file, base_dirs)?,
                        location: r.location,
                        message: r.message.clone(),
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let file = diag.file.trim();
            let existing = if file.is_empty() || has_binary_extension(file) {
                None
            } else if is_bare_name(file) {
                // `Makefile` is a file, `ld` is a tool; only the disk can tell.
                self.find_existing(file, base_dirs)?.filter(|p| p.is_file())
            } else {
                Some(self.resolve_path(file, base_dirs)?)
            };

            if let Some(path) = existing {
                resolved.push(ResolvedDiagnostic {
                    diagnostic: diag.clone(),
                    path,
                    location: diag.location,
                    related,
                    synthetic: false,
                });
            } else {
                orphans += 1;
                let message_lines: Vec<&str> = if diag.message.is_empty() {
                    vec![""]
                } else {
                    diag.message.lines().collect()
                };
                pseudo.push_str(&format!("{} #{}\n", block_title(diag), orphans));
                pseudo.push_str(&format!("{}: {}\n", diag.source, diag.file));
                pseudo.push_str(&format!(
                    "{} {}\n",
                    diag.severity,
                    diag.code.as_deref().unwrap_or("-")
                ));
                for line in &message_lines {
                    pseudo.push_str(line);
                    pseudo.push('\n');
                }
                pseudo.push('\n');

                let anchor = next_line;
                let last = anchor + HEADER_LINES + message_lines.len() as u32 - 1;
                next_line = last + 2;
                resolved.push(ResolvedDiagnostic {
                    diagnostic: diag.clone(),
                    path: linker_path.clone(),
                    location: Range {
                        start: Position::new(anchor, 0),
                        end: Position::new(last, Position::REST_OF_LINE),
                    },
                    related,
                    synthetic: true,
                });
            }
        }

        self.write_linker_errors(&linker_path, orphans, &pseudo)?;
        Ok(resolved)
    }

    fn write_linker_errors(&self, path: &Path, count: usize, content: &str) -> anyhow::Result<()> {
        if count == 0 {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("removing stale {}", path.display()))?;
            }
            return Ok(());
        }
        fs::create_dir_all(&self.linker_errors_dir)
            .with_context(|| format!("creating {}", self.linker_errors_dir.display()))?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        log::debug!("wrote {} linker error(s) to {}", count, path.display());
        Ok(())
    }
}
