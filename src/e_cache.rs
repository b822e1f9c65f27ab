//! Reader for `CMakeCache.txt`.
//!
//! ```text
//! // Build type
//! CMAKE_BUILD_TYPE:STRING=Debug
//! "KEY:WITH:COLONS":INTERNAL=1
//! CMAKE_BUILD_TYPE-ADVANCED:INTERNAL=1
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CACHE_FILE: &str = "CMakeCache.txt";

static RECORD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\n|\r").expect("cache separator regex"));
static ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^("(.*?)"|(.*?)):([^:]*?)=(.*)$"#).expect("cache entry regex"));

const ADVANCED_SUFFIX: &str = "-ADVANCED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEntryType {
    Bool,
    String,
    FilePath,
    Path,
    Internal,
    Uninitialized,
    Static,
}

impl CacheEntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheEntryType::Bool => "BOOL",
            CacheEntryType::String => "STRING",
            CacheEntryType::FilePath => "FILEPATH",
            CacheEntryType::Path => "PATH",
            CacheEntryType::Internal => "INTERNAL",
            CacheEntryType::Uninitialized => "UNINITIALIZED",
            CacheEntryType::Static => "STATIC",
        }
    }
}

impl FromStr for CacheEntryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BOOL" => CacheEntryType::Bool,
            "STRING" => CacheEntryType::String,
            "FILEPATH" => CacheEntryType::FilePath,
            "PATH" => CacheEntryType::Path,
            "INTERNAL" => CacheEntryType::Internal,
            "UNINITIALIZED" => CacheEntryType::Uninitialized,
            "STATIC" => CacheEntryType::Static,
            other => return Err(anyhow!("unknown cache entry type '{}'", other)),
        })
    }
}

impl fmt::Display for CacheEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CMake's notion of a false constant. Case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_ascii_uppercase();
    if v.ends_with("-NOTFOUND") {
        return false;
    }
    if let Ok(n) = v.parse::<f64>() {
        return n != 0.0;
    }
    !matches!(
        v.as_str(),
        "" | "FALSE" | "OFF" | "NO" | "N" | "IGNORE" | "NOTFOUND"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub entry_type: CacheEntryType,
    pub value: String,
    pub docs: String,
    pub advanced: bool,
}

impl CacheEntry {
    /// `Some` only for `BOOL` entries.
    pub fn as_bool(&self) -> Option<bool> {
        (self.entry_type == CacheEntryType::Bool).then(|| is_truthy(&self.value))
    }

    /// Render back to `KEY:TYPE=VALUE`, quoting keys that contain `:`.
    pub fn to_line(&self) -> String {
        if self.key.contains(':') || self.key.starts_with('"') {
            format!("\"{}\":{}={}", self.key, self.entry_type, self.value)
        } else {
            format!("{}:{}={}", self.key, self.entry_type, self.value)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CMakeCache {
    path: Option<PathBuf>,
    entries: Vec<CacheEntry>,
}

impl CMakeCache {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading CMake cache {}", path.display()))?;
        let mut cache = Self::parse(&content);
        cache.path = Some(path.to_path_buf());
        Ok(cache)
    }

    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<CacheEntry> = Vec::new();
        let mut advanced: Vec<String> = Vec::new();
        let mut docs = String::new();

        for line in RECORD_SEPARATOR.split(content) {
            if line.is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            if let Some(doc) = line.strip_prefix("//") {
                docs.push_str(doc);
                docs.push(' ');
                continue;
            }
            let Some(caps) = ENTRY.captures(line) else {
                log::warn!("malformed cache line skipped: {}", line);
                continue;
            };
            let key = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str())
                .to_string();
            let entry_type = match caps[4].parse::<CacheEntryType>() {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("{} in cache line: {}", e, line);
                    docs.clear();
                    continue;
                }
            };
            let value = caps[5].to_string();
            if let Some(base) = key.strip_suffix(ADVANCED_SUFFIX) {
                if is_truthy(&value) {
                    advanced.push(base.to_string());
                }
                docs.clear();
                continue;
            }
            let entry = CacheEntry {
                key,
                entry_type,
                value,
                docs: docs.trim().to_string(),
                advanced: false,
            };
            docs.clear();
            match entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }

        for key in advanced {
            if let Some(entry) = entries.iter_mut().find(|e| e.key == key) {
                entry.advanced = true;
            }
        }
        CMakeCache {
            path: None,
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `CMAKE_HOME_DIRECTORY`, which is where relative CMake diagnostics point.
    pub fn source_dir(&self) -> Option<PathBuf> {
        self.get("CMAKE_HOME_DIRECTORY").map(|e| PathBuf::from(&e.value))
    }
}
