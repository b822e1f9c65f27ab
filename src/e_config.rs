//! `cmake-e.toml` and environment overrides.
//!
//! ```toml
//! parse_build_diagnostics = true
//! enabled_output_parsers = ["gcc", "gnuld", "cmake"]
//! output_encoding = "windows-1252"
//! linker_errors_dir = "build/.cmake-e"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::e_decode::LineDecoder;
use crate::e_outputconsumer::OutputConsumer;
use crate::e_registry::GrammarRegistry;
use crate::e_resolver::PathResolver;

pub const CONFIG_FILE: &str = "cmake-e.toml";
pub const ENV_OUTPUT_ENCODING: &str = "CMAKE_E_OUTPUT_ENCODING";
pub const ENV_PARSERS: &str = "CMAKE_E_PARSERS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    #[serde(alias = "parseBuildDiagnostics")]
    pub parse_build_diagnostics: bool,
    /// `None` enables every grammar.
    #[serde(alias = "enabledOutputParsers")]
    pub enabled_output_parsers: Option<Vec<String>>,
    #[serde(alias = "outputEncoding")]
    pub output_encoding: Option<String>,
    pub linker_errors_dir: Option<PathBuf>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        DiagnosticsConfig {
            parse_build_diagnostics: true,
            enabled_output_parsers: None,
            output_encoding: None,
            linker_errors_dir: None,
        }
    }
}

/// Split `"gcc, msvc,,cmake"` into `["gcc", "msvc", "cmake"]`.
pub fn parse_parser_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl DiagnosticsConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parsing cmake-e configuration")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` (which must exist), else `./cmake-e.toml` when
    /// present, else defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_path(path)?,
            None => {
                let local = Path::new(CONFIG_FILE);
                if local.is_file() {
                    Self::from_path(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enc) = lookup(ENV_OUTPUT_ENCODING).filter(|v| !v.trim().is_empty()) {
            log::debug!("{}={}", ENV_OUTPUT_ENCODING, enc);
            self.output_encoding = Some(enc);
        }
        if let Some(list) = lookup(ENV_PARSERS) {
            log::debug!("{}={}", ENV_PARSERS, list);
            self.enabled_output_parsers = Some(parse_parser_list(&list));
        }
    }

    pub fn registry(&self) -> GrammarRegistry {
        GrammarRegistry::with_builtin().with_allow_list(self.enabled_output_parsers.as_deref())
    }

    pub fn decoder(&self) -> LineDecoder {
        LineDecoder::for_label(self.output_encoding.as_deref())
    }

    pub fn resolver(&self) -> PathResolver {
        match &self.linker_errors_dir {
            Some(dir) => PathResolver::new(dir),
            None => PathResolver::default(),
        }
    }

    /// A consumer wired the way this configuration asks for.
    pub fn consumer(&self) -> OutputConsumer {
        let consumer = if self.parse_build_diagnostics {
            OutputConsumer::new(&self.registry())
        } else {
            OutputConsumer::disabled()
        };
        consumer.with_decoder(self.decoder())
    }
}
