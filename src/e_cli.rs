use std::path::PathBuf;

use clap::Parser;

use crate::e_cache::{CMakeCache, CACHE_FILE};
use crate::e_config::{parse_parser_list, DiagnosticsConfig};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "cmake-e is for Errors.", long_about = None)]
pub struct Cli {
    #[arg(long, value_name = "FILE", help = "Configuration file (default: ./cmake-e.toml if present).")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "LIST",
        help = "Comma separated output parsers to enable, e.g. gcc,gnuld,cmake (default: all)."
    )]
    pub parsers: Option<String>,

    #[arg(long, value_name = "LABEL", help = "Encoding of the build output, e.g. windows-1252.")]
    pub encoding: Option<String>,

    #[arg(long, value_name = "DIR", help = "Source directory used to resolve relative paths.")]
    pub source_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Binary (build) directory; tried first when resolving paths.")]
    pub binary_dir: Option<PathBuf>,

    #[arg(long = "search-dir", value_name = "DIR", help = "Additional directory to resolve paths against. Repeatable.")]
    pub search_dirs: Vec<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Where to write linkerrors.txt.")]
    pub linker_errors_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Replay a captured build log instead of running a command.")]
    pub log: Option<PathBuf>,

    #[arg(long, short = 's', default_value_t = false, help = "Print a per-file summary table.")]
    pub summary: bool,

    #[arg(long, default_value_t = false, help = "Print diagnostics as a table instead of one per line.")]
    pub table: bool,

    #[arg(long, default_value_t = false, help = "Echo the build output while it runs.")]
    pub echo: bool,

    #[arg(long, default_value_t = false, help = "Print each diagnostic to stderr the moment it is found.")]
    pub live: bool,

    #[arg(long, default_value_t = false, help = "Disable colored output.")]
    pub no_color: bool,

    #[arg(long, default_value_t = false, help = "List the available output parsers and exit.")]
    pub list_parsers: bool,

    #[arg(last = true, help = "Build command to run, e.g. -- cmake --build build")]
    pub command: Vec<String>,
}

impl Cli {
    /// Command-line flags win over the configuration file and environment.
    pub fn apply_to(&self, config: &mut DiagnosticsConfig) {
        if let Some(list) = &self.parsers {
            config.enabled_output_parsers = Some(parse_parser_list(list));
        }
        if let Some(enc) = &self.encoding {
            config.output_encoding = Some(enc.clone());
        }
        if let Some(dir) = &self.linker_errors_dir {
            config.linker_errors_dir = Some(dir.clone());
        }
    }

    /// Fill in `--source-dir` from `<binary-dir>/CMakeCache.txt` when only
    /// the build tree was given.
    pub fn infer_source_dir(&mut self) -> anyhow::Result<()> {
        if self.source_dir.is_some() {
            return Ok(());
        }
        let Some(binary) = &self.binary_dir else {
            return Ok(());
        };
        let cache_path = binary.join(CACHE_FILE);
        if !cache_path.is_file() {
            return Ok(());
        }
        let cache = CMakeCache::from_path(&cache_path)?;
        self.source_dir = cache.source_dir();
        if let Some(dir) = &self.source_dir {
            log::debug!("source dir {} from {}", dir.display(), cache_path.display());
        }
        Ok(())
    }

    /// Binary dir, then source dir, then search dirs; `fallback` when empty.
    pub fn base_dirs(&self, fallback: PathBuf) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .binary_dir
            .iter()
            .chain(self.source_dir.iter())
            .chain(self.search_dirs.iter())
            .cloned()
            .collect();
        if dirs.is_empty() {
            dirs.push(fallback);
        }
        dirs
    }
}
