#![allow(dead_code)]
use std::fs;
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A throwaway CMake-style tree: `<tmp>/src`, `<tmp>/build` and a
/// dedicated directory for the generated linker errors file.
pub struct BuildTree {
    /// The temporary directory. When this is dropped, the directory and its contents are removed.
    pub temp_dir: TempDir,
    pub source_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub linker_dir: PathBuf,
}

impl BuildTree {
    pub fn new() -> IoResult<Self> {
        let temp_dir = tempdir()?;
        let source_dir = temp_dir.path().join("src");
        let binary_dir = temp_dir.path().join("build");
        let linker_dir = temp_dir.path().join("diag");
        fs::create_dir_all(&source_dir)?;
        fs::create_dir_all(&binary_dir)?;
        fs::write(
            source_dir.join("CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.20)\nproject(app C)\nadd_executable(app main.c)\n",
        )?;
        Ok(BuildTree {
            temp_dir,
            source_dir,
            binary_dir,
            linker_dir,
        })
    }

    /// Write a file relative to the source directory and return its path.
    pub fn write_source(&self, rel: &str, content: &str) -> IoResult<PathBuf> {
        let path = self.source_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a captured build log (one entry per line) into the build directory.
    pub fn write_log(&self, lines: &[&str]) -> IoResult<PathBuf> {
        let path = self.binary_dir.join("build.log");
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(&path, text)?;
        Ok(path)
    }

    /// Binary dir first, then source dir.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        vec![self.binary_dir.clone(), self.source_dir.clone()]
    }

    pub fn linker_errors_file(&self) -> PathBuf {
        self.linker_dir.join("linkerrors.txt")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
