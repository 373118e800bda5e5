//! The boundary to the native AST exporter.
//!
//! The exporter itself is out of process: it parses a C/C++ file and prints
//! its facts as JSON. Everything here either runs it or reads what it
//! produced earlier.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{AstFacts, FactError, module_name_for};

/// Produces the AST facts of one source file.
pub trait Extractor {
    /// Extract facts for `path`, parsing it as C++ when `is_cxx` is set.
    fn extract_ast(&self, path: &Path, is_cxx: bool) -> Result<AstFacts, FactError>;
}

/// File extensions treated as C++.
const CXX_EXTENSIONS: &[&str] = &["cc", "cpp", "cxx", "c++", "hh", "hpp", "hxx"];

/// Whether a source path should be parsed as C++.
pub fn is_cxx_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CXX_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reject inputs no extractor can work with.
pub fn validate_source(path: &Path) -> Result<(), FactError> {
    if !path.exists() {
        return Err(FactError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(FactError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Runs an external exporter and decodes the JSON it prints on stdout.
///
/// The exporter is invoked as `<program> <args...> [--cxx] <path>`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Build from a full command line, e.g. `["ast-exporter", "--json"]`.
    ///
    /// Returns `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Extractor for CommandExtractor {
    fn extract_ast(&self, path: &Path, is_cxx: bool) -> Result<AstFacts, FactError> {
        validate_source(path)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if is_cxx {
            cmd.arg("--cxx");
        }
        cmd.arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(program = %self.program, path = %path.display(), is_cxx, "running extractor");
        let output = cmd
            .output()
            .map_err(|e| FactError::Extractor(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FactError::Extractor(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let mut facts: AstFacts = serde_json::from_slice(&output.stdout)?;
        facts.module_name = module_name_for(path);
        Ok(facts)
    }
}

/// Reads facts exported ahead of time into `<path>.facts.json`.
///
/// Useful where the exporter is not installed: facts are produced once and
/// checked in next to the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarExtractor;

impl SidecarExtractor {
    /// Where the sidecar for `path` lives.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".facts.json");
        PathBuf::from(name)
    }
}

impl Extractor for SidecarExtractor {
    fn extract_ast(&self, path: &Path, _is_cxx: bool) -> Result<AstFacts, FactError> {
        validate_source(path)?;

        let sidecar = Self::sidecar_path(path);
        if !sidecar.is_file() {
            return Err(FactError::Extractor(format!(
                "no exported facts at {}",
                sidecar.display()
            )));
        }
        let content = std::fs::read_to_string(&sidecar)?;
        let mut facts: AstFacts = serde_json::from_str(&content)?;
        // The sidecar was exported from wherever the file lived at the time;
        // queries key on the path we were asked about.
        facts.module_name = module_name_for(path);
        Ok(facts)
    }
}
