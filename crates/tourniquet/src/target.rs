//! The program under repair: how to build it and how to tell whether it works.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use tourniquet_facts::{FactError, is_cxx_path};
use tracing::debug;

use crate::{Locator, Result};

/// One run of the built program: `executable <input>` must exit with `expected_exit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected_exit: i32,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_exit: i32) -> Self {
        Self {
            input: input.into(),
            expected_exit,
        }
    }
}

/// Parses `INPUT=CODE`; the last `=` separates, so inputs may contain `=`.
impl FromStr for TestCase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (input, code) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected INPUT=EXIT_CODE, got {s:?}"))?;
        let expected_exit = code
            .trim()
            .parse()
            .map_err(|_| format!("exit code must be an integer, got {code:?}"))?;
        Ok(Self::new(input, expected_exit))
    }
}

/// Tally of one pass over a test corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestReport {
    pub passed: usize,
    pub failed: usize,
}

impl TestReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// What happened to one candidate patch.
///
/// None of these stop the search; they only rule the candidate out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Passed,
    BuildFailed,
    TestsFailed { failed: usize },
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialOutcome::Passed => f.write_str("passed"),
            TrialOutcome::BuildFailed => f.write_str("build failed"),
            TrialOutcome::TestsFailed { failed } => write!(f, "{failed} test(s) failed"),
        }
    }
}

/// A source file to repair, with its build and test harness.
pub struct Target {
    pub file: PathBuf,
    pub is_cxx: bool,
    pub tests: Vec<TestCase>,
    pub build_command: Vec<String>,
    pub executable: PathBuf,
    pub locator: Box<dyn Locator>,
}

impl Target {
    /// Fails with `FileNotFound` if `file` does not exist.
    pub fn new(
        file: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
        build_command: Vec<String>,
        tests: Vec<TestCase>,
        locator: impl Locator + 'static,
    ) -> Result<Self> {
        let file = file.into();
        if !file.exists() {
            return Err(FactError::FileNotFound(file).into());
        }
        Ok(Self {
            is_cxx: is_cxx_path(&file),
            file,
            tests,
            build_command,
            executable: executable.into(),
            locator: Box::new(locator),
        })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Run the build command; `Ok(false)` means it ran and failed.
    pub fn build(&self) -> io::Result<bool> {
        let (program, args) = self.build_command.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty build command")
        })?;
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        debug!(command = ?self.build_command, success = status.success(), "build");
        Ok(status.success())
    }

    /// Run every test case against the built executable.
    ///
    /// A process killed by a signal has no exit code and fails its case.
    pub fn run_tests(&self) -> io::Result<TestReport> {
        let mut report = TestReport::default();
        for case in &self.tests {
            let status = Command::new(&self.executable)
                .arg(&case.input)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()?;
            let ok = status.code() == Some(case.expected_exit);
            debug!(
                input = %case.input,
                expected = case.expected_exit,
                actual = ?status.code(),
                ok,
                "test case"
            );
            if ok {
                report.passed += 1;
            } else {
                report.failed += 1;
            }
        }
        Ok(report)
    }

    /// Build, then test if the build succeeded.
    pub fn trial(&self) -> io::Result<TrialOutcome> {
        if !self.build()? {
            return Ok(TrialOutcome::BuildFailed);
        }
        let report = self.run_tests()?;
        Ok(if report.all_passed() {
            TrialOutcome::Passed
        } else {
            TrialOutcome::TestsFailed {
                failed: report.failed,
            }
        })
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("file", &self.file)
            .field("is_cxx", &self.is_cxx)
            .field("tests", &self.tests)
            .field("build_command", &self.build_command)
            .field("executable", &self.executable)
            .finish_non_exhaustive()
    }
}
