//! Source locations and spans.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A line/column pair within some unspecified source file (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceCoordinate {
    pub line: u32,
    pub column: u32,
}

impl SourceCoordinate {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A point in a program's source code.
///
/// Deliberately not a span: concretization is situated at a single point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub coordinate: SourceCoordinate,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            coordinate: SourceCoordinate::new(line, column),
        }
    }

    pub fn line(&self) -> u32 {
        self.coordinate.line
    }

    pub fn column(&self) -> u32 {
        self.coordinate.column
    }

    /// The module name this location belongs to; see [`module_name_for`].
    pub fn module_name(&self) -> String {
        module_name_for(&self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.display(),
            self.coordinate.line,
            self.coordinate.column
        )
    }
}

/// Render a source path as a module name.
///
/// Different spellings of one relative path name one module: a leading `./`
/// is dropped, and so are repeated separators and interior `.` components.
/// The path is not resolved against the filesystem, so `a/../b.c` and
/// `b.c` stay distinct.
pub fn module_name_for(path: &Path) -> String {
    let normalized: PathBuf = path
        .components()
        .skip_while(|c| matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        return path.to_string_lossy().into_owned();
    }
    normalized.to_string_lossy().into_owned()
}

/// Start and end coordinates of a source feature, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn start(&self) -> SourceCoordinate {
        SourceCoordinate::new(self.start_line, self.start_column)
    }

    pub fn end(&self) -> SourceCoordinate {
        SourceCoordinate::new(self.end_line, self.end_column)
    }

    /// Whether `point` lies within this span.
    pub fn contains(&self, point: &SourceCoordinate) -> bool {
        let after_start = point.line > self.start_line
            || (point.line == self.start_line && point.column >= self.start_column);
        let before_end = point.line < self.end_line
            || (point.line == self.end_line && point.column <= self.end_column);
        after_start && before_end
    }
}
