use std::path::PathBuf;

/// Errors from fact extraction, ingestion and queries.
#[derive(Debug, thiserror::Error)]
pub enum FactError {
    #[error("fact database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode extractor output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("malformed fact: {0}")]
    MalformedFact(String),

    #[error("extractor failed: {0}")]
    Extractor(String),
}
