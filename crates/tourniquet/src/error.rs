use tourniquet_facts::{FactError, Location};
use tourniquet_patch_lang::ConcretizeError;

/// Errors that stop the engine.
///
/// A candidate that fails to build or fails its tests is not an error; see
/// [`TrialOutcome`](crate::TrialOutcome).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a template named `{0}` is already registered")]
    TemplateNameConflict(String),

    #[error("no template named `{0}`")]
    TemplateNotFound(String),

    #[error("no statement to patch at {0}")]
    PatchSituation(Location),

    #[error(transparent)]
    Concretize(#[from] ConcretizeError),

    #[error(transparent)]
    Facts(#[from] FactError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
