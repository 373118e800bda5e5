use tourniquet_facts::{FactError, Location};

/// Why a term could not be concretized at a location.
///
/// These are failures of the location-to-facts relationship, not "zero
/// candidates": a term that resolves but yields nothing is `Ok` and empty.
#[derive(Debug, thiserror::Error)]
pub enum ConcretizeError {
    #[error("no function encloses {0}")]
    NoEnclosingFunction(Location),

    #[error("no statement starts at {0}")]
    NoStatementAtLocation(Location),

    #[error(transparent)]
    Facts(#[from] FactError),
}
