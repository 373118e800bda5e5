//! The query contract consumed by concretization.

use crate::{FactError, Function, Location, Statement};

/// Read-only lookups the patch language issues against the fact store.
pub trait FactQuery {
    /// The function whose span contains `location`, in the same module.
    fn function_containing(&self, location: &Location) -> Result<Option<Function>, FactError>;

    /// The statement starting exactly at `location`.
    fn statement_at(&self, location: &Location) -> Result<Option<Statement>, FactError>;
}

/// A fact source with nothing in it.
///
/// Handy for concretizing terms that never touch the store (literals and
/// operators over literals).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFacts;

impl FactQuery for NoFacts {
    fn function_containing(&self, _location: &Location) -> Result<Option<Function>, FactError> {
        Ok(None)
    }

    fn statement_at(&self, _location: &Location) -> Result<Option<Statement>, FactError> {
        Ok(None)
    }
}
