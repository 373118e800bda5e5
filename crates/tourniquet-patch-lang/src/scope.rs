//! Fact lookups for one concretization.

use tourniquet_facts::{FactQuery, Function, Location};

use crate::ConcretizeError;

/// The situation a term is resolved in: a fact source and a point.
///
/// The enclosing function is looked up at most once per concretization no
/// matter how many symbol leaves the term has.
pub(crate) struct Scope<'a> {
    db: &'a dyn FactQuery,
    location: &'a Location,
    function: Option<Function>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(db: &'a dyn FactQuery, location: &'a Location) -> Self {
        Self {
            db,
            location,
            function: None,
        }
    }

    pub(crate) fn enclosing_function(&mut self) -> Result<&Function, ConcretizeError> {
        let db = self.db;
        let location = self.location;
        match &mut self.function {
            Some(function) => Ok(&*function),
            slot @ None => {
                let function = db
                    .function_containing(location)?
                    .ok_or_else(|| ConcretizeError::NoEnclosingFunction(location.clone()))?;
                Ok(&*slot.insert(function))
            }
        }
    }

    /// Text of the statement anchored exactly at the location, `;`-terminated.
    pub(crate) fn anchored_statement(&self) -> Result<String, ConcretizeError> {
        self.db
            .statement_at(self.location)?
            .map(|statement| statement.terminated())
            .ok_or_else(|| ConcretizeError::NoStatementAtLocation(self.location.clone()))
    }
}
