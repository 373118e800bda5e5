//! Where to try templates.

use std::path::Path;

use tourniquet_facts::{FactStore, Location, module_name_for};

use crate::Result;

/// Produces the candidate locations of a file to try templates at.
pub trait Locator: Send + Sync {
    fn locations(&self, db: &FactStore, file: &Path) -> Result<Vec<Location>>;
}

impl<L: Locator + ?Sized> Locator for Box<L> {
    fn locations(&self, db: &FactStore, file: &Path) -> Result<Vec<Location>> {
        (**self).locations(db, file)
    }
}

/// A single, known location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrivialLocator {
    pub line: u32,
    pub column: u32,
}

impl TrivialLocator {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Locator for TrivialLocator {
    fn locations(&self, _db: &FactStore, file: &Path) -> Result<Vec<Location>> {
        Ok(vec![Location::new(file, self.line, self.column)])
    }
}

/// The start of every statement in the file, in source order.
///
/// Template matchers then decide which of them are worth a try.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementLocator;

impl Locator for StatementLocator {
    fn locations(&self, db: &FactStore, file: &Path) -> Result<Vec<Location>> {
        let module = module_name_for(file);
        let mut locations: Vec<Location> = db
            .statements_in_module(&module)?
            .into_iter()
            .map(|s| Location::new(file, s.span.start_line, s.span.start_column))
            .collect();
        locations.dedup();
        Ok(locations)
    }
}
