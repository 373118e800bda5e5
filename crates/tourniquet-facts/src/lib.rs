//! AST fact extraction and storage library.
//!
//! This crate provides:
//! - The [`Extractor`] boundary to the native AST exporter
//! - The SQLite-backed [`FactStore`] that ingests extractor output
//! - The [`FactQuery`] contract the patch language resolves symbols through

pub mod extract;
mod error;
mod query;
mod store;

pub use error::FactError;
pub use extract::{CommandExtractor, Extractor, SidecarExtractor, is_cxx_path};
pub use query::{FactQuery, NoFacts};
pub use store::{CollectStats, FactStore};

// Re-export core types for convenience
pub use tourniquet_facts_core::{
    Argument, AstFacts, Call, FactTuple, Function, Global, Location, Module, SourceCoordinate,
    SourceSpan, Statement, VarDecl, module_name_for,
};
