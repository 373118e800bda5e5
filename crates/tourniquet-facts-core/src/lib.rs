//! Core data types for tourniquet facts.
//!
//! This crate defines the vocabulary shared by the fact store and the patch
//! language - source locations, spans, and the per-module AST facts. These
//! types are used by:
//! - `tourniquet-facts` for ingestion and storage
//! - `tourniquet-patch-lang` for scope resolution during concretization
//! - `tourniquet` for situating patches in a source file

mod location;
mod raw;
mod record;

pub use location::{Location, SourceCoordinate, SourceSpan, module_name_for};
pub use raw::{AstFacts, FactTuple};
pub use record::{Argument, Call, Function, Global, Module, Statement, VarDecl};
