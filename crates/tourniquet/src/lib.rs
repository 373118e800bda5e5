//! Automated program repair for C and C++.
//!
//! Given a source file, its AST facts and a set of fix templates, the
//! [`Tourniquet`] engine enumerates candidate patches at chosen locations,
//! applies each in place, rebuilds, runs a test corpus and keeps the first
//! candidate that passes.
//!
//! - [`TemplateRegistry`] holds the named templates of one engine
//! - [`Locator`]s pick where templates are tried
//! - [`Target`] knows how to build and test the program
//! - [`Transformer`] and [`SourceBackup`] apply a candidate and undo it

mod backup;
pub mod config;
mod engine;
mod error;
mod locator;
mod registry;
pub mod target;
pub mod templates;
mod transform;

pub use backup::SourceBackup;
pub use config::TourniquetConfig;
pub use engine::Tourniquet;
pub use error::{Error, Result};
pub use locator::{Locator, StatementLocator, TrivialLocator};
pub use registry::TemplateRegistry;
pub use target::{Target, TestCase, TestReport, TrialOutcome};
pub use transform::{SpanRewriter, Transformer};

pub use tourniquet_facts as facts;
pub use tourniquet_patch_lang as patch_lang;
