//! Patch Template Language.
//!
//! Fix templates are small term trees built from [`Expression`]s and
//! [`Statement`]s. Concretizing a tree at a [`Location`] resolves its
//! symbol leaves against the AST fact store and expands the combinations
//! into candidate replacement text:
//!
//! ```
//! use tourniquet_patch_lang::{Expression, FixPattern, Statement};
//! use tourniquet_facts::{Location, NoFacts};
//!
//! let pattern = FixPattern::new([Statement::ret(Expression::math(
//!     Expression::lit("1"),
//!     Expression::lit("2"),
//! ))]);
//! let candidates = pattern
//!     .concretize(&NoFacts, &Location::new("prog.c", 3, 5))
//!     .unwrap();
//! assert_eq!(candidates.iter().next().as_deref(), Some("return 1 + 2;"));
//! ```

mod error;
mod expand;
mod expression;
mod scope;
mod statement;
mod template;

pub use error::ConcretizeError;
pub use expand::{Candidates, Concretization};
pub use expression::Expression;
pub use statement::{Statement, StatementList};
pub use template::{FixPattern, Matcher, PatchTemplate};

pub use tourniquet_facts::Location;
