//! Fact records as stored in and returned by the fact store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Location, SourceSpan};

/// A C or C++ translation unit, keyed by its source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
}

/// A function definition together with everything declared or evaluated in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: i64,
    pub module_name: String,
    pub name: String,
    pub span: SourceSpan,
    /// Parameters and locals, in declaration order.
    pub var_decls: Vec<VarDecl>,
    pub calls: Vec<Call>,
    pub statements: Vec<Statement>,
}

impl Function {
    pub fn location(&self) -> Location {
        location_of(&self.module_name, &self.span)
    }
}

/// A global variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub type_name: String,
    pub span: SourceSpan,
    pub is_array: bool,
    /// Size in bytes (element count for constant arrays).
    pub size: u64,
}

/// A parameter or local variable declaration, owned by its function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub type_name: String,
    pub span: SourceSpan,
    pub is_array: bool,
    pub size: u64,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub module_name: String,
    /// Full call expression text.
    pub expr: String,
    pub callee: String,
    pub span: SourceSpan,
    pub arguments: Vec<Argument>,
}

impl Call {
    pub fn location(&self) -> Location {
        location_of(&self.module_name, &self.span)
    }
}

/// One argument of a call, as written at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub type_name: String,
}

/// A primitive (non-compound) statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub module_name: String,
    pub span: SourceSpan,
    pub expr: String,
}

impl Statement {
    pub fn location(&self) -> Location {
        location_of(&self.module_name, &self.span)
    }

    /// The statement text terminated with a semicolon.
    pub fn terminated(&self) -> String {
        if self.expr.ends_with(';') {
            self.expr.clone()
        } else {
            format!("{};", self.expr)
        }
    }
}

fn location_of(module_name: &str, span: &SourceSpan) -> Location {
    Location {
        file: PathBuf::from(module_name),
        coordinate: span.start(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(expr: &str) -> Statement {
        Statement {
            module_name: "prog.c".into(),
            span: SourceSpan::new(23, 3, 23, 15),
            expr: expr.into(),
        }
    }

    #[test]
    fn test_terminated_appends_semicolon() {
        assert_eq!(stmt("char buff[10]").terminated(), "char buff[10];");
    }

    #[test]
    fn test_terminated_keeps_existing_semicolon() {
        assert_eq!(stmt("char buff[10];").terminated(), "char buff[10];");
    }

    #[test]
    fn test_statement_location_is_span_start() {
        let loc = stmt("x").location();
        assert_eq!(loc, Location::new("prog.c", 23, 3));
        assert_eq!(loc.module_name(), "prog.c");
    }
}
