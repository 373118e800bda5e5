//! Expression terms.

use std::fmt;
use std::sync::Arc;

use tourniquet_facts::{FactQuery, Location};

use crate::expand::{Concretization, Node};
use crate::scope::Scope;
use crate::ConcretizeError;

const MATH_OPERATORS: &[&str] = &["+", "-", "/", "*", "<<"];
const BOOL_OPERATORS: &[&str] = &["==", "!=", "<=", "<", ">=", ">"];
const LESS_THAN: &[&str] = &["<"];

/// An expression that expands to one or more snippets of C source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Exactly this text.
    Literal(String),
    /// Each local variable of the enclosing function, in declaration order.
    Variable,
    /// `sizeof(name)` for each array-typed local of the enclosing function.
    StaticBufferSize,
    /// `l + r`, `l - r`, `l / r`, `l * r`, `l << r` for every pair.
    BinaryMathOperator(Box<Expression>, Box<Expression>),
    /// `l == r`, `l != r`, `l <= r`, `l < r`, `l >= r`, `l > r` for every pair.
    BinaryBoolOperator(Box<Expression>, Box<Expression>),
    /// `l < r` for every pair.
    LessThanExpr(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn lit(text: impl Into<String>) -> Self {
        Expression::Literal(text.into())
    }

    pub fn variable() -> Self {
        Expression::Variable
    }

    pub fn static_buffer_size() -> Self {
        Expression::StaticBufferSize
    }

    pub fn math(lhs: Expression, rhs: Expression) -> Self {
        Expression::BinaryMathOperator(Box::new(lhs), Box::new(rhs))
    }

    pub fn compare(lhs: Expression, rhs: Expression) -> Self {
        Expression::BinaryBoolOperator(Box::new(lhs), Box::new(rhs))
    }

    pub fn less_than(lhs: Expression, rhs: Expression) -> Self {
        Expression::LessThanExpr(Box::new(lhs), Box::new(rhs))
    }

    /// Expand this expression at `location`.
    ///
    /// Fails with [`ConcretizeError::NoEnclosingFunction`] if it mentions a
    /// symbol leaf and no function contains the location.
    pub fn concretize(
        &self,
        db: &dyn FactQuery,
        location: &Location,
    ) -> Result<Concretization, ConcretizeError> {
        let mut scope = Scope::new(db, location);
        Ok(Concretization::new(self.resolve(&mut scope)?))
    }

    /// Unexpanded sketch; never touches the fact store.
    pub fn view(&self) -> String {
        self.to_string()
    }

    pub(crate) fn resolve(&self, scope: &mut Scope<'_>) -> Result<Node, ConcretizeError> {
        Ok(match self {
            Expression::Literal(text) => Node::leaves(vec![text.clone()]),
            Expression::Variable => {
                let function = scope.enclosing_function()?;
                Node::leaves(function.var_decls.iter().map(|v| v.name.clone()).collect())
            }
            Expression::StaticBufferSize => {
                let function = scope.enclosing_function()?;
                Node::leaves(
                    function
                        .var_decls
                        .iter()
                        .filter(|v| v.is_array)
                        .map(|v| format!("sizeof({})", v.name))
                        .collect(),
                )
            }
            Expression::BinaryMathOperator(lhs, rhs) => binary(lhs, rhs, MATH_OPERATORS, scope)?,
            Expression::BinaryBoolOperator(lhs, rhs) => binary(lhs, rhs, BOOL_OPERATORS, scope)?,
            Expression::LessThanExpr(lhs, rhs) => binary(lhs, rhs, LESS_THAN, scope)?,
        })
    }
}

fn binary(
    lhs: &Expression,
    rhs: &Expression,
    ops: &'static [&'static str],
    scope: &mut Scope<'_>,
) -> Result<Node, ConcretizeError> {
    Ok(Node::Binary {
        lhs: Arc::new(lhs.resolve(scope)?),
        rhs: Arc::new(rhs.resolve(scope)?),
        ops,
    })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(text) => f.write_str(text),
            Expression::Variable => f.write_str("Variable()"),
            Expression::StaticBufferSize => f.write_str("StaticBufferSize()"),
            Expression::BinaryMathOperator(lhs, rhs) => {
                write!(f, "BinaryMathOperator({lhs},{rhs})")
            }
            Expression::BinaryBoolOperator(lhs, rhs) => {
                write!(f, "BinaryBoolOperator({lhs},{rhs})")
            }
            Expression::LessThanExpr(lhs, rhs) => write!(f, "{lhs} < {rhs}"),
        }
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression::lit(text)
    }
}
