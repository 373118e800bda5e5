//! Statement terms and statement lists.

use std::sync::Arc;

use tourniquet_facts::{FactQuery, Location};

use crate::expand::{Concretization, Node};
use crate::scope::Scope;
use crate::{ConcretizeError, Expression};

/// A statement that expands to one or more snippets of C source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `if (cond) {\nbody\n}\n`
    If {
        cond: Expression,
        body: StatementList,
    },
    /// `else {\nbody\n}\n`
    Else { body: StatementList },
    /// `return expr;`
    Return(Expression),
    /// The program's own statement starting exactly at the location.
    Node,
    /// An expression spliced in as-is, e.g. a literal `exit(1);`.
    Expr(Expression),
}

impl Statement {
    pub fn if_then(cond: Expression, body: impl Into<StatementList>) -> Self {
        Statement::If {
            cond,
            body: body.into(),
        }
    }

    pub fn otherwise(body: impl Into<StatementList>) -> Self {
        Statement::Else { body: body.into() }
    }

    pub fn ret(expr: Expression) -> Self {
        Statement::Return(expr)
    }

    pub fn node() -> Self {
        Statement::Node
    }

    /// Expand this statement at `location`.
    pub fn concretize(
        &self,
        db: &dyn FactQuery,
        location: &Location,
    ) -> Result<Concretization, ConcretizeError> {
        let mut scope = Scope::new(db, location);
        Ok(Concretization::new(self.resolve(&mut scope)?))
    }

    /// Unexpanded sketch.
    ///
    /// Only an anchor consults the store, to show the statement it stands
    /// for; it renders as `NodeStmt()` when there is none. Store failures
    /// are returned, not rendered.
    pub fn view(&self, db: &dyn FactQuery, location: &Location) -> Result<String, ConcretizeError> {
        Ok(match self {
            Statement::If { cond, body } => {
                format!("if ({cond}) {{\n{}\n}}\n", body.view(db, location)?)
            }
            Statement::Else { body } => format!("else {{\n{}\n}}\n", body.view(db, location)?),
            Statement::Return(expr) => format!("return {expr};"),
            Statement::Node => match db.statement_at(location)? {
                Some(statement) => statement.terminated(),
                None => "NodeStmt()".to_string(),
            },
            Statement::Expr(expr) => expr.view(),
        })
    }

    pub(crate) fn resolve(&self, scope: &mut Scope<'_>) -> Result<Node, ConcretizeError> {
        Ok(match self {
            Statement::If { cond, body } => Node::If {
                cond: Arc::new(cond.resolve(scope)?),
                body: Arc::new(body.resolve(scope)?),
            },
            Statement::Else { body } => Node::Wrap {
                inner: Arc::new(body.resolve(scope)?),
                prefix: "else {\n",
                suffix: "\n}\n",
            },
            Statement::Return(expr) => Node::Wrap {
                inner: Arc::new(expr.resolve(scope)?),
                prefix: "return ",
                suffix: ";",
            },
            Statement::Node => Node::leaves(vec![scope.anchored_statement()?]),
            Statement::Expr(expr) => expr.resolve(scope)?,
        })
    }
}

impl From<Expression> for Statement {
    fn from(expr: Expression) -> Self {
        Statement::Expr(expr)
    }
}

/// An ordered sequence of statements.
///
/// Expands to the newline-joined cartesian product of its members'
/// candidates, first member turning slowest. The result is a set: a string
/// produced by more than one combination is streamed once, at its first
/// occurrence. An empty list has no candidates at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementList(pub Vec<Statement>);

impl StatementList {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self(statements)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn concretize(
        &self,
        db: &dyn FactQuery,
        location: &Location,
    ) -> Result<Concretization, ConcretizeError> {
        let mut scope = Scope::new(db, location);
        Ok(Concretization::new(self.resolve(&mut scope)?))
    }

    /// Member views, each followed by a newline.
    pub fn view(&self, db: &dyn FactQuery, location: &Location) -> Result<String, ConcretizeError> {
        self.0
            .iter()
            .map(|s| s.view(db, location).map(|v| v + "\n"))
            .collect()
    }

    pub(crate) fn resolve(&self, scope: &mut Scope<'_>) -> Result<Node, ConcretizeError> {
        let members = self
            .0
            .iter()
            .map(|s| s.resolve(scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::List(members.into()))
    }
}

impl From<Vec<Statement>> for StatementList {
    fn from(statements: Vec<Statement>) -> Self {
        Self(statements)
    }
}

impl<const N: usize> From<[Statement; N]> for StatementList {
    fn from(statements: [Statement; N]) -> Self {
        Self(statements.into())
    }
}

impl From<Statement> for StatementList {
    fn from(statement: Statement) -> Self {
        Self(vec![statement])
    }
}

impl FromIterator<Statement> for StatementList {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
