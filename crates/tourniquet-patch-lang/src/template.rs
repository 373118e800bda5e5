//! Fix patterns and patch templates.

use std::fmt;

use tourniquet_facts::{FactQuery, Location};
use tracing::debug;

use crate::{Concretization, ConcretizeError, StatementList};

/// Location predicate deciding whether a template is worth trying at `(line, column)`.
pub type Matcher = Box<dyn Fn(u32, u32) -> bool + Send + Sync>;

/// The replacement body of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixPattern(pub StatementList);

impl FixPattern {
    pub fn new(statements: impl Into<StatementList>) -> Self {
        Self(statements.into())
    }

    pub fn statements(&self) -> &StatementList {
        &self.0
    }

    pub fn concretize(
        &self,
        db: &dyn FactQuery,
        location: &Location,
    ) -> Result<Concretization, ConcretizeError> {
        self.0.concretize(db, location)
    }

    pub fn view(&self, db: &dyn FactQuery, location: &Location) -> Result<String, ConcretizeError> {
        self.0.view(db, location)
    }
}

/// A fix pattern plus an optional gate on where it applies.
///
/// The matcher is only consulted through [`matches`](Self::matches); it has
/// no say in what [`concretize`](Self::concretize) produces.
pub struct PatchTemplate {
    fix_pattern: FixPattern,
    matcher: Option<Matcher>,
}

impl PatchTemplate {
    /// A template that applies everywhere.
    pub fn new(fix_pattern: FixPattern) -> Self {
        Self {
            fix_pattern,
            matcher: None,
        }
    }

    pub fn with_matcher(
        mut self,
        matcher: impl Fn(u32, u32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Restrict the template to a single point.
    pub fn only_at(self, line: u32, column: u32) -> Self {
        self.with_matcher(move |l, c| l == line && c == column)
    }

    pub fn fix_pattern(&self) -> &FixPattern {
        &self.fix_pattern
    }

    pub fn matches(&self, line: u32, column: u32) -> bool {
        self.matcher.as_ref().is_none_or(|m| m(line, column))
    }

    pub fn concretize(
        &self,
        db: &dyn FactQuery,
        location: &Location,
    ) -> Result<Concretization, ConcretizeError> {
        let candidates = self.fix_pattern.concretize(db, location)?;
        debug!(%location, raw_candidates = candidates.raw_count(), "concretized template");
        Ok(candidates)
    }

    pub fn view(&self, db: &dyn FactQuery, location: &Location) -> Result<String, ConcretizeError> {
        self.fix_pattern.view(db, location)
    }
}

impl fmt::Debug for PatchTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchTemplate")
            .field("fix_pattern", &self.fix_pattern)
            .field("has_matcher", &self.matcher.is_some())
            .finish()
    }
}

impl From<FixPattern> for PatchTemplate {
    fn from(fix_pattern: FixPattern) -> Self {
        Self::new(fix_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expression, Statement};
    use tourniquet_facts::NoFacts;

    fn exit_pattern() -> FixPattern {
        FixPattern::new([
            Statement::if_then(Expression::lit("1"), Statement::from(Expression::lit("exit(1);"))),
            Statement::otherwise(Statement::from(Expression::lit("exit(2);"))),
        ])
    }

    #[test]
    fn test_fix_pattern_concretize() {
        let got: Vec<String> = exit_pattern()
            .concretize(&NoFacts, &Location::new("x.c", 1, 1))
            .unwrap()
            .iter()
            .collect();
        assert_eq!(got, ["if (1) {\nexit(1);\n}\n\nelse {\nexit(2);\n}\n"]);
    }

    #[test]
    fn test_matches_without_matcher() {
        let template = PatchTemplate::new(exit_pattern());
        assert!(template.matches(1, 1));
        assert!(template.matches(999, 42));
    }

    #[test]
    fn test_matcher_gates_location() {
        let template = PatchTemplate::new(exit_pattern()).only_at(32, 3);
        assert!(template.matches(32, 3));
        assert!(!template.matches(32, 4));
        assert!(!template.matches(1, 1));
    }

    #[test]
    fn test_matcher_not_consulted_by_concretize() {
        let template = PatchTemplate::new(exit_pattern()).with_matcher(|_, _| false);
        let c = template
            .concretize(&NoFacts, &Location::new("x.c", 7, 7))
            .unwrap();
        assert_eq!(c.iter().count(), 1);
    }

    #[test]
    fn test_view_forwards() {
        let template = PatchTemplate::new(exit_pattern());
        assert_eq!(
            template.view(&NoFacts, &Location::new("x.c", 1, 1)).unwrap(),
            "if (1) {\nexit(1);\n\n}\n\nelse {\nexit(2);\n\n}\n\n"
        );
    }
}
