//! The repair engine.

use std::path::Path;

use tourniquet_facts::{
    CollectStats, Extractor, FactQuery, FactStore, Location, is_cxx_path,
    extract::validate_source,
};
use tourniquet_patch_lang::{Concretization, PatchTemplate};
use tracing::{debug, info};

use crate::templates::builtin_templates;
use crate::{
    Error, Result, SourceBackup, SpanRewriter, Target, TemplateRegistry, Transformer,
    TrialOutcome,
};

/// Owns a fact store, an extractor and a set of named templates.
///
/// Collection and concretization are separate phases: facts for a file are
/// collected (written) first, then templates are concretized (read) against
/// them. Nothing here is shared between engine instances.
pub struct Tourniquet {
    store: FactStore,
    extractor: Box<dyn Extractor>,
    transformer: Box<dyn Transformer>,
    templates: TemplateRegistry,
    max_candidates: Option<usize>,
}

impl Tourniquet {
    pub fn new(store: FactStore, extractor: Box<dyn Extractor>) -> Self {
        Self {
            store,
            extractor,
            transformer: Box::new(SpanRewriter),
            templates: TemplateRegistry::new(),
            max_candidates: None,
        }
    }

    /// Open (or create) the fact database at `db_path`.
    pub fn open(db_path: &Path, extractor: Box<dyn Extractor>) -> Result<Self> {
        Ok(Self::new(FactStore::open(db_path)?, extractor))
    }

    pub fn with_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Cap the candidates tried per location in [`auto_patch`](Self::auto_patch).
    pub fn with_max_candidates(mut self, max_candidates: Option<usize>) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn db(&self) -> &FactStore {
        &self.store
    }

    /// Extract and store the facts of a source file.
    pub fn collect_info(&mut self, path: &Path) -> Result<CollectStats> {
        self.collect_info_as(path, is_cxx_path(path))
    }

    /// Like [`collect_info`](Self::collect_info), with the language given explicitly.
    pub fn collect_info_as(&mut self, path: &Path, is_cxx: bool) -> Result<CollectStats> {
        validate_source(path)?;
        let facts = self.extractor.extract_ast(path, is_cxx)?;
        Ok(self.store.collect(&facts)?)
    }

    pub fn register_template(
        &mut self,
        name: impl Into<String>,
        template: PatchTemplate,
    ) -> Result<()> {
        self.templates.register(name, template)
    }

    /// Register every built-in template under its usual name.
    pub fn register_builtins(&mut self) -> Result<()> {
        for (name, template) in builtin_templates() {
            self.templates.register(name, template)?;
        }
        Ok(())
    }

    pub fn template(&self, name: &str) -> Result<&PatchTemplate> {
        self.templates.get(name)
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn concretize_template(&self, name: &str, location: &Location) -> Result<Concretization> {
        Ok(self.template(name)?.concretize(&self.store, location)?)
    }

    pub fn view_template(&self, name: &str, location: &Location) -> Result<String> {
        Ok(self.template(name)?.view(&self.store, location)?)
    }

    /// Replace the statement starting at `location` with `replacement`, on disk.
    pub fn transform(&self, location: &Location, replacement: &str, is_cxx: bool) -> Result<()> {
        let statement = self
            .store
            .statement_at(location)?
            .ok_or_else(|| Error::PatchSituation(location.clone()))?;
        self.transformer
            .transform(&location.file, is_cxx, replacement, &statement.span)?;
        Ok(())
    }

    /// Search for a patch that makes `target` build and pass all its tests.
    ///
    /// Returns the first passing replacement, or `None` if no candidate
    /// passes. Failed builds and tests only rule a candidate out; errors are
    /// reserved for things like an unknown template or an unreadable file.
    /// The source file is back to its original content when this returns.
    pub fn auto_patch(&mut self, name: &str, target: &Target) -> Result<Option<String>> {
        self.template(name)?;
        self.collect_info_as(&target.file, target.is_cxx)?;

        let template = self.templates.get(name)?;
        let limit = self.max_candidates.unwrap_or(usize::MAX);
        for location in target.locator.locations(&self.store, &target.file)? {
            if !template.matches(location.line(), location.column()) {
                continue;
            }
            let candidates = template.concretize(&self.store, &location)?;
            info!(
                template = name,
                %location,
                raw_candidates = candidates.raw_count(),
                "trying location"
            );

            for candidate in candidates.iter().take(limit) {
                let outcome = self.trial(target, &location, &candidate)?;
                debug!(%location, %outcome, candidate = %candidate, "trial");
                if outcome == TrialOutcome::Passed {
                    info!(template = name, %location, "found passing patch");
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }

    /// Apply one candidate, build and test, then put the file back.
    fn trial(&self, target: &Target, location: &Location, candidate: &str) -> Result<TrialOutcome> {
        let _backup = SourceBackup::take(&target.file)?;
        self.transform(location, candidate, target.is_cxx)?;
        Ok(target.trial()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourniquet_facts::{AstFacts, FactError, module_name_for};
    use tourniquet_patch_lang::{Expression, FixPattern, Statement};

    /// Serves facts from memory, whatever file is asked for.
    struct Canned(&'static str);

    impl Extractor for Canned {
        fn extract_ast(&self, path: &Path, _is_cxx: bool) -> std::result::Result<AstFacts, FactError> {
            let mut facts: AstFacts = serde_json::from_str(self.0)?;
            facts.module_name = module_name_for(path);
            Ok(facts)
        }
    }

    const FACTS: &str = r#"{
        "module_name": "",
        "functions": {
            "main": [
                ["func_decl", 1, 1, 4, 1],
                ["var_type", 2, 3, 2, 7, "x", "int", 0, 4],
                ["stmt_type", 2, 3, 2, 11, "int x = 1"],
                ["stmt_type", 3, 3, 3, 10, "return x"]
            ]
        }
    }"#;

    const SOURCE: &str = "int main() {\n  int x = 1;\n  return x;\n}\n";

    fn engine() -> Tourniquet {
        Tourniquet::new(FactStore::open_in_memory().unwrap(), Box::new(Canned(FACTS)))
    }

    #[test]
    fn test_collect_missing_file() {
        let mut engine = engine();
        let err = engine.collect_info(Path::new("/no/such/file.c")).unwrap_err();
        assert!(matches!(err, Error::Facts(FactError::FileNotFound(_))));
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine().collect_info(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Facts(FactError::NotAFile(_))));
    }

    #[test]
    fn test_register_and_concretize() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();

        let mut engine = engine();
        engine.collect_info(&file).unwrap();
        engine
            .register_template(
                "ret",
                PatchTemplate::new(FixPattern::new([Statement::ret(Expression::variable())])),
            )
            .unwrap();
        assert!(matches!(
            engine.register_template("ret", PatchTemplate::new(FixPattern::default())),
            Err(Error::TemplateNameConflict(_))
        ));

        let got: Vec<String> = engine
            .concretize_template("ret", &Location::new(&file, 3, 3))
            .unwrap()
            .iter()
            .collect();
        assert_eq!(got, ["return x;"]);
        assert!(matches!(
            engine.concretize_template("nope", &Location::new(&file, 3, 3)),
            Err(Error::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_concretize_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();

        let mut engine = engine();
        engine.collect_info(&file).unwrap();
        engine.register_builtins().unwrap();
        let err = engine
            .concretize_template("buffer-guard", &Location::new(&file, 9, 9))
            .unwrap_err();
        assert!(matches!(err, Error::Concretize(_)));
    }

    #[test]
    fn test_transform_rewrites_statement() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();

        let mut engine = engine();
        engine.collect_info(&file).unwrap();
        engine
            .transform(&Location::new(&file, 3, 3), "return 0", false)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "int main() {\n  int x = 1;\n  return 0;\n}\n"
        );
    }

    #[test]
    fn test_transform_without_statement() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();

        let mut engine = engine();
        engine.collect_info(&file).unwrap();
        let err = engine
            .transform(&Location::new(&file, 3, 4), "return 0", false)
            .unwrap_err();
        assert!(matches!(err, Error::PatchSituation(_)));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[test]
    fn test_view_template() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();

        let mut engine = engine();
        engine.collect_info(&file).unwrap();
        engine.register_builtins().unwrap();
        let view = engine
            .view_template("bounds-check", &Location::new(&file, 3, 3))
            .unwrap();
        assert_eq!(
            view,
            "if (BinaryBoolOperator(Variable(),Variable())) {\nreturn 1;\n\n}\n\nreturn x;\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_auto_patch_restores_source_when_nothing_passes() {
        use crate::{TestCase, TrivialLocator};

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "exit 1").unwrap();

        let mut engine = engine();
        engine.register_builtins().unwrap();
        let target = Target::new(
            &file,
            "sh",
            vec!["true".to_string()],
            vec![TestCase::new(script.to_string_lossy(), 0)],
            TrivialLocator::new(3, 3),
        )
        .unwrap();

        assert_eq!(engine.auto_patch("delete-statement", &target).unwrap(), None);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), SOURCE);
    }

    #[test]
    fn test_auto_patch_unknown_template() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.c");
        std::fs::write(&file, SOURCE).unwrap();
        let target = Target::new(
            &file,
            "prog",
            vec!["true".to_string()],
            vec![],
            crate::TrivialLocator::new(3, 3),
        )
        .unwrap();
        let err = engine().auto_patch("nope", &target).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }
}
