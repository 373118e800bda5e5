//! Configuration for tourniquet.
//!
//! Loads config from:
//! 1. Global: ~/.config/tourniquet/config.toml
//! 2. Per-project: .tourniquet/config.toml (overrides global)
//!
//! The fact database is `$TOURNIQUET_DB` if set, else `[database] path`,
//! else `.tourniquet/facts.sqlite` under the project root.
//!
//! Example config.toml:
//! ```toml
//! [extractor]
//! command = ["ast-exporter"]
//!
//! [database]
//! path = "build/facts.sqlite"   # relative to the project root; `~/` is the home dir
//!
//! [build]
//! command = ["make", "crackme"]
//!
//! [search]
//! max_candidates = 500
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Per-project directory holding `config.toml` and, by default, the fact database.
pub const PROJECT_DIR: &str = ".tourniquet";

/// Environment override for the fact database, taking precedence over `[database] path`.
pub const DATABASE_ENV: &str = "TOURNIQUET_DB";

const DEFAULT_DATABASE: &str = "facts.sqlite";

/// How to run the AST exporter.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Exporter command line; the source path is appended.
    pub command: Option<Vec<String>>,
}

/// Fact database settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file, relative to the project root unless absolute or `~/`-prefixed.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Default build command for `tourniquet patch`.
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on candidates tried per location. Unlimited when unset.
    pub max_candidates: Option<usize>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TourniquetConfig {
    pub extractor: ExtractorConfig,
    pub database: DatabaseConfig,
    pub build: BuildConfig,
    pub search: SearchConfig,
}

impl TourniquetConfig {
    /// Load configuration for a project.
    ///
    /// Missing files are fine; a file that exists but does not parse is a
    /// [`Error::Config`].
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path()
            && let Some(global) = Self::load_file(&global_path)?
        {
            config = config.merge(global);
        }

        let project_path = root.join(PROJECT_DIR).join("config.toml");
        if let Some(project) = Self::load_file(&project_path)? {
            config = config.merge(project);
        }

        Ok(config)
    }

    /// Get the global config path.
    pub fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("tourniquet").join("config.toml"))
    }

    /// Load config from a file path, `None` if there is no such file.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Merge another config into this one; settings present in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            extractor: ExtractorConfig {
                command: other.extractor.command.or(self.extractor.command),
            },
            database: DatabaseConfig {
                path: other.database.path.or(self.database.path),
            },
            build: BuildConfig {
                command: other.build.command.or(self.build.command),
            },
            search: SearchConfig {
                max_candidates: other.search.max_candidates.or(self.search.max_candidates),
            },
        }
    }

    /// Where the fact database lives for `root`.
    ///
    /// `TOURNIQUET_DB` wins over `[database] path`; with neither set the
    /// database sits in the project directory. An empty variable counts as
    /// unset.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        let chosen = std::env::var_os(DATABASE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.database.path.clone());
        match chosen {
            // `join` leaves absolute paths untouched.
            Some(path) => root.join(expand_home(path)),
            None => root.join(PROJECT_DIR).join(DEFAULT_DATABASE),
        }
    }
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // set_var/remove_var are unsafe in edition 2024; tests touching the
    // environment hold this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_config(dir: &Path, body: &str) {
        std::fs::create_dir_all(dir).unwrap();
        let mut file = std::fs::File::create(dir.join("config.toml")).unwrap();
        writeln!(file, "{body}").unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = TourniquetConfig::default();
        assert!(config.extractor.command.is_none());
        assert!(config.search.max_candidates.is_none());
    }

    #[test]
    fn test_load_project_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        let global = TempDir::new().unwrap();
        unsafe { env::set_var("XDG_CONFIG_HOME", global.path()) };

        let dir = TempDir::new().unwrap();
        write_config(
            &dir.path().join(".tourniquet"),
            r#"
[build]
command = ["cc", "-o", "prog", "prog.c"]

[search]
max_candidates = 10
"#,
        );

        let config = TourniquetConfig::load(dir.path()).unwrap();
        unsafe { env::remove_var("XDG_CONFIG_HOME") };
        assert_eq!(
            config.build.command,
            Some(vec![
                "cc".to_string(),
                "-o".to_string(),
                "prog".to_string(),
                "prog.c".to_string()
            ])
        );
        assert_eq!(config.search.max_candidates, Some(10));
        assert!(config.extractor.command.is_none());
    }

    #[test]
    fn test_project_overrides_global() {
        let _guard = ENV_LOCK.lock().unwrap();
        let global = TempDir::new().unwrap();
        write_config(
            &global.path().join("tourniquet"),
            r#"
[extractor]
command = ["global-exporter"]

[search]
max_candidates = 100
"#,
        );
        unsafe { env::set_var("XDG_CONFIG_HOME", global.path()) };

        let dir = TempDir::new().unwrap();
        write_config(
            &dir.path().join(".tourniquet"),
            r#"
[search]
max_candidates = 5
"#,
        );

        let config = TourniquetConfig::load(dir.path()).unwrap();
        unsafe { env::remove_var("XDG_CONFIG_HOME") };
        assert_eq!(config.search.max_candidates, Some(5));
        assert_eq!(
            config.extractor.command,
            Some(vec!["global-exporter".to_string()])
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        let global = TempDir::new().unwrap();
        unsafe { env::set_var("XDG_CONFIG_HOME", global.path()) };

        let dir = TempDir::new().unwrap();
        write_config(&dir.path().join(".tourniquet"), "[search]\nmax_candidates = \"many\"");
        let result = TourniquetConfig::load(dir.path());
        unsafe { env::remove_var("XDG_CONFIG_HOME") };
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_database_defaults_to_project_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::remove_var(DATABASE_ENV) };
        assert_eq!(
            TourniquetConfig::default().database_path(Path::new("/project")),
            PathBuf::from("/project/.tourniquet/facts.sqlite")
        );
    }

    #[test]
    fn test_database_path_from_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::remove_var(DATABASE_ENV) };
        let root = Path::new("/project");
        let mut config = TourniquetConfig::default();
        config.database.path = Some(PathBuf::from("build/facts.sqlite"));
        assert_eq!(
            config.database_path(root),
            PathBuf::from("/project/build/facts.sqlite")
        );
        config.database.path = Some(PathBuf::from("/var/facts.sqlite"));
        assert_eq!(config.database_path(root), PathBuf::from("/var/facts.sqlite"));
    }

    #[test]
    fn test_database_env_overrides_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut config = TourniquetConfig::default();
        config.database.path = Some(PathBuf::from("build/facts.sqlite"));

        unsafe { env::set_var(DATABASE_ENV, "scratch.sqlite") };
        let from_env = config.database_path(Path::new("/project"));
        unsafe { env::set_var(DATABASE_ENV, "") };
        let empty = config.database_path(Path::new("/project"));
        unsafe { env::remove_var(DATABASE_ENV) };

        assert_eq!(from_env, PathBuf::from("/project/scratch.sqlite"));
        assert_eq!(empty, PathBuf::from("/project/build/facts.sqlite"));
    }

    #[test]
    fn test_database_path_expands_home() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::remove_var(DATABASE_ENV) };
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let mut config = TourniquetConfig::default();
        config.database.path = Some(PathBuf::from("~/facts/prog.sqlite"));
        assert_eq!(
            config.database_path(Path::new("/project")),
            home.join("facts/prog.sqlite")
        );
        // Only a whole `~` component is the home directory.
        config.database.path = Some(PathBuf::from("~backup/prog.sqlite"));
        assert_eq!(
            config.database_path(Path::new("/project")),
            PathBuf::from("/project/~backup/prog.sqlite")
        );
    }
}
