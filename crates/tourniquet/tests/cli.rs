//! End-to-end checks of the `tourniquet` binary.
//!
//! Facts come from the `.facts.json` sidecar next to the fixture, so no
//! exporter has to be installed.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The overflow fixture lives with the fact store crate.
const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tourniquet-facts/tests/fixtures/patch_test.c"
);

/// A scratch project holding a copy of the fixture and its sidecar.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::copy(FIXTURE, dir.path().join("patch_test.c")).unwrap();
        std::fs::copy(
            format!("{FIXTURE}.facts.json"),
            dir.path().join("patch_test.c.facts.json"),
        )
        .unwrap();
        Self { dir }
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("patch_test.c")
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("facts.sqlite")
    }

    /// The binary, isolated from any real user config.
    fn tourniquet(&self) -> Command {
        let mut cmd = Command::cargo_bin("tourniquet").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("TOURNIQUET_LOG")
            .arg("--root")
            .arg(self.dir.path())
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn collect(&self) {
        self.tourniquet()
            .arg("collect")
            .arg(self.source())
            .assert()
            .success();
    }
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_templates_lists_builtins() {
    let project = Project::new();
    let output = project.tourniquet().arg("templates").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    for name in ["buffer-guard:", "bounds-check:", "delete-statement:"] {
        assert!(out.contains(name), "missing {name} in:\n{out}");
    }
    assert!(out.contains("    if (Variable() < StaticBufferSize()) {"));
}

#[test]
fn test_collect_reports_counts() {
    let project = Project::new();
    let output = project
        .tourniquet()
        .arg("collect")
        .arg(project.source())
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("1 function(s) (4 skipped)"), "{out}");
    assert!(out.contains("1 global(s)"), "{out}");
    assert!(out.contains("10 statement(s)"), "{out}");
    assert!(Path::new(&project.db()).is_file());
}

#[test]
fn test_collect_missing_file_fails() {
    let project = Project::new();
    let output = project
        .tourniquet()
        .arg("collect")
        .arg(project.dir.path().join("nope.c"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_concretize_with_limit() {
    let project = Project::new();
    project.collect();
    let output = project
        .tourniquet()
        .args(["concretize", "buffer-guard"])
        .arg(project.source())
        .args(["32", "3", "--limit", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert_eq!(out.matches("// candidate").count(), 2, "{out}");
    assert!(out.contains("if (argc < sizeof(buff)) {\nstrcpy(buff, pov);\n}"));
}

#[test]
fn test_view_at_statement() {
    let project = Project::new();
    project.collect();
    let output = project
        .tourniquet()
        .args(["view", "delete-statement"])
        .arg(project.source())
        .args(["32", "3"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), ";\n");
}

#[test]
fn test_unknown_template_fails() {
    let project = Project::new();
    project.collect();
    let output = project
        .tourniquet()
        .args(["view", "no-such-template"])
        .arg(project.source())
        .args(["32", "3"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no template named `no-such-template`"));
}

#[test]
fn test_patch_needs_build_command() {
    let project = Project::new();
    let output = project
        .tourniquet()
        .args(["patch", "buffer-guard"])
        .arg(project.source())
        .args(["--exe", "prog", "--test", "password=0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no build command"));
}

#[test]
fn test_collect_and_query_with_different_spellings() {
    let project = Project::new();
    project
        .tourniquet()
        .current_dir(project.dir.path())
        .args(["collect", "./patch_test.c"])
        .assert()
        .success();
    let output = project
        .tourniquet()
        .current_dir(project.dir.path())
        .args(["concretize", "buffer-guard", "patch_test.c", "32", "3"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout(&output).matches("// candidate").count(), 6);
}

#[test]
fn test_patch_repairs_overflow() {
    if std::process::Command::new("cc").arg("--version").output().is_err() {
        eprintln!("Skipping: no C compiler found");
        return;
    }
    let project = Project::new();
    let original = std::fs::read_to_string(project.source()).unwrap();
    let exe = project.dir.path().join("patch_test");
    let build = format!("cc -o {} {}", exe.display(), project.source().display());

    let output = project
        .tourniquet()
        .args(["patch", "buffer-guard"])
        .arg(project.source())
        .args(["--line", "32", "--col", "3", "--exe"])
        .arg(&exe)
        .arg("--build")
        .arg(&build)
        .args(["--test", "password=0", "--test", "ok=2", "--test"])
        .arg(format!("{}=1", "A".repeat(200)))
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        stdout(&output),
        "if (len < sizeof(buff)) {\nstrcpy(buff, pov);\n}\n\nelse {\nreturn 1;\n}\n\n"
    );
    assert_eq!(std::fs::read_to_string(project.source()).unwrap(), original);
}
