//! Integration tests for tiercache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const LESSON_PRODUCER: &str = r#"
[producer]
command = ["sh", "-c", "echo \"lesson for $0\"", "{key}"]
"#;

    const BROKEN_PRODUCER: &str = r#"
[producer]
command = ["sh", "-c", "exit 3"]
"#;

    /// Isolated config, mirror and state directories
    struct Sandbox {
        dir: TempDir,
        config: PathBuf,
    }

    impl Sandbox {
        fn new(extra: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("config.toml");
            let sandbox = Self { dir, config };
            sandbox.write_config(extra);
            sandbox
        }

        fn write_config(&self, extra: &str) {
            let mirror = self.dir.path().join("mirror");
            let content = format!("[mirror]\ndir = {:?}\n{}", mirror, extra);
            std::fs::write(&self.config, content).unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("tiercache");
            cmd.env("TIERCACHE_CONFIG", &self.config)
                .env("XDG_STATE_HOME", self.dir.path().join("state"))
                .env("HOME", self.dir.path());
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("tiercache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline-first tiered content cache"))
            .stdout(predicate::str::contains("resolve"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("tiercache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tiercache"));
    }

    #[test]
    fn config_path_honours_env() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("cooldown_secs = 30"));
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));

        sandbox
            .cmd()
            .args(["config", "init", "--force"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Configuration initialized"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let sandbox = Sandbox::new("[throttle]\ncooldown_secs = \"soon\"\n");
        sandbox
            .cmd()
            .args(["stats", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn resolve_without_producer_fails_with_hint() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["resolve", "LESSON-42"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No producer command configured"))
            .stderr(predicate::str::contains("tiercache config init"));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_produces_then_serves_from_mirror() {
        let sandbox = Sandbox::new(LESSON_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-42"])
            .assert()
            .success()
            .stdout("lesson for LESSON-42\n");

        // A broken producer is never consulted for a mirrored key
        sandbox.write_config(BROKEN_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-42", "--quiet"])
            .assert()
            .success()
            .stdout("lesson for LESSON-42\n");
    }

    #[cfg(unix)]
    #[test]
    fn failed_production_is_not_cached() {
        let sandbox = Sandbox::new(BROKEN_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-7"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with code 3"));

        sandbox.write_config(LESSON_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-7", "-q"])
            .assert()
            .success()
            .stdout("lesson for LESSON-7\n");
    }

    #[cfg(unix)]
    #[test]
    fn clear_requires_confirmation_and_purges_mirror() {
        let sandbox = Sandbox::new(LESSON_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-1", "-q"])
            .assert()
            .success();

        sandbox
            .cmd()
            .arg("clear")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--yes"));

        sandbox
            .cmd()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Removed 1 cached entry"));

        sandbox.write_config(BROKEN_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "LESSON-1"])
            .assert()
            .failure();
    }

    #[cfg(unix)]
    #[test]
    fn resolve_records_history() {
        let sandbox = Sandbox::new(LESSON_PRODUCER);
        sandbox
            .cmd()
            .args(["resolve", "A1-m1-c1", "-q"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["history", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("A1-m1-c1"));

        sandbox
            .cmd()
            .args(["history", "streak"])
            .assert()
            .success()
            .stdout("1\n");
    }

    #[test]
    fn stats_start_from_defaults() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["stats", "show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("points=0"))
            .stdout(predicate::str::contains("credits=50"))
            .stdout(predicate::str::contains("level=A1"));
    }

    #[test]
    fn stats_add_persists_locally() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["stats", "add", "--points", "10", "--level", "A2"])
            .assert()
            .success();
        sandbox
            .cmd()
            .args(["stats", "add", "--points", "5"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["stats", "show", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"points\": 15"))
            .stdout(predicate::str::contains("\"level\": \"A2\""));
    }

    #[test]
    fn stats_add_without_fields_fails() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["stats", "add"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Nothing to update"));
    }

    #[test]
    fn vocab_resaves_count_as_practice() {
        let sandbox = Sandbox::new("");
        for _ in 0..3 {
            sandbox
                .cmd()
                .args(["vocab", "add", "gezellig", "cozy", "--kind", "adjective"])
                .assert()
                .success();
        }

        sandbox
            .cmd()
            .args(["vocab", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"sync_count\": 3"))
            .stdout(predicate::str::contains("\"mastery\": \"learning\""));

        sandbox
            .cmd()
            .args(["vocab", "master", "fiets", "mastered"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not in the vault"));
    }

    #[test]
    fn progress_complete_awards_points() {
        let sandbox = Sandbox::new("");
        sandbox
            .cmd()
            .args(["progress", "complete", "A1-m1-c1", "--points", "25"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["progress", "list"])
            .assert()
            .success()
            .stdout("A1-m1-c1\n");

        sandbox
            .cmd()
            .args(["stats", "show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("points=25"));
    }
}
