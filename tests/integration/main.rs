//! Integration tests for treecache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Temp workspace with a config pointing the store into it
    struct Workspace {
        dir: TempDir,
        config: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("config.toml");
            let store = dir.path().join("store");
            std::fs::write(
                &config,
                format!(
                    "[general]\naudit_log = false\n\n[cache]\nroot_path = \"/var/cache/site\"\n\n[store]\nbase_dir = {:?}\n",
                    store.display().to_string()
                ),
            )
            .unwrap();
            Self { dir, config }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("treecache");
            cmd.arg("--config").arg(&self.config);
            cmd
        }

        fn init(&self) {
            self.cmd().arg("init").assert().success();
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("treecache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Path-addressed file cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("treecache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("treecache"));
    }

    #[test]
    fn init_creates_root() {
        let ws = Workspace::new();
        ws.cmd()
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Created cache root /var/cache/site"));
        assert!(ws.dir.path().join("store/var/cache/site").is_dir());

        ws.cmd()
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already present"));
    }

    #[test]
    fn write_read_roundtrip() {
        let ws = Workspace::new();
        ws.init();

        ws.cmd()
            .args(["write", "lib/site.css", "--type", "css", "--content", "body{}"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached lib/site.css"));

        ws.cmd()
            .args(["read", "lib/site.css", "--type", "css"])
            .assert()
            .success()
            .stdout("body{}");

        ws.cmd()
            .args(["exists", "lib/site.css"])
            .assert()
            .success()
            .stdout(predicate::str::contains("lib/site.css cached"));
    }

    #[test]
    fn write_from_file() {
        let ws = Workspace::new();
        ws.init();
        let source = ws.dir.path().join("app.js");
        std::fs::write(&source, "console.log(1);").unwrap();

        ws.cmd()
            .args(["write", "app.js", "--type", "js", "--file"])
            .arg(&source)
            .assert()
            .success();

        ws.cmd()
            .args(["read", "app.js", "--type", "js"])
            .assert()
            .success()
            .stdout("console.log(1);");
    }

    #[test]
    fn read_miss_fails() {
        let ws = Workspace::new();
        ws.init();

        ws.cmd()
            .args(["read", "missing.css"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cached file not found"));

        ws.cmd()
            .args(["exists", "missing.css"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("missing.css not cached"))
            .stderr(predicate::str::contains("Error:").not());
    }

    #[test]
    fn read_wrong_type_fails() {
        let ws = Workspace::new();
        ws.init();
        ws.cmd()
            .args(["write", "data.json", "--type", "json", "--content", "{}"])
            .assert()
            .success();

        ws.cmd()
            .args(["read", "data.json", "--type", "css"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be read as css"));
    }

    #[test]
    fn purge_clears_entries() {
        let ws = Workspace::new();
        ws.init();
        ws.cmd()
            .args(["write", "a/b/c.txt", "--content", "c"])
            .assert()
            .success();

        ws.cmd()
            .arg("purge")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 removed"));

        ws.cmd().args(["exists", "a/b/c.txt"]).assert().failure();
        assert!(ws.dir.path().join("store/var/cache/site").is_dir());
    }

    #[test]
    fn purge_without_root_fails_with_hint() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.dir.path().join("store")).unwrap();

        ws.cmd()
            .arg("purge")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"))
            .stderr(predicate::str::contains("treecache init"));
    }

    #[test]
    fn status_json() {
        let ws = Workspace::new();
        ws.init();
        ws.cmd()
            .args(["write", "x.txt", "--content", "abc"])
            .assert()
            .success();

        ws.cmd()
            .args(["status", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"root_present\": true"))
            .stdout(predicate::str::contains("\"entries\": 1"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("/var/cache/site"));
    }
}
