//! Integration tests for the `tmining` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

/// An isolated home, working directory, registry and artifact store.
struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self { temp: TempDir::new().unwrap() };
        std::fs::write(ws.dataset(), review_csv(40)).unwrap();
        ws
    }

    fn dataset(&self) -> PathBuf {
        self.temp.path().join("reviews.csv")
    }

    fn models_dir(&self) -> PathBuf {
        self.temp.path().join("models")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tmining").unwrap();
        cmd.current_dir(self.temp.path())
            .env("HOME", self.temp.path())
            .env_remove("TMINING_DATABASE")
            .env_remove("TMINING_MODEL_DIR")
            .env_remove("TMINING_SEED")
            .env_remove("TMINING_LOG_LEVEL")
            .env_remove("TMINING_MAX_CONNECTIONS")
            .arg("--log-level")
            .arg("warn")
            .arg("--database")
            .arg(self.temp.path().join("registry.db"))
            .arg("--model-dir")
            .arg(self.models_dir());
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().arg("--json").args(args).output().unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn add_user(&self, subject: &str, identifier: &str) {
        self.cmd().args(["users", "add", "--subject", subject, "--identifier", identifier]).assert().success();
    }

    /// Train on the workspace dataset and register for `owner`; returns the id.
    fn train_registered(&self, owner: &str, name: &str, shared: bool) -> String {
        let dataset = self.dataset();
        let mut args = vec!["train", "--dataset", dataset.to_str().unwrap(), "--owner", owner, "--name", name];
        if shared {
            args.push("--shared");
        }
        let out = self.json(&args);
        out["model"]["identifier"].as_str().unwrap().to_string()
    }
}

fn review_csv(rows: usize) -> String {
    let mut out = String::from("id,text,target\n");
    for i in 0..rows {
        let (text, label) = if i % 2 == 0 { ("great excellent film", 1) } else { ("awful boring film", 0) };
        out.push_str(&format!("{i},{text} {i},{label}\n"));
    }
    out
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("tmining")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("reconcile"));
}

#[test]
fn test_train_to_file_then_predict_and_validate() {
    let ws = Workspace::new();
    let artifact = ws.temp.path().join("out.mdl");

    ws.cmd()
        .args(["train", "--dataset"])
        .arg(ws.dataset())
        .arg("--output")
        .arg(&artifact)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved artifact"));
    assert!(artifact.exists());

    ws.cmd()
        .args(["predict", "--text", "an excellent film", "--artifact"])
        .arg(&artifact)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1"));

    let out = ws.json(&["validate", "--dataset", ws.dataset().to_str().unwrap(), "--size", "1", "--artifact", artifact.to_str().unwrap()]);
    assert_eq!(out["rows"], 40);
}

#[test]
fn test_cross_validated_training_reports_metrics() {
    let ws = Workspace::new();
    let artifact = ws.temp.path().join("cv.mdl");
    let out = ws.json(&[
        "train",
        "--dataset",
        ws.dataset().to_str().unwrap(),
        "--kfold",
        "3",
        "--test-size",
        "0.2",
        "--output",
        artifact.to_str().unwrap(),
    ]);
    assert!(out["accuracy"].as_f64().is_some());
    assert!(out["f1"].as_f64().is_some());
}

#[test]
fn test_invalid_folds_rejected() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["train", "--kfold", "0", "--test-size", "0.2", "--dataset"])
        .arg(ws.dataset())
        .assert()
        .failure()
        .stderr(predicate::str::contains("folds"));
}

#[test]
fn test_unknown_algorithm_rejected() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["train", "--algorithm", "xgboost", "--dataset"])
        .arg(ws.dataset())
        .assert()
        .failure()
        .stderr(predicate::str::contains("algorithm"));
}

#[test]
fn test_registered_model_lifecycle() {
    let ws = Workspace::new();
    ws.add_user("alice", "u-alice");
    ws.add_user("bob", "u-bob");

    let private = ws.train_registered("u-alice", "reviews", false);
    let shared = ws.train_registered("u-alice", "public-reviews", true);

    // Second private model with the same name falls back to its identifier.
    let duplicate = ws.train_registered("u-alice", "reviews", false);
    let listed = ws.json(&["models", "list", "--user", "u-alice"]);
    let names: Vec<_> = listed.as_array().unwrap().iter().map(|m| m["name"].as_str().unwrap().to_string()).collect();
    assert_eq!(names, ["reviews".to_string(), "public-reviews".to_string(), duplicate.clone()]);

    // Bob sees only the shared one.
    let visible = ws.json(&["models", "list", "--user", "u-bob", "--include-shared"]);
    let ids: Vec<_> = visible.as_array().unwrap().iter().map(|m| m["identifier"].as_str().unwrap()).collect();
    assert_eq!(ids, [shared.as_str()]);

    ws.cmd()
        .args(["predict", "--text", "great film", "--user", "u-bob", "--model", &private])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    ws.cmd()
        .args(["predict", "--text", "great film", "--user", "u-bob", "--model", &shared])
        .assert()
        .success();

    // Rename, then delete.
    let edited = ws.json(&["models", "edit", "--user", "u-alice", "--model", &private, "--name", "renamed"]);
    assert_eq!(edited["name"], "renamed");

    ws.cmd().args(["models", "remove", "--user", "u-bob", "--model", &private]).assert().failure();
    ws.cmd().args(["models", "remove", "--user", "u-alice", "--model", &private]).assert().success();
    assert!(!ws.models_dir().join(format!("{private}.mdl")).exists());
}

#[test]
fn test_users_show_and_remove() {
    let ws = Workspace::new();
    ws.add_user("carol", "u-carol");
    ws.train_registered("u-carol", "mine", false);

    let shown = ws.json(&["users", "show", "--subject", "carol"]);
    assert_eq!(shown["user"]["identifier"], "u-carol");
    assert_eq!(shown["models"].as_array().unwrap().len(), 1);

    ws.cmd().args(["users", "add", "--subject", "carol"]).assert().failure().stderr(predicate::str::contains("already exists"));

    let removed = ws.json(&["users", "remove", "--identifier", "u-carol"]);
    assert_eq!(removed["removed_models"].as_array().unwrap().len(), 1);
    ws.cmd().args(["users", "show", "--identifier", "u-carol"]).assert().failure();
}

#[test]
fn test_upload_and_download() {
    let ws = Workspace::new();
    ws.add_user("dave", "u-dave");
    let id = ws.train_registered("u-dave", "original", false);
    let copy = ws.temp.path().join("copy.mdl");

    ws.cmd()
        .args(["models", "download", "--user", "u-dave", "--model", &id, "--output"])
        .arg(&copy)
        .assert()
        .success();

    let uploaded = ws.json(&["models", "upload", "--user", "u-dave", "--name", "copy", "--file", copy.to_str().unwrap()]);
    assert_eq!(uploaded["name"], "copy");
    assert_ne!(uploaded["identifier"].as_str().unwrap(), id);
}

#[test]
fn test_reconcile_reports_orphans() {
    let ws = Workspace::new();
    ws.add_user("erin", "u-erin");
    ws.train_registered("u-erin", "kept", false);
    std::fs::write(ws.models_dir().join("stray.mdl"), "{}").unwrap();

    let out = ws.json(&["reconcile"]);
    assert_eq!(out["orphans"], serde_json::json!(["stray"]));

    ws.json(&["reconcile", "--delete"]);
    assert!(!ws.models_dir().join("stray.mdl").exists());
}

#[test]
fn test_local_config_file_is_honored() {
    let ws = Workspace::new();
    std::fs::write(ws.temp.path().join(".tminingrc"), "[database]\nmax_connections = 0\n").unwrap();

    Command::cargo_bin("tmining")
        .unwrap()
        .current_dir(ws.temp.path())
        .env("HOME", ws.temp.path())
        .args(["reconcile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_connections"));
}
