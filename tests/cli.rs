//! CLI integration tests for filegate admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use filegate::store::{SqliteStore, Store};
use filegate::types::Role;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("filegate").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--admin-password",
                "adminpw1",
                "--non-interactive",
            ])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("filegate.db")).expect("failed to open store")
    }

    fn info_json(&self) -> Value {
        let output = self
            .cmd()
            .args([
                "admin",
                "info",
                "--data-dir",
                &self.data_dir_str(),
                "--json",
            ])
            .output()
            .expect("failed to run command");

        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn add_user(&self, username: &str, password: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "user",
                "add",
                "--data-dir",
                &self.data_dir_str(),
                "--username",
                username,
                "--password",
                password,
                "--non-interactive",
            ])
            .assert()
    }

    fn grant(&self, username: &str, plan: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "grant",
                "--data-dir",
                &self.data_dir_str(),
                "--username",
                username,
                "--type",
                plan,
            ])
            .assert()
    }
}

#[test]
fn test_init_seeds_defaults() {
    let ctx = TestContext::new();
    ctx.init()
        .success()
        .stdout(predicate::str::contains("Created admin user 'admin'"));

    assert!(ctx.data_dir().join("filegate.db").exists());
    assert!(ctx.data_dir().join(".session_secret").exists());
    assert!(ctx.data_dir().join("uploads").is_dir());

    let store = ctx.store();
    let admin = store
        .get_user_by_username("admin")
        .unwrap()
        .expect("admin user");
    assert_eq!(admin.role, Role::Admin);

    let categories = store.list_categories_with_files().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].category.name, "SPOOFER4YOU");

    assert_eq!(store.get_settings().unwrap().site_name, "SPOOFER4YOU");
}

#[cfg(unix)]
#[test]
fn test_init_secret_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let mode = std::fs::metadata(ctx.data_dir().join(".session_secret"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_init_generates_password_when_non_interactive() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated password"));
}

#[test]
fn test_reinit_fails_without_changes() {
    let ctx = TestContext::new();
    ctx.init().success();
    let secret = std::fs::read_to_string(ctx.data_dir().join(".session_secret")).unwrap();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    assert_eq!(
        std::fs::read_to_string(ctx.data_dir().join(".session_secret")).unwrap(),
        secret
    );
    assert_eq!(ctx.store().list_categories_with_files().unwrap().len(), 1);
}

#[test]
fn test_commands_require_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["admin", "info", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("admin init"));

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_user_add() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("bob", "secret1")
        .success()
        .stdout(predicate::str::contains("Created user \"bob\""));

    let user = ctx.store().get_user_by_username("bob").unwrap().unwrap();
    assert_eq!(user.role, Role::User);
    assert_ne!(user.password_hash, "secret1");

    ctx.add_user("bob", "secret1")
        .failure()
        .stderr(predicate::str::contains("Username already taken"));

    ctx.add_user("toolong1", "secret1")
        .failure()
        .stderr(predicate::str::contains("6 characters or less"));
}

#[test]
fn test_user_add_non_interactive_requires_fields() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--username",
            "bob",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password is required"));
}

#[test]
fn test_grant_replaces_active_subscription() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("bob", "secret1").success();

    ctx.grant("bob", "30days")
        .success()
        .stdout(predicate::str::contains("Granted 30days"));
    ctx.grant("bob", "7days").success();

    let store = ctx.store();
    let bob = store.get_user_by_username("bob").unwrap().unwrap();
    let grants = store.list_grants(&bob.id).unwrap();
    assert_eq!(grants.len(), 2);
    assert_eq!(grants.iter().filter(|g| g.is_active).count(), 1);
    assert_eq!(
        store.get_active_grant(&bob.id).unwrap().unwrap().subscription_type.as_str(),
        "7days"
    );

    ctx.grant("nobody", "7days")
        .failure()
        .stderr(predicate::str::contains("not found"));

    ctx.grant("bob", "2days").failure();
}

#[test]
fn test_info_json() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("bob", "secret1").success();
    ctx.add_user("eve", "secret1").success();
    ctx.grant("bob", "30days").success();

    let info = ctx.info_json();
    assert_eq!(info["users"], 3);
    assert_eq!(info["admins"], 1);
    assert_eq!(info["active_subscriptions"], 1);
    assert_eq!(info["categories"], 1);
    assert_eq!(info["files"], 0);
    assert_eq!(info["site_name"], "SPOOFER4YOU");

    let users = info["user_list"].as_array().unwrap();
    let bob = users.iter().find(|u| u["username"] == "bob").unwrap();
    assert_eq!(bob["subscription"], "30days");
    assert_eq!(bob["active"], true);
}

#[test]
fn test_info_plain() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "info", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("SPOOFER4YOU Server Status"))
        .stdout(predicate::str::contains("Categories:  1"));
}
