use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

const MASTER: &str = "longpassword1";

fn pwvault(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pwvault").expect("binary exists");
    cmd.env("PWVAULT_TEST_KDF", "1")
        .env("PWVAULT_CONFIG", home.join("config.toml"))
        .env("PWVAULT_DIR", home.join("vaults"))
        .env_remove("PWVAULT_LOG");
    cmd
}

fn register_alice(home: &Path) {
    pwvault(home)
        .args(["register", "--user", "alice"])
        .write_stdin(format!("{MASTER}\n{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered alice"));
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command output");
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn add_get_list_rm_roundtrip() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    pwvault(home.path())
        .args(["add", "--user", "alice", "example.com", "--password", "p@ss"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored password for example.com"));

    pwvault(home.path())
        .args(["add", "--user", "alice", "mail.test"])
        .write_stdin(format!("{MASTER}\nhunter2\n"))
        .assert()
        .success();

    pwvault(home.path())
        .args(["--quiet", "get", "--user", "alice", "example.com"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout("p@ss\n");

    let json = json_output(
        pwvault(home.path())
            .args(["--json", "list", "--user", "alice"])
            .write_stdin(format!("{MASTER}\n")),
    );
    assert_eq!(
        json.get("value").and_then(Value::as_str),
        Some("example.com\nmail.test")
    );
    let meta = json.get("meta").expect("meta field");
    assert_eq!(meta.get("kind").and_then(Value::as_str), Some("list"));
    assert_eq!(meta.get("count").and_then(Value::as_u64), Some(2));

    pwvault(home.path())
        .args(["rm", "--user", "alice", "example.com"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed example.com"));

    pwvault(home.path())
        .args(["rm", "--user", "alice", "example.com"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing stored for example.com"));

    pwvault(home.path())
        .args(["get", "--user", "alice", "example.com"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("no password stored for 'example.com'"));
}

#[test]
fn add_replaces_existing_password() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    for password in ["first", "second"] {
        pwvault(home.path())
            .args(["add", "--user", "alice", "example.com", "--password", password])
            .write_stdin(format!("{MASTER}\n"))
            .assert()
            .success();
    }

    let json = json_output(
        pwvault(home.path())
            .args(["--json", "get", "--user", "alice", "example.com"])
            .write_stdin(format!("{MASTER}\n")),
    );
    assert_eq!(json.get("value").and_then(Value::as_str), Some("second"));
}

#[test]
fn wrong_master_password_is_reported() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    pwvault(home.path())
        .args(["list", "--user", "alice"])
        .write_stdin("not-the-password\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wrong password or key file"));
}

#[test]
fn registration_errors_are_usage_errors() {
    let home = tempfile::tempdir().expect("temp home");

    pwvault(home.path())
        .args(["register", "--user", "alice"])
        .write_stdin("short\nshort\n")
        .assert()
        .code(64)
        .stderr(predicate::str::contains("at least 8 characters"));

    pwvault(home.path())
        .args(["register", "--user", "alice"])
        .write_stdin(format!("{MASTER}\nsomething-else\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("passwords do not match"));

    pwvault(home.path())
        .args(["register", "--user", "bad_name"])
        .write_stdin(format!("{MASTER}\n{MASTER}\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("invalid user name 'bad_name'"));

    register_alice(home.path());
    pwvault(home.path())
        .args(["register", "--user", "alice"])
        .write_stdin(format!("{MASTER}\n{MASTER}\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("account 'alice' already exists"));
}

#[test]
fn unknown_account_is_not_found() {
    let home = tempfile::tempdir().expect("temp home");

    pwvault(home.path())
        .args(["list", "--user", "nobody"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("account 'nobody' not found"));
}

#[test]
fn empty_password_input_is_rejected() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    pwvault(home.path())
        .args(["list", "--user", "alice"])
        .write_stdin("")
        .assert()
        .code(64)
        .stderr(predicate::str::contains("input cannot be empty"));
}

#[test]
fn passwd_switches_master_password() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    pwvault(home.path())
        .args(["add", "--user", "alice", "example.com", "--password", "p@ss"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success();

    pwvault(home.path())
        .args(["passwd", "--user", "alice"])
        .write_stdin(format!("{MASTER}\nnew-password-22\nnew-password-22\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Master password changed"));

    pwvault(home.path())
        .args(["get", "--user", "alice", "example.com"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .code(1);

    pwvault(home.path())
        .args(["--quiet", "get", "--user", "alice", "example.com"])
        .write_stdin("new-password-22\n")
        .assert()
        .success()
        .stdout("p@ss\n");
}

#[test]
fn delete_account_removes_all_files() {
    let home = tempfile::tempdir().expect("temp home");
    register_alice(home.path());

    pwvault(home.path())
        .args(["add", "--user", "alice", "example.com", "--password", "p@ss"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success();

    pwvault(home.path())
        .args(["delete-account", "--user", "alice"])
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted account alice"));

    let remaining = fs::read_dir(home.path().join("vaults"))
        .expect("vault dir")
        .count();
    assert_eq!(remaining, 0);
}

#[test]
fn dir_flag_overrides_environment() {
    let home = tempfile::tempdir().expect("temp home");
    let custom = home.path().join("custom");

    pwvault(home.path())
        .arg("--dir")
        .arg(&custom)
        .args(["register", "--user", "alice"])
        .write_stdin(format!("{MASTER}\n{MASTER}\n"))
        .assert()
        .success();

    assert!(custom.join("alice_key").is_file());
    assert!(custom.join("alice_dir").is_dir());
    assert!(!home.path().join("vaults").exists());
}

#[test]
fn config_reports_resolved_settings() {
    let home = tempfile::tempdir().expect("temp home");
    fs::write(
        home.path().join("config.toml"),
        "min_password_length = 12\n",
    )
    .expect("write config");

    let json = json_output(pwvault(home.path()).args(["--json", "config"]));
    let meta = json.get("meta").expect("meta field");
    assert_eq!(meta.get("kind").and_then(Value::as_str), Some("config"));
    assert_eq!(
        meta.get("vault_dir_source").and_then(Value::as_str),
        Some("env")
    );
    assert_eq!(
        meta.pointer("/kdf/iterations").and_then(Value::as_u64),
        Some(1000)
    );
    assert_eq!(
        meta.get("min_password_length").and_then(Value::as_u64),
        Some(12)
    );
}

#[test]
fn configured_minimum_length_applies_to_registration() {
    let home = tempfile::tempdir().expect("temp home");
    fs::write(
        home.path().join("config.toml"),
        "min_password_length = 20\n",
    )
    .expect("write config");

    pwvault(home.path())
        .args(["register", "--user", "alice"])
        .write_stdin(format!("{MASTER}\n{MASTER}\n"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("at least 20 characters"));
}

#[test]
fn unsupported_kdf_in_config_is_fatal() {
    let home = tempfile::tempdir().expect("temp home");
    fs::write(
        home.path().join("config.toml"),
        "[kdf]\nalgorithm = \"scrypt\"\n",
    )
    .expect("write config");

    pwvault(home.path())
        .args(["list", "--user", "alice"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("unsupported kdf algorithm 'scrypt'"));
}

#[test]
fn missing_subcommand_prints_help() {
    let home = tempfile::tempdir().expect("temp home");
    pwvault(home.path())
        .assert()
        .code(64)
        .stdout(predicate::str::contains("Usage"));
}
