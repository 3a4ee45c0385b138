use pwvault::vault::{self, AccountPaths, Vault, VaultError, VaultOptions};
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::Path;

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn register(root: &Path, user: &str, password: &str) -> AccountPaths {
    let paths = vault::account(root, user).expect("valid user");
    vault::register(&paths, &secret(password), &VaultOptions::for_tests()).expect("registered");
    paths
}

#[test]
fn alice_scenario() {
    let root = tempfile::tempdir().expect("temp root");
    let paths = register(root.path(), "alice", "longpassword1");

    let mut opened = Vault::open(paths.clone(), &secret("longpassword1")).expect("open");
    opened
        .add_entry("example.com", secret("p@ss"))
        .expect("add entry");
    opened.close();

    let reopened = Vault::open(paths.clone(), &secret("longpassword1")).expect("reopen");
    assert_eq!(reopened.list_websites(), vec!["example.com"]);
    assert_eq!(
        reopened
            .get_password("example.com")
            .map(|p| p.expose_secret().to_string()),
        Some("p@ss".to_string())
    );
    reopened.close();

    let err = Vault::open(paths.clone(), &secret("wrongpassword")).expect_err("wrong password");
    assert!(matches!(err, VaultError::IntegrityViolation { .. }), "{err:?}");

    let entry = paths.entry("example.com");
    let mut bytes = fs::read(&entry).expect("entry bytes");
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&entry, bytes).expect("corrupt entry");

    let err = Vault::open(paths, &secret("longpassword1")).expect_err("corrupted entry");
    assert!(matches!(err, VaultError::EntryCorrupted { .. }), "{err:?}");
    assert!(err.is_integrity_violation());
}

#[test]
fn listing_is_independent_of_insertion_order() {
    let root = tempfile::tempdir().expect("temp root");
    let paths = register(root.path(), "bob", "longpassword1");

    let mut opened = Vault::open(paths.clone(), &secret("longpassword1")).expect("open");
    for site in ["zeta.org", "alpha.net", "Mid.io", "beta.com"] {
        opened.add_entry(site, secret(site)).expect("add");
    }
    opened.close();

    let reopened = Vault::open(paths, &secret("longpassword1")).expect("reopen");
    assert_eq!(
        reopened.list_websites(),
        vec!["Mid.io", "alpha.net", "beta.com", "zeta.org"]
    );
    for site in reopened.list_websites() {
        assert_eq!(reopened.get_password(site).expect("present").expose_secret(), site);
    }
}

#[test]
fn entries_survive_password_change_without_reencryption() {
    let root = tempfile::tempdir().expect("temp root");
    let paths = register(root.path(), "carol", "longpassword1");

    let mut opened = Vault::open(paths.clone(), &secret("longpassword1")).expect("open");
    opened.add_entry("a.com", secret("one")).expect("add");
    opened.add_entry("b.com", secret("two")).expect("add");
    let snapshot: Vec<Vec<u8>> = ["a.com", "b.com"]
        .iter()
        .map(|site| fs::read(paths.entry(site)).expect("entry bytes"))
        .collect();

    opened
        .change_master_password(
            &secret("longpassword1"),
            &secret("brand-new-password"),
            &VaultOptions::for_tests(),
        )
        .expect("change password");
    opened.close();

    let reopened = Vault::open(paths.clone(), &secret("brand-new-password")).expect("reopen");
    assert_eq!(reopened.get_password("a.com").expect("a").expose_secret(), "one");
    assert_eq!(reopened.get_password("b.com").expect("b").expose_secret(), "two");

    let after: Vec<Vec<u8>> = ["a.com", "b.com"]
        .iter()
        .map(|site| fs::read(paths.entry(site)).expect("entry bytes"))
        .collect();
    assert_eq!(snapshot, after);

    let err = Vault::open(paths, &secret("longpassword1")).expect_err("old password");
    assert!(err.is_integrity_violation());
}

#[test]
fn tampered_key_files_look_like_a_wrong_password() {
    let root = tempfile::tempdir().expect("temp root");
    let paths = register(root.path(), "dave", "longpassword1");

    for key_file in [&paths.master_key, &paths.mac_key] {
        let original = fs::read(key_file).expect("key bytes");
        let mut tampered = original.clone();
        let middle = tampered.len() / 2;
        tampered[middle] ^= 0x40;
        fs::write(key_file, &tampered).expect("tamper");

        let err = Vault::open(paths.clone(), &secret("longpassword1")).expect_err("tampered");
        assert!(err.is_integrity_violation(), "{err:?}");

        fs::write(key_file, original).expect("restore");
    }

    assert!(Vault::open(paths, &secret("longpassword1")).is_ok());
}

#[test]
fn accounts_are_isolated_from_each_other() {
    let root = tempfile::tempdir().expect("temp root");
    let alice = register(root.path(), "alice", "longpassword1");
    let bob = register(root.path(), "bob", "longpassword1");

    let mut vault = Vault::open(alice.clone(), &secret("longpassword1")).expect("alice");
    vault.add_entry("shared.com", secret("alice-secret")).expect("add");

    let bob_vault = Vault::open(bob.clone(), &secret("longpassword1")).expect("bob");
    assert!(bob_vault.is_empty());

    // Alice's entry copied into Bob's directory fails Bob's MAC.
    fs::copy(alice.entry("shared.com"), bob.entry("shared.com")).expect("copy entry");
    let err = Vault::open(bob, &secret("longpassword1")).expect_err("foreign entry");
    assert!(err.is_integrity_violation(), "{err:?}");
}

#[test]
fn delete_account_leaves_other_users_alone() {
    let root = tempfile::tempdir().expect("temp root");
    let alice = register(root.path(), "alice", "longpassword1");
    let bob = register(root.path(), "bob", "longpassword1");

    let mut vault = Vault::open(alice.clone(), &secret("longpassword1")).expect("alice");
    vault.add_entry("example.com", secret("p@ss")).expect("add");
    vault.delete_account().expect("delete");

    assert!(!alice.any_exists());
    assert!(Vault::open(bob, &secret("longpassword1")).is_ok());

    let err = Vault::open(alice.clone(), &secret("longpassword1")).expect_err("deleted");
    assert!(matches!(err, VaultError::AccountNotFound(_)));

    // The name is free again.
    vault::register(&alice, &secret("longpassword2"), &VaultOptions::for_tests())
        .expect("re-register");
}

#[test]
fn stray_temp_files_are_ignored_on_open() {
    let root = tempfile::tempdir().expect("temp root");
    let paths = register(root.path(), "erin", "longpassword1");

    fs::write(paths.entries_dir.join(".tmpA1b2C3"), b"half-written").expect("stray file");
    let vault = Vault::open(paths, &secret("longpassword1")).expect("open");
    assert!(vault.is_empty());
}
