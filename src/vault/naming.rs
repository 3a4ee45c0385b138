//! File names for one account's vault files.
//!
//! User names may not contain `_`, so the `{user}_{suffix}` names below can
//! never collide across users. Website names are stored under their
//! base64url encoding, which is injective and filesystem-safe.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::path::{Path, PathBuf};

const MASTER_KEY_SUFFIX: &str = "_key";
const MAC_KEY_SUFFIX: &str = "_mackey";
const MASTER_SALT_SUFFIX: &str = "_mastersalt";
const MAC_SALT_SUFFIX: &str = "_macsalt";
const DIRECTORY_SUFFIX: &str = "_dir";

pub const MAX_USER_LEN: usize = 64;
/// Longest website whose encoded name still fits a 255-byte file name.
pub const MAX_WEBSITE_LEN: usize = 180;

pub fn master_salt_filename(user: &str) -> String {
    format!("{user}{MASTER_SALT_SUFFIX}")
}

pub fn mac_salt_filename(user: &str) -> String {
    format!("{user}{MAC_SALT_SUFFIX}")
}

pub fn master_key_filename(user: &str) -> String {
    format!("{user}{MASTER_KEY_SUFFIX}")
}

pub fn mac_key_filename(user: &str) -> String {
    format!("{user}{MAC_KEY_SUFFIX}")
}

pub fn directory_name(user: &str) -> String {
    format!("{user}{DIRECTORY_SUFFIX}")
}

pub fn entry_filename(website: &str) -> String {
    URL_SAFE_NO_PAD.encode(website.as_bytes())
}

pub fn is_valid_user(user: &str) -> bool {
    !user.is_empty()
        && user.len() <= MAX_USER_LEN
        && !user.starts_with('.')
        && user
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

pub fn is_valid_website(website: &str) -> bool {
    !website.is_empty() && website.len() <= MAX_WEBSITE_LEN
}

/// Resolved paths of every file belonging to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPaths {
    pub user: String,
    pub root: PathBuf,
    pub master_salt: PathBuf,
    pub mac_salt: PathBuf,
    pub master_key: PathBuf,
    pub mac_key: PathBuf,
    pub entries_dir: PathBuf,
}

impl AccountPaths {
    /// Returns `None` when `user` is not a valid user name.
    pub fn new(root: &Path, user: &str) -> Option<Self> {
        if !is_valid_user(user) {
            return None;
        }
        Some(Self {
            user: user.to_string(),
            root: root.to_path_buf(),
            master_salt: root.join(master_salt_filename(user)),
            mac_salt: root.join(mac_salt_filename(user)),
            master_key: root.join(master_key_filename(user)),
            mac_key: root.join(mac_key_filename(user)),
            entries_dir: root.join(directory_name(user)),
        })
    }

    pub fn entry(&self, website: &str) -> PathBuf {
        self.entries_dir.join(entry_filename(website))
    }

    /// The four salt/key files, in deletion order.
    pub fn key_files(&self) -> [&Path; 4] {
        [
            &self.master_salt,
            &self.mac_salt,
            &self.master_key,
            &self.mac_key,
        ]
    }

    /// Whether any file or directory of this account is present.
    pub fn any_exists(&self) -> bool {
        self.entries_dir.exists() || self.key_files().iter().any(|p| p.exists())
    }
}
