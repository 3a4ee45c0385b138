use crate::vault::crypto::{
    Authenticator, CryptoError, ENC_KEY_LEN, Envelope, KdfParams, KeyPair, SecretBytes, kdf, mac,
};
use crate::vault::io::{self, VaultIoError};
use crate::vault::naming::{self, AccountPaths};
use crate::vault::registration;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

pub const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid user name '{0}': use 1-64 letters, digits, '.' or '-'")]
    InvalidUser(String),

    #[error("invalid website name: must be 1 to {max} bytes", max = naming::MAX_WEBSITE_LEN)]
    InvalidWebsite,

    #[error("your password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("account '{0}' already exists")]
    AccountAlreadyExists(String),

    #[error("account '{0}' not found")]
    AccountNotFound(String),

    #[error("wrong password or key file {} is corrupted", .path.display())]
    IntegrityViolation { path: PathBuf },

    #[error("password file {} is corrupted", .path.display())]
    EntryCorrupted {
        path: PathBuf,
        #[source]
        source: CryptoError,
    },

    #[error("password file {} is stored under the wrong name", .path.display())]
    EntryMisplaced { path: PathBuf },

    #[error("file {} is malformed", .path.display())]
    MalformedFile { path: PathBuf },

    #[error("{context}: {}", .path.display())]
    Storage {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: VaultIoError,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("failed to delete {} account file(s)", .failures.len())]
    DeleteFailed { failures: Vec<DeleteFailure> },
}

impl VaultError {
    /// True for every failure a wrong password or tampered file can cause.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            VaultError::IntegrityViolation { .. }
                | VaultError::EntryMisplaced { .. }
                | VaultError::EntryCorrupted {
                    source: CryptoError::IntegrityViolation
                        | CryptoError::CorruptedCiphertext
                        | CryptoError::MalformedInput,
                    ..
                }
        )
    }
}

#[derive(Debug)]
pub struct DeleteFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

pub(crate) fn storage<E: Into<VaultIoError>>(
    context: &'static str,
    path: &Path,
) -> impl FnOnce(E) -> VaultError + use<E> {
    let path = path.to_path_buf();
    move |source| VaultError::Storage {
        context,
        path,
        source: source.into(),
    }
}

/// Policy applied when (re)wrapping the account keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultOptions {
    pub kdf: KdfParams,
    pub min_password_length: usize,
}

impl VaultOptions {
    pub fn for_tests() -> Self {
        Self {
            kdf: KdfParams::for_tests(),
            ..Self::default()
        }
    }
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::recommended(),
            min_password_length: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

/// Resolve the files of `user` under `root`.
pub fn account(root: &Path, user: &str) -> Result<AccountPaths, VaultError> {
    AccountPaths::new(root, user).ok_or_else(|| VaultError::InvalidUser(user.to_string()))
}

/// Outcome of [`Vault::remove_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// The entry file was already gone; the map entry (if any) was dropped.
    FileMissing,
}

/// An open vault: the account's entry cipher plus every decrypted entry.
///
/// The map mirrors the entry files on disk; every mutation writes through
/// before the map changes. Key material is zeroized when the vault drops.
pub struct Vault {
    paths: AccountPaths,
    cipher: Envelope,
    entries: BTreeMap<String, SecretString>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("user", &self.paths.user)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Derive the password keys, recover the account keys and decrypt every
    /// entry. Any failure leaves nothing open.
    pub fn open(paths: AccountPaths, password: &SecretString) -> Result<Self, VaultError> {
        let cipher = {
            let keys = unlock_keys(&paths, password)?;
            keys.entry_cipher()?
        };
        let entries = load_entries(&paths, &cipher)?;
        debug!(user = %paths.user, entries = entries.len(), "vault opened");
        Ok(Self {
            paths,
            cipher,
            entries,
        })
    }

    pub fn user(&self) -> &str {
        &self.paths.user
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Website names in sorted order.
    pub fn list_websites(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn get_password(&self, website: &str) -> Option<&SecretString> {
        self.entries.get(website)
    }

    /// Store `password` for `website`, replacing any previous entry.
    pub fn add_entry(&mut self, website: &str, password: SecretString) -> Result<(), VaultError> {
        use secrecy::ExposeSecret;

        if !naming::is_valid_website(website) {
            return Err(VaultError::InvalidWebsite);
        }

        let sealed_website = self.cipher.encrypt_str(website)?;
        let sealed_password = self.cipher.encrypt_str(password.expose_secret())?;
        let path = self.paths.entry(website);
        io::write_blocks_atomic(&path, &[&sealed_website, &sealed_password])
            .map_err(storage("couldn't write password file", &path))?;

        let replaced = self.entries.insert(website.to_string(), password).is_some();
        debug!(user = %self.paths.user, website, replaced, "entry stored");
        Ok(())
    }

    /// Delete the entry file for `website` and forget it.
    ///
    /// A missing file is tolerated so repeated removals succeed; it is
    /// logged and reported as [`Removal::FileMissing`].
    pub fn remove_entry(&mut self, website: &str) -> Result<Removal, VaultError> {
        if !naming::is_valid_website(website) {
            return Err(VaultError::InvalidWebsite);
        }

        let path = self.paths.entry(website);
        let outcome = match std::fs::remove_file(&path) {
            Ok(()) => Removal::Deleted,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(user = %self.paths.user, website, "entry file already missing");
                Removal::FileMissing
            }
            Err(err) => return Err(storage("couldn't delete password file", &path)(err)),
        };

        self.entries.remove(website);
        debug!(user = %self.paths.user, website, "entry removed");
        Ok(outcome)
    }

    /// Re-wrap the account keys under `new_password`.
    ///
    /// The keys are recovered from disk with `old_password`, so a wrong old
    /// password fails exactly like a failed open. Entry files are untouched.
    pub fn change_master_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
        options: &VaultOptions,
    ) -> Result<(), VaultError> {
        let keys = unlock_keys(&self.paths, old_password)?;
        registration::rekey(&self.paths, new_password, &keys, options)?;
        info!(user = %self.paths.user, "master password changed");
        Ok(())
    }

    /// Remove the entry directory and the four key/salt files.
    ///
    /// Every path is attempted even after a failure; failures are reported
    /// together.
    pub fn delete_account(self) -> Result<(), VaultError> {
        delete_account_files(&self.paths)
    }

    pub fn close(self) {
        debug!(user = %self.paths.user, "vault closed");
    }
}

/// Remove every file of the account, continuing past failures.
pub fn delete_account_files(paths: &AccountPaths) -> Result<(), VaultError> {
    delete_paths_with(paths, io::remove_path)
}

fn delete_paths_with(
    paths: &AccountPaths,
    mut remove: impl FnMut(&Path) -> std::io::Result<()>,
) -> Result<(), VaultError> {
    let mut failures = Vec::new();
    let targets = std::iter::once(paths.entries_dir.as_path()).chain(paths.key_files());
    for path in targets {
        match remove(path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "account file already missing");
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "couldn't delete account file");
                failures.push(DeleteFailure {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }

    if failures.is_empty() {
        info!(user = %paths.user, "account deleted");
        Ok(())
    } else {
        Err(VaultError::DeleteFailed { failures })
    }
}

/// Recover MacKey then MasterKey with `password`.
pub(crate) fn unlock_keys(
    paths: &AccountPaths,
    password: &SecretString,
) -> Result<KeyPair, VaultError> {
    let mac_key = {
        let wrapped = open_wrapped_key(paths, &paths.mac_salt, &paths.mac_key, password)?;
        mac::unwrap(&wrapped).map_err(|err| key_error(&paths.mac_key, err))?
    };

    let master_key = {
        let wrapped = open_wrapped_key(paths, &paths.master_salt, &paths.master_key, password)?;
        let key = Authenticator::new(&mac_key)?
            .unmac(&wrapped)
            .map_err(|err| key_error(&paths.master_key, err))?;
        if key.len() != ENC_KEY_LEN {
            return Err(VaultError::MalformedFile {
                path: paths.master_key.clone(),
            });
        }
        SecretBytes::from(key.to_vec())
    };

    Ok(KeyPair::from_parts(master_key, mac_key)?)
}

fn open_wrapped_key(
    paths: &AccountPaths,
    salt_path: &Path,
    key_path: &Path,
    password: &SecretString,
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let (salt, params) = registration::read_salt_file(paths, salt_path)?;

    let blocks = read_account_file(paths, key_path, "problem reading key file")?;
    let [sealed] = blocks.as_slice() else {
        return Err(VaultError::MalformedFile {
            path: key_path.to_path_buf(),
        });
    };

    let password_key = kdf::derive_from_password(password, &salt, ENC_KEY_LEN * 8, params)?;
    Envelope::from_password_key(&password_key)?
        .decrypt(sealed)
        .map_err(|err| key_error(key_path, err))
}

/// A wrong password usually fails padding before any MAC check, so every
/// decode failure on the key path reads as an integrity violation.
fn key_error(path: &Path, err: CryptoError) -> VaultError {
    match err {
        CryptoError::IntegrityViolation
        | CryptoError::CorruptedCiphertext
        | CryptoError::MalformedInput => VaultError::IntegrityViolation {
            path: path.to_path_buf(),
        },
        other => VaultError::Crypto(other),
    }
}

pub(crate) fn read_account_file(
    paths: &AccountPaths,
    path: &Path,
    context: &'static str,
) -> Result<Vec<Vec<u8>>, VaultError> {
    io::read_blocks(path).map_err(|err| {
        if err.is_not_found() {
            VaultError::AccountNotFound(paths.user.clone())
        } else {
            storage(context, path)(err)
        }
    })
}

fn load_entries(
    paths: &AccountPaths,
    cipher: &Envelope,
) -> Result<BTreeMap<String, SecretString>, VaultError> {
    let files = io::list_files(&paths.entries_dir)
        .map_err(storage("can't read password directory", &paths.entries_dir))?;

    let mut entries = BTreeMap::new();
    for path in files {
        let blocks =
            io::read_blocks(&path).map_err(storage("problem reading password file", &path))?;
        let [sealed_website, sealed_password] = blocks.as_slice() else {
            return Err(VaultError::MalformedFile { path });
        };

        let website = cipher
            .decrypt_string(sealed_website)
            .map_err(|source| VaultError::EntryCorrupted {
                path: path.clone(),
                source,
            })?;
        let password = cipher
            .decrypt_string(sealed_password)
            .map_err(|source| VaultError::EntryCorrupted {
                path: path.clone(),
                source,
            })?;

        let expected_name = naming::entry_filename(&website);
        if path.file_name().and_then(|n| n.to_str()) != Some(expected_name.as_str()) {
            return Err(VaultError::EntryMisplaced { path });
        }
        entries.insert(website, SecretString::from(password));
    }
    Ok(entries)
}
