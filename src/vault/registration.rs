//! Account provisioning and key (re)wrapping.
//!
//! Each account key is stored in two files: a salt file holding
//! `[salt][iterations: u32 LE]` and a key file holding one envelope sealed
//! under the key derived from the master password and that salt. Salt
//! files without the iteration block predate it and use the legacy count.

use crate::vault::crypto::{
    self, Authenticator, ENC_KEY_LEN, Envelope, KdfParams, KeyPair, SALT_LEN, kdf, mac,
};
use crate::vault::io;
use crate::vault::naming::AccountPaths;
use crate::vault::ops::{
    VaultError, VaultOptions, delete_account_files, read_account_file, storage,
};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use tracing::{debug, info, warn};

/// Create a new account: fresh keys, an empty entry directory and the four
/// salt/key files. A failure after the directory exists removes whatever was
/// created, so the name stays free.
pub fn register(
    paths: &AccountPaths,
    password: &SecretString,
    options: &VaultOptions,
) -> Result<(), VaultError> {
    check_password(password, options)?;
    if paths.any_exists() {
        return Err(VaultError::AccountAlreadyExists(paths.user.clone()));
    }

    let keys = KeyPair::generate()?;
    io::ensure_root(&paths.root).map_err(storage("couldn't create vault directory", &paths.root))?;
    match io::create_private_dir(&paths.entries_dir) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(VaultError::AccountAlreadyExists(paths.user.clone()));
        }
        Err(err) => {
            return Err(storage("couldn't create password directory", &paths.entries_dir)(err));
        }
    }

    if let Err(err) = store_keys(paths, password, &keys, options.kdf) {
        if let Err(cleanup) = delete_account_files(paths) {
            warn!(user = %paths.user, error = %cleanup, "couldn't clean up failed registration");
        }
        return Err(err);
    }
    info!(user = %paths.user, iterations = options.kdf.iterations, "account registered");
    Ok(())
}

/// Wrap existing `keys` under `password` with fresh salts.
///
/// The entry directory normally exists already; that is not an error here.
pub fn rekey(
    paths: &AccountPaths,
    password: &SecretString,
    keys: &KeyPair,
    options: &VaultOptions,
) -> Result<(), VaultError> {
    check_password(password, options)?;

    io::ensure_root(&paths.root).map_err(storage("couldn't create vault directory", &paths.root))?;
    match io::create_private_dir(&paths.entries_dir) {
        Ok(()) => debug!(user = %paths.user, "recreated missing password directory"),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
        Err(err) => {
            return Err(storage("couldn't create password directory", &paths.entries_dir)(err));
        }
    }

    store_keys(paths, password, keys, options.kdf)
}

pub fn check_password(password: &SecretString, options: &VaultOptions) -> Result<(), VaultError> {
    if password.expose_secret().chars().count() < options.min_password_length {
        return Err(VaultError::PasswordTooShort {
            min: options.min_password_length,
        });
    }
    Ok(())
}

/// Seal both keys under `password`, then replace the four salt/key files
/// together: an error leaves the previous wrapping intact.
fn store_keys(
    paths: &AccountPaths,
    password: &SecretString,
    keys: &KeyPair,
    params: KdfParams,
) -> Result<(), VaultError> {
    let params = params.validate()?;
    let wrapped_master = Authenticator::new(&keys.mac)?.mac(keys.master.expose_secret())?;
    let wrapped_mac = mac::wrap_self(&keys.mac)?;
    let master = seal_key(password, &wrapped_master, params)?;
    let mac_seal = seal_key(password, &wrapped_mac, params)?;

    let iterations = params.iterations.to_le_bytes();
    let master_salt: [&[u8]; 2] = [&master.salt, &iterations];
    let master_key: [&[u8]; 1] = [&master.sealed];
    let mac_salt: [&[u8]; 2] = [&mac_seal.salt, &iterations];
    let mac_key: [&[u8]; 1] = [&mac_seal.sealed];
    let files: [(&Path, &[&[u8]]); 4] = [
        (&paths.master_salt, &master_salt),
        (&paths.master_key, &master_key),
        (&paths.mac_salt, &mac_salt),
        (&paths.mac_key, &mac_key),
    ];
    io::write_files_atomic(&files).map_err(storage("couldn't write key files", &paths.root))
}

struct SealedKey {
    salt: [u8; SALT_LEN],
    sealed: Vec<u8>,
}

fn seal_key(
    password: &SecretString,
    wrapped: &[u8],
    params: KdfParams,
) -> Result<SealedKey, VaultError> {
    let salt = crypto::random_bytes::<SALT_LEN>()?;
    let password_key = kdf::derive_from_password(password, &salt, ENC_KEY_LEN * 8, params)?;
    let sealed = Envelope::from_password_key(&password_key)?.encrypt(wrapped)?;
    Ok(SealedKey { salt, sealed })
}

/// Read a salt file and the KDF parameters recorded with it.
pub(crate) fn read_salt_file(
    paths: &AccountPaths,
    path: &Path,
) -> Result<(Vec<u8>, KdfParams), VaultError> {
    let mut blocks = read_account_file(paths, path, "problem reading salt file")?;
    let malformed = || VaultError::MalformedFile {
        path: path.to_path_buf(),
    };

    let params = match blocks.len() {
        1 => KdfParams::legacy(),
        2 => {
            let raw: [u8; 4] = blocks[1].as_slice().try_into().map_err(|_| malformed())?;
            KdfParams::with_iterations(u32::from_le_bytes(raw))
                .validate()
                .map_err(|_| malformed())?
        }
        _ => return Err(malformed()),
    };
    blocks.truncate(1);
    let salt = blocks.pop().ok_or_else(malformed)?;
    Ok((salt, params))
}
