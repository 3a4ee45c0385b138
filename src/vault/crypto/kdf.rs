//! Password-based key derivation.
//!
//! PBKDF2-HMAC-SHA256 with an iteration count recorded next to each salt.
//! Older salt files carry no count and are read with [`LEGACY_ITERATIONS`].

use super::{CryptoError, SecretBytes};
use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Iteration count of the first on-disk format. Far too low for new vaults.
pub const LEGACY_ITERATIONS: u32 = 1_000;
/// Default iteration count for new wrappings (OWASP guidance for SHA-256).
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Supported password-based KDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KdfAlgorithm {
    #[default]
    Pbkdf2HmacSha256,
}

impl KdfAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            KdfAlgorithm::Pbkdf2HmacSha256 => "pbkdf2-hmac-sha256",
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pbkdf2-hmac-sha256" => Ok(KdfAlgorithm::Pbkdf2HmacSha256),
            other => Err(CryptoError::Configuration(format!(
                "unknown key derivation algorithm '{other}'"
            ))),
        }
    }
}

/// KDF tuning parameters.
///
/// The count written next to each salt is the source of record when
/// re-deriving; these values only decide how new wrappings are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    pub iterations: u32,
}

impl KdfParams {
    pub fn recommended() -> Self {
        Self {
            algorithm: KdfAlgorithm::Pbkdf2HmacSha256,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Parameters used to read salt files written before counts were stored.
    pub fn legacy() -> Self {
        Self {
            algorithm: KdfAlgorithm::Pbkdf2HmacSha256,
            iterations: LEGACY_ITERATIONS,
        }
    }

    pub fn for_tests() -> Self {
        Self::legacy()
    }

    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::recommended()
        }
    }

    pub fn validate(self) -> Result<Self, CryptoError> {
        if self.iterations == 0 {
            return Err(CryptoError::Configuration(
                "iteration count must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::recommended()
    }
}

/// Derive a `key_size_bits`-bit key from `password` and `salt`.
///
/// Same inputs always give the same key, which is what lets the vault
/// re-derive its password keys on every open.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    key_size_bits: usize,
    params: KdfParams,
) -> Result<SecretBytes, CryptoError> {
    let params = params.validate()?;
    if key_size_bits == 0 || key_size_bits % 8 != 0 {
        return Err(CryptoError::Configuration(format!(
            "key size of {key_size_bits} bits is not a whole number of bytes"
        )));
    }

    let mut out = Zeroizing::new(vec![0u8; key_size_bits / 8]);
    match params.algorithm {
        KdfAlgorithm::Pbkdf2HmacSha256 => {
            pbkdf2_hmac::<Sha256>(password, salt, params.iterations, out.as_mut_slice());
        }
    }
    Ok(SecretBytes::from(out.to_vec()))
}

/// Convenience wrapper for `derive` using a `SecretString`.
pub fn derive_from_password(
    password: &SecretString,
    salt: &[u8],
    key_size_bits: usize,
    params: KdfParams,
) -> Result<SecretBytes, CryptoError> {
    derive(
        password.expose_secret().as_bytes(),
        salt,
        key_size_bits,
        params,
    )
}
