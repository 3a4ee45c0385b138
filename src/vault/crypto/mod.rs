//! Cryptographic building blocks for the credential vault.
//!
//! The pieces are small and composable; `registration` and `ops` wire them
//! together according to the on-disk layout.
//!
//! Design notes:
//!
//! - KDF: PBKDF2-HMAC-SHA256 turns the master password + a per-key salt into
//!   a 128-bit password key.
//! - Key hierarchy: a random MasterKey encrypts entries and a random MacKey
//!   authenticates them. Both are generated once per account and stored
//!   wrapped (key ‖ HMAC) inside an envelope under a password key.
//! - Envelope: `IV ‖ AES-128-CBC(key, mac(plaintext))`, where the mac step
//!   only happens when a MacKey is configured (mac-then-encrypt).
//!
//! Security foot-guns to avoid:
//!
//! - Never reuse an IV under the same key; `Envelope::encrypt` always draws a
//!   fresh one.
//! - Do not log or print keys, plaintext payloads, or decrypted secrets.
//! - Keep key bytes in `SecretBytes` and decrypted buffers in `Zeroizing`.

pub mod envelope;
pub mod kdf;
pub mod mac;

use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretSlice};
use thiserror::Error;

pub use envelope::Envelope;
pub use kdf::{KdfAlgorithm, KdfParams};
pub use mac::Authenticator;

/// Size (bytes) of the MasterKey and of every password-derived key (AES-128).
pub const ENC_KEY_LEN: usize = 16;
/// Size (bytes) of the MacKey (HMAC-SHA256 key).
pub const MAC_KEY_LEN: usize = 32;
/// Size (bytes) of an HMAC-SHA256 tag.
pub const MAC_TAG_LEN: usize = 32;
/// AES block size, which is also the IV length.
pub const BLOCK_LEN: usize = 16;
/// Size (bytes) of each per-key salt.
pub const SALT_LEN: usize = 32;

/// Secret bytes held in memory with zeroize-on-drop semantics.
pub type SecretBytes = SecretSlice<u8>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("integrity check failed")]
    IntegrityViolation,

    #[error("malformed input: shorter than the authentication tag")]
    MalformedInput,

    #[error("ciphertext is corrupted")]
    CorruptedCiphertext,

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,

    #[error("unsupported cryptographic configuration: {0}")]
    Configuration(String),

    #[error("failed to sample random bytes")]
    Random,
}

/// The two long-lived account keys.
///
/// They never change once an account exists; a master password change only
/// re-wraps them.
pub struct KeyPair {
    pub master: SecretBytes,
    pub mac: SecretBytes,
}

impl KeyPair {
    /// Generate a fresh MasterKey and MacKey from the OS CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self {
            master: generate_key(ENC_KEY_LEN)?,
            mac: generate_key(MAC_KEY_LEN)?,
        })
    }

    pub fn from_parts(master: SecretBytes, mac: SecretBytes) -> Result<Self, CryptoError> {
        check_key_len(&master, ENC_KEY_LEN)?;
        check_key_len(&mac, MAC_KEY_LEN)?;
        Ok(Self { master, mac })
    }

    /// Build the cipher used for entry payloads.
    pub fn entry_cipher(&self) -> Result<Envelope, CryptoError> {
        Envelope::with_mac(&self.master, &self.mac)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

/// Generate `N` cryptographically-secure random bytes.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|_| CryptoError::Random)?;
    Ok(bytes)
}

/// Generate a random symmetric key of `len` bytes.
pub fn generate_key(len: usize) -> Result<SecretBytes, CryptoError> {
    let mut key = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|_| CryptoError::Random)?;
    Ok(SecretBytes::from(key))
}

pub(crate) fn check_key_len(key: &SecretBytes, expected: usize) -> Result<(), CryptoError> {
    let actual = key.expose_secret().len();
    if actual != expected {
        return Err(CryptoError::InvalidKeyLength { expected, actual });
    }
    Ok(())
}

/// Copy key material into a new secret owned by the caller.
pub(crate) fn duplicate(key: &SecretBytes) -> SecretBytes {
    SecretBytes::from(key.expose_secret().to_vec())
}
