//! HMAC-SHA256 tagging.
//!
//! A tagged message is `message ‖ HMAC(key, message)` with a fixed
//! [`MAC_TAG_LEN`]-byte tag. The MacKey itself is [`MAC_KEY_LEN`] bytes; the
//! two sizes happen to match for SHA-256 but are tracked separately.

use super::{CryptoError, MAC_KEY_LEN, MAC_TAG_LEN, SecretBytes, check_key_len, duplicate};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies tags under one MacKey.
pub struct Authenticator {
    key: SecretBytes,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(key: &SecretBytes) -> Result<Self, CryptoError> {
        check_key_len(key, MAC_KEY_LEN)?;
        Ok(Self {
            key: duplicate(key),
        })
    }

    /// Append the tag: `message ‖ HMAC(key, message)`.
    pub fn mac(&self, message: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let tag = tag(self.key.expose_secret(), message)?;
        let mut tagged = Zeroizing::new(Vec::with_capacity(message.len() + MAC_TAG_LEN));
        tagged.extend_from_slice(message);
        tagged.extend_from_slice(&tag);
        Ok(tagged)
    }

    /// Strip and verify the trailing tag, returning the message.
    pub fn unmac(&self, tagged: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let (message, tag) = split_tag(tagged)?;
        verify(self.key.expose_secret(), message, tag)?;
        Ok(Zeroizing::new(message.to_vec()))
    }
}

/// Tag a MacKey with itself, the bootstrapping form it is stored in.
pub fn wrap_self(key: &SecretBytes) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    Authenticator::new(key)?.mac(key.expose_secret())
}

/// Recover a MacKey stored as `key ‖ HMAC(key, key)`.
///
/// Nothing else can vouch for the MacKey, so it is checked against itself.
pub fn unwrap(self_tagged: &[u8]) -> Result<SecretBytes, CryptoError> {
    let (key, tag) = split_tag(self_tagged)?;
    if key.len() != MAC_KEY_LEN {
        return Err(CryptoError::MalformedInput);
    }
    verify(key, key, tag)?;
    Ok(SecretBytes::from(key.to_vec()))
}

fn split_tag(tagged: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if tagged.len() < MAC_TAG_LEN {
        return Err(CryptoError::MalformedInput);
    }
    Ok(tagged.split_at(tagged.len() - MAC_TAG_LEN))
}

fn tag(key: &[u8], message: &[u8]) -> Result<[u8; MAC_TAG_LEN], CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::Configuration("HMAC key rejected".to_string()))?;
    mac.update(message);
    let mut out = [0u8; MAC_TAG_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn verify(key: &[u8], message: &[u8], expected: &[u8]) -> Result<(), CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::Configuration("HMAC key rejected".to_string()))?;
    mac.update(message);
    mac.verify_slice(expected)
        .map_err(|_| CryptoError::IntegrityViolation)
}
