//! IV-prefixed AES-128-CBC envelopes.
//!
//! Format: `[IV: 16 bytes][ciphertext: PKCS#7 padded, multiple of 16]`.
//! With a MacKey configured, the plaintext is tagged before encryption and
//! verified after decryption.

use super::{
    Authenticator, BLOCK_LEN, CryptoError, ENC_KEY_LEN, SecretBytes, check_key_len, duplicate,
    random_bytes,
};
use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encrypts and decrypts self-describing envelopes under one key.
///
/// Built from a password key alone while (un)wrapping the account keys, and
/// from `(MasterKey, MacKey)` for entry payloads.
pub struct Envelope {
    key: SecretBytes,
    mac: Option<Authenticator>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("authenticated", &self.mac.is_some())
            .finish_non_exhaustive()
    }
}

impl Envelope {
    /// Envelope without integrity tagging; the wrapped keys carry their own.
    pub fn from_password_key(key: &SecretBytes) -> Result<Self, CryptoError> {
        check_key_len(key, ENC_KEY_LEN)?;
        Ok(Self {
            key: duplicate(key),
            mac: None,
        })
    }

    /// Envelope that tags every plaintext with `mac_key` before encrypting.
    pub fn with_mac(key: &SecretBytes, mac_key: &SecretBytes) -> Result<Self, CryptoError> {
        check_key_len(key, ENC_KEY_LEN)?;
        Ok(Self {
            key: duplicate(key),
            mac: Some(Authenticator::new(mac_key)?),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let tagged;
        let plaintext = match &self.mac {
            Some(mac) => {
                tagged = mac.mac(plaintext)?;
                tagged.as_slice()
            }
            None => plaintext,
        };

        let iv = random_bytes::<BLOCK_LEN>()?;
        let cipher = Aes128CbcEnc::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: ENC_KEY_LEN,
                actual: self.key.expose_secret().len(),
            })?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut envelope = Vec::with_capacity(BLOCK_LEN + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    pub fn decrypt(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if envelope.len() < 2 * BLOCK_LEN || envelope.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::CorruptedCiphertext);
        }
        let (iv, ciphertext) = envelope.split_at(BLOCK_LEN);

        let cipher = Aes128CbcDec::new_from_slices(self.key.expose_secret(), iv)
            .map_err(|_| CryptoError::CorruptedCiphertext)?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::CorruptedCiphertext)?,
        );

        match &self.mac {
            Some(mac) => mac.unmac(&plaintext),
            None => Ok(plaintext),
        }
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_string(&self, envelope: &[u8]) -> Result<String, CryptoError> {
        let bytes = self.decrypt(envelope)?;
        String::from_utf8(bytes.to_vec()).map_err(|err| {
            let mut rejected = err.into_bytes();
            zeroize::Zeroize::zeroize(&mut rejected);
            CryptoError::InvalidUtf8
        })
    }
}
