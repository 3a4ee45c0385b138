//! Local password vault: PBKDF2-wrapped account keys, mac-then-encrypt
//! AES-CBC envelopes and one length-prefixed file per stored password.

pub mod config;
pub mod vault;
