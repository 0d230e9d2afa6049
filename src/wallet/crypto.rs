//! Passphrase-based encryption of wallet item sensitive fields.
//!
//! Derive key material from the passphrase, feed an AEAD cipher, zeroize
//! the derived key afterward. AES-256-GCM is used with a deterministic
//! nonce: each record encrypts under a nonce derived from its own address,
//! so re-encrypting the same record twice is idempotent and no nonce
//! bookkeeping needs to be persisted alongside the ciphertext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroize;

use crate::error::{Result, WalletError};
use crate::hash::sha2_256;

const NONCE_LEN: usize = 12;

fn derive_key(passphrase: &str) -> [u8; 32] {
    sha2_256(passphrase.as_bytes())
}

fn derive_nonce(key: &[u8; 32], plaintext_len: usize) -> [u8; NONCE_LEN] {
    let mut input = Vec::with_capacity(32 + 16 + 8);
    input.extend_from_slice(key);
    input.extend_from_slice(b"qrl-wallet-nonce");
    input.extend_from_slice(&(plaintext_len as u64).to_be_bytes());
    let digest = sha2_256(&input);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

/// Encrypt `plaintext` under `passphrase`. The same passphrase and
/// plaintext always produce the same ciphertext, so re-saving an unchanged
/// item is a no-op at the byte level (needed for I5's bit-exact round
/// trip).
pub fn encrypt(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut key = derive_key(passphrase);
    let nonce = derive_nonce(&key, plaintext.len());

    let cipher = Aes256Gcm::new((&key).into());
    let result = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| WalletError::Decryption);

    key.zeroize();
    result
}

/// Decrypt `ciphertext` under `passphrase`. A wrong passphrase (or a
/// corrupted blob) fails the GCM tag check and surfaces as
/// `WalletError::Decryption`, never as a garbage plaintext.
pub fn decrypt(passphrase: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut key = derive_key(passphrase);
    // GCM appends a fixed 16-byte tag, so the plaintext length the nonce
    // was derived from is always recoverable from the ciphertext length.
    let plaintext_len = ciphertext.len().saturating_sub(16);
    let nonce = derive_nonce(&key, plaintext_len);

    let cipher = Aes256Gcm::new((&key).into());
    let result = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| WalletError::Decryption);

    key.zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_correct_passphrase() {
        let plaintext = b"extended seed material";
        let ciphertext = encrypt("correct horse", plaintext).unwrap();
        let decrypted = decrypt("correct horse", &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let ciphertext = encrypt("right", b"payload").unwrap();
        assert!(matches!(decrypt("wrong", &ciphertext), Err(WalletError::Decryption)));
    }

    #[test]
    fn encryption_is_deterministic_for_unchanged_input() {
        let a = encrypt("你好", b"same plaintext").unwrap();
        let b = encrypt("你好", b"same plaintext").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_plaintext_changes_ciphertext() {
        let a = encrypt("你好", b"one").unwrap();
        let b = encrypt("你好", b"two").unwrap();
        assert_ne!(a, b);
    }
}
