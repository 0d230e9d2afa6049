//! Bidirectional mapping between the 51-byte extended seed, its 102-char
//! hex form, and its 34-word mnemonic form.
//!
//! The word lookup table is a lazily-initialized static, built once from
//! the compiled-in word list rather than populated at runtime.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::descriptor::{Descriptor, DESCRIPTOR_LEN};
use crate::error::{Result, WalletError};

pub const SEED_LEN: usize = 48;
pub const EXTENDED_SEED_LEN: usize = DESCRIPTOR_LEN + SEED_LEN;
pub const HEX_LEN: usize = EXTENDED_SEED_LEN * 2;
pub const MNEMONIC_WORD_COUNT: usize = 34;

const WORDLIST_TEXT: &str = include_str!("wordlist.txt");

static WORDLIST: Lazy<Vec<&'static str>> =
    Lazy::new(|| WORDLIST_TEXT.lines().filter(|l| !l.is_empty()).collect());

static WORD_INDEX: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    WORDLIST
        .iter()
        .enumerate()
        .map(|(i, word)| (*word, i as u16))
        .collect()
});

/// A validated 51-byte extended seed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ExtendedSeed(pub [u8; EXTENDED_SEED_LEN]);

impl std::fmt::Debug for ExtendedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedSeed").field("descriptor", &self.descriptor()).finish()
    }
}

impl ExtendedSeed {
    pub fn new(bytes: [u8; EXTENDED_SEED_LEN]) -> Result<Self> {
        let descriptor_bytes: [u8; DESCRIPTOR_LEN] = bytes[..DESCRIPTOR_LEN].try_into().unwrap();
        Descriptor::from_bytes(&descriptor_bytes)?;
        Ok(Self(bytes))
    }

    pub fn descriptor(&self) -> Descriptor {
        let descriptor_bytes: [u8; DESCRIPTOR_LEN] = self.0[..DESCRIPTOR_LEN].try_into().unwrap();
        Descriptor::from_bytes(&descriptor_bytes).expect("validated at construction")
    }

    pub fn seed_bytes(&self) -> [u8; SEED_LEN] {
        self.0[DESCRIPTOR_LEN..].try_into().unwrap()
    }

    /// Strict lowercase hex encoding, 102 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode a hex seed. Uppercase input is normalized before validation:
    /// accepted on the way in, never produced on the way out.
    pub fn from_hex(input: &str) -> Result<Self> {
        if input.len() != HEX_LEN {
            return Err(WalletError::InvalidSeed(format!(
                "hex seed must be {HEX_LEN} characters, got {}",
                input.len()
            )));
        }
        let normalized = input.to_ascii_lowercase();
        let bytes = hex::decode(&normalized)
            .map_err(|e| WalletError::InvalidSeed(format!("not valid hex: {e}")))?;
        let array: [u8; EXTENDED_SEED_LEN] = bytes
            .try_into()
            .map_err(|_| WalletError::InvalidSeed("decoded hex has wrong length".to_string()))?;
        Self::new(array)
    }

    /// Encode as 34 space-separated words.
    pub fn to_mnemonic(&self) -> Result<String> {
        let words = bytes_to_word_indices(&self.0);
        let rendered: Result<Vec<&str>> = words
            .iter()
            .map(|&idx| {
                WORDLIST
                    .get(idx as usize)
                    .copied()
                    .ok_or_else(|| WalletError::InvalidSeed(format!("word index {idx} out of range")))
            })
            .collect();
        Ok(rendered?.join(" "))
    }

    /// Decode a 34-word mnemonic.
    pub fn from_mnemonic(input: &str) -> Result<Self> {
        let words: Vec<&str> = input.split_whitespace().collect();
        if words.len() != MNEMONIC_WORD_COUNT {
            return Err(WalletError::InvalidSeed(format!(
                "mnemonic must have {MNEMONIC_WORD_COUNT} words, got {}",
                words.len()
            )));
        }

        let mut indices = [0u16; MNEMONIC_WORD_COUNT];
        for (i, word) in words.iter().enumerate() {
            let lower = word.to_ascii_lowercase();
            let idx = WORD_INDEX
                .get(lower.as_str())
                .copied()
                .ok_or_else(|| WalletError::InvalidSeed(format!("unknown word: {word}")))?;
            indices[i] = idx;
        }

        let bytes = word_indices_to_bytes(&indices);
        Self::new(bytes)
    }
}

/// Pack 51 bytes (408 bits) into 34 12-bit words, MSB-first.
fn bytes_to_word_indices(bytes: &[u8; EXTENDED_SEED_LEN]) -> [u16; MNEMONIC_WORD_COUNT] {
    let mut words = [0u16; MNEMONIC_WORD_COUNT];
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out_index = 0;
    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 12 {
            bits -= 12;
            words[out_index] = ((acc >> bits) & 0xFFF) as u16;
            out_index += 1;
        }
    }
    debug_assert_eq!(out_index, MNEMONIC_WORD_COUNT);
    words
}

/// Unpack 34 12-bit words back into 51 bytes, MSB-first.
fn word_indices_to_bytes(words: &[u16; MNEMONIC_WORD_COUNT]) -> [u8; EXTENDED_SEED_LEN] {
    let mut out = [0u8; EXTENDED_SEED_LEN];
    let mut acc: u64 = 0;
    let mut bits: u32 = 0;
    let mut out_index = 0;
    for &word in words {
        acc = (acc << 12) | word as u64;
        bits += 12;
        while bits >= 8 {
            bits -= 8;
            out[out_index] = ((acc >> bits) & 0xFF) as u8;
            out_index += 1;
        }
    }
    debug_assert_eq!(out_index, EXTENDED_SEED_LEN);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_seed() -> [u8; EXTENDED_SEED_LEN] {
        let mut bytes = [0u8; EXTENDED_SEED_LEN];
        bytes[0] = 0x01; // shake256
        bytes[1] = 0x04; // height 4
        bytes[2] = 0x00; // xmss
        for (i, b) in bytes[3..].iter_mut().enumerate() {
            *b = i as u8;
        }
        bytes
    }

    #[test]
    fn wordlist_has_4096_unique_entries() {
        assert_eq!(WORDLIST.len(), 4096);
        assert_eq!(WORD_INDEX.len(), 4096);
    }

    #[test]
    fn hex_round_trips() {
        let seed = ExtendedSeed::new(sample_seed()).unwrap();
        let hex_str = seed.to_hex();
        assert_eq!(hex_str.len(), HEX_LEN);
        let decoded = ExtendedSeed::from_hex(&hex_str).unwrap();
        assert_eq!(decoded.0, seed.0);
    }

    #[test]
    fn mnemonic_round_trips() {
        let seed = ExtendedSeed::new(sample_seed()).unwrap();
        let mnemonic = seed.to_mnemonic().unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), MNEMONIC_WORD_COUNT);
        let decoded = ExtendedSeed::from_mnemonic(&mnemonic).unwrap();
        assert_eq!(decoded.0, seed.0);
    }

    #[test]
    fn mnemonic_round_trips_for_all_byte_fill_patterns() {
        for fill in [0u8, 1, 17, 255] {
            let mut bytes = [fill; EXTENDED_SEED_LEN];
            bytes[0] = 0x00; // shake128
            bytes[1] = 0x06; // height 6
            bytes[2] = 0x00;
            let seed = ExtendedSeed::new(bytes).unwrap();
            let mnemonic = seed.to_mnemonic().unwrap();
            let decoded = ExtendedSeed::from_mnemonic(&mnemonic).unwrap();
            assert_eq!(decoded.0, seed.0);
        }
    }

    #[test]
    fn wrong_word_count_is_rejected() {
        let short = "absorb drank lute".to_string();
        assert!(matches!(ExtendedSeed::from_mnemonic(&short), Err(WalletError::InvalidSeed(_))));
    }

    #[test]
    fn unknown_word_is_rejected() {
        let words = vec!["notarealword"; MNEMONIC_WORD_COUNT].join(" ");
        assert!(matches!(ExtendedSeed::from_mnemonic(&words), Err(WalletError::InvalidSeed(_))));
    }

    #[test]
    fn wrong_hex_length_is_rejected() {
        assert!(ExtendedSeed::from_hex("abcd").is_err());
    }

    #[test]
    fn uppercase_hex_normalizes_on_decode() {
        let seed = ExtendedSeed::new(sample_seed()).unwrap();
        let upper = seed.to_hex().to_ascii_uppercase();
        let decoded = ExtendedSeed::from_hex(&upper).unwrap();
        assert_eq!(decoded.0, seed.0);
    }
}
