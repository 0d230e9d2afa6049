//! Fixed-output hash primitives used by the XMSS engine and address codec.
//!
//! The descriptor byte in an extended seed selects one of three hash
//! functions at runtime; every PRF/T-hash call in the XMSS engine threads
//! that choice through explicitly rather than picking it at compile time,
//! since a signer and verifier must agree on it per-key, not per-build.

use sha2::Digest as _;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake128, Shake256};

/// The three hash functions an XMSS descriptor can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Shake128,
    Shake256,
    Sha2_256,
}

impl HashFunction {
    /// Decode the descriptor's hash-function nibble.
    pub fn from_descriptor_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Shake128),
            1 => Some(Self::Shake256),
            2 => Some(Self::Sha2_256),
            _ => None,
        }
    }

    /// Encode back to the descriptor's hash-function nibble.
    pub fn descriptor_id(self) -> u8 {
        match self {
            Self::Shake128 => 0,
            Self::Shake256 => 1,
            Self::Sha2_256 => 2,
        }
    }

    /// Hash `input` to exactly 32 bytes using this function.
    pub fn digest32(self, input: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            Self::Shake128 => {
                let mut hasher = Shake128::default();
                hasher.update(input);
                hasher.finalize_xof().read(&mut out);
            }
            Self::Shake256 => {
                let mut hasher = Shake256::default();
                hasher.update(input);
                hasher.finalize_xof().read(&mut out);
            }
            Self::Sha2_256 => {
                let digest = sha2::Sha256::digest(input);
                out.copy_from_slice(&digest);
            }
        }
        out
    }

    /// Hash the concatenation of several byte slices to 32 bytes, avoiding
    /// an intermediate allocation for the common multi-part T-hash calls.
    pub fn digest32_parts(self, parts: &[&[u8]]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            Self::Shake128 => {
                let mut hasher = Shake128::default();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize_xof().read(&mut out);
            }
            Self::Shake256 => {
                let mut hasher = Shake256::default();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize_xof().read(&mut out);
            }
            Self::Sha2_256 => {
                let mut hasher = sha2::Sha256::new();
                for part in parts {
                    sha2::Digest::update(&mut hasher, part);
                }
                out.copy_from_slice(&sha2::Digest::finalize(hasher));
            }
        }
        out
    }
}

/// Plain SHA2-256, used outside the descriptor-driven XMSS path (address
/// checksums, passphrase keying) where the hash function is not a wallet
/// choice but fixed by the address/wallet-file format itself.
pub fn sha2_256(input: &[u8]) -> [u8; 32] {
    let digest = sha2::Sha256::digest(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_round_trip() {
        for f in [HashFunction::Shake128, HashFunction::Shake256, HashFunction::Sha2_256] {
            assert_eq!(HashFunction::from_descriptor_id(f.descriptor_id()), Some(f));
        }
    }

    #[test]
    fn unknown_descriptor_is_none() {
        assert!(HashFunction::from_descriptor_id(9).is_none());
    }

    #[test]
    fn digest32_is_deterministic() {
        let a = HashFunction::Shake256.digest32(b"hello");
        let b = HashFunction::Shake256.digest32(b"hello");
        assert_eq!(a, b);
        let c = HashFunction::Shake256.digest32(b"world");
        assert_ne!(a, c);
    }

    #[test]
    fn digest32_parts_matches_concatenation() {
        let whole = HashFunction::Sha2_256.digest32(b"ab");
        let parts = HashFunction::Sha2_256.digest32_parts(&[b"a", b"b"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn sha2_256_is_stable() {
        let out = sha2_256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(out.as_slice(), expected.as_slice());
    }
}
