//! XMSS key derivation, signing, and verification.
//!
//! This is a pure, stateless set of functions over `(seed, height,
//! hash_function)` plus an explicit leaf index: nothing in this module
//! owns an OTS cursor. That bookkeeping belongs to the wallet store
//! (`crate::wallet`), so that the cursor bump can be committed to disk
//! before a signature ever leaves the process.

pub mod adrs;
pub mod tree;
pub mod wots;

use crate::error::{Result, WalletError};
use crate::hash::HashFunction;
use wots::WOTS_LEN;

/// Tree heights the descriptor may name; each yields `2^h` one-time
/// signatures.
pub const ALLOWED_HEIGHTS: [u8; 8] = [4, 6, 8, 10, 12, 14, 16, 18];

/// The seed-part of an extended seed: 48 bytes, after the 3-byte
/// descriptor.
pub type SeedBytes = [u8; 48];

/// The two values that make up an XMSS public key: a public seed and a
/// Merkle root, both 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmssPublicKey {
    pub pub_seed: [u8; 32],
    pub root: [u8; 32],
}

/// An XMSS signature: the leaf index signed, the per-signature nonce `r`,
/// the revealed WOTS+ chain values, and the authentication path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmssSignature {
    pub index: u32,
    pub r: [u8; 32],
    pub wots_sig: Vec<[u8; 32]>,
    pub auth_path: Vec<[u8; 32]>,
}

fn validate_height(height: u8) -> Result<()> {
    if ALLOWED_HEIGHTS.contains(&height) {
        Ok(())
    } else {
        Err(WalletError::UnsupportedDescriptor(format!(
            "tree height {height} is not one of {ALLOWED_HEIGHTS:?}"
        )))
    }
}

/// Derive the three internal working seeds from the 48-byte seed portion of
/// an extended seed: `sk_seed` feeds WOTS+ private key generation,
/// `pub_seed` randomizes every public hash call, `prf_seed` generates the
/// per-signature nonce `r`. Each is domain-separated so that none can be
/// confused with another even though all three come from the same input.
fn derive_seeds(seed: &SeedBytes, hf: HashFunction) -> ([u8; 32], [u8; 32], [u8; 32]) {
    let sk_seed = hf.digest32_parts(&[b"xmss-sk-seed", seed]);
    let pub_seed = hf.digest32_parts(&[b"xmss-pub-seed", seed]);
    let prf_seed = hf.digest32_parts(&[b"xmss-prf-seed", seed]);
    (sk_seed, pub_seed, prf_seed)
}

/// Derive the public key (public seed and Merkle root) for an extended
/// seed at the given height.
pub fn derive_public_key(seed: &SeedBytes, height: u8, hf: HashFunction) -> Result<XmssPublicKey> {
    validate_height(height)?;
    let (sk_seed, pub_seed, _prf_seed) = derive_seeds(seed, hf);
    let root = tree::root(&sk_seed, &pub_seed, height, hf);
    Ok(XmssPublicKey { pub_seed, root })
}

/// Sign `msg` (a 32-byte digest, typically a transaction hash) at `index`.
///
/// Returns `ExhaustedKey`-shaped `OtsExhausted` if `index >= 2^height`;
/// callers are expected to have already checked the wallet's OTS cursor,
/// but the engine re-checks rather than trust the caller blindly.
pub fn sign(
    seed: &SeedBytes,
    height: u8,
    hf: HashFunction,
    index: u32,
    msg: &[u8; 32],
) -> Result<XmssSignature> {
    validate_height(height)?;
    let capacity = 1u64 << height;
    if u64::from(index) >= capacity {
        return Err(WalletError::OtsExhausted { cursor: index, height });
    }

    let (sk_seed, pub_seed, prf_seed) = derive_seeds(seed, hf);
    let root = tree::root(&sk_seed, &pub_seed, height, hf);

    let r = hf.digest32_parts(&[&prf_seed, &index.to_be_bytes()]);
    let digest = hf.digest32_parts(&[&r, &root, &index.to_be_bytes(), msg]);

    let wots_sig = wots::wots_sign(&sk_seed, &pub_seed, index, &digest, hf).to_vec();
    let auth_path = tree::auth_path(&sk_seed, &pub_seed, height, index, hf);

    Ok(XmssSignature {
        index,
        r,
        wots_sig,
        auth_path,
    })
}

/// Verify `sig` against `msg` and the public key `(pub_seed, root)`.
///
/// Never errors: a malformed signature (wrong chain/path lengths) simply
/// fails to verify, matching the contract of a boolean signature check.
pub fn verify(public_key: &XmssPublicKey, height: u8, msg: &[u8; 32], sig: &XmssSignature, hf: HashFunction) -> bool {
    if sig.wots_sig.len() != WOTS_LEN || sig.auth_path.len() != height as usize {
        return false;
    }
    if u64::from(sig.index) >= 1u64 << height {
        return false;
    }

    let digest = hf.digest32_parts(&[&sig.r, &public_key.root, &sig.index.to_be_bytes(), msg]);

    let mut wots_sig_array = [[0u8; 32]; WOTS_LEN];
    wots_sig_array.copy_from_slice(&sig.wots_sig);
    let recomputed_pk = wots::wots_pk_from_sig(&wots_sig_array, &public_key.pub_seed, sig.index, &digest, hf);
    let leaf = tree::leaf_hash(&public_key.pub_seed, sig.index, &recomputed_pk, hf);

    let computed_root = tree::root_from_auth_path(leaf, sig.index, &sig.auth_path, &public_key.pub_seed, hf);
    computed_root == public_key.root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_bytes(fill: u8) -> SeedBytes {
        [fill; 48]
    }

    #[test]
    fn sign_and_verify_round_trips() {
        let seed = seed_bytes(5);
        let height = 4;
        let hf = HashFunction::Shake256;
        let pk = derive_public_key(&seed, height, hf).unwrap();

        let msg = [42u8; 32];
        let sig = sign(&seed, height, hf, 3, &msg).unwrap();
        assert!(verify(&pk, height, &msg, &sig, hf));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let seed = seed_bytes(6);
        let height = 4;
        let hf = HashFunction::Sha2_256;
        let pk = derive_public_key(&seed, height, hf).unwrap();

        let msg = [1u8; 32];
        let sig = sign(&seed, height, hf, 0, &msg).unwrap();
        let other_msg = [2u8; 32];
        assert!(!verify(&pk, height, &other_msg, &sig, hf));
    }

    #[test]
    fn index_at_or_beyond_capacity_is_exhausted() {
        let seed = seed_bytes(7);
        let height = 4;
        let hf = HashFunction::Shake128;
        let err = sign(&seed, height, hf, 16, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, WalletError::OtsExhausted { cursor: 16, height: 4 }));
    }

    #[test]
    fn unsupported_height_is_rejected() {
        let seed = seed_bytes(8);
        let err = derive_public_key(&seed, 5, HashFunction::Shake256).unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedDescriptor(_)));
    }

    #[test]
    fn different_seeds_give_different_keys() {
        let hf = HashFunction::Shake256;
        let pk1 = derive_public_key(&seed_bytes(1), 4, hf).unwrap();
        let pk2 = derive_public_key(&seed_bytes(2), 4, hf).unwrap();
        assert_ne!(pk1, pk2);
    }
}
