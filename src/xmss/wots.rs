//! WOTS+ chain generation: Winternitz parameter w=16, an ADRS carrying
//! chain/hash/keypair indices mutated between hash calls. Each per-chain
//! value stays available (rather than being compressed to a flat public
//! key immediately) so the tree builder can compress them into a leaf and
//! the signer can reveal a chosen step of each chain.
//!
//! Standard WOTS+ signs the message digits *and* a checksum over them:
//! without the checksum, anyone who sees one signature can forge a valid
//! signature for any digest whose every nibble is >= the signed digest's,
//! by hashing each revealed chain value forward the difference (`pub_seed`
//! and the ADRS are public, so this needs no secret material). The
//! checksum chains close that gap: forging upward on the message digits
//! drives the checksum down, which would require stepping a checksum
//! chain *backward* — infeasible without the hash's preimage resistance.

use super::adrs::{XmssAddress, ADRS_TYPE_WOTS_HASH};
use crate::hash::HashFunction;

/// Winternitz parameter (base of the digit alphabet).
pub const WOTS_W: u32 = 16;
/// log2(WOTS_W).
pub const WOTS_LOG_W: u32 = 4;
/// Steps needed to walk a chain end to end: 2^WOTS_LOG_W - 1.
pub const CHAIN_LEN: u32 = (1 << WOTS_LOG_W) - 1;
/// Message-digit chains: one 4-bit digit per nibble of a 32-byte digest.
pub const WOTS_LEN1: usize = 64;
/// Checksum chains: enough base-16 digits to hold `Σ (w-1 - digit_i)`,
/// whose maximum is `WOTS_LEN1 * (w-1)` = 960 < 16^3.
pub const WOTS_LEN2: usize = 3;
/// Total chains per WOTS+ key: message digits plus checksum digits.
pub const WOTS_LEN: usize = WOTS_LEN1 + WOTS_LEN2;

/// The `WOTS_LEN` private-key seed values for one leaf, prior to chaining.
pub fn wots_sk(sk_seed: &[u8; 32], keypair_index: u32, hf: HashFunction) -> [[u8; 32]; WOTS_LEN] {
    let mut out = [[0u8; 32]; WOTS_LEN];
    for (chain_index, slot) in out.iter_mut().enumerate() {
        let mut addr = XmssAddress::new();
        addr.set_type(ADRS_TYPE_WOTS_HASH)
            .set_keypair_index(keypair_index)
            .set_chain_index(chain_index as u32)
            .set_hash_index(0);
        let addr_bytes = addr.to_bytes();
        *slot = hf.digest32_parts(&[sk_seed, &(chain_index as u32).to_be_bytes(), &addr_bytes]);
    }
    out
}

/// Apply `steps` iterations of the chain function to `start`, for the
/// given chain, recording the address's `hash_index` at each step.
pub fn chain(
    start: [u8; 32],
    pub_seed: &[u8; 32],
    keypair_index: u32,
    chain_index: u32,
    from_step: u32,
    steps: u32,
    hf: HashFunction,
) -> [u8; 32] {
    let mut value = start;
    for step in from_step..from_step + steps {
        let mut addr = XmssAddress::new();
        addr.set_type(ADRS_TYPE_WOTS_HASH)
            .set_keypair_index(keypair_index)
            .set_chain_index(chain_index)
            .set_hash_index(step);
        let addr_bytes = addr.to_bytes();
        value = hf.digest32_parts(&[&value, pub_seed, &addr_bytes]);
    }
    value
}

/// Full public-key chain values (all `CHAIN_LEN` steps applied) for one leaf.
pub fn wots_pk(
    sk_seed: &[u8; 32],
    pub_seed: &[u8; 32],
    keypair_index: u32,
    hf: HashFunction,
) -> [[u8; 32]; WOTS_LEN] {
    let sk = wots_sk(sk_seed, keypair_index, hf);
    let mut pk = [[0u8; 32]; WOTS_LEN];
    for chain_index in 0..WOTS_LEN {
        pk[chain_index] = chain(
            sk[chain_index],
            pub_seed,
            keypair_index,
            chain_index as u32,
            0,
            CHAIN_LEN,
            hf,
        );
    }
    pk
}

/// Split a 32-byte digest into `WOTS_LEN1` 4-bit message digits, MSB-first
/// per byte.
pub fn message_digits(digest: &[u8; 32]) -> [u8; WOTS_LEN1] {
    let mut digits = [0u8; WOTS_LEN1];
    for (i, byte) in digest.iter().enumerate() {
        digits[2 * i] = byte >> 4;
        digits[2 * i + 1] = byte & 0x0f;
    }
    digits
}

/// The checksum over a set of message digits: `Σ (w-1 - digit_i)`,
/// base-16 encoded into `WOTS_LEN2` digits, MSB-first. Forging a higher
/// message digit lowers this checksum, so an attacker who only owns one
/// signature can raise the message chains but can never lower the
/// checksum chains to match — that direction needs a hash preimage.
fn checksum_digits(msg_digits: &[u8; WOTS_LEN1]) -> [u8; WOTS_LEN2] {
    let mut csum: u32 = msg_digits.iter().map(|&d| CHAIN_LEN - d as u32).sum();
    let mut digits = [0u8; WOTS_LEN2];
    for slot in digits.iter_mut().rev() {
        *slot = (csum & 0xF) as u8;
        csum >>= 4;
    }
    digits
}

/// The full `WOTS_LEN` digit sequence signed and verified: message digits
/// followed by their checksum digits.
pub fn signature_digits(digest: &[u8; 32]) -> [u8; WOTS_LEN] {
    let msg_digits = message_digits(digest);
    let csum_digits = checksum_digits(&msg_digits);
    let mut digits = [0u8; WOTS_LEN];
    digits[..WOTS_LEN1].copy_from_slice(&msg_digits);
    digits[WOTS_LEN1..].copy_from_slice(&csum_digits);
    digits
}

/// Reveal the signature value for each chain: the chain value after exactly
/// `digit` steps, where `digit` is this chain's message or checksum digit.
pub fn wots_sign(
    sk_seed: &[u8; 32],
    pub_seed: &[u8; 32],
    keypair_index: u32,
    digest: &[u8; 32],
    hf: HashFunction,
) -> [[u8; 32]; WOTS_LEN] {
    let sk = wots_sk(sk_seed, keypair_index, hf);
    let digits = signature_digits(digest);
    let mut sig = [[0u8; 32]; WOTS_LEN];
    for chain_index in 0..WOTS_LEN {
        sig[chain_index] = chain(
            sk[chain_index],
            pub_seed,
            keypair_index,
            chain_index as u32,
            0,
            digits[chain_index] as u32,
            hf,
        );
    }
    sig
}

/// Recompute the public-key chain values from a revealed signature by
/// applying the remaining `CHAIN_LEN - digit` steps, over both message and
/// checksum chains.
pub fn wots_pk_from_sig(
    sig: &[[u8; 32]; WOTS_LEN],
    pub_seed: &[u8; 32],
    keypair_index: u32,
    digest: &[u8; 32],
    hf: HashFunction,
) -> [[u8; 32]; WOTS_LEN] {
    let digits = signature_digits(digest);
    let mut pk = [[0u8; 32]; WOTS_LEN];
    for chain_index in 0..WOTS_LEN {
        let digit = digits[chain_index] as u32;
        pk[chain_index] = chain(
            sig[chain_index],
            pub_seed,
            keypair_index,
            chain_index as u32,
            digit,
            CHAIN_LEN - digit,
            hf,
        );
    }
    pk
}
