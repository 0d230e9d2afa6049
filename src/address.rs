//! Address derivation: public-key-seed + root → 39-byte address →
//! `Q`-prefixed hex "qaddress". Hash the canonical content, then append a
//! short checksum for cheap corruption detection.

use crate::descriptor::Descriptor;
use crate::error::{Result, WalletError};
use crate::hash::sha2_256;

pub const ADDRESS_LEN: usize = 39;
const CORE_LEN: usize = 35;
const CHECKSUM_LEN: usize = 4;
const QADDRESS_LEN: usize = 1 + ADDRESS_LEN * 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derive an address from a descriptor, public-key seed, and Merkle
    /// root.
    pub fn derive(descriptor: Descriptor, pub_key_seed: &[u8; 32], root: &[u8; 32]) -> Self {
        let descriptor_bytes = descriptor.to_bytes();

        let mut hash_input = Vec::with_capacity(3 + 32 + 32);
        hash_input.extend_from_slice(&descriptor_bytes);
        hash_input.extend_from_slice(pub_key_seed);
        hash_input.extend_from_slice(root);
        let content_hash = sha2_256(&hash_input);

        let mut core = [0u8; CORE_LEN];
        core[..3].copy_from_slice(&descriptor_bytes);
        core[3..].copy_from_slice(&content_hash);

        let checksum = checksum_of(&core);

        let mut address = [0u8; ADDRESS_LEN];
        address[..CORE_LEN].copy_from_slice(&core);
        address[CORE_LEN..].copy_from_slice(&checksum);
        Self(address)
    }

    pub fn to_qaddress(&self) -> String {
        format!("Q{}", hex::encode(self.0))
    }

    pub fn from_qaddress(qaddress: &str) -> Result<Self> {
        if !qaddress.starts_with('Q') {
            return Err(WalletError::MalformedAddress(
                "qaddress must start with 'Q'".to_string(),
            ));
        }
        if qaddress.len() != QADDRESS_LEN {
            return Err(WalletError::MalformedAddress(format!(
                "qaddress must be {QADDRESS_LEN} characters, got {}",
                qaddress.len()
            )));
        }
        let hex_part = &qaddress[1..];
        let bytes = hex::decode(hex_part)
            .map_err(|e| WalletError::MalformedAddress(format!("not valid hex: {e}")))?;
        let address: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| WalletError::MalformedAddress("decoded address has wrong length".to_string()))?;

        let core = &address[..CORE_LEN];
        let expected_checksum = checksum_of(core);
        if expected_checksum != address[CORE_LEN..] {
            return Err(WalletError::MalformedAddress("checksum mismatch".to_string()));
        }

        Ok(Self(address))
    }

    pub fn descriptor(&self) -> Result<Descriptor> {
        let bytes: [u8; 3] = self.0[..3].try_into().unwrap();
        Descriptor::from_bytes(&bytes)
    }
}

fn checksum_of(core: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha2_256(&sha2_256(core));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashFunction;

    #[test]
    fn qaddress_round_trips() {
        let descriptor = Descriptor::new(HashFunction::Shake256, 4).unwrap();
        let pub_key_seed = [11u8; 32];
        let root = [22u8; 32];
        let address = Address::derive(descriptor, &pub_key_seed, &root);

        let qaddress = address.to_qaddress();
        assert_eq!(qaddress.len(), QADDRESS_LEN);
        assert!(qaddress.starts_with('Q'));

        let parsed = Address::from_qaddress(&qaddress).unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let descriptor = Descriptor::new(HashFunction::Sha2_256, 6).unwrap();
        let address = Address::derive(descriptor, &[1u8; 32], &[2u8; 32]);
        let mut qaddress = address.to_qaddress();
        let last = qaddress.pop().unwrap();
        let flipped = if last == '0' { '1' } else { '0' };
        qaddress.push(flipped);
        assert!(Address::from_qaddress(&qaddress).is_err());
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let address = Address::derive(Descriptor::new(HashFunction::Shake128, 4).unwrap(), &[0u8; 32], &[0u8; 32]);
        let without_q = &address.to_qaddress()[1..];
        assert!(Address::from_qaddress(without_q).is_err());
    }

    #[test]
    fn different_roots_give_different_addresses() {
        let descriptor = Descriptor::new(HashFunction::Shake256, 4).unwrap();
        let a = Address::derive(descriptor, &[1u8; 32], &[2u8; 32]);
        let b = Address::derive(descriptor, &[1u8; 32], &[3u8; 32]);
        assert_ne!(a, b);
    }
}
