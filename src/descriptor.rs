//! The 3-byte descriptor prefix shared by extended seeds, addresses, and
//! public keys: hash function, tree height, and signature scheme.

use crate::error::{Result, WalletError};
use crate::hash::HashFunction;
use crate::xmss::ALLOWED_HEIGHTS;

/// Signature scheme id. XMSS is the only one this daemon implements; the
/// byte is still carried through so a future scheme addition doesn't
/// change the wire format.
pub const SIG_SCHEME_XMSS: u8 = 0;

pub const DESCRIPTOR_LEN: usize = 3;

/// Decoded form of the 3-byte descriptor prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub hash_function: HashFunction,
    pub height: u8,
    pub sig_scheme: u8,
}

impl Descriptor {
    pub fn new(hash_function: HashFunction, height: u8) -> Result<Self> {
        if !ALLOWED_HEIGHTS.contains(&height) {
            return Err(WalletError::UnsupportedDescriptor(format!(
                "tree height {height} is not one of {ALLOWED_HEIGHTS:?}"
            )));
        }
        Ok(Self {
            hash_function,
            height,
            sig_scheme: SIG_SCHEME_XMSS,
        })
    }

    pub fn to_bytes(self) -> [u8; DESCRIPTOR_LEN] {
        [self.hash_function.descriptor_id(), self.height, self.sig_scheme]
    }

    pub fn from_bytes(bytes: &[u8; DESCRIPTOR_LEN]) -> Result<Self> {
        let hash_function = HashFunction::from_descriptor_id(bytes[0]).ok_or_else(|| {
            WalletError::UnsupportedDescriptor(format!("unknown hash function id {}", bytes[0]))
        })?;
        let height = bytes[1];
        if !ALLOWED_HEIGHTS.contains(&height) {
            return Err(WalletError::UnsupportedDescriptor(format!(
                "tree height {height} is not one of {ALLOWED_HEIGHTS:?}"
            )));
        }
        if bytes[2] != SIG_SCHEME_XMSS {
            return Err(WalletError::UnsupportedDescriptor(format!(
                "unknown signature scheme id {}",
                bytes[2]
            )));
        }
        Ok(Self {
            hash_function,
            height,
            sig_scheme: bytes[2],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let d = Descriptor::new(HashFunction::Shake256, 8).unwrap();
        let bytes = d.to_bytes();
        assert_eq!(Descriptor::from_bytes(&bytes).unwrap(), d);
    }

    #[test]
    fn rejects_unknown_hash_function() {
        let bytes = [9u8, 4, 0];
        assert!(Descriptor::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_bad_height() {
        assert!(Descriptor::new(HashFunction::Shake128, 5).is_err());
        let bytes = [0u8, 5, 0];
        assert!(Descriptor::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_unknown_sig_scheme() {
        let bytes = [1u8, 4, 7];
        assert!(Descriptor::from_bytes(&bytes).is_err());
    }

    #[test]
    fn literal_fixture_decodes() {
        // descriptor bytes from the daemon's literal hex-seed scenario
        let bytes = [0x01u8, 0x04, 0x00];
        let d = Descriptor::from_bytes(&bytes).unwrap();
        assert_eq!(d.hash_function, HashFunction::Shake256);
        assert_eq!(d.height, 4);
    }
}
