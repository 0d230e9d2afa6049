//! ADRS: the 8-word addressing structure that domain-separates every hash
//! call the XMSS engine makes.

/// WOTS+ leaf generation and chain stepping.
pub const ADRS_TYPE_WOTS_HASH: u32 = 0;
/// Compression of a completed WOTS+ public key into a tree leaf.
pub const ADRS_TYPE_WOTS_PK: u32 = 1;
/// Internal Merkle tree node compression.
pub const ADRS_TYPE_TREE: u32 = 2;

/// Address used to domain-separate a single XMSS tree's hash calls. This
/// engine addresses exactly one XMSS tree per extended seed (no
/// hypertree), so `tree_index` is always zero; it is kept as an explicit
/// field rather than removed, in case a future layered scheme needs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmssAddress {
    words: [u32; 8],
}

impl XmssAddress {
    pub fn new() -> Self {
        Self { words: [0; 8] }
    }

    pub fn set_type(&mut self, t: u32) -> &mut Self {
        self.words[3] = t;
        self
    }

    /// Height of the tree level this address refers to (0 = leaves).
    pub fn set_tree_height(&mut self, height: u32) -> &mut Self {
        self.words[4] = height;
        self
    }

    /// Node index within the level named by `set_tree_height`.
    pub fn set_tree_index(&mut self, index: u32) -> &mut Self {
        self.words[1] = index;
        self
    }

    /// Leaf (OTS) index this WOTS+ key pair belongs to.
    pub fn set_keypair_index(&mut self, index: u32) -> &mut Self {
        self.words[5] = index;
        self
    }

    /// Which of the `WOTS_LEN` chains this hash call steps.
    pub fn set_chain_index(&mut self, index: u32) -> &mut Self {
        self.words[6] = index;
        self
    }

    /// Position within the chain named by `set_chain_index`.
    pub fn set_hash_index(&mut self, index: u32) -> &mut Self {
        self.words[7] = index;
        self
    }

    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, word) in self.words.iter().enumerate() {
            out[i * 4..(i + 1) * 4].copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_fields_produce_distinct_bytes() {
        let mut a = XmssAddress::new();
        a.set_type(ADRS_TYPE_WOTS_HASH).set_keypair_index(3);
        let mut b = XmssAddress::new();
        b.set_type(ADRS_TYPE_WOTS_HASH).set_keypair_index(4);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn default_is_all_zero() {
        assert_eq!(XmssAddress::new().to_bytes(), [0u8; 32]);
    }
}
