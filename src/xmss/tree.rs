//! Merkle tree construction and authentication paths. Each internal node
//! is `H(left || right || PRF(pub_seed, addr_node(level, index)))`, with
//! an ADRS folded into every hash call for domain separation.

use super::adrs::{XmssAddress, ADRS_TYPE_TREE, ADRS_TYPE_WOTS_PK};
use super::wots::{wots_pk, WOTS_LEN};
use crate::hash::HashFunction;

/// Compress a leaf's full WOTS+ public key into a single tree leaf value.
pub fn leaf_hash(
    pub_seed: &[u8; 32],
    keypair_index: u32,
    wots_pk: &[[u8; 32]; WOTS_LEN],
    hf: HashFunction,
) -> [u8; 32] {
    let mut addr = XmssAddress::new();
    addr.set_type(ADRS_TYPE_WOTS_PK).set_keypair_index(keypair_index);
    let addr_bytes = addr.to_bytes();

    let mut flat = Vec::with_capacity(WOTS_LEN * 32);
    for chain_value in wots_pk {
        flat.extend_from_slice(chain_value);
    }
    hf.digest32_parts(&[pub_seed, &addr_bytes, &flat])
}

fn node_hash(
    left: &[u8; 32],
    right: &[u8; 32],
    pub_seed: &[u8; 32],
    level: u32,
    index_at_level: u32,
    hf: HashFunction,
) -> [u8; 32] {
    let mut addr = XmssAddress::new();
    addr.set_type(ADRS_TYPE_TREE)
        .set_tree_height(level)
        .set_tree_index(index_at_level);
    let addr_bytes = addr.to_bytes();
    let prf = hf.digest32_parts(&[pub_seed, &addr_bytes]);
    hf.digest32_parts(&[left, right, &prf])
}

/// All `2^height` leaves for a tree rooted at `sk_seed`/`pub_seed`.
pub fn leaves(sk_seed: &[u8; 32], pub_seed: &[u8; 32], height: u8, hf: HashFunction) -> Vec<[u8; 32]> {
    let count = 1usize << height;
    (0..count)
        .map(|i| leaf_hash(pub_seed, i as u32, &wots_pk(sk_seed, pub_seed, i as u32, hf), hf))
        .collect()
}

/// Every level of the tree, level 0 being the leaves and the last level
/// holding the single root.
fn levels(leaves: Vec<[u8; 32]>, pub_seed: &[u8; 32], hf: HashFunction) -> Vec<Vec<[u8; 32]>> {
    let mut levels = vec![leaves];
    let mut level = 0u32;
    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let next = current
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| node_hash(&pair[0], &pair[1], pub_seed, level, i as u32, hf))
            .collect();
        levels.push(next);
        level += 1;
    }
    levels
}

/// Compute the Merkle root for a tree of the given height.
pub fn root(sk_seed: &[u8; 32], pub_seed: &[u8; 32], height: u8, hf: HashFunction) -> [u8; 32] {
    let leaves = leaves(sk_seed, pub_seed, height, hf);
    let levels = levels(leaves, pub_seed, hf);
    levels.last().unwrap()[0]
}

/// The authentication path for leaf `index`: one sibling hash per level,
/// leaf level first.
pub fn auth_path(
    sk_seed: &[u8; 32],
    pub_seed: &[u8; 32],
    height: u8,
    index: u32,
    hf: HashFunction,
) -> Vec<[u8; 32]> {
    let leaves = leaves(sk_seed, pub_seed, height, hf);
    let levels = levels(leaves, pub_seed, hf);

    let mut path = Vec::with_capacity(height as usize);
    let mut node_index = index as usize;
    for level in levels.iter().take(height as usize) {
        let sibling_index = node_index ^ 1;
        path.push(level[sibling_index]);
        node_index /= 2;
    }
    path
}

/// Recompute the root implied by a leaf, its index, and an authentication
/// path, without rebuilding the whole tree. Used at verification time.
pub fn root_from_auth_path(
    leaf: [u8; 32],
    index: u32,
    auth_path: &[[u8; 32]],
    pub_seed: &[u8; 32],
    hf: HashFunction,
) -> [u8; 32] {
    let mut node = leaf;
    let mut node_index = index;
    for (level, sibling) in auth_path.iter().enumerate() {
        let (left, right) = if node_index % 2 == 0 {
            (&node, sibling)
        } else {
            (sibling, &node)
        };
        node = node_hash(left, right, pub_seed, level as u32, node_index / 2, hf);
        node_index /= 2;
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_path_reconstructs_root() {
        let sk_seed = [11u8; 32];
        let pub_seed = [22u8; 32];
        let hf = HashFunction::Shake256;
        let height = 4u8;

        let expected_root = root(&sk_seed, &pub_seed, height, hf);
        for index in 0..(1u32 << height) {
            let leaves = leaves(&sk_seed, &pub_seed, height, hf);
            let leaf = leaves[index as usize];
            let path = auth_path(&sk_seed, &pub_seed, height, index, hf);
            assert_eq!(path.len(), height as usize);
            let got = root_from_auth_path(leaf, index, &path, &pub_seed, hf);
            assert_eq!(got, expected_root, "leaf {index} failed to reconstruct root");
        }
    }

    #[test]
    fn wrong_leaf_does_not_reconstruct_root() {
        let sk_seed = [1u8; 32];
        let pub_seed = [2u8; 32];
        let hf = HashFunction::Sha2_256;
        let height = 3u8;

        let expected_root = root(&sk_seed, &pub_seed, height, hf);
        let path = auth_path(&sk_seed, &pub_seed, height, 0, hf);
        let got = root_from_auth_path([0xffu8; 32], 0, &path, &pub_seed, hf);
        assert_ne!(got, expected_root);
    }
}
