// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! SHA-512 Merkle tree engine.
//!
//! One Ed25519 signature over the tree root covers every request in a batch;
//! each response carries only its leaf index and the sibling hashes on the
//! way up. Leaves and interior nodes are domain-separated by a one-byte
//! tweak before hashing:
//!
//! - `leaf = SHA-512(0x00 ‖ leaf_data)[..hash_size]`
//! - `node = SHA-512(0x01 ‖ left ‖ right)[..hash_size]`
//!
//! The Google-era wire uses 64-byte hashes; the IETF drafts truncate to 32.
//! Node order is `Natural` (the node whose index bit is 0 sits on the left);
//! `Mirrored` swaps the roles for interoperating with servers that used the
//! reversed layout. A lone node at an odd-sized level is combined with
//! itself.

use crate::crypto::sha512_prefixed;
use crate::error::RoughtimeError;

/// Tweak byte prepended to leaf data prior to hashing.
pub const TREE_LEAF_TWEAK: u8 = 0x00;

/// Tweak byte prepended to node pairs prior to hashing.
pub const TREE_NODE_TWEAK: u8 = 0x01;

/// Sibling placement when combining a node with its neighbor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TreeOrder {
    /// A node whose index bit is 0 is the left input.
    Natural,
    /// A node whose index bit is 0 is the right input.
    Mirrored,
}

/// Merkle tree geometry: hash size and node order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MerkleOptions {
    /// Bytes kept from each SHA-512 digest (32 or 64).
    pub hash_size: usize,
    /// Node combination order.
    pub order: TreeOrder,
}

impl MerkleOptions {
    /// Google-era geometry: full 64-byte hashes, natural order.
    pub const CLASSIC: MerkleOptions = MerkleOptions {
        hash_size: 64,
        order: TreeOrder::Natural,
    };

    /// IETF geometry: 32-byte truncated hashes, natural order.
    pub const IETF: MerkleOptions = MerkleOptions {
        hash_size: 32,
        order: TreeOrder::Natural,
    };
}

/// Hash leaf data: `SHA-512(0x00 ‖ data)` truncated to the hash size.
pub fn hash_leaf(opts: MerkleOptions, data: &[u8]) -> Vec<u8> {
    sha512_prefixed(Some(TREE_LEAF_TWEAK), &[data])[..opts.hash_size].to_vec()
}

/// Hash an interior node: `SHA-512(0x01 ‖ left ‖ right)` truncated.
pub fn hash_node(opts: MerkleOptions, left: &[u8], right: &[u8]) -> Vec<u8> {
    sha512_prefixed(Some(TREE_NODE_TWEAK), &[left, right])[..opts.hash_size].to_vec()
}

/// Combine a node with its sibling, placing them according to the tree
/// order and the node's index bit at this level.
fn combine(opts: MerkleOptions, node: &[u8], sibling: &[u8], bit: u32) -> Vec<u8> {
    let node_is_left = match opts.order {
        TreeOrder::Natural => bit == 0,
        TreeOrder::Mirrored => bit != 0,
    };
    if node_is_left {
        hash_node(opts, node, sibling)
    } else {
        hash_node(opts, sibling, node)
    }
}

/// Compute the parent level from a full level of node hashes.
fn next_level(opts: MerkleOptions, level: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut parents = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        let left = &pair[0];
        // A lone node is combined with itself.
        let right = pair.get(1).unwrap_or(left);
        parents.push(combine(opts, left, right, 0));
    }
    parents
}

fn hash_leaves(opts: MerkleOptions, leaves: &[&[u8]]) -> Result<Vec<Vec<u8>>, RoughtimeError> {
    if leaves.is_empty() {
        return Err(RoughtimeError::InputValidation {
            what: "merkle tree needs at least one leaf",
        });
    }
    Ok(leaves.iter().map(|l| hash_leaf(opts, l)).collect())
}

/// Compute the tree root over the given leaf data.
pub fn compute_root(opts: MerkleOptions, leaves: &[&[u8]]) -> Result<Vec<u8>, RoughtimeError> {
    let mut level = hash_leaves(opts, leaves)?;
    while level.len() > 1 {
        level = next_level(opts, &level);
    }
    Ok(level.remove(0))
}

/// Build the Merkle path (concatenated sibling hashes, bottom up) for the
/// leaf at `index`.
pub fn build_path(
    opts: MerkleOptions,
    leaves: &[&[u8]],
    index: usize,
) -> Result<Vec<u8>, RoughtimeError> {
    let mut level = hash_leaves(opts, leaves)?;
    if index >= leaves.len() {
        return Err(RoughtimeError::InputValidation {
            what: "merkle leaf index out of range",
        });
    }
    let mut path = Vec::new();
    let mut index = index;
    while level.len() > 1 {
        let sibling = index ^ 1;
        // The lone node at an odd-sized level is its own sibling.
        let sibling = if sibling < level.len() { sibling } else { index };
        path.extend_from_slice(&level[sibling]);
        level = next_level(opts, &level);
        index >>= 1;
    }
    Ok(path)
}

/// Reconstruct the root from leaf data, the leaf's index, and the sibling
/// path returned by the server.
pub fn reconstruct_root(
    opts: MerkleOptions,
    leaf_data: &[u8],
    index: u32,
    path: &[u8],
) -> Result<Vec<u8>, RoughtimeError> {
    if path.len() % opts.hash_size != 0 {
        return Err(RoughtimeError::BadLength {
            what: "merkle path",
            expected: path.len().next_multiple_of(opts.hash_size),
            actual: path.len(),
        });
    }
    let mut current = hash_leaf(opts, leaf_data);
    for (i, sibling) in path.chunks_exact(opts.hash_size).enumerate() {
        let bit = if i < 32 { (index >> i) & 1 } else { 0 };
        current = combine(opts, &current, sibling, bit);
    }
    // Every bit of the index must have been consumed by the walk.
    let steps = path.len() / opts.hash_size;
    let remaining = if steps >= 32 { 0 } else { index >> steps };
    if remaining != 0 {
        return Err(RoughtimeError::InputValidation {
            what: "merkle index exceeds path depth",
        });
    }
    Ok(current)
}

/// Reconstruct the root and compare it to `root` in constant time.
///
/// Fails with [`RoughtimeError::BadRoot`] carrying both roots on mismatch.
pub fn verify_path(
    opts: MerkleOptions,
    root: &[u8],
    leaf_data: &[u8],
    index: u32,
    path: &[u8],
) -> Result<(), RoughtimeError> {
    let computed = reconstruct_root(opts, leaf_data, index, path)?;
    if ring::constant_time::verify_slices_are_equal(&computed, root).is_err() {
        return Err(RoughtimeError::BadRoot {
            expected: root.to_vec(),
            computed,
        });
    }
    Ok(())
}

/// A fully built Merkle tree retaining every level, for emitting the root
/// and all leaf paths in one pass.
///
/// This is the batch hot path: [`compute_root`] plus per-leaf [`build_path`]
/// produce identical bytes but rehash the lower levels once per leaf.
#[derive(Debug)]
pub struct MerkleTree {
    opts: MerkleOptions,
    /// `levels[0]` is the leaf hashes; the last level is the root alone.
    levels: Vec<Vec<Vec<u8>>>,
}

impl MerkleTree {
    /// Build the tree over the given leaf data.
    pub fn build(opts: MerkleOptions, leaves: &[&[u8]]) -> Result<MerkleTree, RoughtimeError> {
        let mut levels = vec![hash_leaves(opts, leaves)?];
        while levels[levels.len() - 1].len() > 1 {
            let parents = next_level(opts, &levels[levels.len() - 1]);
            levels.push(parents);
        }
        Ok(MerkleTree { opts, levels })
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The tree root.
    pub fn root(&self) -> &[u8] {
        &self.levels[self.levels.len() - 1][0]
    }

    /// The sibling path for the leaf at `index`.
    pub fn path(&self, index: usize) -> Result<Vec<u8>, RoughtimeError> {
        if index >= self.leaf_count() {
            return Err(RoughtimeError::InputValidation {
                what: "merkle leaf index out of range",
            });
        }
        let mut path = Vec::with_capacity((self.levels.len() - 1) * self.opts.hash_size);
        let mut index = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            let sibling = if sibling < level.len() { sibling } else { index };
            path.extend_from_slice(&level[sibling]);
            index >>= 1;
        }
        Ok(path)
    }
}
