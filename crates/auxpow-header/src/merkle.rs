//! Merkle branches.
//!
//! A branch is the list of sibling hashes from a leaf up to the root,
//! together with the leaf's index. Bit `i` of the index tells whether the
//! running hash is the right (1) or left (0) child at level `i`.

use auxpow_primitives::chainhash::{double_hash_pair, Hash};
use auxpow_primitives::util::{VarInt, WireReader, WireWriter};

use crate::HeaderError;

/// Size of a hash on the wire; a lower bound for each branch element.
const BRANCH_HASH_SIZE: usize = 32;

/// Compute the Merkle tree parent of two `Hash` values.
///
/// The hashes are in internal (little-endian) byte order. They are
/// concatenated directly (no reversal), double-SHA256'd.
pub fn merkle_tree_parent(left: &Hash, right: &Hash) -> Hash {
    double_hash_pair(left, right)
}

/// Fold `leaf` through `branch` and return the resulting root.
///
/// Total over any branch length; callers bound the length where it matters.
pub fn compute_root(leaf: &Hash, branch: &[Hash], index: u32) -> Hash {
    let mut current = *leaf;
    let mut index = index;
    for sibling in branch {
        current = if index & 1 == 1 {
            merkle_tree_parent(sibling, &current)
        } else {
            merkle_tree_parent(&current, sibling)
        };
        index >>= 1;
    }
    current
}

/// A merkle branch: sibling hashes from leaf to root plus the leaf index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleBranch {
    pub hashes: Vec<Hash>,
    pub index: u32,
}

impl MerkleBranch {
    /// Build a branch from sibling hashes ordered leaf to root.
    ///
    /// # Arguments
    /// * `hashes` - Sibling at each level, starting next to the leaf.
    /// * `index` - Position of the leaf in the tree; bit `i` picks the side
    ///   at level `i`.
    pub fn new(hashes: Vec<Hash>, index: u32) -> Self {
        MerkleBranch { hashes, index }
    }

    /// Number of levels, which is the depth of the tree.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// An empty branch folds to the leaf itself.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Root obtained by folding `leaf` through this branch.
    pub fn root(&self, leaf: &Hash) -> Hash {
        compute_root(leaf, &self.hashes, self.index)
    }

    /// Read a varint count, that many hashes, then a 4-byte index.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, HeaderError> {
        let count = reader.read_varint()?.value();
        let available = (reader.remaining() / BRANCH_HASH_SIZE) as u64;
        if count > available {
            return Err(HeaderError::Decode(format!(
                "merkle branch of {} hashes exceeds the {} remaining bytes",
                count,
                reader.remaining()
            )));
        }
        let mut hashes = Vec::with_capacity(reader.bounded_capacity(count, BRANCH_HASH_SIZE));
        for _ in 0..count {
            hashes.push(reader.read_hash()?);
        }
        let index = reader.read_u32_le()?;
        Ok(MerkleBranch { hashes, index })
    }

    /// Write the branch in the layout [`MerkleBranch::read_from`] accepts.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_varint(VarInt::from(self.hashes.len()));
        for hash in &self.hashes {
            writer.write_hash(hash);
        }
        writer.write_u32_le(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auxpow_primitives::chainhash::double_hash_h;

    fn leaf(n: u8) -> Hash {
        double_hash_h(&[n])
    }

    #[test]
    fn test_merkle_tree_parent() {
        let left = Hash::from_hex("d6c79a6ef05572f0cb8e9a450c561fc40b0a8a7d48faad95e20d93ddeb08c231").unwrap();
        let right = Hash::from_hex("b1ed931b79056438b990d8981ba46fae97e5574b142445a74a44b978af284f98").unwrap();
        let expected = Hash::from_hex("b0d537b3ee52e472507f453df3d69561720346118a5a8c4d85ca0de73bc792be").unwrap();
        assert_eq!(merkle_tree_parent(&left, &right), expected);
    }

    #[test]
    fn test_compute_root_ordering() {
        let (a, b) = (leaf(1), leaf(2));
        assert_eq!(compute_root(&a, &[b], 0), merkle_tree_parent(&a, &b));
        assert_eq!(compute_root(&a, &[b], 1), merkle_tree_parent(&b, &a));
        // Empty branch: the leaf is the root.
        assert_eq!(compute_root(&a, &[], 7), a);
    }

    #[test]
    fn test_branches_reproduce_tree_root() {
        let leaves: Vec<Hash> = (0..4).map(leaf).collect();
        let left = merkle_tree_parent(&leaves[0], &leaves[1]);
        let right = merkle_tree_parent(&leaves[2], &leaves[3]);
        let root = merkle_tree_parent(&left, &right);

        let branches = [
            MerkleBranch::new(vec![leaves[1], right], 0),
            MerkleBranch::new(vec![leaves[0], right], 1),
            MerkleBranch::new(vec![leaves[3], left], 2),
            MerkleBranch::new(vec![leaves[2], left], 3),
        ];
        for (i, branch) in branches.iter().enumerate() {
            assert_eq!(branch.len(), 2);
            assert_eq!(branch.root(&leaves[i]), root, "leaf {}", i);
        }
        // A wrong index folds on the wrong side.
        assert_ne!(MerkleBranch::new(vec![leaves[1], right], 2).root(&leaves[0]), root);
        assert!(MerkleBranch::default().is_empty());
    }

    #[test]
    fn test_branch_wire_format() {
        let branch = MerkleBranch::new(vec![leaf(1), leaf(2)], 3);
        let mut writer = WireWriter::new();
        branch.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 1 + 64 + 4);
        assert_eq!(&bytes[65..], &[3, 0, 0, 0]);

        let decoded = MerkleBranch::read_from(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(decoded, branch);
    }

    #[test]
    fn test_branch_count_beyond_input_is_rejected() {
        let bytes = [0xfe, 0xff, 0xff, 0xff, 0x7f];
        assert!(matches!(
            MerkleBranch::read_from(&mut WireReader::new(&bytes)),
            Err(HeaderError::Decode(_))
        ));
    }
}
