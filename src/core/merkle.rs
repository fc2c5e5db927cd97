use crate::core::{Hash32, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use serde::{Deserialize, Serialize};

/// Binary Merkle tree over transaction hashes.
///
/// Every level is kept, leaves first, so the tree can be re-derived node by
/// node and inclusion proofs can be produced. An odd node at any level is
/// paired with itself; a single leaf therefore has root `H(leaf || leaf)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash32>>,
}

/// Merkle proof for transaction inclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Transaction hash being proven
    pub transaction_hash: Hash32,
    /// Merkle root hash
    pub merkle_root: Hash32,
    /// Proof path (sibling hashes and directions), leaf level first
    pub proof_path: Vec<ProofElement>,
    /// Index of the transaction in the block
    pub transaction_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    /// Sibling hash
    pub hash: Hash32,
    /// Direction: true if sibling is on the right, false if on the left
    pub is_right: bool,
}

impl MerkleTree {
    /// Create a new Merkle tree from a list of transactions
    pub fn new(transactions: &[Transaction]) -> Result<Self> {
        let leaf_hashes: Vec<Hash32> = transactions.iter().map(Transaction::hash).collect();
        Self::from_hashes(&leaf_hashes)
    }

    pub fn from_hashes(hashes: &[Hash32]) -> Result<Self> {
        if hashes.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Cannot create Merkle tree from empty hash list".to_string(),
            ));
        }

        let mut levels = vec![hashes.to_vec()];
        loop {
            let current = &levels[levels.len() - 1];
            // a lone leaf is still hashed with itself
            if current.len() == 1 && levels.len() > 1 {
                break;
            }
            let next = Self::parent_level(current);
            levels.push(next);
        }

        Ok(MerkleTree { levels })
    }

    fn parent_level(level: &[Hash32]) -> Vec<Hash32> {
        level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => Self::hash_pair(left, right),
                [single] => Self::hash_pair(single, single),
                _ => unreachable!("chunks(2) yields one or two elements"),
            })
            .collect()
    }

    pub fn get_root_hash(&self) -> Hash32 {
        // from_hashes guarantees at least two levels, the last holding one node
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Recompute every internal node from its children.
    pub fn verify_tree(&self) -> bool {
        if self.levels.len() < 2 || self.levels[self.levels.len() - 1].len() != 1 {
            return false;
        }
        self.levels
            .windows(2)
            .all(|pair| Self::parent_level(&pair[0]) == pair[1])
    }

    pub fn generate_proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        if transaction_index >= self.leaf_count() {
            return Err(BlockchainError::InvalidBlock(format!(
                "Transaction index {} out of bounds (leaves: {})",
                transaction_index,
                self.leaf_count()
            )));
        }

        let mut proof_path = Vec::with_capacity(self.levels.len() - 1);
        let mut index = transaction_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let element = if index % 2 == 0 {
                let sibling = level.get(index + 1).unwrap_or(&level[index]);
                ProofElement {
                    hash: *sibling,
                    is_right: true,
                }
            } else {
                ProofElement {
                    hash: level[index - 1],
                    is_right: false,
                }
            };
            proof_path.push(element);
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_hash: self.levels[0][transaction_index],
            merkle_root: self.get_root_hash(),
            proof_path,
            transaction_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current_hash = proof.transaction_hash;

        for element in &proof.proof_path {
            current_hash = if element.is_right {
                Self::hash_pair(&current_hash, &element.hash)
            } else {
                Self::hash_pair(&element.hash, &current_hash)
            };
        }

        current_hash == proof.merkle_root
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> Hash32 {
        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&combined)
    }

    /// Root over the transactions in block order.
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Result<Hash32> {
        Ok(Self::new(transactions)?.get_root_hash())
    }
}
