//! Core ledger functionality
//!
//! Blocks, transactions, their canonical encoding and Merkle commitment, and
//! the chain that validates and commits blocks.

pub mod block;
pub mod chain;
pub mod codec;
pub mod merkle;
pub mod transaction;

/// SHA-256 output.
pub type Hash32 = [u8; 32];

pub use block::{hash_header, Block, Header};
pub use chain::{
    genesis_block, genesis_private_key, Chain, HeaderList, BLOCK_VERSION, GENESIS_AMOUNT,
    GENESIS_SEED, TX_VERSION,
};
pub use codec::{encode_header, encode_transaction};
pub use merkle::{MerkleProof, MerkleTree, ProofElement};
pub use transaction::{outpoint_key, Transaction, TxInput, TxOutput};
