//! # Gossip Ledger - My Peer-to-Peer Ledger Node
//!
//! This is a small ledger node I built in Rust: a linear chain of signed
//! blocks, a UTXO model, and a gossip overlay that spreads transactions and
//! blocks between nodes. When I come back to this code, here's what I need to
//! remember:
//!
//! ## What I Built
//! - **Signed Blocks**: Ed25519 signatures over a canonical header encoding
//! - **UTXO Model**: every input spends one earlier output, surplus is burned
//! - **Merkle Commitment**: the whole tree is kept so it can be re-verified
//! - **Gossip Overlay**: handshake discovery, transitive peer lists, fan-out
//! - **Validator Loop**: a timer drains the mempool into a block every few seconds
//! - **Pluggable Storage**: in-memory stores or one sled database per node
//!
//! ## How I Organized My Code
//! - `core/`: blocks, transactions, encoding, Merkle trees and the chain itself
//! - `wallet/`: Ed25519 keys, signatures and addresses
//! - `network/`: node, peer directory, transports and the validator loop
//! - `storage/`: store contracts, memory and sled backends, UTXO ledger, mempool
//! - `config/`: TOML + environment configuration
//! - `utils/`: digests, signing primitives, bincode helpers
//! - `cli/`: command-line interface of the node binary
//!
//! ## Key Design Decisions I Made
//! - The chain never sees a concrete store or transport, only traits
//! - Block validation stages UTXO changes and commits them in one batch
//! - The header list's write lock is the commit lock
//! - There is no fork choice: a block either extends the head or is rejected

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::NodeConfig;
pub use core::{
    genesis_block, genesis_private_key, Block, Chain, Hash32, Header, MerkleTree, Transaction,
    TxInput, TxOutput, GENESIS_AMOUNT,
};
pub use error::{BlockchainError, Result};
pub use network::{
    Ack, Dialer, GossipMessage, LocalNetwork, Node, NodeOptions, PeerClient, Server, TcpDialer,
    VersionMessage,
};
pub use storage::{
    BlockStore, ChainStore, MemoryChainStore, MemoryPool, SledChainStore, TransactionStore, Utxo,
    UtxoStore,
};
pub use utils::{current_timestamp, sha256_digest};
pub use wallet::{Address, PrivateKey, PublicKey, Signature};
