//! Data storage and persistence
//!
//! Storage contracts for blocks, transactions and UTXOs, with in-memory and
//! sled-backed implementations, the staged UTXO ledger and the mempool.
//! Every store is keyed by lower-case hex hashes; a missing key is
//! `BlockchainError::NotFound`, never a default value.

pub mod memory;
pub mod memory_pool;
pub mod sled_store;
pub mod utxo_set;

pub use memory::{
    MemoryBlockStore, MemoryChainStore, MemoryTransactionStore, MemoryUtxoStore,
};
pub use memory_pool::MemoryPool;
pub use sled_store::{SledBlockStore, SledChainStore, SledTransactionStore, SledUtxoStore};
pub use utxo_set::{Utxo, UtxoLedger};

use crate::core::{Block, Header, Transaction};
use crate::error::Result;

pub trait BlockStore: Send + Sync {
    fn put(&self, block: &Block) -> Result<()>;
    fn get(&self, hash_hex: &str) -> Result<Block>;
    /// Headers of every stored block, ordered by height.
    fn headers(&self) -> Result<Vec<Header>>;
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub trait TransactionStore: Send + Sync {
    fn put(&self, tx: &Transaction) -> Result<()>;
    fn get(&self, hash_hex: &str) -> Result<Transaction>;
    fn contains(&self, hash_hex: &str) -> Result<bool>;
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub trait UtxoStore: Send + Sync {
    fn put(&self, utxo: &Utxo) -> Result<()>;
    /// `key` is `"<hash hex>_<index>"`.
    fn get(&self, key: &str) -> Result<Utxo>;
    /// Write every entry or none of them.
    fn put_batch(&self, utxos: &[Utxo]) -> Result<()>;
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// The three stores of one chain and the write that commits a block to them.
pub trait ChainStore: Send + Sync {
    fn blocks(&self) -> &dyn BlockStore;
    fn transactions(&self) -> &dyn TransactionStore;
    fn utxos(&self) -> &dyn UtxoStore;

    /// Write the block, its header index, its transactions and `utxos` as one
    /// unit. On error none of them is visible.
    fn commit_block(&self, block: &Block, utxos: &[Utxo]) -> Result<()>;

    fn flush(&self) -> Result<()> {
        self.blocks().flush()?;
        self.transactions().flush()?;
        self.utxos().flush()
    }
}
