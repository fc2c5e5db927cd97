use crate::core::{Block, Header, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{BlockStore, ChainStore, TransactionStore, Utxo, UtxoStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

fn lock_error(store: &str) -> BlockchainError {
    BlockchainError::Concurrency(format!("Failed to acquire {store} lock"))
}

#[derive(Default)]
struct BlockTables {
    blocks: HashMap<String, Block>,
    headers: BTreeMap<i32, Header>,
}

/// ( K -> block hash hex, V => Block ), plus a height index of headers
#[derive(Default)]
pub struct MemoryBlockStore {
    inner: RwLock<BlockTables>,
}

impl MemoryBlockStore {
    pub fn new() -> MemoryBlockStore {
        MemoryBlockStore::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: &Block) -> Result<()> {
        let mut tables = self.inner.write().map_err(|_| lock_error("block store"))?;
        tables.blocks.insert(block.hash_hex(), block.clone());
        tables
            .headers
            .insert(block.get_height(), block.header().clone());
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Block> {
        let tables = self.inner.read().map_err(|_| lock_error("block store"))?;
        tables.blocks.get(hash_hex).cloned().ok_or_else(|| {
            BlockchainError::NotFound(format!("block with hash [{hash_hex}] does not exist"))
        })
    }

    fn headers(&self) -> Result<Vec<Header>> {
        let tables = self.inner.read().map_err(|_| lock_error("block store"))?;
        Ok(tables.headers.values().cloned().collect())
    }
}

/// ( K -> tx hash hex, V => Transaction )
#[derive(Default)]
pub struct MemoryTransactionStore {
    inner: RwLock<HashMap<String, Transaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> MemoryTransactionStore {
        MemoryTransactionStore::default()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn put(&self, tx: &Transaction) -> Result<()> {
        let mut txs = self.inner.write().map_err(|_| lock_error("tx store"))?;
        txs.insert(tx.hash_hex(), tx.clone());
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Transaction> {
        let txs = self.inner.read().map_err(|_| lock_error("tx store"))?;
        txs.get(hash_hex).cloned().ok_or_else(|| {
            BlockchainError::NotFound(format!("transaction with hash [{hash_hex}] does not exist"))
        })
    }

    fn contains(&self, hash_hex: &str) -> Result<bool> {
        let txs = self.inner.read().map_err(|_| lock_error("tx store"))?;
        Ok(txs.contains_key(hash_hex))
    }
}

/// ( K -> "hash_index", V => Utxo )
#[derive(Default)]
pub struct MemoryUtxoStore {
    inner: RwLock<HashMap<String, Utxo>>,
}

impl MemoryUtxoStore {
    pub fn new() -> MemoryUtxoStore {
        MemoryUtxoStore::default()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put(&self, utxo: &Utxo) -> Result<()> {
        let mut utxos = self.inner.write().map_err(|_| lock_error("utxo store"))?;
        utxos.insert(utxo.key(), utxo.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Utxo> {
        let utxos = self.inner.read().map_err(|_| lock_error("utxo store"))?;
        utxos
            .get(key)
            .cloned()
            .ok_or_else(|| BlockchainError::NotFound(format!("utxo [{key}] does not exist")))
    }

    fn put_batch(&self, batch: &[Utxo]) -> Result<()> {
        let mut utxos = self.inner.write().map_err(|_| lock_error("utxo store"))?;
        for utxo in batch {
            utxos.insert(utxo.key(), utxo.clone());
        }
        Ok(())
    }
}

/// The three memory stores behind one commit.
#[derive(Default)]
pub struct MemoryChainStore {
    blocks: MemoryBlockStore,
    transactions: MemoryTransactionStore,
    utxos: MemoryUtxoStore,
}

impl MemoryChainStore {
    pub fn new() -> MemoryChainStore {
        MemoryChainStore::default()
    }
}

impl ChainStore for MemoryChainStore {
    fn blocks(&self) -> &dyn BlockStore {
        &self.blocks
    }

    fn transactions(&self) -> &dyn TransactionStore {
        &self.transactions
    }

    fn utxos(&self) -> &dyn UtxoStore {
        &self.utxos
    }

    // Every lock is taken before the first insert. Lock order is blocks,
    // transactions, utxos; single-store calls never hold two locks.
    fn commit_block(&self, block: &Block, utxos: &[Utxo]) -> Result<()> {
        let mut tables = self
            .blocks
            .inner
            .write()
            .map_err(|_| lock_error("block store"))?;
        let mut txs = self
            .transactions
            .inner
            .write()
            .map_err(|_| lock_error("tx store"))?;
        let mut utxo_map = self
            .utxos
            .inner
            .write()
            .map_err(|_| lock_error("utxo store"))?;

        for tx in block.get_transactions() {
            txs.insert(tx.hash_hex(), tx.clone());
        }
        tables.blocks.insert(block.hash_hex(), block.clone());
        tables
            .headers
            .insert(block.get_height(), block.header().clone());
        for utxo in utxos {
            utxo_map.insert(utxo.key(), utxo.clone());
        }
        Ok(())
    }
}
