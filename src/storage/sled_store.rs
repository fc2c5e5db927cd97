// Sled-backed stores. One database, one tree per record kind; values are
// bincode-encoded through utils::serialization.

use crate::core::{Block, Header, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{BlockStore, ChainStore, TransactionStore, Utxo, UtxoStore};
use crate::utils::{deserialize, serialize};
use sled::transaction::TransactionError;
use sled::{Batch, Db, Transactional, Tree};
use std::path::Path;

const BLOCKS_TREE: &str = "blocks";
const HEADERS_TREE: &str = "headers";
const TRANSACTIONS_TREE: &str = "transactions";
const UTXO_TREE: &str = "chainstate";

fn open_tree(db: &Db, name: &str) -> Result<Tree> {
    db.open_tree(name)
        .map_err(|e| BlockchainError::Database(format!("Failed to open {name} tree: {e}")))
}

// Flipping the sign bit keeps big-endian keys in height order.
fn height_key(height: i32) -> [u8; 4] {
    ((height as u32) ^ 0x8000_0000).to_be_bytes()
}

pub struct SledBlockStore {
    blocks: Tree,
    headers: Tree,
}

impl SledBlockStore {
    pub fn new(db: &Db) -> Result<SledBlockStore> {
        Ok(SledBlockStore {
            blocks: open_tree(db, BLOCKS_TREE)?,
            headers: open_tree(db, HEADERS_TREE)?,
        })
    }
}

impl BlockStore for SledBlockStore {
    fn put(&self, block: &Block) -> Result<()> {
        let block_hash = block.hash_hex();
        let block_data = block.serialize()?;
        let header_data = serialize(block.header())?;
        let key = height_key(block.get_height());

        (&self.blocks, &self.headers)
            .transaction(|(blocks, headers)| {
                blocks.insert(block_hash.as_bytes(), block_data.as_slice())?;
                headers.insert(&key[..], header_data.as_slice())?;
                Ok(())
            })
            .map_err(|e: TransactionError| {
                BlockchainError::Database(format!("Failed to update blocks tree: {e}"))
            })?;
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Block> {
        let data = self
            .blocks
            .get(hash_hex.as_bytes())
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
            .ok_or_else(|| {
                BlockchainError::NotFound(format!("block with hash [{hash_hex}] does not exist"))
            })?;
        Block::deserialize(data.as_ref())
    }

    fn headers(&self) -> Result<Vec<Header>> {
        let mut headers = vec![];
        for item in self.headers.iter() {
            let (_, v) = item.map_err(|e| {
                BlockchainError::Database(format!("Failed to iterate headers tree: {e}"))
            })?;
            headers.push(deserialize::<Header>(v.as_ref())?);
        }
        Ok(headers)
    }

    fn flush(&self) -> Result<()> {
        self.blocks.flush()?;
        self.headers.flush()?;
        Ok(())
    }
}

pub struct SledTransactionStore {
    transactions: Tree,
}

impl SledTransactionStore {
    pub fn new(db: &Db) -> Result<SledTransactionStore> {
        Ok(SledTransactionStore {
            transactions: open_tree(db, TRANSACTIONS_TREE)?,
        })
    }
}

impl TransactionStore for SledTransactionStore {
    fn put(&self, tx: &Transaction) -> Result<()> {
        self.transactions
            .insert(tx.hash_hex().as_bytes(), tx.serialize()?)
            .map_err(|e| BlockchainError::Database(format!("Failed to insert transaction: {e}")))?;
        Ok(())
    }

    fn get(&self, hash_hex: &str) -> Result<Transaction> {
        let data = self
            .transactions
            .get(hash_hex.as_bytes())
            .map_err(|e| BlockchainError::Database(format!("Failed to get transaction: {e}")))?
            .ok_or_else(|| {
                BlockchainError::NotFound(format!(
                    "transaction with hash [{hash_hex}] does not exist"
                ))
            })?;
        Transaction::deserialize(data.as_ref())
    }

    fn contains(&self, hash_hex: &str) -> Result<bool> {
        self.transactions
            .contains_key(hash_hex.as_bytes())
            .map_err(|e| BlockchainError::Database(format!("Failed to query transaction: {e}")))
    }

    fn flush(&self) -> Result<()> {
        self.transactions.flush()?;
        Ok(())
    }
}

pub struct SledUtxoStore {
    utxos: Tree,
}

impl SledUtxoStore {
    pub fn new(db: &Db) -> Result<SledUtxoStore> {
        Ok(SledUtxoStore {
            utxos: open_tree(db, UTXO_TREE)?,
        })
    }
}

impl UtxoStore for SledUtxoStore {
    fn put(&self, utxo: &Utxo) -> Result<()> {
        self.utxos
            .insert(utxo.key().as_bytes(), serialize(utxo)?)
            .map_err(|e| BlockchainError::Database(format!("Failed to insert UTXO: {e}")))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Utxo> {
        let data = self
            .utxos
            .get(key.as_bytes())
            .map_err(|e| BlockchainError::Database(format!("Failed to get UTXO: {e}")))?
            .ok_or_else(|| BlockchainError::NotFound(format!("utxo [{key}] does not exist")))?;
        deserialize::<Utxo>(data.as_ref())
    }

    fn put_batch(&self, utxos: &[Utxo]) -> Result<()> {
        let mut batch = Batch::default();
        for utxo in utxos {
            batch.insert(utxo.key().as_bytes(), serialize(utxo)?);
        }
        self.utxos
            .apply_batch(batch)
            .map_err(|e| BlockchainError::Database(format!("Failed to apply UTXO batch: {e}")))
    }

    fn flush(&self) -> Result<()> {
        self.utxos.flush()?;
        Ok(())
    }
}

/// The three sled stores of one database. A block commit is one sled
/// transaction across all four trees.
pub struct SledChainStore {
    blocks: SledBlockStore,
    transactions: SledTransactionStore,
    utxos: SledUtxoStore,
}

impl SledChainStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<SledChainStore> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        SledChainStore::new(&db)
    }

    pub fn new(db: &Db) -> Result<SledChainStore> {
        Ok(SledChainStore {
            blocks: SledBlockStore::new(db)?,
            transactions: SledTransactionStore::new(db)?,
            utxos: SledUtxoStore::new(db)?,
        })
    }
}

impl ChainStore for SledChainStore {
    fn blocks(&self) -> &dyn BlockStore {
        &self.blocks
    }

    fn transactions(&self) -> &dyn TransactionStore {
        &self.transactions
    }

    fn utxos(&self) -> &dyn UtxoStore {
        &self.utxos
    }

    fn commit_block(&self, block: &Block, utxos: &[Utxo]) -> Result<()> {
        let block_hash = block.hash_hex();
        let block_data = block.serialize()?;
        let header_data = serialize(block.header())?;
        let height = height_key(block.get_height());
        let mut tx_entries = vec![];
        for tx in block.get_transactions() {
            tx_entries.push((tx.hash_hex(), tx.serialize()?));
        }
        let mut utxo_entries = vec![];
        for utxo in utxos {
            utxo_entries.push((utxo.key(), serialize(utxo)?));
        }

        (
            &self.blocks.blocks,
            &self.blocks.headers,
            &self.transactions.transactions,
            &self.utxos.utxos,
        )
            .transaction(|(blocks, headers, transactions, utxo_tree)| {
                for (key, data) in &tx_entries {
                    transactions.insert(key.as_bytes(), data.as_slice())?;
                }
                for (key, data) in &utxo_entries {
                    utxo_tree.insert(key.as_bytes(), data.as_slice())?;
                }
                blocks.insert(block_hash.as_bytes(), block_data.as_slice())?;
                headers.insert(&height[..], header_data.as_slice())?;
                Ok(())
            })
            .map_err(|e: TransactionError| {
                BlockchainError::Database(format!("Failed to commit block {block_hash}: {e}"))
            })?;
        Ok(())
    }
}
