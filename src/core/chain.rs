// The chain is a linear list of headers backed by a ChainStore. Nothing here
// knows whether the stores live in memory or in sled.
//
// I treat the header list's write lock as the commit lock: a block is
// validated and written while that guard is held, so two blocks built on the
// same head can never both land.

use crate::core::{Block, Hash32, Header, Transaction, TxOutput};
use crate::error::{BlockchainError, Result};
use crate::storage::{ChainStore, Utxo, UtxoLedger};
use crate::wallet::PrivateKey;
use data_encoding::HEXLOWER;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Seed of the key that signs the genesis block and owns its only output.
pub const GENESIS_SEED: &str = "13be19fc5de106d87f9deaec7de204bd5b3a36bb50d66f81fdd5d1482dbeab6e";
pub const GENESIS_AMOUNT: u64 = 8888;
pub const BLOCK_VERSION: u32 = 1;
pub const TX_VERSION: u32 = 1;

pub fn genesis_private_key() -> Result<PrivateKey> {
    PrivateKey::from_seed_hex(GENESIS_SEED)
}

/// The same block on every node: fixed key, zero prev hash, timestamp 0.
pub fn genesis_block() -> Result<Block> {
    let key = genesis_private_key()?;
    let credit = Transaction::new(
        TX_VERSION,
        vec![],
        vec![TxOutput::new(
            GENESIS_AMOUNT,
            key.public().address().bytes().to_vec(),
        )],
    );
    let header = Header {
        version: BLOCK_VERSION,
        height: 0,
        prev_hash: [0u8; 32],
        root_hash: [0u8; 32],
        timestamp: 0,
    };
    let mut block = Block::new(header, vec![credit]);
    block.sign(&key)?;
    Ok(block)
}

/// Append-only header sequence. Index equals height.
#[derive(Debug, Default, Clone)]
pub struct HeaderList {
    headers: Vec<Header>,
}

impl HeaderList {
    pub fn new() -> HeaderList {
        HeaderList::default()
    }

    pub fn add(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn get(&self, height: i64) -> Option<&Header> {
        usize::try_from(height)
            .ok()
            .and_then(|idx| self.headers.get(idx))
    }

    pub fn last(&self) -> Option<&Header> {
        self.headers.last()
    }

    /// -1 for an empty list.
    pub fn height(&self) -> i64 {
        self.headers.len() as i64 - 1
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

struct ChainState {
    headers: HeaderList,
    burned: u64,
}

pub struct Chain {
    state: RwLock<ChainState>,
    store: Box<dyn ChainStore>,
}

impl Chain {
    /// Reload the header list from `store`, or commit genesis when it is empty.
    pub fn new(store: Box<dyn ChainStore>) -> Result<Chain> {
        let chain = Chain {
            state: RwLock::new(ChainState {
                headers: HeaderList::new(),
                burned: 0,
            }),
            store,
        };

        let stored = chain.store.blocks().headers()?;
        if stored.is_empty() {
            chain.commit_genesis()?;
        } else {
            chain.reload(stored)?;
        }
        Ok(chain)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, ChainState>> {
        self.state
            .write()
            .map_err(|_| BlockchainError::Concurrency("Failed to acquire chain lock".to_string()))
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, ChainState>> {
        self.state
            .read()
            .map_err(|_| BlockchainError::Concurrency("Failed to acquire chain lock".to_string()))
    }

    fn commit_genesis(&self) -> Result<()> {
        let block = genesis_block()?;
        let mut state = self.write_state()?;
        // Genesis mints value, so it is applied without ledger validation.
        let mut ledger = UtxoLedger::new(self.store.utxos());
        for tx in block.get_transactions() {
            ledger.apply_transaction(tx)?;
        }
        self.commit(&mut state, &block, ledger, 0)?;
        info!("Created genesis block {}", block.hash_hex());
        Ok(())
    }

    fn reload(&self, stored: Vec<Header>) -> Result<()> {
        let genesis_hash = genesis_block()?.hash();
        if stored[0].hash() != genesis_hash {
            return Err(BlockchainError::Database(
                "stored genesis block does not match the well-known genesis".to_string(),
            ));
        }

        let mut state = self.write_state()?;
        for (idx, header) in stored.into_iter().enumerate() {
            if header.height as i64 != idx as i64 {
                return Err(BlockchainError::Database(format!(
                    "stored headers have a gap at height {idx}"
                )));
            }
            if idx > 0 {
                let block = self.store.blocks().get(&HEXLOWER.encode(&header.hash()))?;
                state.burned = state.burned.saturating_add(self.replay_surplus(&block)?);
            }
            state.headers.add(header);
        }
        info!("Reloaded chain at height {}", state.headers.height());
        Ok(())
    }

    // Spent records are never deleted, so the surplus of a committed block can
    // be recomputed from the stored UTXOs.
    fn replay_surplus(&self, block: &Block) -> Result<u64> {
        let mut surplus = 0u64;
        for tx in block.get_transactions() {
            let mut available = 0u64;
            for input in tx.get_inputs() {
                let utxo = self.store.utxos().get(&input.outpoint_key())?;
                available = available.saturating_add(utxo.get_amount());
            }
            let required = tx
                .get_outputs()
                .iter()
                .fold(0u64, |acc, o| acc.saturating_add(o.get_amount()));
            surplus = surplus.saturating_add(available.saturating_sub(required));
        }
        Ok(surplus)
    }

    pub fn height(&self) -> Result<i64> {
        Ok(self.read_state()?.headers.height())
    }

    pub fn head_hash(&self) -> Result<Hash32> {
        let state = self.read_state()?;
        state
            .headers
            .last()
            .map(Header::hash)
            .ok_or_else(|| BlockchainError::NotFound("chain has no blocks".to_string()))
    }

    /// Total input surplus destroyed by committed transactions.
    pub fn burned(&self) -> Result<u64> {
        Ok(self.read_state()?.burned)
    }

    pub fn add_block(&self, block: &Block) -> Result<()> {
        let mut state = self.write_state()?;
        let (ledger, surplus) = self.validate_block(&state.headers, block)?;
        self.commit(&mut state, block, ledger, surplus)?;
        debug!(
            "Added block {} at height {}",
            block.hash_hex(),
            block.get_height()
        );
        Ok(())
    }

    fn validate_block(&self, headers: &HeaderList, block: &Block) -> Result<(UtxoLedger<'_>, u64)> {
        if !block.verify_signature() {
            return Err(BlockchainError::InvalidBlock(
                "invalid block signature".to_string(),
            ));
        }
        if !block.get_transactions().is_empty() && !block.verify_root_hash() {
            return Err(BlockchainError::InvalidBlock("invalid root hash".to_string()));
        }

        let head_hash = headers.last().map(Header::hash).unwrap_or([0u8; 32]);
        if head_hash != block.header().prev_hash {
            return Err(BlockchainError::InvalidBlock(
                "invalid previous block hash".to_string(),
            ));
        }
        if block.get_height() as i64 != headers.height() + 1 {
            return Err(BlockchainError::InvalidBlock(
                "invalid block height".to_string(),
            ));
        }

        let mut ledger = UtxoLedger::new(self.store.utxos());
        let mut seen = HashSet::new();
        let mut surplus = 0u64;
        for tx in block.get_transactions() {
            let hash_hex = tx.hash_hex();
            if !seen.insert(hash_hex.clone()) || self.store.transactions().contains(&hash_hex)? {
                return Err(BlockchainError::DuplicateTransaction(hash_hex));
            }
            let fee = ledger.stage(tx)?;
            surplus = surplus.saturating_add(fee);
        }
        Ok((ledger, surplus))
    }

    // One store commit, then the head moves. A failed commit leaves both the
    // stores and the header list as they were.
    fn commit(
        &self,
        state: &mut ChainState,
        block: &Block,
        ledger: UtxoLedger<'_>,
        surplus: u64,
    ) -> Result<()> {
        self.store.commit_block(block, &ledger.staged())?;
        state.headers.add(block.header().clone());
        state.burned = state.burned.saturating_add(surplus);
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    pub fn get_block_by_hash(&self, hash: &Hash32) -> Result<Block> {
        self.store.blocks().get(&HEXLOWER.encode(hash))
    }

    pub fn has_block(&self, hash: &Hash32) -> Result<bool> {
        match self.get_block_by_hash(hash) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn get_block_by_height(&self, height: i64) -> Result<Block> {
        let hash = {
            let state = self.read_state()?;
            let current = state.headers.height();
            match state.headers.get(height) {
                Some(header) => header.hash(),
                None => {
                    return Err(BlockchainError::InvalidHeight {
                        requested: height,
                        current,
                    })
                }
            }
        };
        self.get_block_by_hash(&hash)
    }

    pub fn contains_transaction(&self, hash: &Hash32) -> Result<bool> {
        self.store.transactions().contains(&HEXLOWER.encode(hash))
    }

    pub fn get_transaction(&self, hash: &Hash32) -> Result<Transaction> {
        self.store.transactions().get(&HEXLOWER.encode(hash))
    }

    pub fn get_utxo(&self, tx_hash: &Hash32, out_index: u32) -> Result<Utxo> {
        self.store
            .utxos()
            .get(&crate::core::transaction::outpoint_key(tx_hash, out_index))
    }

    /// Split `candidates` into the ones that validate in order against the
    /// current UTXO state and the ones that do not, with the reason.
    pub fn select_valid(
        &self,
        candidates: Vec<Transaction>,
    ) -> Result<(Vec<Transaction>, Vec<(Transaction, BlockchainError)>)> {
        let _state = self.read_state()?;
        let mut ledger = UtxoLedger::new(self.store.utxos());
        let mut seen = HashSet::new();
        let mut valid = vec![];
        let mut rejected = vec![];

        for tx in candidates {
            let hash_hex = tx.hash_hex();
            if !seen.insert(hash_hex.clone()) || self.store.transactions().contains(&hash_hex)? {
                rejected.push((tx, BlockchainError::DuplicateTransaction(hash_hex)));
                continue;
            }
            match ledger.stage(&tx) {
                Ok(_) => valid.push(tx),
                Err(e) if e.is_validation() => rejected.push((tx, e)),
                Err(e) => return Err(e),
            }
        }
        Ok((valid, rejected))
    }
}
