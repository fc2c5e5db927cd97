use crate::core::transaction::outpoint_key;
use crate::core::{Hash32, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UtxoStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A transaction output as tracked by the ledger. Spent records are kept.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Utxo {
    tx_hash: Hash32,
    out_index: u32,
    amount: u64,
    address: Vec<u8>,
    spent: bool,
}

impl Utxo {
    pub fn new(tx_hash: Hash32, out_index: u32, amount: u64, address: Vec<u8>) -> Utxo {
        Utxo {
            tx_hash,
            out_index,
            amount,
            address,
            spent: false,
        }
    }

    pub fn key(&self) -> String {
        outpoint_key(&self.tx_hash, self.out_index)
    }

    pub fn get_tx_hash(&self) -> &Hash32 {
        &self.tx_hash
    }

    pub fn get_out_index(&self) -> u32 {
        self.out_index
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_address(&self) -> &[u8] {
        self.address.as_slice()
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    pub fn mark_spent(&mut self) {
        self.spent = true;
    }
}

/// Staged view over a `UtxoStore`.
///
/// Reads see staged entries before the store; writes only touch the overlay
/// until the caller writes `staged()` out in one batch.
pub struct UtxoLedger<'a> {
    store: &'a dyn UtxoStore,
    staged: HashMap<String, Utxo>,
    order: Vec<String>,
}

impl<'a> UtxoLedger<'a> {
    pub fn new(store: &'a dyn UtxoStore) -> UtxoLedger<'a> {
        UtxoLedger {
            store,
            staged: HashMap::new(),
            order: vec![],
        }
    }

    pub fn get(&self, key: &str) -> Result<Utxo> {
        if let Some(utxo) = self.staged.get(key) {
            return Ok(utxo.clone());
        }
        self.store.get(key)
    }

    fn stage_entry(&mut self, utxo: Utxo) {
        let key = utxo.key();
        if self.staged.insert(key.clone(), utxo).is_none() {
            self.order.push(key);
        }
    }

    /// Check signatures, outpoints and balance. Returns the surplus of inputs
    /// over outputs, which the caller burns.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<u64> {
        tx.verify_signatures()?;

        let mut seen = HashSet::new();
        let mut available: u64 = 0;
        for input in tx.get_inputs() {
            let key = input.outpoint_key();
            if !seen.insert(key.clone()) {
                return Err(BlockchainError::AlreadySpent(key));
            }
            let utxo = match self.get(&key) {
                Ok(utxo) => utxo,
                Err(BlockchainError::NotFound(_)) => {
                    return Err(BlockchainError::UnknownInput(key))
                }
                Err(e) => return Err(e),
            };
            if utxo.is_spent() {
                return Err(BlockchainError::AlreadySpent(key));
            }
            available = available.checked_add(utxo.get_amount()).ok_or_else(|| {
                BlockchainError::InvalidTransaction("input amounts overflow".to_string())
            })?;
        }

        let mut required: u64 = 0;
        for output in tx.get_outputs() {
            required = required.checked_add(output.get_amount()).ok_or_else(|| {
                BlockchainError::InvalidTransaction("output amounts overflow".to_string())
            })?;
        }

        if available < required {
            return Err(BlockchainError::InsufficientBalance {
                required,
                available,
            });
        }
        Ok(available - required)
    }

    /// Create the transaction's outputs and mark its inputs spent, in the overlay.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<()> {
        let tx_hash = tx.hash();
        for (idx, output) in tx.get_outputs().iter().enumerate() {
            let out_index = u32::try_from(idx).map_err(|_| {
                BlockchainError::InvalidTransaction("too many outputs".to_string())
            })?;
            self.stage_entry(Utxo::new(
                tx_hash,
                out_index,
                output.get_amount(),
                output.get_address().to_vec(),
            ));
        }
        for input in tx.get_inputs() {
            let mut utxo = self.get(&input.outpoint_key())?;
            utxo.mark_spent();
            self.stage_entry(utxo);
        }
        Ok(())
    }

    /// Validate then apply; later transactions see this one's effects.
    pub fn stage(&mut self, tx: &Transaction) -> Result<u64> {
        let fee = self.validate_transaction(tx)?;
        self.apply_transaction(tx)?;
        Ok(fee)
    }

    pub fn staged(&self) -> Vec<Utxo> {
        self.order
            .iter()
            .filter_map(|key| self.staged.get(key).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TxInput, TxOutput};
    use crate::storage::MemoryUtxoStore;
    use crate::wallet::PrivateKey;

    fn funded(store: &MemoryUtxoStore, key: &PrivateKey, amount: u64) -> Utxo {
        let utxo = Utxo::new(
            crate::testnet::random_hash(),
            0,
            amount,
            key.public().address().bytes().to_vec(),
        );
        store.put(&utxo).unwrap();
        utxo
    }

    fn spend(key: &PrivateKey, utxos: &[&Utxo], outputs: &[u64]) -> Transaction {
        let inputs = utxos
            .iter()
            .map(|u| TxInput::new(*u.get_tx_hash(), u.get_out_index(), key.public().bytes().to_vec()))
            .collect();
        let recipient = PrivateKey::generate().unwrap();
        let outputs = outputs
            .iter()
            .map(|a| TxOutput::new(*a, recipient.public().address().bytes().to_vec()))
            .collect();
        let mut tx = Transaction::new(1, inputs, outputs);
        tx.sign(key);
        tx
    }

    #[test]
    fn test_spend_marks_output_spent() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let utxo = funded(&store, &key, 100);
        let tx = spend(&key, &[&utxo], &[60, 40]);

        let mut ledger = UtxoLedger::new(&store);
        assert_eq!(ledger.stage(&tx).unwrap(), 0);
        assert!(!store.get(&utxo.key()).unwrap().is_spent());
        store.put_batch(&ledger.staged()).unwrap();

        assert!(store.get(&utxo.key()).unwrap().is_spent());
        let created = store.get(&outpoint_key(&tx.hash(), 1)).unwrap();
        assert_eq!(created.get_amount(), 40);
        assert!(!created.is_spent());
    }

    #[test]
    fn test_respend_fails() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let utxo = funded(&store, &key, 100);

        let mut ledger = UtxoLedger::new(&store);
        ledger.stage(&spend(&key, &[&utxo], &[100])).unwrap();
        store.put_batch(&ledger.staged()).unwrap();

        let ledger = UtxoLedger::new(&store);
        let again = spend(&key, &[&utxo], &[10]);
        assert_eq!(
            ledger.validate_transaction(&again),
            Err(BlockchainError::AlreadySpent(utxo.key()))
        );
    }

    #[test]
    fn test_double_spend_within_overlay() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let utxo = funded(&store, &key, 100);

        let mut ledger = UtxoLedger::new(&store);
        ledger.stage(&spend(&key, &[&utxo], &[50])).unwrap();
        assert!(matches!(
            ledger.stage(&spend(&key, &[&utxo], &[20])),
            Err(BlockchainError::AlreadySpent(_))
        ));
        assert!(matches!(
            UtxoLedger::new(&store).validate_transaction(&spend(&key, &[&utxo, &utxo], &[1])),
            Err(BlockchainError::AlreadySpent(_))
        ));
    }

    #[test]
    fn test_overspend_fails() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let utxo = funded(&store, &key, 100);
        let ledger = UtxoLedger::new(&store);
        assert_eq!(
            ledger.validate_transaction(&spend(&key, &[&utxo], &[80, 21])),
            Err(BlockchainError::InsufficientBalance {
                required: 101,
                available: 100
            })
        );
    }

    #[test]
    fn test_unknown_input_fails() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let ghost = Utxo::new([7u8; 32], 3, 10, key.public().address().bytes().to_vec());
        let ledger = UtxoLedger::new(&store);
        assert_eq!(
            ledger.validate_transaction(&spend(&key, &[&ghost], &[1])),
            Err(BlockchainError::UnknownInput(ghost.key()))
        );
    }

    #[test]
    fn test_surplus_is_reported() {
        let store = MemoryUtxoStore::new();
        let key = PrivateKey::generate().unwrap();
        let a = funded(&store, &key, 30);
        let b = funded(&store, &key, 20);
        let ledger = UtxoLedger::new(&store);
        assert_eq!(ledger.validate_transaction(&spend(&key, &[&a, &b], &[45])), Ok(5));
    }

    #[test]
    fn test_chained_spend_in_one_overlay() {
        let store = MemoryUtxoStore::new();
        let alice = PrivateKey::generate().unwrap();
        let utxo = funded(&store, &alice, 100);

        let bob = PrivateKey::generate().unwrap();
        let mut first = Transaction::new(
            1,
            vec![TxInput::new(*utxo.get_tx_hash(), 0, alice.public().bytes().to_vec())],
            vec![TxOutput::new(100, bob.public().address().bytes().to_vec())],
        );
        first.sign(&alice);

        let mut second = Transaction::new(
            1,
            vec![TxInput::new(first.hash(), 0, bob.public().bytes().to_vec())],
            vec![TxOutput::new(90, alice.public().address().bytes().to_vec())],
        );
        second.sign(&bob);

        let mut ledger = UtxoLedger::new(&store);
        ledger.stage(&first).unwrap();
        assert_eq!(ledger.stage(&second).unwrap(), 10);
        assert_eq!(ledger.staged().len(), 3);
    }
}
