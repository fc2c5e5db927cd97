use crate::core::Transaction;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct PoolEntries {
    txs: HashMap<String, Transaction>,
    order: Vec<String>,
}

impl PoolEntries {
    fn insert(&mut self, hash: String, tx: Transaction) -> bool {
        if self.txs.contains_key(&hash) {
            return false;
        }
        self.order.push(hash.clone());
        self.txs.insert(hash, tx);
        true
    }
}

/// ( K -> tx hash hex, V => Transaction ), drained in insertion order.
///
/// Every operation takes the single mutex, so check-and-insert and
/// snapshot-and-clear are each one critical section.
#[derive(Default)]
pub struct MemoryPool {
    inner: Mutex<PoolEntries>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolEntries> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory pool lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn has(&self, tx: &Transaction) -> bool {
        self.contains(&tx.hash_hex())
    }

    pub fn contains(&self, hash_hex: &str) -> bool {
        self.lock().txs.contains_key(hash_hex)
    }

    pub fn get(&self, hash_hex: &str) -> Option<Transaction> {
        self.lock().txs.get(hash_hex).cloned()
    }

    /// Idempotent insert.
    pub fn add(&self, tx: Transaction) {
        self.add_if_absent(tx);
    }

    /// Returns true only for the caller that actually inserted `tx`.
    pub fn add_if_absent(&self, tx: Transaction) -> bool {
        let hash = tx.hash_hex();
        self.lock().insert(hash, tx)
    }

    pub fn len(&self) -> usize {
        self.lock().txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().txs.is_empty()
    }

    pub fn drain_all(&self) -> Vec<Transaction> {
        let mut pool = self.lock();
        let order = std::mem::take(&mut pool.order);
        let mut txs = std::mem::take(&mut pool.txs);
        order.into_iter().filter_map(|h| txs.remove(&h)).collect()
    }

    /// Drop transactions that were committed in a block.
    pub fn remove_included(&self, included: &[Transaction]) {
        let mut pool = self.lock();
        let mut removed = false;
        for tx in included {
            removed |= pool.txs.remove(&tx.hash_hex()).is_some();
        }
        if removed {
            let PoolEntries { txs, order } = &mut *pool;
            order.retain(|h| txs.contains_key(h));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TxOutput;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn tx(version: u32) -> Transaction {
        Transaction::new(version, vec![], vec![TxOutput::new(1, vec![0u8; 20])])
    }

    #[test]
    fn test_add_is_idempotent() {
        let pool = MemoryPool::new();
        let t = tx(1);
        assert!(pool.add_if_absent(t.clone()));
        assert!(!pool.add_if_absent(t.clone()));
        pool.add(t.clone());
        assert_eq!(pool.len(), 1);
        assert!(pool.has(&t));
        assert_eq!(pool.get(&t.hash_hex()), Some(t));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let pool = Arc::new(MemoryPool::new());
        pool.add(tx(1));
        let poisoner = Arc::clone(&pool);
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the pool");
        })
        .join();

        assert!(pool.inner.is_poisoned());
        assert!(pool.add_if_absent(tx(2)));
        assert_eq!(pool.drain_all(), vec![tx(1), tx(2)]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_drain_keeps_insertion_order() {
        let pool = MemoryPool::new();
        let txs: Vec<Transaction> = (0..10).map(tx).collect();
        for t in txs.iter().rev() {
            pool.add(t.clone());
        }
        let drained = pool.drain_all();
        assert_eq!(drained, txs.into_iter().rev().collect::<Vec<_>>());
        assert!(pool.is_empty());
        assert!(pool.drain_all().is_empty());
    }

    #[test]
    fn test_remove_included() {
        let pool = MemoryPool::new();
        for v in 0..4 {
            pool.add(tx(v));
        }
        pool.remove_included(&[tx(1), tx(3), tx(99)]);
        assert_eq!(pool.drain_all(), vec![tx(0), tx(2)]);
    }

    #[test]
    fn test_concurrent_add_if_absent_single_winner() {
        let pool = Arc::new(MemoryPool::new());
        let t = tx(7);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let t = t.clone();
                thread::spawn(move || pool.add_if_absent(t))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_concurrent_add_and_drain_lose_nothing() {
        let pool = Arc::new(MemoryPool::new());
        let writers: Vec<_> = (0..4u32)
            .map(|w| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..250 {
                        pool.add(tx(w * 1000 + i));
                    }
                })
            })
            .collect();

        let drainer = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut seen = vec![];
                for _ in 0..50 {
                    seen.extend(pool.drain_all());
                    thread::yield_now();
                }
                seen
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        let mut all = drainer.join().unwrap();
        all.extend(pool.drain_all());

        let unique: HashSet<String> = all.iter().map(|t| t.hash_hex()).collect();
        assert_eq!(all.len(), 1000);
        assert_eq!(unique.len(), 1000);
    }
}
