//! Test utilities for ledger and gossip testing

use crate::core::{Block, Chain, Hash32, Header, Transaction, TxInput, TxOutput, TX_VERSION};
use crate::storage::MemoryChainStore;
use crate::utils::current_timestamp;
use crate::wallet::PrivateKey;
use rand::Rng;

pub fn random_hash() -> Hash32 {
    rand::thread_rng().gen()
}

/// Unsigned block with random linkage and no transactions.
pub fn random_block() -> Block {
    let mut rng = rand::thread_rng();
    let header = Header {
        version: 1,
        height: rng.gen_range(0..1000),
        prev_hash: random_hash(),
        root_hash: random_hash(),
        timestamp: current_timestamp().unwrap(),
    };
    Block::new(header, vec![])
}

/// Fresh chain over in-memory stores.
pub fn memory_chain() -> Chain {
    Chain::new(Box::new(MemoryChainStore::new())).unwrap()
}

/// Signed block on top of the chain's current head.
pub fn build_block(chain: &Chain, key: &PrivateKey, txs: Vec<Transaction>) -> Block {
    let header = Header {
        version: 1,
        height: chain.height().unwrap() as i32 + 1,
        prev_hash: chain.head_hash().unwrap(),
        root_hash: [0u8; 32],
        timestamp: current_timestamp().unwrap(),
    };
    let mut block = Block::new(header, txs);
    block.sign(key).unwrap();
    block
}

/// Spend output `out_index` of `prev` (owned by `owner`): `amount` to
/// `recipient`, plus `change` back to `owner` when non-zero.
pub fn spend(
    owner: &PrivateKey,
    prev: &Transaction,
    out_index: u32,
    recipient: &PrivateKey,
    amount: u64,
    change: u64,
) -> Transaction {
    let mut outputs = vec![TxOutput::new(
        amount,
        recipient.public().address().bytes().to_vec(),
    )];
    if change > 0 {
        outputs.push(TxOutput::new(
            change,
            owner.public().address().bytes().to_vec(),
        ));
    }
    let mut tx = Transaction::new(
        TX_VERSION,
        vec![TxInput::new(
            prev.hash(),
            out_index,
            owner.public().bytes().to_vec(),
        )],
        outputs,
    );
    tx.sign(owner);
    tx
}
