// Block production for nodes that hold a validator key. The loop wakes every
// block time, turns the mempool into a block and commits it through the same
// `add_block` path that gossiped blocks take.

use crate::core::{Block, Header, Transaction, BLOCK_VERSION};
use crate::error::{BlockchainError, Result};
use crate::network::{GossipMessage, Node};
use crate::utils::current_timestamp;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::thread;

pub fn run(node: Arc<Node>) {
    let Some(key) = node.validator_key() else {
        return;
    };
    info!(
        "starting validator loop, pubkey={} blocktime={:?}",
        key.public(),
        node.options().block_time
    );

    loop {
        thread::sleep(node.options().block_time);
        if node.is_stopped() {
            info!("validator loop stopped");
            return;
        }
        if let Err(e) = produce_block(&node) {
            error!("Failed to produce block: {e}");
        }
    }
}

/// One round of block production. `Ok(None)` when there was nothing to commit.
pub fn produce_block(node: &Arc<Node>) -> Result<Option<Block>> {
    let key = node.validator_key().ok_or_else(|| {
        BlockchainError::Config("node has no validator key".to_string())
    })?;
    let produce_empty = node.options().produce_empty_blocks;

    let drained = node.mempool().drain_all();
    debug!("time to create a new block, lenTx={}", drained.len());
    if drained.is_empty() && !produce_empty {
        return Ok(None);
    }

    let (valid, rejected) = match node.chain().select_valid(drained.clone()) {
        Ok(selected) => selected,
        Err(e) => {
            restore(node, drained);
            return Err(e);
        }
    };
    for (tx, e) in &rejected {
        warn!("Dropping transaction {}: {e}", tx.hash_hex());
    }
    if valid.is_empty() && !produce_empty {
        return Ok(None);
    }

    let block = match assemble(node, valid.clone()).and_then(|mut block| {
        block.sign(key)?;
        Ok(block)
    }) {
        Ok(block) => block,
        Err(e) => {
            restore(node, valid);
            return Err(e);
        }
    };

    if let Err(e) = node.chain().add_block(&block) {
        restore(node, valid);
        return Err(e);
    }
    info!(
        "Produced block {} at height {} with {} transactions",
        block.hash_hex(),
        block.get_height(),
        block.get_transactions().len()
    );

    let failures = node.broadcast(&GossipMessage::Block(block.clone()));
    if !failures.is_empty() {
        debug!("block {} not delivered to {} peers", block.hash_hex(), failures.len());
    }
    Ok(Some(block))
}

fn assemble(node: &Node, txs: Vec<Transaction>) -> Result<Block> {
    let chain = node.chain();
    let height = i32::try_from(chain.height()? + 1)
        .map_err(|_| BlockchainError::InvalidBlock("block height overflow".to_string()))?;
    let header = Header {
        version: BLOCK_VERSION,
        height,
        prev_hash: chain.head_hash()?,
        root_hash: [0u8; 32],
        timestamp: current_timestamp()?,
    };
    Ok(Block::new(header, txs))
}

fn restore(node: &Node, txs: Vec<Transaction>) {
    for tx in txs {
        node.mempool().add(tx);
    }
}
