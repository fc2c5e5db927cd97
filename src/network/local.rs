use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Ack, Dialer, Node, PeerClient, VersionMessage};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

/// In-process transport: listen address -> node, for simulations and tests.
///
/// Nodes are held weakly so a network never keeps a node alive.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    nodes: Arc<RwLock<HashMap<String, Weak<Node>>>>,
}

impl LocalNetwork {
    pub fn new() -> LocalNetwork {
        LocalNetwork::default()
    }

    pub fn register(&self, node: &Arc<Node>) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(|_| {
            BlockchainError::Concurrency("Failed to acquire local network lock".to_string())
        })?;
        nodes.insert(node.listen_addr().to_string(), Arc::downgrade(node));
        Ok(())
    }

    /// Make `addr` unreachable, as if its process went away.
    pub fn unregister(&self, addr: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(|_| {
            BlockchainError::Concurrency("Failed to acquire local network lock".to_string())
        })?;
        nodes.remove(addr);
        Ok(())
    }

    fn lookup(&self, addr: &str) -> Result<Arc<Node>> {
        let nodes = self.nodes.read().map_err(|_| {
            BlockchainError::Concurrency("Failed to acquire local network lock".to_string())
        })?;
        nodes
            .get(addr)
            .and_then(Weak::upgrade)
            .ok_or_else(|| BlockchainError::Network(format!("no node listening on {addr}")))
    }
}

impl Dialer for LocalNetwork {
    fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>> {
        self.lookup(addr)?;
        Ok(Arc::new(LocalPeerClient {
            network: self.clone(),
            addr: addr.to_string(),
        }))
    }
}

struct LocalPeerClient {
    network: LocalNetwork,
    addr: String,
}

const LOCAL_SENDER: &str = "local";

impl PeerClient for LocalPeerClient {
    fn handshake(&self, version: &VersionMessage) -> Result<VersionMessage> {
        self.network.lookup(&self.addr)?.handshake(version.clone())
    }

    fn handle_transaction(&self, tx: &Transaction) -> Result<Ack> {
        self.network
            .lookup(&self.addr)?
            .handle_transaction(tx.clone(), LOCAL_SENDER)
    }

    fn handle_block(&self, block: &Block) -> Result<Ack> {
        self.network
            .lookup(&self.addr)?
            .handle_block(block.clone(), LOCAL_SENDER)
    }
}
