// A node owns its chain, its mempool and its view of the network. Every
// remote call lands on one of the `handle_*` methods or on `handshake`,
// whichever transport carried it.

use crate::core::{Block, Chain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Ack, Dialer, GossipMessage, PeerClient, PeerDirectory, VersionMessage};
use crate::storage::MemoryPool;
use crate::wallet::PrivateKey;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_VERSION: &str = "gossip-ledger-1";
pub const DEFAULT_BLOCK_TIME: Duration = Duration::from_secs(5);

/// Runtime settings of one node.
#[derive(Debug)]
pub struct NodeOptions {
    pub version: String,
    pub listen_addr: String,
    pub validator_key: Option<PrivateKey>,
    pub block_time: Duration,
    pub produce_empty_blocks: bool,
}

impl NodeOptions {
    pub fn new(listen_addr: &str) -> NodeOptions {
        NodeOptions {
            version: DEFAULT_VERSION.to_string(),
            listen_addr: listen_addr.to_string(),
            validator_key: None,
            block_time: DEFAULT_BLOCK_TIME,
            produce_empty_blocks: false,
        }
    }
}

pub struct Node {
    options: NodeOptions,
    chain: Chain,
    mempool: MemoryPool,
    peers: PeerDirectory,
    dialer: Arc<dyn Dialer>,
    shutdown: AtomicBool,
}

impl Node {
    pub fn new(options: NodeOptions, chain: Chain, dialer: Arc<dyn Dialer>) -> Arc<Node> {
        Arc::new(Node {
            options,
            chain,
            mempool: MemoryPool::new(),
            peers: PeerDirectory::new(),
            dialer,
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn listen_addr(&self) -> &str {
        &self.options.listen_addr
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn mempool(&self) -> &MemoryPool {
        &self.mempool
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn validator_key(&self) -> Option<&PrivateKey> {
        self.options.validator_key.as_ref()
    }

    pub fn get_version(&self) -> Result<VersionMessage> {
        Ok(VersionMessage {
            version: self.options.version.clone(),
            height: self.chain.height()?,
            listen_addr: self.options.listen_addr.clone(),
            peer_list: self.peers.listen_addrs()?,
        })
    }

    /// Register the remote and answer with our version, which now lists it.
    pub fn handshake(self: &Arc<Self>, remote: VersionMessage) -> Result<VersionMessage> {
        if remote.listen_addr == self.options.listen_addr {
            return Err(BlockchainError::Network(format!(
                "refusing handshake from our own address {}",
                remote.listen_addr
            )));
        }
        let client = self.dialer.dial(&remote.listen_addr)?;
        let seeds = remote.peer_list.clone();
        self.add_peer(client, remote)?;

        if !seeds.is_empty() {
            let node = Arc::clone(self);
            thread::spawn(move || {
                node.bootstrap(&seeds);
            });
        }
        self.get_version()
    }

    fn add_peer(&self, client: Arc<dyn PeerClient>, version: VersionMessage) -> Result<()> {
        let addr = version.listen_addr.clone();
        let height = version.height;
        if self.peers.add(client, version)? {
            debug!(
                "new peer connected, we={} remote={addr} height={height}",
                self.options.listen_addr
            );
        }
        Ok(())
    }

    fn can_connect_with(&self, addr: &str) -> Result<bool> {
        Ok(addr != self.options.listen_addr && !self.peers.contains(addr)?)
    }

    fn dial_remote(&self, addr: &str) -> Result<(Arc<dyn PeerClient>, VersionMessage)> {
        let client = self.dialer.dial(addr)?;
        let version = client.handshake(&self.get_version()?)?;
        Ok((client, version))
    }

    /// Connect to every reachable address in `seeds` and, transitively, to the
    /// peers they announce. Returns the addresses that could not be reached.
    pub fn bootstrap(&self, seeds: &[String]) -> Vec<(String, BlockchainError)> {
        let mut visited = HashSet::from([self.options.listen_addr.clone()]);
        let mut failures = vec![];
        self.bootstrap_from(seeds, &mut visited, &mut failures);
        failures
    }

    fn bootstrap_from(
        &self,
        seeds: &[String],
        visited: &mut HashSet<String>,
        failures: &mut Vec<(String, BlockchainError)>,
    ) {
        for addr in seeds {
            if !visited.insert(addr.clone()) {
                continue;
            }
            match self.can_connect_with(addr) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    failures.push((addr.clone(), e));
                    continue;
                }
            }

            let (client, version) = match self.dial_remote(addr) {
                Ok(dialed) => dialed,
                Err(e) => {
                    warn!("Failed to bootstrap with {addr}: {e}");
                    failures.push((addr.clone(), e));
                    continue;
                }
            };
            if version.listen_addr == self.options.listen_addr {
                continue;
            }
            let next = version.peer_list.clone();
            if let Err(e) = self.add_peer(client, version) {
                failures.push((addr.clone(), e));
                continue;
            }
            self.bootstrap_from(&next, visited, failures);
        }
    }

    /// Admit a transaction into the mempool and gossip it on first sight.
    pub fn handle_transaction(self: &Arc<Self>, tx: Transaction, sender: &str) -> Result<Ack> {
        tx.verify_signatures()?;
        if self.chain.contains_transaction(&tx.hash())? {
            return Ok(Ack);
        }
        let hash = tx.hash_hex();
        if self.mempool.add_if_absent(tx.clone()) {
            debug!(
                "received tx from={sender} hash={hash} we={}",
                self.options.listen_addr
            );
            self.broadcast_in_background(GossipMessage::Transaction(tx));
        }
        Ok(Ack)
    }

    /// Commit a gossiped block and pass it on. Blocks we already hold are acked.
    pub fn handle_block(self: &Arc<Self>, block: Block, sender: &str) -> Result<Ack> {
        let hash = block.hash();
        if let Err(e) = self.chain.add_block(&block) {
            if self.chain.has_block(&hash)? {
                return Ok(Ack);
            }
            warn!("Rejected block {} from {sender}: {e}", block.hash_hex());
            return Err(e);
        }

        self.mempool.remove_included(block.get_transactions());
        info!(
            "Added block {} at height {} from {sender}",
            block.hash_hex(),
            block.get_height()
        );
        self.broadcast_in_background(GossipMessage::Block(block));
        Ok(Ack)
    }

    /// Deliver `message` to every peer. Peers that fail for reasons other than
    /// rejecting the payload are dropped from the directory.
    pub fn broadcast(&self, message: &GossipMessage) -> Vec<(String, BlockchainError)> {
        let clients = match self.peers.clients() {
            Ok(clients) => clients,
            Err(e) => return vec![(self.options.listen_addr.clone(), e)],
        };

        let mut failures = vec![];
        for (addr, client) in clients {
            let result = match message {
                GossipMessage::Transaction(tx) => client.handle_transaction(tx),
                GossipMessage::Block(block) => client.handle_block(block),
            };
            let Err(e) = result else { continue };

            if e.is_validation() {
                debug!("{addr} rejected {} {}: {e}", message.kind(), message.hash_hex());
            } else {
                warn!("Dropping peer {addr} after failed {} broadcast: {e}", message.kind());
                if let Err(remove_err) = self.peers.remove(&addr) {
                    error!("Failed to remove peer {addr}: {remove_err}");
                }
            }
            failures.push((addr, e));
        }
        failures
    }

    fn broadcast_in_background(self: &Arc<Self>, message: GossipMessage) {
        let node = Arc::clone(self);
        thread::spawn(move || {
            let failures = node.broadcast(&message);
            if !failures.is_empty() {
                debug!(
                    "{} broadcast of {} reached all but {} peers",
                    message.kind(),
                    message.hash_hex(),
                    failures.len()
                );
            }
        });
    }

    /// Bootstrap in the background and start the validator loop if this node
    /// has a key. Returns the validator thread, if any.
    pub fn start(self: &Arc<Self>, bootstrap_nodes: Vec<String>) -> Option<JoinHandle<()>> {
        info!("node running: {}", self.options.listen_addr);
        if !bootstrap_nodes.is_empty() {
            let node = Arc::clone(self);
            thread::spawn(move || {
                let failures = node.bootstrap(&bootstrap_nodes);
                for (addr, e) in failures {
                    error!("Bootstrap with {addr} failed: {e}");
                }
            });
        }

        self.validator_key()?;
        let node = Arc::clone(self);
        Some(thread::spawn(move || crate::network::validator::run(node)))
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genesis_private_key;
    use crate::network::LocalNetwork;
    use crate::testnet::{memory_chain, spend};

    fn local_node(network: &LocalNetwork, addr: &str) -> Arc<Node> {
        let node = Node::new(
            NodeOptions::new(addr),
            memory_chain(),
            Arc::new(network.clone()),
        );
        network.register(&node).unwrap();
        node
    }

    #[test]
    fn test_get_version() {
        let network = LocalNetwork::new();
        let node = local_node(&network, ":3000");
        let version = node.get_version().unwrap();
        assert_eq!(version.version, DEFAULT_VERSION);
        assert_eq!(version.height, 0);
        assert_eq!(version.listen_addr, ":3000");
        assert!(version.peer_list.is_empty());
    }

    #[test]
    fn test_handshake_rejects_own_address() {
        let network = LocalNetwork::new();
        let node = local_node(&network, ":3000");
        let own = node.get_version().unwrap();
        assert!(matches!(
            node.handshake(own),
            Err(BlockchainError::Network(_))
        ));
        assert!(node.peers().is_empty().unwrap());
    }

    #[test]
    fn test_bootstrap_reports_unreachable_seeds() {
        let network = LocalNetwork::new();
        let a = local_node(&network, ":3000");
        let b = local_node(&network, ":4000");

        let failures = a.bootstrap(&[
            ":9999".to_string(),
            ":4000".to_string(),
            ":3000".to_string(),
        ]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ":9999");
        assert_eq!(a.peers().listen_addrs().unwrap(), vec![":4000"]);
        assert_eq!(b.peers().listen_addrs().unwrap(), vec![":3000"]);
    }

    #[test]
    fn test_handle_transaction_rejects_bad_signature() {
        let network = LocalNetwork::new();
        let node = local_node(&network, ":3000");
        let genesis_key = genesis_private_key().unwrap();
        let credit = node.chain().get_block_by_height(0).unwrap().get_transactions()[0].clone();

        let mut tx = spend(&genesis_key, &credit, 0, &genesis_key, 10, 0);
        tx.get_inputs_mut()[0].set_signature(vec![9u8; 64]);
        assert!(node.handle_transaction(tx, "test").is_err());
        assert!(node.mempool().is_empty());
    }

    #[test]
    fn test_handle_transaction_is_idempotent() {
        let network = LocalNetwork::new();
        let node = local_node(&network, ":3000");
        let genesis_key = genesis_private_key().unwrap();
        let credit = node.chain().get_block_by_height(0).unwrap().get_transactions()[0].clone();

        let tx = spend(&genesis_key, &credit, 0, &genesis_key, 10, 0);
        assert_eq!(node.handle_transaction(tx.clone(), "test").unwrap(), Ack);
        assert_eq!(node.handle_transaction(tx.clone(), "test").unwrap(), Ack);
        assert_eq!(node.mempool().len(), 1);
        assert!(node.mempool().has(&tx));
    }

    #[test]
    fn test_broadcast_drops_unreachable_peer() {
        let network = LocalNetwork::new();
        let a = local_node(&network, ":3000");
        let b = local_node(&network, ":4000");
        assert!(a.bootstrap(&[":4000".to_string()]).is_empty());

        network.unregister(":4000").unwrap();
        drop(b);

        let failures = a.broadcast(&GossipMessage::Block(Block::default()));
        assert_eq!(failures.len(), 1);
        assert!(a.peers().is_empty().unwrap());
    }
}
