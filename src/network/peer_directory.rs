use crate::error::{BlockchainError, Result};
use crate::network::{PeerClient, VersionMessage};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Peer {
    client: Arc<dyn PeerClient>,
    version: VersionMessage,
}

/// ( K -> announced listen address, V => client + last VersionMessage )
#[derive(Default)]
pub struct PeerDirectory {
    inner: RwLock<HashMap<String, Peer>>,
}

impl PeerDirectory {
    pub fn new() -> PeerDirectory {
        PeerDirectory::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Peer>>> {
        self.inner.read().map_err(|_| {
            BlockchainError::Concurrency("Failed to acquire read lock on peers".to_string())
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Peer>>> {
        self.inner.write().map_err(|_| {
            BlockchainError::Concurrency("Failed to acquire write lock on peers".to_string())
        })
    }

    /// Insert or refresh. Returns true when the address was not known before.
    pub fn add(&self, client: Arc<dyn PeerClient>, version: VersionMessage) -> Result<bool> {
        let mut peers = self.write()?;
        let addr = version.listen_addr.clone();
        Ok(peers.insert(addr, Peer { client, version }).is_none())
    }

    pub fn remove(&self, addr: &str) -> Result<bool> {
        Ok(self.write()?.remove(addr).is_some())
    }

    pub fn contains(&self, addr: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(addr))
    }

    /// Sorted snapshot of known listen addresses.
    pub fn listen_addrs(&self) -> Result<Vec<String>> {
        let mut addrs: Vec<String> = self.read()?.keys().cloned().collect();
        addrs.sort();
        Ok(addrs)
    }

    /// Snapshot of clients, so no lock is held while calling them.
    pub fn clients(&self) -> Result<Vec<(String, Arc<dyn PeerClient>)>> {
        Ok(self
            .read()?
            .iter()
            .map(|(addr, peer)| (addr.clone(), Arc::clone(&peer.client)))
            .collect())
    }

    pub fn version_of(&self, addr: &str) -> Result<Option<VersionMessage>> {
        Ok(self.read()?.get(addr).map(|peer| peer.version.clone()))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Block, Transaction};
    use crate::network::Ack;

    struct NullClient;

    impl PeerClient for NullClient {
        fn handshake(&self, version: &VersionMessage) -> Result<VersionMessage> {
            Ok(version.clone())
        }
        fn handle_transaction(&self, _tx: &Transaction) -> Result<Ack> {
            Ok(Ack)
        }
        fn handle_block(&self, _block: &Block) -> Result<Ack> {
            Ok(Ack)
        }
    }

    fn version(addr: &str, height: i64) -> VersionMessage {
        VersionMessage {
            version: "gossip-ledger-1".to_string(),
            height,
            listen_addr: addr.to_string(),
            peer_list: vec![],
        }
    }

    #[test]
    fn test_add_refresh_remove() {
        let peers = PeerDirectory::new();
        assert!(peers.add(Arc::new(NullClient), version(":4000", 0)).unwrap());
        assert!(!peers.add(Arc::new(NullClient), version(":4000", 7)).unwrap());
        assert!(peers.add(Arc::new(NullClient), version(":3000", 0)).unwrap());

        assert_eq!(peers.len().unwrap(), 2);
        assert_eq!(peers.listen_addrs().unwrap(), vec![":3000", ":4000"]);
        assert_eq!(peers.version_of(":4000").unwrap().unwrap().height, 7);

        assert!(peers.remove(":4000").unwrap());
        assert!(!peers.remove(":4000").unwrap());
        assert!(!peers.contains(":4000").unwrap());
        assert_eq!(peers.clients().unwrap().len(), 1);
    }
}
