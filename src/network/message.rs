use crate::core::{Block, Transaction};
use serde::{Deserialize, Serialize};

/// What a node announces about itself during a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMessage {
    pub version: String,
    pub height: i64,
    pub listen_addr: String,
    pub peer_list: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack;

/// One request per connection on the TCP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Handshake(VersionMessage),
    Transaction(Transaction),
    Block(Block),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Version(VersionMessage),
    Ack(Ack),
    /// The payload failed ledger validation.
    Rejected(String),
    Error(String),
}

/// Everything a node fans out to its peers.
#[derive(Debug, Clone)]
pub enum GossipMessage {
    Transaction(Transaction),
    Block(Block),
}

impl GossipMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            GossipMessage::Transaction(_) => "transaction",
            GossipMessage::Block(_) => "block",
        }
    }

    pub fn hash_hex(&self) -> String {
        match self {
            GossipMessage::Transaction(tx) => tx.hash_hex(),
            GossipMessage::Block(block) => block.hash_hex(),
        }
    }
}
