//! Peer-to-peer gossip
//!
//! Handshake-based peer discovery, transaction and block fan-out, and the
//! validator loop. The node only talks to peers through the `PeerClient` and
//! `Dialer` traits; `client`/`server` carry them over TCP and `local` keeps
//! them in-process.

pub mod client;
pub mod local;
pub mod message;
pub mod node;
pub mod peer_directory;
pub mod server;
pub mod validator;

pub use client::{Dialer, PeerClient, TcpDialer, TcpPeerClient};
pub use local::LocalNetwork;
pub use message::{Ack, GossipMessage, Request, Response, VersionMessage};
pub use node::{Node, NodeOptions, DEFAULT_BLOCK_TIME, DEFAULT_VERSION};
pub use peer_directory::PeerDirectory;
pub use server::{dispatch, Server};
pub use validator::produce_block;
