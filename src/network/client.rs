use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{Ack, Request, Response, VersionMessage};
use log::trace;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// The calls one node makes on another.
pub trait PeerClient: Send + Sync {
    fn handshake(&self, version: &VersionMessage) -> Result<VersionMessage>;
    fn handle_transaction(&self, tx: &Transaction) -> Result<Ack>;
    fn handle_block(&self, block: &Block) -> Result<Ack>;
}

/// Opens clients for listen addresses.
pub trait Dialer: Send + Sync {
    fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>>;
}

pub struct TcpDialer {
    timeout: Duration,
}

impl TcpDialer {
    pub fn new(timeout: Duration) -> TcpDialer {
        TcpDialer { timeout }
    }
}

impl Dialer for TcpDialer {
    fn dial(&self, addr: &str) -> Result<Arc<dyn PeerClient>> {
        let socket_addr = resolve(addr)?;
        Ok(Arc::new(TcpPeerClient {
            addr: socket_addr,
            timeout: self.timeout,
        }))
    }
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| BlockchainError::Network(format!("Invalid address {addr}: {e}")))?
        .next()
        .ok_or_else(|| BlockchainError::Network(format!("Address {addr} did not resolve")))
}

/// Connects per call: one JSON line out, one JSON line back.
pub struct TcpPeerClient {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpPeerClient {
    fn call(&self, request: &Request) -> Result<Response> {
        let addr = self.addr;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| BlockchainError::Network(format!("Failed to connect to {addr}: {e}")))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;

        trace!("Sending request to {addr}");
        let mut writer = &stream;
        serde_json::to_writer(&mut writer, request)
            .map_err(|e| BlockchainError::Network(format!("Failed to send request: {e}")))?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| BlockchainError::Network(format!("Failed to send request: {e}")))?;

        let mut line = String::new();
        BufReader::new(&stream)
            .read_line(&mut line)
            .map_err(|e| BlockchainError::Network(format!("Failed to read response: {e}")))?;
        if line.trim().is_empty() {
            return Err(BlockchainError::Network(format!(
                "{addr} closed the connection without a response"
            )));
        }
        serde_json::from_str(line.trim_end())
            .map_err(|e| BlockchainError::Network(format!("Failed to decode response: {e}")))
    }

    fn expect_ack(&self, response: Response, rejected: fn(String) -> BlockchainError) -> Result<Ack> {
        match response {
            Response::Ack(ack) => Ok(ack),
            Response::Rejected(reason) => Err(rejected(reason)),
            Response::Error(reason) => Err(BlockchainError::Network(reason)),
            Response::Version(_) => Err(BlockchainError::Network(
                "unexpected version response".to_string(),
            )),
        }
    }
}

impl PeerClient for TcpPeerClient {
    fn handshake(&self, version: &VersionMessage) -> Result<VersionMessage> {
        match self.call(&Request::Handshake(version.clone()))? {
            Response::Version(remote) => Ok(remote),
            Response::Rejected(reason) | Response::Error(reason) => {
                Err(BlockchainError::Network(reason))
            }
            Response::Ack(_) => Err(BlockchainError::Network(
                "unexpected ack to handshake".to_string(),
            )),
        }
    }

    fn handle_transaction(&self, tx: &Transaction) -> Result<Ack> {
        let response = self.call(&Request::Transaction(tx.clone()))?;
        self.expect_ack(response, BlockchainError::InvalidTransaction)
    }

    fn handle_block(&self, block: &Block) -> Result<Ack> {
        let response = self.call(&Request::Block(block.clone()))?;
        self.expect_ack(response, BlockchainError::InvalidBlock)
    }
}
