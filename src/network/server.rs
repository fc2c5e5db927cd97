use crate::error::{BlockchainError, Result};
use crate::network::{Node, Request, Response};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Longest request line a peer may send.
pub const MAX_REQUEST_BYTES: u64 = 8 * 1024 * 1024;

/// TCP front end of a node: one thread per connection, one request each.
pub struct Server {
    listener: TcpListener,
    node: Arc<Node>,
    timeout: Duration,
}

impl Server {
    pub fn bind(addr: &str, node: Arc<Node>, timeout: Duration) -> Result<Server> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        Ok(Server::new(listener, node, timeout))
    }

    pub fn new(listener: TcpListener, node: Arc<Node>, timeout: Duration) -> Server {
        Server {
            listener,
            node,
            timeout,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| BlockchainError::Network(format!("Failed to read local address: {e}")))
    }

    /// Accept connections until the listener fails.
    pub fn serve(self) -> Result<()> {
        info!("Server listening on {}", self.local_addr()?);
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    let node = Arc::clone(&self.node);
                    let timeout = self.timeout;
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(&node, stream, peer_addr, timeout) {
                            error!("Error handling connection from {peer_addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
        Ok(())
    }

    /// Serve on a background thread.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            if let Err(e) = self.serve() {
                error!("Server stopped: {e}");
            }
        })
    }
}

fn handle_connection(
    node: &Arc<Node>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    timeout: Duration,
) -> Result<()> {
    stream
        .set_read_timeout(Some(timeout))
        .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;

    let response = match read_request(&stream, MAX_REQUEST_BYTES)? {
        Some(line) => match serde_json::from_str::<Request>(line.trim_end()) {
            Ok(request) => {
                debug!("Received request from {peer_addr}");
                dispatch(node, request, &peer_addr.to_string())
            }
            Err(e) => Response::Error(format!("malformed request: {e}")),
        },
        None => {
            warn!("Request from {peer_addr} exceeds {MAX_REQUEST_BYTES} bytes");
            Response::Error(format!("request exceeds {MAX_REQUEST_BYTES} bytes"))
        }
    };

    let mut writer = &stream;
    serde_json::to_writer(&mut writer, &response)
        .map_err(|e| BlockchainError::Network(format!("Failed to send response: {e}")))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| BlockchainError::Network(format!("Failed to send response: {e}")))?;

    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Read one request line of at most `limit` bytes. `None` when the line is
/// longer than that.
fn read_request<R: Read>(stream: R, limit: u64) -> Result<Option<String>> {
    let mut line = String::new();
    BufReader::new(stream.take(limit))
        .read_line(&mut line)
        .map_err(|e| BlockchainError::Network(format!("Failed to read request: {e}")))?;
    if !line.ends_with('\n') && line.len() as u64 >= limit {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Route one request to the node and turn the outcome into a response.
pub fn dispatch(node: &Arc<Node>, request: Request, sender: &str) -> Response {
    let result = match request {
        Request::Handshake(version) => node.handshake(version).map(Response::Version),
        Request::Transaction(tx) => node.handle_transaction(tx, sender).map(Response::Ack),
        Request::Block(block) => node.handle_block(block, sender).map(Response::Ack),
    };
    match result {
        Ok(response) => response,
        Err(e) if e.is_validation() => Response::Rejected(e.to_string()),
        Err(e) => Response::Error(e.to_string()),
    }
}
