//! Error handling for the ledger node
//!
//! One error type covers every layer of the node. Validation failures are
//! recoverable and leave chain state untouched; configuration and crypto
//! failures are fatal at start-up; network failures are logged and the peer
//! interaction abandoned.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Storage backend errors
    Database(String),
    /// Malformed key material or signatures handed to the signature engine
    Crypto(String),
    /// Transport failures talking to a peer
    Network(String),
    /// Poisoned locks guarding shared node state
    Concurrency(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Missing block, transaction or UTXO
    NotFound(String),
    /// Block failed validation
    InvalidBlock(String),
    /// Transaction failed structural or signature validation
    InvalidTransaction(String),
    /// An input carries no signature
    MissingSignature { input: usize },
    /// An input references an outpoint that was never created
    UnknownInput(String),
    /// An input references an outpoint that is already spent
    AlreadySpent(String),
    /// Outputs exceed inputs
    InsufficientBalance { required: u64, available: u64 },
    /// A transaction with this hash is already committed
    DuplicateTransaction(String),
    /// Height lookup beyond the current head
    InvalidHeight { requested: i64, current: i64 },
}

impl BlockchainError {
    /// True for errors that reject a block or transaction without touching state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BlockchainError::InvalidBlock(_)
                | BlockchainError::InvalidTransaction(_)
                | BlockchainError::MissingSignature { .. }
                | BlockchainError::UnknownInput(_)
                | BlockchainError::AlreadySpent(_)
                | BlockchainError::InsufficientBalance { .. }
                | BlockchainError::DuplicateTransaction(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockchainError::NotFound(_))
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Concurrency(msg) => write!(f, "Concurrency error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::MissingSignature { input } => {
                write!(f, "Invalid transaction: input {input} has no signature")
            }
            BlockchainError::UnknownInput(outpoint) => write!(f, "Unknown input: {outpoint}"),
            BlockchainError::AlreadySpent(outpoint) => {
                write!(f, "Input already spent: {outpoint}")
            }
            BlockchainError::InsufficientBalance {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient balance: required {required}, available {available}"
                )
            }
            BlockchainError::DuplicateTransaction(hash) => {
                write!(f, "Transaction already committed: {hash}")
            }
            BlockchainError::InvalidHeight { requested, current } => write!(
                f,
                "given height [{requested}] is invalid, current height [{current}]"
            ),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
