//! Utility functions and helpers
//!
//! Digest and Ed25519 primitives on top of `ring`, timestamps, and the bincode
//! layer used by the persistent stores.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ed25519_key_pair_from_seed, ed25519_public_key, ed25519_sign,
    ed25519_verify, random_seed, sha256_digest,
};

pub use serialization::{deserialize, serialize};
