//! Key management
//!
//! Ed25519 private/public keys, signatures and the 20-byte addresses derived
//! from public keys.

pub mod keys;

pub use keys::{
    derive_address, Address, PrivateKey, PublicKey, Signature, ADDRESS_LEN, PRIV_KEY_LEN,
    PUB_KEY_LEN, SEED_LEN, SIGNATURE_LEN,
};
