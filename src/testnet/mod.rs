//! Test helpers
//!
//! Random hashes and blocks, in-memory chains, and signed spends of existing
//! outputs for the unit tests.

pub mod test_utils;

pub use test_utils::*;
