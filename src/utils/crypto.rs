use ring::digest::{Context, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};

use crate::error::{BlockchainError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    if duration > i64::MAX as u128 {
        return Err(BlockchainError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Fill a 32-byte Ed25519 seed from the system CSPRNG.
pub fn random_seed() -> Result<[u8; 32]> {
    let rng = SystemRandom::new();
    let mut seed = [0u8; 32];
    rng.fill(&mut seed)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate seed: {e}")))?;
    Ok(seed)
}

pub fn ed25519_key_pair_from_seed(seed: &[u8]) -> Result<Ed25519KeyPair> {
    Ed25519KeyPair::from_seed_unchecked(seed)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to create key pair from seed: {e}")))
}

pub fn ed25519_public_key(key_pair: &Ed25519KeyPair) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(key_pair.public_key().as_ref());
    out
}

pub fn ed25519_sign(key_pair: &Ed25519KeyPair, message: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(key_pair.sign(message).as_ref());
    out
}

pub fn ed25519_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let peer_public_key = UnparsedPublicKey::new(&ED25519, public_key);
    peer_public_key.verify(message, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256_digest(b"abc");
        assert_eq!(
            data_encoding::HEXLOWER.encode(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_random_seed_differs() {
        let a = random_seed().unwrap();
        let b = random_seed().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sign_verify_helpers() {
        let key_pair = ed25519_key_pair_from_seed(&[7u8; 32]).unwrap();
        let public_key = ed25519_public_key(&key_pair);
        let signature = ed25519_sign(&key_pair, b"message");
        assert!(ed25519_verify(&public_key, &signature, b"message"));
        assert!(!ed25519_verify(&public_key, &signature, b"messagf"));
    }
}
