use crate::error::{BlockchainError, Result};
use crate::utils::{
    ed25519_key_pair_from_seed, ed25519_public_key, ed25519_sign, ed25519_verify, random_seed,
};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use ring::signature::Ed25519KeyPair;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const PRIV_KEY_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = 64;
pub const PUB_KEY_LEN: usize = 32;
pub const SEED_LEN: usize = 32;
pub const ADDRESS_LEN: usize = 20;

/// Ed25519 secret key: 32-byte seed followed by the 32-byte public key.
#[derive(ZeroizeOnDrop)]
pub struct PrivateKey {
    seed: [u8; SEED_LEN],
    public: [u8; PUB_KEY_LEN],
    #[zeroize(skip)]
    key_pair: Ed25519KeyPair,
}

impl PrivateKey {
    pub fn generate() -> Result<PrivateKey> {
        let mut seed = random_seed()?;
        let key = Self::from_seed(&seed);
        seed.zeroize();
        key
    }

    pub fn from_seed(seed: &[u8]) -> Result<PrivateKey> {
        if seed.len() != SEED_LEN {
            return Err(BlockchainError::Crypto(format!(
                "invalid seed length {}, must be {SEED_LEN}",
                seed.len()
            )));
        }
        let key_pair = ed25519_key_pair_from_seed(seed)?;
        let mut owned = [0u8; SEED_LEN];
        owned.copy_from_slice(seed);
        Ok(PrivateKey {
            seed: owned,
            public: ed25519_public_key(&key_pair),
            key_pair,
        })
    }

    pub fn from_seed_hex(seed: &str) -> Result<PrivateKey> {
        let mut bytes = HEXLOWER_PERMISSIVE
            .decode(seed.trim().as_bytes())
            .map_err(|e| BlockchainError::Crypto(format!("invalid seed hex: {e}")))?;
        let key = Self::from_seed(&bytes);
        bytes.zeroize();
        key
    }

    /// The full 64-byte secret (seed || public key).
    pub fn bytes(&self) -> [u8; PRIV_KEY_LEN] {
        let mut out = [0u8; PRIV_KEY_LEN];
        out[..SEED_LEN].copy_from_slice(&self.seed);
        out[SEED_LEN..].copy_from_slice(&self.public);
        out
    }

    pub fn seed_hex(&self) -> String {
        HEXLOWER.encode(&self.seed)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            value: ed25519_sign(&self.key_pair, message),
        }
    }

    pub fn public(&self) -> PublicKey {
        PublicKey { key: self.public }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key: [u8; PUB_KEY_LEN],
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<PublicKey> {
        if bytes.len() != PUB_KEY_LEN {
            return Err(BlockchainError::Crypto(format!(
                "invalid length of bytes for public key: {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; PUB_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(PublicKey { key })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.key
    }

    /// Raw truncation to the trailing 20 bytes, no hashing.
    pub fn address(&self) -> Address {
        let mut value = [0u8; ADDRESS_LEN];
        value.copy_from_slice(&self.key[PUB_KEY_LEN - ADDRESS_LEN..]);
        Address { value }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.key))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    value: [u8; SIGNATURE_LEN],
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Signature> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(BlockchainError::Crypto(format!(
                "invalid length of bytes for signature: {}",
                bytes.len()
            )));
        }
        let mut value = [0u8; SIGNATURE_LEN];
        value.copy_from_slice(bytes);
        Ok(Signature { value })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.value
    }

    pub fn verify(&self, public_key: &PublicKey, message: &[u8]) -> bool {
        ed25519_verify(public_key.bytes(), &self.value, message)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", HEXLOWER.encode(&self.value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    value: [u8; ADDRESS_LEN],
}

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Result<Address> {
        if bytes.len() != ADDRESS_LEN {
            return Err(BlockchainError::Crypto(format!(
                "invalid length of bytes for address: {}",
                bytes.len()
            )));
        }
        let mut value = [0u8; ADDRESS_LEN];
        value.copy_from_slice(bytes);
        Ok(Address { value })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.value))
    }
}

pub fn derive_address(public_key: &PublicKey) -> Address {
    public_key.address()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "13be19fc5de106d87f9deaec7de204bd5b3a36bb50d66f81fdd5d1482dbeab6e";

    #[test]
    fn test_generate_private_key() {
        let key = PrivateKey::generate().unwrap();
        assert_eq!(key.bytes().len(), PRIV_KEY_LEN);
        assert_eq!(key.public().bytes().len(), PUB_KEY_LEN);
        assert_eq!(&key.bytes()[SEED_LEN..], key.public().bytes());
    }

    #[test]
    fn test_private_key_from_seed_is_deterministic() {
        let a = PrivateKey::from_seed_hex(SEED).unwrap();
        let b = PrivateKey::from_seed_hex(SEED).unwrap();
        assert_eq!(a.bytes(), b.bytes());
        assert_eq!(a.seed_hex(), SEED);
    }

    #[test]
    fn test_seed_length_enforced() {
        assert!(matches!(
            PrivateKey::from_seed(&[1u8; 31]),
            Err(BlockchainError::Crypto(_))
        ));
        assert!(PrivateKey::from_seed_hex("zz").is_err());
    }

    #[test]
    fn test_sign_verify_success() {
        let key = PrivateKey::generate().unwrap();
        let public = key.public();
        let msg = b"foo bar baz";
        let sig = key.sign(msg);
        assert_eq!(sig.bytes().len(), SIGNATURE_LEN);
        assert!(sig.verify(&public, msg));
    }

    #[test]
    fn test_sign_verify_fail() {
        let key = PrivateKey::generate().unwrap();
        let msg = b"foo bar baz";
        let sig = key.sign(msg);

        let other = PrivateKey::generate().unwrap();
        assert!(!sig.verify(&other.public(), msg));
        assert!(!sig.verify(&key.public(), b"foo bar bay"));
    }

    #[test]
    fn test_address_is_tail_of_public_key() {
        let key = PrivateKey::generate().unwrap();
        let public = key.public();
        let address = derive_address(&public);
        assert_eq!(address.bytes().len(), ADDRESS_LEN);
        assert_eq!(address.bytes(), &public.bytes()[PUB_KEY_LEN - ADDRESS_LEN..]);
        assert_eq!(address, public.address());
        assert_eq!(address.to_string().len(), ADDRESS_LEN * 2);
    }

    #[test]
    fn test_length_checked_constructors() {
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
        assert!(Signature::from_bytes(&[0u8; 65]).is_err());
        assert!(Address::from_bytes(&[0u8; 21]).is_err());
        assert!(Address::from_bytes(&[0u8; ADDRESS_LEN]).is_ok());
    }

    #[test]
    fn test_private_key_zeroizes_on_drop() {
        fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<PrivateKey>();
    }
}
