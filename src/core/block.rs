use crate::core::codec::encode_header;
use crate::core::{Hash32, MerkleTree, Transaction};
use crate::error::Result;
use crate::utils::{deserialize, serialize, sha256_digest};
use crate::wallet::{PrivateKey, PublicKey, Signature, PUB_KEY_LEN, SIGNATURE_LEN};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Header {
    pub version: u32,
    pub height: i32,
    pub prev_hash: Hash32,
    pub root_hash: Hash32,
    pub timestamp: i64,
}

impl Header {
    pub fn hash(&self) -> Hash32 {
        hash_header(self)
    }
}

/// SHA-256 of the canonical header encoding.
pub fn hash_header(header: &Header) -> Hash32 {
    sha256_digest(&encode_header(header))
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    header: Header,
    transactions: Vec<Transaction>,
    public_key: Vec<u8>,
    signature: Vec<u8>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Block {
        Block {
            header,
            transactions,
            public_key: vec![],
            signature: vec![],
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn set_public_key(&mut self, public_key: Vec<u8>) {
        self.public_key = public_key;
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = signature;
    }

    pub fn get_height(&self) -> i32 {
        self.header.height
    }

    /// Block identity covers the header only; the root hash commits to the body.
    pub fn hash(&self) -> Hash32 {
        hash_header(&self.header)
    }

    pub fn hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash())
    }

    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        MerkleTree::new(&self.transactions)
    }

    /// Embed the Merkle root (when there are transactions), then sign the header hash.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<Signature> {
        if !self.transactions.is_empty() {
            self.header.root_hash = self.merkle_tree()?.get_root_hash();
        }
        let signature = key.sign(&self.hash());
        self.public_key = key.public().bytes().to_vec();
        self.signature = signature.bytes().to_vec();
        Ok(signature)
    }

    pub fn verify_signature(&self) -> bool {
        if self.public_key.len() != PUB_KEY_LEN || self.signature.len() != SIGNATURE_LEN {
            return false;
        }
        let (Ok(public_key), Ok(signature)) = (
            PublicKey::from_bytes(&self.public_key),
            Signature::from_bytes(&self.signature),
        ) else {
            return false;
        };
        signature.verify(&public_key, &self.hash())
    }

    /// Rebuild the whole tree, check it, and compare against the header.
    pub fn verify_root_hash(&self) -> bool {
        match self.merkle_tree() {
            Ok(tree) => tree.verify_tree() && tree.get_root_hash() == self.header.root_hash,
            Err(_) => false,
        }
    }

    pub fn verify(&self) -> bool {
        if !self.transactions.is_empty() && !self.verify_root_hash() {
            return false;
        }
        self.verify_signature()
    }
}
