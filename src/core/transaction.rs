// Transactions move value in the UTXO model: each input consumes an earlier
// output (its outpoint) and each output creates a new spendable amount.

use crate::core::codec::encode_transaction;
use crate::core::Hash32;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use crate::wallet::{PrivateKey, PublicKey, Signature, ADDRESS_LEN, PUB_KEY_LEN, SIGNATURE_LEN};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    prev_tx_hash: Hash32,
    prev_out_index: u32,
    public_key: Vec<u8>,
    signature: Vec<u8>, // empty until signed
}

impl TxInput {
    pub fn new(prev_tx_hash: Hash32, prev_out_index: u32, public_key: Vec<u8>) -> TxInput {
        TxInput {
            prev_tx_hash,
            prev_out_index,
            public_key,
            signature: vec![],
        }
    }

    pub fn get_prev_tx_hash(&self) -> &Hash32 {
        &self.prev_tx_hash
    }

    pub fn get_prev_out_index(&self) -> u32 {
        self.prev_out_index
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = signature;
    }

    /// Store key of the UTXO this input spends.
    pub fn outpoint_key(&self) -> String {
        outpoint_key(&self.prev_tx_hash, self.prev_out_index)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    amount: u64,
    address: Vec<u8>,
}

impl TxOutput {
    pub fn new(amount: u64, address: Vec<u8>) -> TxOutput {
        TxOutput { amount, address }
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_address(&self) -> &[u8] {
        self.address.as_slice()
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    version: u32,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(version: u32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize::<Transaction>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_version(&self) -> u32 {
        self.version
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_inputs_mut(&mut self) -> &mut [TxInput] {
        self.inputs.as_mut_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    /// SHA-256 over the fully populated encoding, signatures included.
    pub fn hash(&self) -> Hash32 {
        sha256_digest(&encode_transaction(self, true))
    }

    pub fn hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash())
    }

    /// The message every input signs: the hash with all signatures cleared.
    pub fn signing_hash(&self) -> Hash32 {
        sha256_digest(&encode_transaction(self, false))
    }

    /// Sign the pre-signature form. The caller embeds the result in the input.
    pub fn sign_with(&self, key: &PrivateKey) -> Signature {
        key.sign(&self.signing_hash())
    }

    /// Sign every input whose public key belongs to `key`.
    pub fn sign(&mut self, key: &PrivateKey) -> usize {
        let public = key.public();
        let signature = self.sign_with(key);
        let mut signed = 0;
        for input in self.inputs.iter_mut() {
            if input.public_key == public.bytes() {
                input.signature = signature.bytes().to_vec();
                signed += 1;
            }
        }
        signed
    }

    /// Structural and signature checks that need no ledger state.
    pub fn verify_signatures(&self) -> Result<()> {
        for output in &self.outputs {
            if output.address.len() != ADDRESS_LEN {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "output address must be {ADDRESS_LEN} bytes, got {}",
                    output.address.len()
                )));
            }
        }

        let message = self.signing_hash();
        for (idx, input) in self.inputs.iter().enumerate() {
            if input.signature.is_empty() {
                return Err(BlockchainError::MissingSignature { input: idx });
            }
            if input.public_key.len() != PUB_KEY_LEN || input.signature.len() != SIGNATURE_LEN {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "input {idx} has malformed key or signature"
                )));
            }
            let public_key = PublicKey::from_bytes(&input.public_key)?;
            let signature = Signature::from_bytes(&input.signature)?;
            if !signature.verify(&public_key, &message) {
                return Err(BlockchainError::InvalidTransaction(
                    "invalid tx signature".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn verify(&self) -> bool {
        self.verify_signatures().is_ok()
    }
}

pub fn outpoint_key(tx_hash: &Hash32, index: u32) -> String {
    format!("{}_{index}", HEXLOWER.encode(tx_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::random_hash;

    // balance: 100 coins, send 5, keep 95 as change
    fn transfer(from: &PrivateKey, to: &PrivateKey) -> Transaction {
        let input = TxInput::new(random_hash(), 0, from.public().bytes().to_vec());
        let outputs = vec![
            TxOutput::new(5, to.public().address().bytes().to_vec()),
            TxOutput::new(95, from.public().address().bytes().to_vec()),
        ];
        Transaction::new(1, vec![input], outputs)
    }

    #[test]
    fn test_new_transaction_sign_and_verify() {
        let from = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        let mut tx = transfer(&from, &to);

        let sig = tx.sign_with(&from);
        tx.get_inputs_mut()[0].set_signature(sig.bytes().to_vec());
        assert!(tx.verify());
    }

    #[test]
    fn test_hash_covers_signatures_signing_hash_does_not() {
        let from = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        let mut tx = transfer(&from, &to);
        let unsigned_hash = tx.hash();
        let signing_hash = tx.signing_hash();
        assert_eq!(unsigned_hash, signing_hash);

        assert_eq!(tx.sign(&from), 1);
        assert_ne!(tx.hash(), unsigned_hash);
        assert_eq!(tx.signing_hash(), signing_hash);
        assert_eq!(tx.hash(), tx.hash());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let from = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        let tx = transfer(&from, &to);
        assert_eq!(
            tx.verify_signatures(),
            Err(BlockchainError::MissingSignature { input: 0 })
        );
    }

    #[test]
    fn test_tampered_output_fails_verification() {
        let from = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        let mut tx = transfer(&from, &to);
        tx.sign(&from);

        let mut tampered = Transaction::new(
            tx.get_version(),
            tx.get_inputs().to_vec(),
            vec![TxOutput::new(100, to.public().address().bytes().to_vec())],
        );
        assert!(!tampered.verify());

        tampered.sign(&to);
        assert!(!tampered.verify());
    }

    #[test]
    fn test_wrong_signer_fails_verification() {
        let from = PrivateKey::generate().unwrap();
        let to = PrivateKey::generate().unwrap();
        let mut tx = transfer(&from, &to);
        let sig = tx.sign_with(&to);
        tx.get_inputs_mut()[0].set_signature(sig.bytes().to_vec());
        assert!(!tx.verify());
    }

    #[test]
    fn test_multi_input_signatures() {
        let alice = PrivateKey::generate().unwrap();
        let bob = PrivateKey::generate().unwrap();
        let inputs = vec![
            TxInput::new(random_hash(), 0, alice.public().bytes().to_vec()),
            TxInput::new(random_hash(), 1, bob.public().bytes().to_vec()),
            TxInput::new(random_hash(), 2, alice.public().bytes().to_vec()),
        ];
        let outputs = vec![TxOutput::new(1, bob.public().address().bytes().to_vec())];
        let mut tx = Transaction::new(1, inputs, outputs);

        assert_eq!(tx.sign(&alice), 2);
        assert_eq!(
            tx.verify_signatures(),
            Err(BlockchainError::MissingSignature { input: 1 })
        );
        assert_eq!(tx.sign(&bob), 1);
        assert!(tx.verify());
    }

    #[test]
    fn test_malformed_lengths_are_validation_errors() {
        let from = PrivateKey::generate().unwrap();
        let mut input = TxInput::new(random_hash(), 0, vec![1u8; 31]);
        input.set_signature(vec![2u8; 64]);
        let tx = Transaction::new(
            1,
            vec![input],
            vec![TxOutput::new(1, from.public().address().bytes().to_vec())],
        );
        assert!(matches!(
            tx.verify_signatures(),
            Err(BlockchainError::InvalidTransaction(_))
        ));

        let bad_address = Transaction::new(1, vec![], vec![TxOutput::new(1, vec![0u8; 19])]);
        assert!(matches!(
            bad_address.verify_signatures(),
            Err(BlockchainError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_outpoint_key_format() {
        let key = outpoint_key(&[0xABu8; 32], 7);
        assert!(key.starts_with("abab"));
        assert!(key.ends_with("_7"));
        assert_eq!(key.len(), 64 + 2);
    }
}
