//! Canonical byte encoding used as hash input.
//!
//! Integers are little-endian and fixed width. Sequences carry a `u64`
//! element count and byte strings a `u64` length prefix. Fields are written in
//! declaration order. Changing any of this changes every hash on the network.

use crate::core::{Header, Transaction};

fn write_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_i32_le(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u64_le(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_i64_le(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    write_u64_le(out, len as u64);
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) {
    write_len(out, b.len());
    out.extend_from_slice(b);
}

/// Canonical encoding of a header.
pub fn encode_header(header: &Header) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 4 + 40 + 40 + 8);
    write_u32_le(&mut out, header.version);
    write_i32_le(&mut out, header.height);
    write_bytes(&mut out, &header.prev_hash);
    write_bytes(&mut out, &header.root_hash);
    write_i64_le(&mut out, header.timestamp);
    out
}

/// Canonical encoding of a transaction.
///
/// With `include_signatures == false` every input's signature is written as an
/// empty byte string, which is the form each input signs.
pub fn encode_transaction(tx: &Transaction, include_signatures: bool) -> Vec<u8> {
    let mut out = Vec::new();
    write_u32_le(&mut out, tx.get_version());

    write_len(&mut out, tx.get_inputs().len());
    for input in tx.get_inputs() {
        write_bytes(&mut out, input.get_prev_tx_hash());
        write_u32_le(&mut out, input.get_prev_out_index());
        write_bytes(&mut out, input.get_public_key());
        if include_signatures {
            write_bytes(&mut out, input.get_signature());
        } else {
            write_bytes(&mut out, &[]);
        }
    }

    write_len(&mut out, tx.get_outputs().len());
    for output in tx.get_outputs() {
        write_u64_le(&mut out, output.get_amount());
        write_bytes(&mut out, output.get_address());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TxInput, TxOutput};

    #[test]
    fn test_header_layout() {
        let header = Header {
            version: 1,
            height: 2,
            prev_hash: [0xAA; 32],
            root_hash: [0xBB; 32],
            timestamp: -1,
        };
        let bytes = encode_header(&header);
        assert_eq!(bytes.len(), 4 + 4 + 8 + 32 + 8 + 32 + 8);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2i32.to_le_bytes());
        assert_eq!(&bytes[8..16], &32u64.to_le_bytes());
        assert_eq!(&bytes[16..48], &[0xAA; 32]);
        assert_eq!(&bytes[56..88], &[0xBB; 32]);
        assert_eq!(&bytes[88..96], &(-1i64).to_le_bytes());
    }

    #[test]
    fn test_transaction_layout() {
        let mut input = TxInput::new([3u8; 32], 5, vec![4u8; 32]);
        input.set_signature(vec![6u8; 64]);
        let tx = Transaction::new(1, vec![input], vec![TxOutput::new(10, vec![7u8; 20])]);

        let signed = encode_transaction(&tx, true);
        let unsigned = encode_transaction(&tx, false);

        // version, input count, prev hash, index, key, empty sig, output count, amount, address
        assert_eq!(unsigned.len(), 4 + 8 + 40 + 4 + 40 + 8 + 8 + 8 + 28);
        assert_eq!(signed.len(), unsigned.len() + 64);
        assert_eq!(&signed[0..4], &1u32.to_le_bytes());
        assert_eq!(&signed[4..12], &1u64.to_le_bytes());
    }

    #[test]
    fn test_input_order_changes_encoding() {
        let a = TxInput::new([1u8; 32], 0, vec![9u8; 32]);
        let b = TxInput::new([2u8; 32], 0, vec![9u8; 32]);
        let tx1 = Transaction::new(1, vec![a.clone(), b.clone()], vec![]);
        let tx2 = Transaction::new(1, vec![b, a], vec![]);
        assert_ne!(encode_transaction(&tx1, true), encode_transaction(&tx2, true));
    }
}
