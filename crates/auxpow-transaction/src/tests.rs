//! Tests for the auxpow-transaction crate.
//!
//! Covers legacy parsing, serialization roundtrips and txid computation.

use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::util::WireReader;

use crate::input::{TransactionInput, COINBASE_OUT_INDEX, DEFAULT_SEQUENCE_NUMBER};
use crate::output::TransactionOutput;
use crate::script::Script;
use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Raw transaction hex test vectors
// -----------------------------------------------------------------------

/// A standard one-input, two-output transaction.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

/// A coinbase transaction hex.
const COINBASE_TX_HEX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff17033f250d2f43555656452f2c903fb60859897700d02700ffffffff01d864a012000000001976a914d648686cf603c11850f39600e37312738accca8f88ac00000000";

/// Display-order txid of `COINBASE_TX_HEX`.
const COINBASE_TXID: &str = "f2feeafa708f31083549ab0b2487efc4cd007b239c5a099a9fc9de25feb0643a";

/// Decode exactly one transaction from hex, rejecting trailing bytes.
fn parse(hex_str: &str) -> Result<Transaction, TransactionError> {
    let bytes = hex::decode(hex_str).map_err(|e| TransactionError::SerializationError(e.to_string()))?;
    parse_bytes(&bytes)
}

fn parse_bytes(bytes: &[u8]) -> Result<Transaction, TransactionError> {
    let mut reader = WireReader::new(bytes);
    let tx = Transaction::read_from(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(TransactionError::SerializationError(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }
    Ok(tx)
}

// -----------------------------------------------------------------------
// Transaction parsing and serialization
// -----------------------------------------------------------------------

#[test]
fn test_read_roundtrip() {
    let tx = parse(SOURCE_RAW_TX).expect("should parse source tx hex");

    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.lock_time, 0);
    assert_eq!(tx.outputs[0].value, 1500);

    assert_eq!(hex::encode(tx.to_bytes()), SOURCE_RAW_TX, "roundtrip should produce identical bytes");
}

#[test]
fn test_reader_stops_after_lock_time() {
    let mut bytes = hex::decode(SOURCE_RAW_TX).unwrap();
    bytes.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let mut reader = WireReader::new(&bytes);
    Transaction::read_from(&mut reader).unwrap();
    assert_eq!(reader.remaining(), 4);
}

#[test]
fn test_empty_bytes_error() {
    assert!(parse_bytes(&[]).is_err());
}

#[test]
fn test_truncated_transaction_error() {
    let bytes = hex::decode(SOURCE_RAW_TX).unwrap();
    for cut in [1, 4, 5, 40, bytes.len() - 1] {
        assert!(
            matches!(parse_bytes(&bytes[..cut]), Err(TransactionError::SerializationError(_))),
            "truncation at {} should fail",
            cut
        );
    }
}

#[test]
fn test_huge_input_count_does_not_allocate() {
    // Version, then an input count of 2^64-1 with nothing behind it.
    let mut bytes = vec![0x01, 0x00, 0x00, 0x00, 0xff];
    bytes.extend_from_slice(&[0xff; 8]);
    assert!(parse_bytes(&bytes).is_err());
}

// -----------------------------------------------------------------------
// Transaction ID
// -----------------------------------------------------------------------

#[test]
fn test_coinbase_tx_id() {
    let tx = parse(COINBASE_TX_HEX).expect("should parse coinbase tx");
    assert_eq!(tx.tx_id(), Hash::from_hex(COINBASE_TXID).unwrap());
    assert_eq!(tx.tx_id().to_string(), COINBASE_TXID);

    let input = &tx.inputs[0];
    assert!(input.source_txid.is_zero());
    assert_eq!(input.source_tx_out_index, COINBASE_OUT_INDEX);
    assert_eq!(input.unlocking_script.len(), 0x17);
}

#[test]
fn test_zero_inputs_read_as_legacy() {
    // A zero input count followed by outputs would look like a witness
    // marker to a general parser; here it is a plain legacy transaction.
    let mut tx = Transaction::new();
    let mut output = TransactionOutput::new();
    output.value = 5_000_000_000;
    output.locking_script = Script::from_bytes(&[0x51]);
    tx.add_output(output);

    let bytes = tx.to_bytes();
    assert_eq!(bytes[4], 0x00);
    let decoded = parse_bytes(&bytes).unwrap();
    assert!(decoded.inputs.is_empty());
    assert_eq!(decoded, tx);
}

#[test]
fn test_zero_outputs_allowed() {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::coinbase(Script::from_bytes(b"no outputs")));
    let decoded = parse_bytes(&tx.to_bytes()).unwrap();
    assert!(decoded.outputs.is_empty());
    assert_eq!(decoded.tx_id(), tx.tx_id());
}

// -----------------------------------------------------------------------
// Transaction building
// -----------------------------------------------------------------------

#[test]
fn test_build_coinbase() {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::coinbase(Script::from_bytes(b"merged")));
    tx.add_output(TransactionOutput::new());

    let input = &tx.inputs[0];
    assert_eq!(input.source_txid, Hash::ZERO);
    assert_eq!(input.source_tx_out_index, COINBASE_OUT_INDEX);
    assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);

    let decoded = parse_bytes(&tx.to_bytes()).unwrap();
    assert_eq!(decoded, tx);
    assert_eq!(Transaction::default(), Transaction::new());
}
