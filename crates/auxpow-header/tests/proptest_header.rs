use proptest::prelude::*;

use auxpow_header::{
    decode, encode, AuxPow, AuxPowMode, AuxPowVerifier, ChainId, DecodeOptions, Header,
    MerkleBranch, AUXPOW_VERSION_FLAG,
};
use auxpow_header::verify::{expected_index, MERGED_MINING_HEADER};
use auxpow_primitives::chainhash::Hash;
use auxpow_transaction::{Script, Transaction, TransactionInput, TransactionOutput};

fn arb_hash() -> impl Strategy<Value = Hash> {
    prop::array::uniform32(any::<u8>()).prop_map(Hash::new)
}

/// A header without the AuxPoW flag.
fn arb_plain_header() -> impl Strategy<Value = Header> {
    (any::<u32>(), arb_hash(), arb_hash(), any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
        |(version, prev_hash, merkle_root, timestamp, bits, nonce)| Header {
            version: version & !AUXPOW_VERSION_FLAG,
            prev_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
            auxpow: None,
        },
    )
}

/// Attach a structurally valid payload to `side` with a chain branch of
/// `chain_len` hashes and the given commitment nonce.
fn attach_payload(side: Header, chain_hashes: Vec<Hash>, nonce: u32, prefix: Vec<u8>) -> Header {
    let chain_len = chain_hashes.len();
    let index = expected_index(nonce, side.chain_id(), chain_len);
    let chain_branch = MerkleBranch::new(chain_hashes, index);
    let root = chain_branch.root(&side.hash());

    let mut script = prefix;
    script.extend_from_slice(&MERGED_MINING_HEADER);
    script.extend_from_slice(&root.to_display_bytes());
    script.extend_from_slice(&(1u32 << chain_len).to_le_bytes());
    script.extend_from_slice(&nonce.to_le_bytes());

    let mut coinbase = Transaction::new();
    coinbase.add_input(TransactionInput::coinbase(Script::from(script)));
    coinbase.add_output(TransactionOutput::new());

    let coinbase_branch = MerkleBranch::new(vec![], 0);
    let parent_header = Header {
        version: 2,
        merkle_root: coinbase.tx_id(),
        timestamp: side.timestamp,
        ..Header::default()
    };
    let auxpow = AuxPow {
        coinbase_tx: coinbase,
        parent_hash: parent_header.hash(),
        coinbase_branch,
        chain_branch,
        parent_header,
    };
    Header { auxpow: Some(Box::new(auxpow)), ..side }
}

proptest! {
    #[test]
    fn plain_header_roundtrip(header in arb_plain_header()) {
        let bytes = encode(&header);
        prop_assert_eq!(bytes.len(), 80);
        for mode in [AuxPowMode::BelowCheckpoint, AuxPowMode::AboveCheckpoint] {
            let (decoded, end) = decode(&bytes, mode, DecodeOptions::default()).unwrap();
            prop_assert_eq!(&decoded, &header);
            prop_assert_eq!(end, 80);
        }
    }

    #[test]
    fn decode_garbage_never_panics(
        bytes in prop::collection::vec(any::<u8>(), 0..400),
        trailing in any::<bool>(),
        start in 0usize..8,
    ) {
        let options = DecodeOptions { expect_trailing_data: trailing, start_position: start };
        for mode in [AuxPowMode::BelowCheckpoint, AuxPowMode::AboveCheckpoint] {
            if let Ok((_, end)) = decode(&bytes, mode, options) {
                prop_assert!(end <= bytes.len());
                prop_assert!(end >= start + 80);
            }
        }
    }

    #[test]
    fn built_commitments_verify_and_roundtrip(
        chain_hashes in prop::collection::vec(arb_hash(), 0..=30),
        nonce in any::<u32>(),
        prefix in prop::collection::vec(0u8..0xf0, 0..40),
        prev_hash in arb_hash(),
        timestamp in any::<u32>(),
    ) {
        let side = Header {
            version: (1 << 16) | AUXPOW_VERSION_FLAG | 1,
            prev_hash,
            timestamp,
            bits: 0x207f_ffff,
            ..Header::default()
        };
        let header = attach_payload(side, chain_hashes, nonce, prefix);

        let verifier = AuxPowVerifier::new(ChainId(1));
        let proof = verifier.verify_commitment(&header).unwrap();
        prop_assert!(proof.explicit_marker);
        prop_assert_eq!(proof.nonce, nonce);

        let bytes = encode(&header);
        let (decoded, _) =
            decode(&bytes, AuxPowMode::AboveCheckpoint, DecodeOptions::default()).unwrap();
        prop_assert_eq!(&decoded, &header);
        prop_assert_eq!(verifier.verify_commitment(&decoded).unwrap(), proof);
    }

    #[test]
    fn expected_index_within_tree(nonce in any::<u32>(), chain_id in any::<u32>(), len in 0usize..=30) {
        prop_assert!(expected_index(nonce, ChainId(chain_id), len) < (1u32 << len));
    }

    #[test]
    fn chain_id_serializes_as_number(id in any::<u32>()) {
        let json = serde_json::to_string(&ChainId(id)).unwrap();
        prop_assert_eq!(&json, &id.to_string());
        prop_assert_eq!(serde_json::from_str::<ChainId>(&json).unwrap(), ChainId(id));
    }
}
