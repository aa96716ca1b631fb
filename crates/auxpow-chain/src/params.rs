//! Network parameters.
//!
//! Everything the chain manager needs to know about a network is collected
//! in one immutable [`NetworkParams`] value. Parameters are plain data: they
//! can be built in code, taken from a preset, or loaded from JSON.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use auxpow_header::{AuxPowMode, ChainId, BASE_HEADER_SIZE};
use auxpow_primitives::chainhash::Hash;
use auxpow_primitives::target::Target;

use crate::ChainError;

/// A trusted header at the end of a retarget interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Height of the header; always the last height of an interval.
    pub height: u32,
    pub hash: Hash,
    /// Compact target of the interval that starts after `height`.
    pub next_bits: u32,
    /// Cumulative work up to and including this header.
    #[serde(default, with = "hex_work", skip_serializing_if = "Option::is_none")]
    pub chain_work: Option<BigUint>,
}

/// Static per-network constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub name: String,
    pub genesis_hash: Hash,
    /// Sorted by height, strictly increasing.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Compact form of the easiest allowed target.
    pub pow_limit_bits: u32,
    /// Chain id this network's AuxPoW headers must carry.
    pub auxpow_chain_id: ChainId,
    #[serde(default = "default_header_size")]
    pub header_size: usize,
    /// First height at which AuxPoW headers are accepted.
    pub auxpow_start_height: u32,
    /// Headers per retarget interval.
    pub retarget_interval: u32,
    /// Intended duration of one interval, in seconds.
    pub target_timespan: u32,
    /// Intended time between headers, in seconds.
    pub target_spacing: u32,
    /// Allow a header to use the pow limit when it comes more than two
    /// spacings after its parent.
    #[serde(default)]
    pub allow_min_difficulty: bool,
    /// Reject AuxPoW headers whose chain id differs from `auxpow_chain_id`.
    #[serde(default)]
    pub strict_chain_id: bool,
    /// Measure an interval's timespan from the header before its first
    /// header (timewarp fix).
    #[serde(default)]
    pub retarget_lookback_fix: bool,
    /// Headers kept above the finalized base before the excess is stored.
    pub max_reorg_depth: u32,
}

fn default_header_size() -> usize {
    BASE_HEADER_SIZE
}

impl NetworkParams {
    /// Namecoin mainnet. Checkpoint data is supplied by configuration.
    pub fn namecoin() -> Self {
        NetworkParams {
            name: "namecoin".to_string(),
            genesis_hash: Hash::from_display_bytes([
                0x00, 0x00, 0x00, 0x00, 0x00, 0x62, 0xb7, 0x2c, 0x5e, 0x2c, 0xeb, 0x45, 0xfb, 0xc8,
                0x58, 0x7e, 0x80, 0x7c, 0x15, 0x5b, 0x0d, 0xa7, 0x35, 0xe6, 0x48, 0x3d, 0xfb, 0xa2,
                0xf0, 0xa9, 0xc7, 0x70,
            ]),
            checkpoints: Vec::new(),
            pow_limit_bits: 0x1d00_ffff,
            auxpow_chain_id: ChainId(1),
            header_size: BASE_HEADER_SIZE,
            auxpow_start_height: 19_200,
            retarget_interval: 2016,
            target_timespan: 14 * 24 * 60 * 60,
            target_spacing: 10 * 60,
            allow_min_difficulty: false,
            strict_chain_id: true,
            retarget_lookback_fix: true,
            max_reorg_depth: 200,
        }
    }

    /// Parse and validate parameters from JSON.
    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        let params: NetworkParams =
            serde_json::from_str(json).map_err(|e| ChainError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String, ChainError> {
        serde_json::to_string_pretty(self).map_err(|e| ChainError::Config(e.to_string()))
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.header_size != BASE_HEADER_SIZE {
            return Err(ChainError::Config(format!(
                "header size must be {}, got {}",
                BASE_HEADER_SIZE, self.header_size
            )));
        }
        if self.retarget_interval == 0 || self.target_timespan == 0 || self.target_spacing == 0 {
            return Err(ChainError::Config(
                "retarget interval, timespan and spacing must be nonzero".to_string(),
            ));
        }
        Target::from_compact(self.pow_limit_bits)
            .map_err(|_| ChainError::Config(format!("bad pow limit {:#010x}", self.pow_limit_bits)))?;

        let mut previous: Option<u32> = None;
        for checkpoint in &self.checkpoints {
            if previous.is_some_and(|p| checkpoint.height <= p) {
                return Err(ChainError::Config(format!(
                    "checkpoint heights must increase, {} follows {:?}",
                    checkpoint.height, previous
                )));
            }
            if (u64::from(checkpoint.height) + 1) % u64::from(self.retarget_interval) != 0 {
                return Err(ChainError::Config(format!(
                    "checkpoint {} does not end a retarget interval",
                    checkpoint.height
                )));
            }
            Target::from_compact(checkpoint.next_bits).map_err(|_| {
                ChainError::Config(format!(
                    "checkpoint {} has bad next bits {:#010x}",
                    checkpoint.height, checkpoint.next_bits
                ))
            })?;
            previous = Some(checkpoint.height);
        }
        Ok(())
    }

    /// The easiest allowed target.
    pub fn pow_limit(&self) -> Result<Target, ChainError> {
        Ok(Target::from_compact(self.pow_limit_bits)?)
    }

    pub fn max_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn max_checkpoint_height(&self) -> Option<u32> {
        self.max_checkpoint().map(|c| c.height)
    }

    /// Whether `height` lies in checkpointed history.
    pub fn is_checkpointed(&self, height: u32) -> bool {
        self.max_checkpoint_height().is_some_and(|max| height <= max)
    }

    pub fn checkpoint_at(&self, height: u32) -> Option<&Checkpoint> {
        self.checkpoints
            .binary_search_by_key(&height, |c| c.height)
            .ok()
            .map(|i| &self.checkpoints[i])
    }

    pub fn is_auxpow_active(&self, height: u32) -> bool {
        height >= self.auxpow_start_height
    }

    /// How a header at `height` is decoded: a payload is read only above
    /// the highest checkpoint and once AuxPoW is active.
    pub fn auxpow_mode(&self, height: u32) -> AuxPowMode {
        if !self.is_checkpointed(height) && self.is_auxpow_active(height) {
            AuxPowMode::AboveCheckpoint
        } else {
            AuxPowMode::BelowCheckpoint
        }
    }
}

/// Serialize optional chain work as a lowercase hex string.
mod hex_work {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<BigUint>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(work) => serializer.serialize_str(&work.to_str_radix(16)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BigUint>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|s| {
            let digits = s.strip_prefix("0x").unwrap_or(&s);
            BigUint::parse_bytes(digits.as_bytes(), 16)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid chain work {:?}", s)))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checkpoints(checkpoints: Vec<Checkpoint>) -> NetworkParams {
        NetworkParams { checkpoints, ..NetworkParams::namecoin() }
    }

    fn checkpoint(height: u32) -> Checkpoint {
        Checkpoint {
            height,
            hash: Hash::new([height as u8; 32]),
            next_bits: 0x1d00_ffff,
            chain_work: None,
        }
    }

    #[test]
    fn test_namecoin_preset() {
        let params = NetworkParams::namecoin();
        assert!(params.validate().is_ok());
        assert_eq!(
            params.genesis_hash.to_string(),
            "000000000062b72c5e2ceb45fbc8587e807c155b0da735e6483dfba2f0a9c770"
        );
        assert_eq!(params.auxpow_chain_id, ChainId(1));
        assert_eq!(params.max_checkpoint_height(), None);
    }

    #[test]
    fn test_auxpow_mode() {
        let params = with_checkpoints(vec![checkpoint(20_159), checkpoint(40_319)]);
        assert_eq!(params.auxpow_mode(100), AuxPowMode::BelowCheckpoint);
        assert_eq!(params.auxpow_mode(40_319), AuxPowMode::BelowCheckpoint);
        assert_eq!(params.auxpow_mode(40_320), AuxPowMode::AboveCheckpoint);

        // Without checkpoints only activation matters.
        let params = NetworkParams::namecoin();
        assert_eq!(params.auxpow_mode(19_199), AuxPowMode::BelowCheckpoint);
        assert_eq!(params.auxpow_mode(19_200), AuxPowMode::AboveCheckpoint);
    }

    #[test]
    fn test_checkpoint_lookup() {
        let params = with_checkpoints(vec![checkpoint(2015), checkpoint(4031)]);
        assert_eq!(params.checkpoint_at(4031).map(|c| c.height), Some(4031));
        assert!(params.checkpoint_at(4030).is_none());
        assert!(params.is_checkpointed(4031));
        assert!(!params.is_checkpointed(4032));
    }

    #[test]
    fn test_validate_rejects_misaligned_checkpoint() {
        let params = with_checkpoints(vec![checkpoint(2016)]);
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unordered_checkpoints() {
        let params = with_checkpoints(vec![checkpoint(4031), checkpoint(2015)]);
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));

        let params = with_checkpoints(vec![checkpoint(2015), checkpoint(2015)]);
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_bits_and_zero_interval() {
        let mut cp = checkpoint(2015);
        cp.next_bits = 0x0480_0001;
        assert!(matches!(with_checkpoints(vec![cp]).validate(), Err(ChainError::Config(_))));

        let params = NetworkParams { retarget_interval: 0, ..NetworkParams::namecoin() };
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));

        let params = NetworkParams { pow_limit_bits: 0, ..NetworkParams::namecoin() };
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));

        let params = NetworkParams { header_size: 81, ..NetworkParams::namecoin() };
        assert!(matches!(params.validate(), Err(ChainError::Config(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut cp = checkpoint(2015);
        cp.chain_work = Some(BigUint::from(0x7e0_07e0u64));
        let params = with_checkpoints(vec![cp]);

        let json = params.to_json().unwrap();
        assert!(json.contains("\"chain_work\": \"7e007e0\""));
        assert_eq!(NetworkParams::from_json(&json).unwrap(), params);
    }

    #[test]
    fn test_from_json_defaults_and_errors() {
        let json = r#"{
            "name": "regtest",
            "genesis_hash": "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
            "pow_limit_bits": 545259519,
            "auxpow_chain_id": 1,
            "auxpow_start_height": 0,
            "retarget_interval": 2016,
            "target_timespan": 1209600,
            "target_spacing": 600,
            "max_reorg_depth": 100,
            "checkpoints": [
                { "height": 2015, "hash": "000000000000000000000000000000000000000000000000000000000000beef", "next_bits": 545259519, "chain_work": "0x1000" }
            ]
        }"#;
        let params = NetworkParams::from_json(json).unwrap();
        assert_eq!(params.header_size, 80);
        assert!(!params.strict_chain_id);
        assert_eq!(params.checkpoints[0].chain_work, Some(BigUint::from(0x1000u32)));

        assert!(matches!(NetworkParams::from_json("{"), Err(ChainError::Config(_))));
        let bad_work = json.replace("0x1000", "zz");
        assert!(matches!(NetworkParams::from_json(&bad_work), Err(ChainError::Config(_))));
        let short_hash = json.replace("000000000000000000000000000000000000000000000000000000000000beef", "beef");
        assert!(matches!(NetworkParams::from_json(&short_hash), Err(ChainError::Config(_))));
    }
}
