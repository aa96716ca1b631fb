//! Header codec.
//!
//! Whether an AuxPoW payload is read depends only on an explicit
//! [`AuxPowMode`]: checkpointed history is served truncated, so below the
//! highest checkpoint a flagged header is read as its 80 base bytes.

use auxpow_primitives::util::{WireReader, WireWriter};

use crate::auxpow::AuxPow;
use crate::header::{Header, BASE_HEADER_SIZE};
use crate::HeaderError;

/// Whether the header being decoded lies in checkpointed history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuxPowMode {
    /// At or below the highest checkpoint (or before AuxPoW activation):
    /// never read a payload.
    BelowCheckpoint,
    /// Above the highest checkpoint: read a payload when the version is
    /// flagged.
    AboveCheckpoint,
}

/// Framing options for [`decode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Allow bytes to remain after the header.
    pub expect_trailing_data: bool,
    /// Offset in the input at which the header starts.
    pub start_position: usize,
}

/// Decode one header starting at `options.start_position`.
///
/// # Arguments
/// * `bytes` - Input holding the header, possibly among other data.
/// * `mode` - Whether a flagged header carries a payload at this height.
/// * `options` - Start offset and whether trailing bytes are allowed.
///
/// # Returns
/// The header and the absolute position just past it, or a `HeaderError`
/// on truncation, malformed payloads or unexpected trailing bytes.
pub fn decode(
    bytes: &[u8],
    mode: AuxPowMode,
    options: DecodeOptions,
) -> Result<(Header, usize), HeaderError> {
    let mut reader = WireReader::at(bytes, options.start_position)?;
    let mut header = Header::read_base_from(&mut reader)?;

    if mode == AuxPowMode::AboveCheckpoint && header.has_auxpow_flag() {
        header.auxpow = Some(Box::new(AuxPow::read_from(&mut reader)?));
    }

    if !options.expect_trailing_data && reader.remaining() != 0 {
        return Err(HeaderError::TrailingData(reader.remaining()));
    }
    Ok((header, reader.position()))
}

/// Decode exactly 80 bytes as a header without a payload.
pub fn decode_pure(bytes: &[u8]) -> Result<Header, HeaderError> {
    if bytes.len() < BASE_HEADER_SIZE {
        return Err(HeaderError::Decode(format!(
            "pure header needs {} bytes, got {}",
            BASE_HEADER_SIZE,
            bytes.len()
        )));
    }
    let (header, _) = decode(bytes, AuxPowMode::BelowCheckpoint, DecodeOptions::default())?;
    Ok(header)
}

/// Encode a header: the base fields, followed by the payload if present.
pub fn encode(header: &Header) -> Vec<u8> {
    let mut writer = WireWriter::with_capacity(BASE_HEADER_SIZE);
    header.write_base_to(&mut writer);
    if let Some(auxpow) = &header.auxpow {
        auxpow.write_to(&mut writer);
    }
    writer.into_bytes()
}
