//! Byte-order and version detection.
//!
//! Neither the byte order nor the format version is stored anywhere
//! self-describing. The version-0 prefix of the header is read once and
//! decoded under both byte orders; the version indicator must be a small
//! positive integer, and the wrong order almost always byte-swaps it into a
//! huge or negative number.
//!
//! Selection policy: drop candidates whose version is not positive, then take
//! the smallest version, breaking ties with `Little` before `Big`.

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;
use tracing::debug;

use crate::error::{AcqError, FormatError, Result};
use crate::field::ByteOrder;
use crate::format::FormatDescriptor;
use crate::layout::{FieldLayoutTable, VERSION_FIELD_INDEX};

/// One interpretation of the version prefix.
///
/// Field order matters: the derived `Ord` compares `version` first and then
/// `byte_order`, which is exactly the selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Candidate {
    pub version: i64,
    pub byte_order: ByteOrder,
}

impl Candidate {
    /// Version indicators are strictly positive (and fit the version type).
    pub fn is_plausible(&self) -> bool {
        self.version > 0 && self.version <= i64::from(u32::MAX)
    }
}

/// The byte order and format version a file was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedHeaderIdentity {
    pub byte_order: ByteOrder,
    pub version: u32,
    /// The version-0 prefix the identity was decoded from.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

/// Bytes needed to detect the identity: the width of the version-0 fields.
pub fn probe_length(table: &FieldLayoutTable) -> usize {
    FormatDescriptor::build(table, 0, None).byte_length()
}

/// Seek to the start of `source` and read exactly [`probe_length`] bytes.
///
/// Leaves the cursor `probe_length` bytes from the start. The previous
/// position is not restored.
pub fn read_probe_bytes<R: Read + Seek>(
    source: &mut R,
    table: &FieldLayoutTable,
) -> Result<Vec<u8>> {
    let needed = probe_length(table);
    source.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::with_capacity(needed);
    source.by_ref().take(needed as u64).read_to_end(&mut bytes)?;
    if bytes.len() < needed {
        return Err(AcqError::TruncatedHeader { needed, bytes });
    }
    debug!(needed, bytes = ?bytes, "read version prefix");
    Ok(bytes)
}

/// Decode the version indicator of `bytes` under each byte order.
pub fn candidates(table: &FieldLayoutTable, bytes: &[u8]) -> Result<Vec<Candidate>> {
    ByteOrder::ALL
        .iter()
        .map(|&byte_order| {
            let malformed = |source: FormatError| AcqError::MalformedHeader {
                byte_order,
                source,
                bytes: bytes.to_vec(),
            };
            let descriptor = FormatDescriptor::build(table, 0, Some(byte_order));
            let values = descriptor.unpack(bytes).map_err(malformed)?;
            let version = values
                .get(VERSION_FIELD_INDEX)
                .and_then(|v| v.as_int())
                .ok_or_else(|| {
                    malformed(FormatError::NonInteger {
                        name: table.version_field().name,
                    })
                })?;
            debug!(%byte_order, version, descriptor = %descriptor, "candidate");
            Ok(Candidate {
                version,
                byte_order,
            })
        })
        .collect()
}

/// Pick the winning candidate, or `None` if none is plausible.
pub fn select(candidates: &[Candidate]) -> Option<Candidate> {
    candidates.iter().copied().filter(Candidate::is_plausible).min()
}

/// Determine the identity from an already-read version prefix. Pure.
pub fn probe(table: &FieldLayoutTable, bytes: Vec<u8>) -> Result<DecodedHeaderIdentity> {
    let candidates = candidates(table, &bytes)?;
    let Some(winner) = select(&candidates) else {
        return Err(AcqError::AmbiguousFormat { candidates, bytes });
    };
    Ok(DecodedHeaderIdentity {
        byte_order: winner.byte_order,
        // is_plausible bounds the value to u32.
        version: winner.version as u32,
        raw: bytes,
    })
}

/// Read the version prefix of `source` and determine its identity.
pub fn detect<R: Read + Seek>(
    source: &mut R,
    table: &FieldLayoutTable,
) -> Result<DecodedHeaderIdentity> {
    let bytes = read_probe_bytes(source, table)?;
    probe(table, bytes)
}
