use std::io;

use crate::field::ByteOrder;
use crate::prober::Candidate;
use crate::reader::SessionState;

/// Failures while building or applying a [`FormatDescriptor`].
///
/// These never depend on file contents alone: a `FormatError` surfacing from
/// detection means the layout table and the descriptor sizing disagree.
///
/// [`FormatDescriptor`]: crate::format::FormatDescriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// A type code string that does not name a fixed-width primitive.
    #[error("invalid field code {0:?}")]
    InvalidCode(String),

    /// Decoding was attempted with a descriptor built without a byte order.
    #[error("descriptor has no byte order and can only be used for sizing")]
    MissingByteOrder,

    /// The input slice is not exactly the descriptor's byte length.
    #[error("descriptor needs exactly {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The version indicator decoded to something other than an integer.
    #[error("field {name} did not decode to an integer")]
    NonInteger { name: &'static str },
}

/// Errors returned by header detection and decoding.
#[derive(Debug, thiserror::Error)]
pub enum AcqError {
    /// The stream ended before the minimal header was read. Nothing was decoded.
    #[error("truncated header: need {needed} bytes but only {} were available", .bytes.len())]
    TruncatedHeader {
        /// Bytes required by the version-resolved descriptor.
        needed: usize,
        /// Whatever was read before end of stream.
        bytes: Vec<u8>,
    },

    /// The layout table and descriptor sizing disagree; this is a defect, not bad input.
    #[error("malformed header under {byte_order}-endian interpretation: {source} (bytes {bytes:02x?})")]
    MalformedHeader {
        byte_order: ByteOrder,
        #[source]
        source: FormatError,
        /// The bytes that failed to decode.
        bytes: Vec<u8>,
    },

    /// Neither byte order produced a positive version; not this file format.
    #[error("no byte order yields a plausible version (candidates {candidates:?}, bytes {bytes:02x?})")]
    AmbiguousFormat {
        candidates: Vec<Candidate>,
        bytes: Vec<u8>,
    },

    /// An operation was invoked in the wrong reader session state.
    #[error("reader session is {actual}, operation requires {expected}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, AcqError>;
