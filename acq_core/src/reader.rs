use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AcqError, Result};
use crate::format::{DecodedRecord, FormatDescriptor};
use crate::layout::{FieldLayoutTable, MAIN_HEADER};
use crate::prober::{self, DecodedHeaderIdentity};

/// Lifecycle of a [`Reader`].
///
/// ```text
/// Unstarted ──detect──▶ OrderAndVersionDetected ──read_main_header──▶ Complete
///     │                          │
///     └───────── error ──────────┴──▶ Failed
/// ```
///
/// No transition returns to `Unstarted`; `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unstarted,
    OrderAndVersionDetected,
    Complete,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Unstarted => "unstarted",
            SessionState::OrderAndVersionDetected => "order-and-version-detected",
            SessionState::Complete => "complete",
            SessionState::Failed => "failed",
        })
    }
}

/// Reads one AcqKnowledge file.
///
/// # Open sequence
/// 1. [`detect_order_and_version`] reads the version-0 header prefix and
///    commits the byte order and version. It may run once per reader.
/// 2. [`read_main_header`] decodes the main header as laid out for that
///    version.
///
/// The reader owns its stream exclusively; detection seeks to absolute
/// offsets and leaves the cursor wherever the last read ended.
///
/// [`detect_order_and_version`]: Reader::detect_order_and_version
/// [`read_main_header`]: Reader::read_main_header
pub struct Reader<R> {
    source: R,
    table: FieldLayoutTable,
    state: SessionState,
    identity: Option<DecodedHeaderIdentity>,
}

impl Reader<File> {
    /// Open the file at `path`. Nothing is read until detection.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Reader over `source` using the AcqKnowledge main header layout.
    pub fn new(source: R) -> Self {
        Self::with_table(source, MAIN_HEADER)
    }

    pub fn with_table(source: R, table: FieldLayoutTable) -> Self {
        Self {
            source,
            table,
            state: SessionState::Unstarted,
            identity: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The committed identity, once detection has succeeded.
    pub fn identity(&self) -> Option<&DecodedHeaderIdentity> {
        self.identity.as_ref()
    }

    pub fn table(&self) -> &FieldLayoutTable {
        &self.table
    }

    /// Descriptor for the main header at `version` under the detected byte
    /// order, e.g. to compare layouts across versions while debugging offsets.
    pub fn descriptor_for(&self, version: u32) -> Option<FormatDescriptor> {
        let identity = self.identity.as_ref()?;
        Some(FormatDescriptor::build(
            &self.table,
            version,
            Some(identity.byte_order),
        ))
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state != expected {
            return Err(AcqError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Determine the byte order and format version from the header prefix.
    ///
    /// Must be called exactly once, on an unstarted reader. A second call
    /// fails with [`AcqError::InvalidState`] and leaves the first result in
    /// place. Any other failure moves the reader to [`SessionState::Failed`].
    pub fn detect_order_and_version(&mut self) -> Result<&DecodedHeaderIdentity> {
        self.expect_state(SessionState::Unstarted)?;

        match prober::detect(&mut self.source, &self.table) {
            Ok(identity) => {
                info!(
                    byte_order = %identity.byte_order,
                    version = identity.version,
                    "detected file identity"
                );
                self.state = SessionState::OrderAndVersionDetected;
                Ok(&*self.identity.insert(identity))
            }
            Err(e) => {
                warn!(error = %e, "byte order and version detection failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Decode the main header laid out for the detected version.
    pub fn read_main_header(&mut self) -> Result<DecodedRecord> {
        self.expect_state(SessionState::OrderAndVersionDetected)?;

        match self.decode_main_header() {
            Ok(record) => {
                self.state = SessionState::Complete;
                Ok(record)
            }
            Err(e) => {
                warn!(error = %e, "main header decode failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn decode_main_header(&mut self) -> Result<DecodedRecord> {
        let (byte_order, version) = match &self.identity {
            Some(identity) => (identity.byte_order, identity.version),
            None => {
                return Err(AcqError::InvalidState {
                    expected: SessionState::OrderAndVersionDetected,
                    actual: self.state,
                })
            }
        };

        let fields = self.table.fields_for(version);
        let descriptor = FormatDescriptor::from_fields(&fields, Some(byte_order));
        let needed = descriptor.byte_length();

        self.source.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::with_capacity(needed);
        self.source
            .by_ref()
            .take(needed as u64)
            .read_to_end(&mut bytes)?;
        if bytes.len() < needed {
            return Err(AcqError::TruncatedHeader { needed, bytes });
        }

        let values = match descriptor.unpack(&bytes) {
            Ok(values) => values,
            Err(source) => {
                return Err(AcqError::MalformedHeader {
                    byte_order,
                    source,
                    bytes,
                })
            }
        };
        Ok(DecodedRecord::new(&fields, values))
    }
}
