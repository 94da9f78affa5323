pub mod error;
pub mod field;
pub mod format;
pub mod layout;
pub mod prober;
pub mod reader;

pub use error::{AcqError, FormatError, Result};
pub use field::{ByteOrder, FieldCode, FieldSpec, Primitive};
pub use format::{DecodedRecord, FormatDescriptor, Value};
pub use layout::{field_offsets, FieldLayoutTable, FieldOffset, MAIN_HEADER};
pub use prober::{Candidate, DecodedHeaderIdentity};
pub use reader::{Reader, SessionState};
