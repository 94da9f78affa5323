use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::FormatError;
use crate::field::{ByteOrder, FieldCode, FieldSpec, Primitive};
use crate::layout::FieldLayoutTable;

/// Concrete pack/unpack description of a record: an optional byte-order
/// marker followed by one type code per field, e.g. `<hi`.
///
/// Cheap to build and never cached; rebuild it for each (table, version,
/// byte order) query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    byte_order: Option<ByteOrder>,
    codes: Vec<FieldCode>,
    byte_length: usize,
}

impl FormatDescriptor {
    /// Descriptor for `fields` in order. Without a byte order the result is
    /// only good for sizing, since widths do not depend on byte order.
    pub fn from_fields(fields: &[FieldSpec], byte_order: Option<ByteOrder>) -> Self {
        let codes: Vec<FieldCode> = fields.iter().map(|f| f.code).collect();
        let byte_length = codes.iter().map(FieldCode::width).sum();
        Self {
            byte_order,
            codes,
            byte_length,
        }
    }

    /// Descriptor for the fields of `table` present in `target_version`.
    pub fn build(
        table: &FieldLayoutTable,
        target_version: u32,
        byte_order: Option<ByteOrder>,
    ) -> Self {
        Self::from_fields(&table.fields_for(target_version), byte_order)
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn codes(&self) -> &[FieldCode] {
        &self.codes
    }

    /// Total bytes covered by the descriptor.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Decode `bytes` into one [`Value`] per field.
    ///
    /// `bytes` must be exactly [`byte_length`](Self::byte_length) long and the
    /// descriptor must carry a byte order.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Vec<Value>, FormatError> {
        let order = self.byte_order.ok_or(FormatError::MissingByteOrder)?;
        if bytes.len() != self.byte_length {
            return Err(FormatError::LengthMismatch {
                expected: self.byte_length,
                actual: bytes.len(),
            });
        }

        let mut values = Vec::with_capacity(self.codes.len());
        let mut offset = 0;
        for code in &self.codes {
            let chunk = &bytes[offset..offset + code.width()];
            values.push(decode_field(code, chunk, order));
            offset += code.width();
        }
        Ok(values)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(order) = self.byte_order {
            write!(f, "{}", order.flag())?;
        }
        for code in &self.codes {
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

// ── Decoding ───────────────────────────────────────────────────────────────

macro_rules! read_ordered {
    ($ty:ty, $bytes:expr, $order:expr) => {{
        let mut buf = [0u8; std::mem::size_of::<$ty>()];
        buf.copy_from_slice($bytes);
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(buf),
            ByteOrder::Big => <$ty>::from_be_bytes(buf),
        }
    }};
}

fn decode_field(code: &FieldCode, chunk: &[u8], order: ByteOrder) -> Value {
    match code.primitive {
        Primitive::Byte => Value::Bytes(chunk.to_vec()),
        p if code.count == 1 => decode_scalar(p, chunk, order),
        p => Value::Array(
            chunk
                .chunks_exact(p.width())
                .map(|c| decode_scalar(p, c, order))
                .collect(),
        ),
    }
}

/// `bytes` is exactly `primitive.width()` long.
fn decode_scalar(primitive: Primitive, bytes: &[u8], order: ByteOrder) -> Value {
    match primitive {
        Primitive::I8 => Value::Int(bytes[0] as i8 as i64),
        Primitive::I16 => Value::Int(read_ordered!(i16, bytes, order) as i64),
        Primitive::I32 => Value::Int(read_ordered!(i32, bytes, order) as i64),
        Primitive::F64 => Value::Float(read_ordered!(f64, bytes, order)),
        Primitive::Byte => Value::Bytes(bytes.to_vec()),
    }
}

// ── Values ─────────────────────────────────────────────────────────────────

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// Fixed-length byte string, including any trailing NULs.
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Byte string up to its first NUL, lossily decoded.
    pub fn as_c_str(&self) -> Option<String> {
        self.as_bytes().map(|b| {
            let end = b.iter().position(|&c| c == 0).unwrap_or(b.len());
            String::from_utf8_lossy(&b[..end]).into_owned()
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(_) => write!(f, "{:?}", self.as_c_str().unwrap_or_default()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Bytes(_) => serializer.serialize_str(&self.as_c_str().unwrap_or_default()),
            Value::Array(items) => items.serialize(serializer),
        }
    }
}

// ── Records ────────────────────────────────────────────────────────────────

/// Named field values of one decoded record, in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord {
    entries: Vec<(&'static str, Value)>,
}

impl DecodedRecord {
    /// Pair each field with its decoded value. Both slices come from the same
    /// descriptor, so they have equal length.
    pub fn new(fields: &[FieldSpec], values: Vec<Value>) -> Self {
        Self {
            entries: fields.iter().map(|f| f.name).zip(values).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{MAIN_HEADER, V_30};

    #[test]
    fn version_zero_descriptor_text_and_length() {
        let bare = FormatDescriptor::build(&MAIN_HEADER, 0, None);
        assert_eq!(bare.to_string(), "hi");
        assert_eq!(bare.byte_length(), 6);

        let le = FormatDescriptor::build(&MAIN_HEADER, 0, Some(ByteOrder::Little));
        let be = FormatDescriptor::build(&MAIN_HEADER, 0, Some(ByteOrder::Big));
        assert_eq!(le.to_string(), "<hi");
        assert_eq!(be.to_string(), ">hi");
        assert_eq!(le.byte_length(), bare.byte_length());
        assert_eq!(be.byte_length(), bare.byte_length());
    }

    #[test]
    fn full_main_header_descriptor() {
        let d = FormatDescriptor::build(&MAIN_HEADER, V_30, Some(ByteOrder::Big));
        assert_eq!(d.to_string(), ">hiihhhddddd8b6hhdh40s10shhhhhh");
        assert_eq!(d.byte_length(), 150);
    }

    #[test]
    fn unpack_both_orders() {
        let le = FormatDescriptor::build(&MAIN_HEADER, 0, Some(ByteOrder::Little));
        let be = FormatDescriptor::build(&MAIN_HEADER, 0, Some(ByteOrder::Big));
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x2a];
        assert_eq!(le.unpack(&bytes).unwrap(), [Value::Int(256), Value::Int(0x2a00_0000)]);
        assert_eq!(be.unpack(&bytes).unwrap(), [Value::Int(1), Value::Int(42)]);
    }

    #[test]
    fn unpack_signed_values() {
        let d = FormatDescriptor::from_fields(
            &[
                FieldSpec::new("h", FieldCode::I16, 0),
                FieldSpec::new("b", FieldCode::I8, 0),
            ],
            Some(ByteOrder::Little),
        );
        assert_eq!(
            d.unpack(&[0xff, 0xff, 0x80]).unwrap(),
            [Value::Int(-1), Value::Int(-128)]
        );
    }

    #[test]
    fn unpack_arrays_strings_and_floats() {
        let fields = [
            FieldSpec::new("arr", FieldCode::array(Primitive::I16, 2), 0),
            FieldSpec::new("name", FieldCode::bytes(4), 0),
            FieldSpec::new("t", FieldCode::F64, 0),
        ];
        let d = FormatDescriptor::from_fields(&fields, Some(ByteOrder::Big));
        let mut bytes = vec![0x00, 0x07, 0xff, 0xfe];
        bytes.extend_from_slice(b"ms\0\0");
        bytes.extend_from_slice(&0.5f64.to_be_bytes());

        let record = DecodedRecord::new(&fields, d.unpack(&bytes).unwrap());
        assert_eq!(
            record.get("arr"),
            Some(&Value::Array(vec![Value::Int(7), Value::Int(-2)]))
        );
        assert_eq!(record.get("name").and_then(Value::as_c_str).as_deref(), Some("ms"));
        assert_eq!(record.get("t").and_then(Value::as_float), Some(0.5));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        let d = FormatDescriptor::build(&MAIN_HEADER, 0, Some(ByteOrder::Little));
        assert_eq!(
            d.unpack(&[0u8; 5]),
            Err(FormatError::LengthMismatch {
                expected: 6,
                actual: 5
            })
        );
        assert!(d.unpack(&[0u8; 7]).is_err());
    }

    #[test]
    fn unpack_requires_byte_order() {
        let d = FormatDescriptor::build(&MAIN_HEADER, 0, None);
        assert_eq!(d.unpack(&[0u8; 6]), Err(FormatError::MissingByteOrder));
    }
}
