use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FormatError;

/// Byte order of multi-byte values in a file.
///
/// The derived ordering places `Little` before `Big`. Detection uses it to
/// break ties between two equally plausible interpretations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Every candidate order, in tie-break order.
    pub const ALL: [ByteOrder; 2] = [ByteOrder::Little, ByteOrder::Big];

    /// Marker character prefixed to a descriptor.
    pub fn flag(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ByteOrder {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" | "little" | "le" => Ok(ByteOrder::Little),
            ">" | "big" | "be" => Ok(ByteOrder::Big),
            other => Err(FormatError::InvalidCode(other.to_string())),
        }
    }
}

// ── Primitives ─────────────────────────────────────────────────────────────

/// Fixed-width element types a field is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `b`: signed 8-bit integer.
    I8,
    /// `h`: signed 16-bit integer.
    I16,
    /// `i`: signed 32-bit integer.
    I32,
    /// `d`: 64-bit IEEE float.
    F64,
    /// `s`: one byte of a fixed-length byte string.
    Byte,
}

impl Primitive {
    /// Width in bytes. Sizing and decoding both read this; there is no other width table.
    pub const fn width(self) -> usize {
        match self {
            Primitive::I8 | Primitive::Byte => 1,
            Primitive::I16 => 2,
            Primitive::I32 => 4,
            Primitive::F64 => 8,
        }
    }

    pub fn code(self) -> char {
        match self {
            Primitive::I8 => 'b',
            Primitive::I16 => 'h',
            Primitive::I32 => 'i',
            Primitive::F64 => 'd',
            Primitive::Byte => 's',
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            'b' => Some(Primitive::I8),
            'h' => Some(Primitive::I16),
            'i' => Some(Primitive::I32),
            'd' => Some(Primitive::F64),
            's' => Some(Primitive::Byte),
            _ => None,
        }
    }
}

// ── Field codes ────────────────────────────────────────────────────────────

/// A field's type: `count` consecutive elements of `primitive`.
///
/// For [`Primitive::Byte`] the count is the length of a single byte string
/// (`40s` is one 40-byte value), not 40 separate values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldCode {
    pub primitive: Primitive,
    pub count: usize,
}

impl FieldCode {
    pub const I8: FieldCode = FieldCode::scalar(Primitive::I8);
    pub const I16: FieldCode = FieldCode::scalar(Primitive::I16);
    pub const I32: FieldCode = FieldCode::scalar(Primitive::I32);
    pub const F64: FieldCode = FieldCode::scalar(Primitive::F64);

    pub const fn scalar(primitive: Primitive) -> Self {
        Self {
            primitive,
            count: 1,
        }
    }

    pub const fn array(primitive: Primitive, count: usize) -> Self {
        Self { primitive, count }
    }

    /// Fixed-length byte string of `len` bytes.
    pub const fn bytes(len: usize) -> Self {
        Self {
            primitive: Primitive::Byte,
            count: len,
        }
    }

    pub const fn width(&self) -> usize {
        self.primitive.width() * self.count
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count != 1 {
            write!(f, "{}", self.count)?;
        }
        write!(f, "{}", self.primitive.code())
    }
}

impl FromStr for FieldCode {
    type Err = FormatError;

    /// Parses codes such as `h`, `8b`, or `40s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FormatError::InvalidCode(s.to_string());
        let mut chars = s.chars();
        let primitive = chars
            .next_back()
            .and_then(Primitive::from_code)
            .ok_or_else(invalid)?;
        let digits = chars.as_str();
        let count = if digits.is_empty() {
            1
        } else {
            digits.parse::<usize>().map_err(|_| invalid())?
        };
        if count == 0 {
            return Err(invalid());
        }
        Ok(Self { primitive, count })
    }
}

// ── Field spec ─────────────────────────────────────────────────────────────

/// One named field of a binary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Identifier used for lookup in decoded records.
    pub name: &'static str,
    pub code: FieldCode,
    /// First format version containing this field. Fields are never removed.
    pub min_version: u32,
}

impl FieldSpec {
    pub const fn new(name: &'static str, code: FieldCode, min_version: u32) -> Self {
        Self {
            name,
            code,
            min_version,
        }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.code.width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_array_and_string_codes() {
        assert_eq!("h".parse::<FieldCode>().unwrap(), FieldCode::I16);
        assert_eq!(
            "8b".parse::<FieldCode>().unwrap(),
            FieldCode::array(Primitive::I8, 8)
        );
        assert_eq!("40s".parse::<FieldCode>().unwrap(), FieldCode::bytes(40));
        assert_eq!("s".parse::<FieldCode>().unwrap(), FieldCode::bytes(1));
    }

    #[test]
    fn rejects_unknown_or_empty_codes() {
        for bad in ["", "q", "0h", "x8", "8", "-2h"] {
            assert!(
                bad.parse::<FieldCode>().is_err(),
                "code {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_matches_parse_input() {
        for code in ["h", "i", "d", "8b", "6h", "40s", "10s"] {
            assert_eq!(code.parse::<FieldCode>().unwrap().to_string(), code);
        }
    }

    #[test]
    fn widths() {
        assert_eq!(FieldCode::I16.width(), 2);
        assert_eq!(FieldCode::I32.width(), 4);
        assert_eq!(FieldCode::F64.width(), 8);
        assert_eq!(FieldCode::array(Primitive::I16, 6).width(), 12);
        assert_eq!(FieldCode::bytes(40).width(), 40);
    }

    #[test]
    fn little_endian_sorts_first() {
        assert!(ByteOrder::Little < ByteOrder::Big);
        assert_eq!(ByteOrder::ALL, [ByteOrder::Little, ByteOrder::Big]);
        assert_eq!("<".parse::<ByteOrder>().unwrap(), ByteOrder::Little);
        assert_eq!("big".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
    }
}
