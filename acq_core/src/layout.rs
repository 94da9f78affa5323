//! Versioned field layout tables.
//!
//! A table is an ordered list of [`FieldSpec`]s; order defines byte offsets.
//! Each field records the first format version that contains it, and later
//! versions only ever append fields, so the layout for any version is the
//! subsequence of fields introduced at or before it.

use serde::Serialize;

use crate::field::{FieldCode, FieldSpec, Primitive};

/// Position of the version indicator in every table.
pub const VERSION_FIELD_INDEX: usize = 1;

/// Format revision that introduced the extended main header.
pub const V_30: u32 = 30;

/// Immutable, ordered description of a binary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayoutTable {
    fields: &'static [FieldSpec],
}

impl FieldLayoutTable {
    /// # Panics
    /// If there are fewer than two fields, or either of the first two fields
    /// (the second being the version indicator) is absent from version 0.
    /// For a `static` table this is a compile-time error.
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        assert!(fields.len() >= 2, "a layout table needs at least two fields");
        assert!(
            fields[0].min_version == 0 && fields[VERSION_FIELD_INDEX].min_version == 0,
            "the leading field and the version field must exist in version 0"
        );
        Self { fields }
    }

    /// Every field, in table order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Fields present in `target_version`, in table order.
    ///
    /// A field is included iff `field.min_version <= target_version`; version 0
    /// selects exactly the fields of the first format revision.
    pub fn fields_for(&self, target_version: u32) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.min_version <= target_version)
            .copied()
            .collect()
    }

    pub fn version_field(&self) -> &'static FieldSpec {
        &self.fields[VERSION_FIELD_INDEX]
    }

    pub fn get(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ── AcqKnowledge main header ───────────────────────────────────────────────

const MAIN_HEADER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("nItemHeaderLen", FieldCode::I16, 0),
    FieldSpec::new("iVersion", FieldCode::I32, 0),
    FieldSpec::new("iExtItemHeaderLen", FieldCode::I32, V_30),
    FieldSpec::new("nChannels", FieldCode::I16, V_30),
    FieldSpec::new("nHorizAxisType", FieldCode::I16, V_30),
    FieldSpec::new("nCurChannel", FieldCode::I16, V_30),
    FieldSpec::new("dSampleTime", FieldCode::F64, V_30),
    FieldSpec::new("dTimeOffset", FieldCode::F64, V_30),
    FieldSpec::new("dTimeScale", FieldCode::F64, V_30),
    FieldSpec::new("dTimeCursor1", FieldCode::F64, V_30),
    FieldSpec::new("dTimeCursor2", FieldCode::F64, V_30),
    FieldSpec::new("rcWindow", FieldCode::array(Primitive::I8, 8), V_30),
    FieldSpec::new("nMeasurement", FieldCode::array(Primitive::I16, 6), V_30),
    FieldSpec::new("fHilite", FieldCode::I16, V_30),
    FieldSpec::new("dFirstTimeOffset", FieldCode::F64, V_30),
    FieldSpec::new("nRescale", FieldCode::I16, V_30),
    FieldSpec::new("szHorizUnits1", FieldCode::bytes(40), V_30),
    FieldSpec::new("szHorizUnits2", FieldCode::bytes(10), V_30),
    FieldSpec::new("nInMemory", FieldCode::I16, V_30),
    FieldSpec::new("fGrid", FieldCode::I16, V_30),
    FieldSpec::new("fMarkers", FieldCode::I16, V_30),
    FieldSpec::new("nPlotDraft", FieldCode::I16, V_30),
    FieldSpec::new("nDispMode", FieldCode::I16, V_30),
    FieldSpec::new("rRReserved", FieldCode::I16, V_30),
];

/// Main file header of an AcqKnowledge file.
pub static MAIN_HEADER: FieldLayoutTable = FieldLayoutTable::new(MAIN_HEADER_FIELDS);

// ── Offset diagnostics ─────────────────────────────────────────────────────

/// Cumulative byte offset of a field from the start of its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldOffset {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

/// Offset of every field in `fields`, for checking a table against published
/// offsets. Byte order does not affect size, so none is involved.
pub fn field_offsets(fields: &[FieldSpec]) -> Vec<FieldOffset> {
    fields
        .iter()
        .scan(0usize, |offset, f| {
            let entry = FieldOffset {
                name: f.name,
                offset: *offset,
                width: f.width(),
            };
            *offset += f.width();
            Some(entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROWING_FIELDS: &[FieldSpec] = &[
        FieldSpec::new("len", FieldCode::I16, 0),
        FieldSpec::new("version", FieldCode::I32, 0),
        FieldSpec::new("a", FieldCode::I32, 2),
        FieldSpec::new("b", FieldCode::I16, 5),
        FieldSpec::new("c", FieldCode::F64, 2),
    ];
    static GROWING: FieldLayoutTable = FieldLayoutTable::new(GROWING_FIELDS);

    fn names(fields: &[FieldSpec]) -> Vec<&'static str> {
        fields.iter().map(|f| f.name).collect()
    }

    #[test]
    fn version_zero_selects_first_revision_only() {
        assert_eq!(names(&GROWING.fields_for(0)), ["len", "version"]);
        assert_eq!(names(&MAIN_HEADER.fields_for(0)), ["nItemHeaderLen", "iVersion"]);
    }

    #[test]
    fn fields_for_preserves_table_order() {
        assert_eq!(names(&GROWING.fields_for(2)), ["len", "version", "a", "c"]);
        assert_eq!(names(&GROWING.fields_for(5)), ["len", "version", "a", "b", "c"]);
    }

    #[test]
    fn fields_for_is_monotonic() {
        for v1 in 0..8 {
            for v2 in v1..8 {
                let earlier = GROWING.fields_for(v1);
                let later = GROWING.fields_for(v2);
                assert!(
                    earlier.iter().all(|f| later.contains(f)),
                    "fields at version {v1} must remain present at {v2}"
                );
                // Relative order survives.
                let positions: Vec<usize> = earlier
                    .iter()
                    .map(|f| later.iter().position(|g| g == f).unwrap())
                    .collect();
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn main_header_at_version_30_has_every_field() {
        assert_eq!(MAIN_HEADER.fields_for(V_30).len(), 24);
        assert_eq!(MAIN_HEADER.fields_for(29).len(), 2);
        assert_eq!(MAIN_HEADER.version_field().name, "iVersion");
    }

    #[test]
    fn offsets_are_cumulative_widths() {
        const WIDTHS_2_4_4_2: &[FieldSpec] = &[
            FieldSpec::new("w2", FieldCode::I16, 0),
            FieldSpec::new("w4a", FieldCode::I32, 0),
            FieldSpec::new("w4b", FieldCode::I32, 0),
            FieldSpec::new("w2b", FieldCode::I16, 0),
        ];
        let offsets: Vec<usize> = field_offsets(WIDTHS_2_4_4_2)
            .iter()
            .map(|o| o.offset)
            .collect();
        assert_eq!(offsets, [0, 2, 6, 10]);
    }

    #[test]
    fn main_header_offsets() {
        let offsets = field_offsets(&MAIN_HEADER.fields_for(V_30));
        let at = |name: &str| offsets.iter().find(|o| o.name == name).unwrap().offset;
        assert_eq!(at("nItemHeaderLen"), 0);
        assert_eq!(at("iVersion"), 2);
        assert_eq!(at("iExtItemHeaderLen"), 6);
        assert_eq!(at("dSampleTime"), 16);
        assert_eq!(at("rcWindow"), 56);
        assert_eq!(at("szHorizUnits1"), 88);
        assert_eq!(at("rRReserved"), 148);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(MAIN_HEADER.get("nChannels").unwrap().min_version, V_30);
        assert!(MAIN_HEADER.get("nope").is_none());
    }
}
