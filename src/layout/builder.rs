//! Translation of layout trees into encodable [`Table`]s.
//!
//! Field names follow the OpenType specification, with list elements numbered from zero
//! (`startGlyphID0`, `startGlyphID1`, ...).

use rustc_hash::FxHashMap;

use crate::error::LayoutError;
use crate::layout::{
    ClassDef, Coverage, FeatureList, LangSys, LayoutTable, Lookup, LookupFlag, LookupList,
    ScriptList, LAYOUT_VERSION,
};
use crate::table::{record_list, table_list, ushort_list, Field, Table};
use crate::types::Scalar;

/// Layout structures that can be written without further context.
pub trait BuildTable {
    fn build_table(&self) -> Result<Table, LayoutError>;
}

/// Builds the table for one lookup subtable.
pub type SubtableBuilder<S> = fn(&S) -> Result<Table, LayoutError>;

/// Subtable builders keyed by lookup type.
pub struct SubtableBuilders<S> {
    builders: FxHashMap<u16, SubtableBuilder<S>>,
}

impl<S> SubtableBuilders<S> {
    pub fn new() -> Self {
        SubtableBuilders {
            builders: FxHashMap::default(),
        }
    }

    pub fn with(mut self, lookup_type: u16, builder: SubtableBuilder<S>) -> Self {
        self.builders.insert(lookup_type, builder);
        self
    }

    pub fn get(&self, lookup_type: u16) -> Option<SubtableBuilder<S>> {
        self.builders.get(&lookup_type).copied()
    }
}

impl<S> Default for SubtableBuilders<S> {
    fn default() -> Self {
        SubtableBuilders::new()
    }
}

impl BuildTable for Coverage {
    fn build_table(&self) -> Result<Table, LayoutError> {
        let mut fields = vec![Field::ushort("coverageFormat", self.format())];
        match self {
            Coverage::Format1 { glyphs } => fields.extend(ushort_list("glyph", glyphs, None)?),
            Coverage::Format2 { ranges } => {
                fields.extend(record_list::<_, LayoutError, _>(
                    "rangeRecord",
                    ranges,
                    |range, i| {
                        Ok(vec![
                            Field::ushort(format!("startGlyphID{}", i), range.start),
                            Field::ushort(format!("endGlyphID{}", i), range.end),
                            Field::ushort(format!("startCoverageIndex{}", i), range.index),
                        ])
                    },
                )?)
            }
        }
        Ok(Table::new("Coverage", fields))
    }
}

impl BuildTable for ClassDef {
    fn build_table(&self) -> Result<Table, LayoutError> {
        let mut fields = vec![Field::ushort("classFormat", self.format())];
        match self {
            ClassDef::Format1 {
                start_glyph,
                classes,
            } => {
                fields.push(Field::ushort("startGlyphID", *start_glyph));
                fields.extend(ushort_list("classValue", classes, None)?);
            }
            ClassDef::Format2 { ranges } => {
                fields.extend(record_list::<_, LayoutError, _>(
                    "classRangeRecord",
                    ranges,
                    |range, i| {
                        Ok(vec![
                            Field::ushort(format!("startGlyphID{}", i), range.start),
                            Field::ushort(format!("endGlyphID{}", i), range.end),
                            Field::ushort(format!("class{}", i), range.class),
                        ])
                    },
                )?)
            }
        }
        Ok(Table::new("ClassDef", fields))
    }
}

impl BuildTable for LangSys {
    fn build_table(&self) -> Result<Table, LayoutError> {
        let mut fields = vec![
            Field::ushort("lookupOrder", 0),
            Field::ushort("reqFeatureIndex", self.required_feature_index),
        ];
        fields.extend(ushort_list("featureIndex", &self.feature_indices, None)?);
        Ok(Table::new("LangSys", fields))
    }
}

impl BuildTable for ScriptList {
    /// Every script must have a default language system.
    fn build_table(&self) -> Result<Table, LayoutError> {
        let fields = record_list(
            "scriptRecord",
            &self.script_records,
            |record, i| -> Result<Vec<Field>, LayoutError> {
                let script = &record.script_table;
                let default_langsys = script.default_langsys.as_ref().ok_or(
                    LayoutError::MissingRequiredField {
                        script: record.script_tag,
                    },
                )?;

                let mut script_fields =
                    vec![Field::table("defaultLangSys", default_langsys.build_table()?)];
                script_fields.extend(record_list(
                    "langSys",
                    &script.langsys_records,
                    |langsys_record, j| -> Result<Vec<Field>, LayoutError> {
                        Ok(vec![
                            Field::tag(format!("langSysTag{}", j), langsys_record.langsys_tag),
                            Field::table(
                                format!("langSys{}", j),
                                langsys_record.langsys_table.build_table()?,
                            ),
                        ])
                    },
                )?);

                Ok(vec![
                    Field::tag(format!("scriptTag{}", i), record.script_tag),
                    Field::table(format!("script{}", i), Table::new("Script", script_fields)),
                ])
            },
        )?;
        Ok(Table::new("ScriptList", fields))
    }
}

impl BuildTable for FeatureList {
    fn build_table(&self) -> Result<Table, LayoutError> {
        let fields = record_list(
            "featureRecord",
            &self.feature_records,
            |record, i| -> Result<Vec<Field>, LayoutError> {
                let feature = &record.feature_table;
                let mut feature_fields =
                    vec![Field::ushort("featureParams", feature.feature_params)];
                feature_fields.extend(ushort_list(
                    "lookupListIndex",
                    &feature.lookup_indices,
                    None,
                )?);
                Ok(vec![
                    Field::tag(format!("featureTag{}", i), record.feature_tag),
                    Field::table(format!("feature{}", i), Table::new("Feature", feature_fields)),
                ])
            },
        )?;
        Ok(Table::new("FeatureList", fields))
    }
}

impl<S> Lookup<S> {
    pub fn build_table(&self, builders: &SubtableBuilders<S>) -> Result<Table, LayoutError> {
        let builder = builders
            .get(self.lookup_type)
            .ok_or(LayoutError::UnsupportedLookupType(self.lookup_type))?;

        let mut fields = vec![
            Field::ushort("lookupType", self.lookup_type),
            Field::ushort("lookupFlag", self.lookup_flag.bits()),
        ];
        fields.extend(table_list("subtable", &self.subtables, |subtable, _| {
            builder(subtable)
        })?);
        if self.lookup_flag.contains(LookupFlag::USE_MARK_FILTERING_SET) {
            let mark_filtering_set = self.mark_filtering_set.ok_or(LayoutError::InvalidArgument(
                "lookup flag requires a mark filtering set",
            ))?;
            fields.push(Field::ushort("markFilteringSet", mark_filtering_set));
        }
        Ok(Table::new("Lookup", fields))
    }
}

impl<S> LookupList<S> {
    pub fn build_table(&self, builders: &SubtableBuilders<S>) -> Result<Table, LayoutError> {
        let fields = table_list("lookup", &self.lookups, |lookup, _| {
            lookup.build_table(builders)
        })?;
        Ok(Table::new("LookupList", fields))
    }
}

impl<S> LayoutTable<S> {
    /// Build a complete `GSUB` or `GPOS` table, named `name`.
    pub fn build_table(
        &self,
        name: &str,
        builders: &SubtableBuilders<S>,
    ) -> Result<Table, LayoutError> {
        Ok(Table::new(
            name,
            vec![
                Field::scalar("version", Scalar::ULong(LAYOUT_VERSION)),
                Field::table("scriptList", self.script_list.build_table()?),
                Field::table("featureList", self.feature_list.build_table()?),
                Field::table("lookupList", self.lookup_list.build_table(builders)?),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriteError;
    use crate::layout::{
        ClassRangeRecord, FeatureRecord, FeatureTable, LangSysRecord, RangeRecord, ScriptRecord,
        ScriptTable,
    };
    use crate::tag;

    fn build_u16(value: &u16) -> Result<Table, LayoutError> {
        Ok(Table::new("Raw", vec![Field::ushort("value", *value)]))
    }

    #[test]
    fn test_coverage_format1() {
        let coverage = Coverage::Format1 {
            glyphs: vec![0x38, 0x3B, 0x41, 0x42, 0x4A],
        };
        let expected = [
            0x00, 0x01, // coverageFormat
            0x00, 0x05, // glyphCount
            0x00, 0x38, 0x00, 0x3B, 0x00, 0x41, 0x00, 0x42, 0x00, 0x4A, // glyphArray
        ];
        let table = coverage.build_table().unwrap();
        assert_eq!(table.encode().unwrap(), expected);
        assert_eq!(table.size_of().unwrap(), expected.len());
    }

    #[test]
    fn test_coverage_format2() {
        let coverage = Coverage::Format2 {
            ranges: vec![RangeRecord {
                start: 0x4E,
                end: 0x57,
                index: 0,
            }],
        };
        let expected = [
            0x00, 0x02, // coverageFormat
            0x00, 0x01, // rangeCount
            0x00, 0x4E, 0x00, 0x57, 0x00, 0x00, // rangeRecord[0]
        ];
        assert_eq!(coverage.build_table().unwrap().encode().unwrap(), expected);
    }

    #[test]
    fn test_class_def_formats() {
        let class_def = ClassDef::Format1 {
            start_glyph: 0x32,
            classes: vec![0, 1, 1],
        };
        assert_eq!(
            class_def.build_table().unwrap().encode().unwrap(),
            [0x00, 0x01, 0x00, 0x32, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01]
        );

        let class_def = ClassDef::Format2 {
            ranges: vec![ClassRangeRecord {
                start: 0x30,
                end: 0x31,
                class: 2,
            }],
        };
        assert_eq!(
            class_def.build_table().unwrap().encode().unwrap(),
            [0x00, 0x02, 0x00, 0x01, 0x00, 0x30, 0x00, 0x31, 0x00, 0x02]
        );
    }

    #[test]
    fn test_script_list() {
        let script_list = ScriptList {
            script_records: vec![ScriptRecord {
                script_tag: tag::LATN,
                script_table: ScriptTable {
                    default_langsys: Some(LangSys::new(vec![0])),
                    langsys_records: vec![LangSysRecord {
                        langsys_tag: tag::from_string("TRK").unwrap(),
                        langsys_table: LangSys::new(vec![0, 1]),
                    }],
                },
            }],
        };
        let expected = [
            0x00, 0x01, // scriptCount
            b'l', b'a', b't', b'n', // scriptTag
            0x00, 0x08, // scriptOffset
            // Script
            0x00, 0x0A, // defaultLangSysOffset
            0x00, 0x01, // langSysCount
            b'T', b'R', b'K', b' ', // langSysTag
            0x00, 0x12, // langSysOffset
            // default LangSys
            0x00, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0x00, 0x00, //
            // TRK LangSys
            0x00, 0x00, 0xFF, 0xFF, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01,
        ];
        let table = script_list.build_table().unwrap();
        assert_eq!(table.encode().unwrap(), expected);
        assert_eq!(table.size_of().unwrap(), expected.len());
    }

    #[test]
    fn test_script_without_default_langsys() {
        let script_list = ScriptList {
            script_records: vec![
                ScriptRecord {
                    script_tag: tag::DFLT,
                    script_table: ScriptTable {
                        default_langsys: Some(LangSys::default()),
                        langsys_records: Vec::new(),
                    },
                },
                ScriptRecord {
                    script_tag: tag::LATN,
                    script_table: ScriptTable::default(),
                },
            ],
        };
        let err = script_list.build_table().unwrap_err();
        assert_eq!(err, LayoutError::MissingRequiredField { script: tag::LATN });
        assert!(err.to_string().contains("latn"));
    }

    #[test]
    fn test_feature_list() {
        let feature_list = FeatureList {
            feature_records: vec![FeatureRecord {
                feature_tag: tag::LIGA,
                feature_table: FeatureTable {
                    feature_params: 0,
                    lookup_indices: vec![0],
                },
            }],
        };
        let expected = [
            0x00, 0x01, // featureCount
            b'l', b'i', b'g', b'a', // featureTag
            0x00, 0x08, // featureOffset
            0x00, 0x00, // featureParams
            0x00, 0x01, // lookupIndexCount
            0x00, 0x00, // lookupListIndices
        ];
        assert_eq!(feature_list.build_table().unwrap().encode().unwrap(), expected);
    }

    #[test]
    fn test_lookup_list() {
        let mut lookup = Lookup::new(1);
        lookup.subtables = vec![0x1234u16];
        lookup.lookup_flag = LookupFlag::IGNORE_MARKS | LookupFlag::USE_MARK_FILTERING_SET;
        lookup.mark_filtering_set = Some(2);
        let lookup_list = LookupList {
            lookups: vec![lookup],
        };
        let builders = SubtableBuilders::new().with(1, build_u16);

        let expected = [
            0x00, 0x01, // lookupCount
            0x00, 0x04, // lookupOffset
            // Lookup
            0x00, 0x01, // lookupType
            0x00, 0x18, // lookupFlag
            0x00, 0x01, // subTableCount
            0x00, 0x0A, // subtableOffset
            0x00, 0x02, // markFilteringSet
            // subtable
            0x12, 0x34,
        ];
        let table = lookup_list.build_table(&builders).unwrap();
        assert_eq!(table.encode().unwrap(), expected);
        assert_eq!(table.size_of().unwrap(), expected.len());
    }

    #[test]
    fn test_unsupported_lookup_type() {
        let lookup_list = LookupList {
            lookups: vec![Lookup::<u16>::new(5)],
        };
        let builders = SubtableBuilders::new().with(1, build_u16);
        assert_eq!(
            lookup_list.build_table(&builders),
            Err(LayoutError::UnsupportedLookupType(5))
        );
    }

    #[test]
    fn test_missing_mark_filtering_set() {
        let mut lookup = Lookup::<u16>::new(1);
        lookup.lookup_flag = LookupFlag::USE_MARK_FILTERING_SET;
        let builders = SubtableBuilders::new().with(1, build_u16);
        assert!(matches!(
            lookup.build_table(&builders),
            Err(LayoutError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_layout_table_header() {
        let table = LayoutTable::<u16>::default();
        let expected = [
            0x00, 0x01, 0x00, 0x00, // version
            0x00, 0x0A, // scriptListOffset
            0x00, 0x0C, // featureListOffset
            0x00, 0x0E, // lookupListOffset
            0x00, 0x00, // scriptCount
            0x00, 0x00, // featureCount
            0x00, 0x00, // lookupCount
        ];
        let table = table.build_table("GSUB", &SubtableBuilders::new()).unwrap();
        assert_eq!(table.encode().unwrap(), expected);
    }

    #[test]
    fn test_too_many_glyphs() {
        let coverage = Coverage::Format1 {
            glyphs: vec![1; 70_000],
        };
        assert_eq!(
            coverage.build_table(),
            Err(LayoutError::Write(WriteError::BadValue))
        );
    }
}
