//! OpenType common layout tables and the script, language, feature and lookup resolution shared
//! by `GSUB` and `GPOS`.
//!
//! The tree is plain owned data so that it can be edited in place. It is turned into binary form
//! by the [`builder`] module.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2>

pub mod builder;

use std::convert::TryFrom;

use bitflags::bitflags;
use itertools::Itertools;
use log::debug;

use crate::error::{LayoutError, WriteError};
use crate::tag::{self, DisplayTag};

/// Version 1.0 of the `GSUB` and `GPOS` table headers.
pub const LAYOUT_VERSION: u32 = 0x0001_0000;

// GSUB and GPOS tables have the same top-level structure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutTable<S> {
    pub script_list: ScriptList,
    pub feature_list: FeatureList,
    pub lookup_list: LookupList<S>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptList {
    /// Sorted by script tag.
    pub script_records: Vec<ScriptRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRecord {
    pub script_tag: u32,
    pub script_table: ScriptTable,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptTable {
    /// Optional when read but required when writing.
    pub default_langsys: Option<LangSys>,
    /// Sorted by language system tag.
    pub langsys_records: Vec<LangSysRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LangSysRecord {
    pub langsys_tag: u32,
    pub langsys_table: LangSys,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LangSys {
    pub required_feature_index: u16,
    pub feature_indices: Vec<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureList {
    /// Sorted by feature tag. A tag may appear more than once.
    pub feature_records: Vec<FeatureRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureRecord {
    pub feature_tag: u32,
    pub feature_table: FeatureTable,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureTable {
    pub feature_params: u16, // offset to feature parameters, normally zero
    pub lookup_indices: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupList<S> {
    pub lookups: Vec<Lookup<S>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup<S> {
    pub lookup_type: u16,
    pub lookup_flag: LookupFlag,
    pub subtables: Vec<S>,
    /// Only written when `lookup_flag` contains `USE_MARK_FILTERING_SET`.
    pub mark_filtering_set: Option<u16>,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LookupFlag: u16 {
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE_MASK = 0xFF00;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coverage {
    Format1 { glyphs: Vec<u16> },
    Format2 { ranges: Vec<RangeRecord> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RangeRecord {
    pub start: u16,
    pub end: u16,
    /// Coverage index of `start`.
    pub index: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassDef {
    Format1 { start_glyph: u16, classes: Vec<u16> },
    Format2 { ranges: Vec<ClassRangeRecord> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClassRangeRecord {
    pub start: u16,
    pub end: u16,
    pub class: u16,
}

/// Records that are kept sorted by tag.
pub trait TaggedRecord {
    fn tag(&self) -> u32;
}

impl TaggedRecord for ScriptRecord {
    fn tag(&self) -> u32 {
        self.script_tag
    }
}

impl TaggedRecord for LangSysRecord {
    fn tag(&self) -> u32 {
        self.langsys_tag
    }
}

impl TaggedRecord for FeatureRecord {
    fn tag(&self) -> u32 {
        self.feature_tag
    }
}

/// Binary search of a sorted glyph array.
///
/// Returns the index of `id` when present, otherwise `-1 - i` where `i` is the index at which
/// `id` would have to be inserted to keep the array sorted.
pub fn bin_search(sorted: &[u16], id: u16) -> isize {
    to_search_result(sorted.binary_search(&id))
}

/// Binary search of tag-sorted records, with the same result convention as [`bin_search`].
pub fn search_tag<R: TaggedRecord>(records: &[R], tag: u32) -> isize {
    to_search_result(records.binary_search_by_key(&tag, R::tag))
}

fn to_search_result(result: Result<usize, usize>) -> isize {
    // Slices never hold more than isize::MAX elements
    match result {
        Ok(index) => index as isize,
        Err(insertion) => -1 - insertion as isize,
    }
}

/// All glyphs covered by `coverage`, in coverage index order.
pub fn expand_coverage(coverage: &Coverage) -> Vec<u16> {
    match coverage {
        Coverage::Format1 { glyphs } => glyphs.clone(),
        Coverage::Format2 { ranges } => ranges
            .iter()
            .flat_map(|range| range.start..=range.end)
            .collect(),
    }
}

/// The coverage index of `glyph`, if covered.
pub fn coverage_index(coverage: &Coverage, glyph: u16) -> Option<u16> {
    match coverage {
        Coverage::Format1 { glyphs } => glyphs
            .binary_search(&glyph)
            .ok()
            .and_then(|index| u16::try_from(index).ok()),
        Coverage::Format2 { ranges } => ranges
            .iter()
            .find(|range| (range.start..=range.end).contains(&glyph))
            .and_then(|range| range.index.checked_add(glyph - range.start)),
    }
}

/// The class of `glyph`. Glyphs not assigned a class are in class 0.
pub fn glyph_class(class_def: &ClassDef, glyph: u16) -> u16 {
    match class_def {
        ClassDef::Format1 {
            start_glyph,
            classes,
        } => glyph
            .checked_sub(*start_glyph)
            .and_then(|index| classes.get(usize::from(index)))
            .copied()
            .unwrap_or(0),
        ClassDef::Format2 { ranges } => ranges
            .iter()
            .find(|range| (range.start..=range.end).contains(&glyph))
            .map_or(0, |range| range.class),
    }
}

fn is_default_language(language: Option<u32>) -> bool {
    matches!(language, None | Some(tag::DFLT_LANG) | Some(tag::DFLT))
}

impl Coverage {
    /// Construct a coverage table from decoded values, selected by `format`.
    pub fn from_parts(
        format: u16,
        glyphs: Vec<u16>,
        ranges: Vec<RangeRecord>,
    ) -> Result<Coverage, LayoutError> {
        match format {
            1 => Ok(Coverage::Format1 { glyphs }),
            2 => Ok(Coverage::Format2 { ranges }),
            _ => Err(LayoutError::InvalidFormat {
                table: "Coverage",
                format,
            }),
        }
    }

    /// Build the more compact coverage table for a strictly ascending list of glyphs.
    pub fn from_glyphs(glyphs: &[u16]) -> Coverage {
        // At most 65536 distinct glyphs, so every index fits in a u16
        let ranges = glyphs
            .iter()
            .enumerate()
            .map(|(index, &glyph)| RangeRecord {
                start: glyph,
                end: glyph,
                index: index as u16,
            })
            .coalesce(|prev, next| {
                if prev.end.checked_add(1) == Some(next.start) {
                    Ok(RangeRecord {
                        end: next.end,
                        ..prev
                    })
                } else {
                    Err((prev, next))
                }
            })
            .collect::<Vec<_>>();

        // Each range record takes three times the space of a glyph array entry
        if ranges.len() * 3 < glyphs.len() {
            Coverage::Format2 { ranges }
        } else {
            Coverage::Format1 {
                glyphs: glyphs.to_vec(),
            }
        }
    }

    pub fn format(&self) -> u16 {
        match self {
            Coverage::Format1 { .. } => 1,
            Coverage::Format2 { .. } => 2,
        }
    }

    /// Convenience method to count the total number of glyphs covered
    pub fn glyph_count(&self) -> usize {
        match self {
            Coverage::Format1 { glyphs } => glyphs.len(),
            Coverage::Format2 { ranges } => ranges
                .iter()
                .filter(|range| range.start <= range.end)
                .map(|range| usize::from(range.end - range.start) + 1)
                .sum(),
        }
    }
}

impl ClassDef {
    /// Construct a class definition table from decoded values, selected by `format`.
    pub fn from_parts(
        format: u16,
        start_glyph: u16,
        classes: Vec<u16>,
        ranges: Vec<ClassRangeRecord>,
    ) -> Result<ClassDef, LayoutError> {
        match format {
            1 => Ok(ClassDef::Format1 {
                start_glyph,
                classes,
            }),
            2 => Ok(ClassDef::Format2 { ranges }),
            _ => Err(LayoutError::InvalidFormat {
                table: "ClassDef",
                format,
            }),
        }
    }

    pub fn format(&self) -> u16 {
        match self {
            ClassDef::Format1 { .. } => 1,
            ClassDef::Format2 { .. } => 2,
        }
    }
}

impl LangSys {
    pub const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

    pub fn new(feature_indices: Vec<u16>) -> LangSys {
        LangSys {
            required_feature_index: LangSys::NO_REQUIRED_FEATURE,
            feature_indices,
        }
    }

    pub fn has_required_feature(&self) -> bool {
        self.required_feature_index != LangSys::NO_REQUIRED_FEATURE
    }

    /// Adjust feature indices after a feature record was inserted at `position`.
    fn shift_feature_indices(&mut self, position: u16) {
        for index in self.feature_indices.iter_mut() {
            if *index >= position {
                *index = index.saturating_add(1);
            }
        }
        if self.has_required_feature() && self.required_feature_index >= position {
            self.required_feature_index += 1;
        }
    }
}

impl Default for LangSys {
    fn default() -> Self {
        LangSys::new(Vec::new())
    }
}

impl ScriptList {
    pub fn find_script(&self, script_tag: u32) -> Option<&ScriptTable> {
        let pos = search_tag(&self.script_records, script_tag);
        usize::try_from(pos)
            .ok()
            .map(|index| &self.script_records[index].script_table)
    }

    /// `DFLT` when present, otherwise the first script.
    fn default_script_index(&self) -> Option<usize> {
        match search_tag(&self.script_records, tag::DFLT) {
            pos if pos >= 0 => Some(pos as usize),
            _ if self.script_records.is_empty() => None,
            _ => Some(0),
        }
    }

    fn script_index(&self, script: Option<u32>) -> Option<usize> {
        match script {
            Some(script_tag) => usize::try_from(search_tag(&self.script_records, script_tag)).ok(),
            None => self.default_script_index(),
        }
    }

    fn get_or_create_script(&mut self, script: Option<u32>) -> usize {
        if let Some(index) = self.script_index(script) {
            return index;
        }
        let script_tag = script.unwrap_or(tag::DFLT);
        let pos = search_tag(&self.script_records, script_tag);
        let index = (-1 - pos) as usize;
        debug!("creating script '{}'", DisplayTag(script_tag));
        self.script_records.insert(
            index,
            ScriptRecord {
                script_tag,
                script_table: ScriptTable {
                    default_langsys: Some(LangSys::default()),
                    langsys_records: Vec::new(),
                },
            },
        );
        index
    }
}

impl ScriptTable {
    pub fn find_langsys(&self, langsys_tag: u32) -> Option<&LangSys> {
        let pos = search_tag(&self.langsys_records, langsys_tag);
        usize::try_from(pos)
            .ok()
            .map(|index| &self.langsys_records[index].langsys_table)
    }

    /// The language system for `language`. `None`, `dflt` and `DFLT` select the default.
    pub fn langsys(&self, language: Option<u32>) -> Option<&LangSys> {
        match language {
            Some(langsys_tag) if !is_default_language(language) => self.find_langsys(langsys_tag),
            _ => self.default_langsys.as_ref(),
        }
    }

    fn get_or_create_langsys(&mut self, language: Option<u32>) -> &mut LangSys {
        match language {
            Some(langsys_tag) if !is_default_language(language) => {
                let pos = search_tag(&self.langsys_records, langsys_tag);
                let index = match usize::try_from(pos) {
                    Ok(index) => index,
                    Err(_) => {
                        let index = (-1 - pos) as usize;
                        debug!("creating language system '{}'", DisplayTag(langsys_tag));
                        self.langsys_records.insert(
                            index,
                            LangSysRecord {
                                langsys_tag,
                                langsys_table: LangSys::default(),
                            },
                        );
                        index
                    }
                };
                &mut self.langsys_records[index].langsys_table
            }
            _ => self.default_langsys.get_or_insert_with(|| {
                debug!("creating default language system");
                LangSys::default()
            }),
        }
    }

    fn all_langsys_mut(&mut self) -> impl Iterator<Item = &mut LangSys> {
        self.default_langsys.iter_mut().chain(
            self.langsys_records
                .iter_mut()
                .map(|record| &mut record.langsys_table),
        )
    }
}

impl FeatureList {
    /// Index of the feature record for `feature_tag` among `feature_indices`.
    fn find_in(&self, feature_indices: &[u16], feature_tag: u32) -> Option<usize> {
        feature_indices
            .iter()
            .map(|&index| usize::from(index))
            .find(|&index| {
                self.feature_records
                    .get(index)
                    .map_or(false, |record| record.feature_tag == feature_tag)
            })
    }
}

impl<S> LookupList<S> {
    pub fn new() -> Self {
        LookupList {
            lookups: Vec::new(),
        }
    }
}

impl<S> Default for LookupList<S> {
    fn default() -> Self {
        LookupList::new()
    }
}

impl<S> Lookup<S> {
    pub fn new(lookup_type: u16) -> Self {
        Lookup {
            lookup_type,
            lookup_flag: LookupFlag::empty(),
            subtables: Vec::new(),
            mark_filtering_set: None,
        }
    }
}

impl<S> Default for LayoutTable<S> {
    fn default() -> Self {
        LayoutTable {
            script_list: ScriptList::default(),
            feature_list: FeatureList::default(),
            lookup_list: LookupList::default(),
        }
    }
}

impl<S> LayoutTable<S> {
    /// Tags of all scripts, in script list order.
    pub fn script_names(&self) -> Vec<u32> {
        self.script_list
            .script_records
            .iter()
            .map(|record| record.script_tag)
            .collect()
    }

    /// `DFLT` if the table has it, otherwise `latn` if the table has it.
    pub fn default_script_name(&self) -> Option<u32> {
        let names = self.script_names();
        [tag::DFLT, tag::LATN]
            .iter()
            .copied()
            .find(|name| names.contains(name))
    }

    /// The script table for `script`. `None` selects `DFLT`, falling back to the first script.
    pub fn script_table(&self, script: Option<u32>) -> Option<&ScriptTable> {
        self.script_list
            .script_index(script)
            .map(|index| &self.script_list.script_records[index].script_table)
    }

    pub fn langsys_table(&self, script: Option<u32>, language: Option<u32>) -> Option<&LangSys> {
        self.script_table(script)?.langsys(language)
    }

    pub fn feature_table(
        &self,
        script: Option<u32>,
        language: Option<u32>,
        feature_tag: u32,
    ) -> Option<&FeatureTable> {
        let langsys = self.langsys_table(script, language)?;
        let index = self
            .feature_list
            .find_in(&langsys.feature_indices, feature_tag)?;
        Some(&self.feature_list.feature_records[index].feature_table)
    }

    /// Indices of the lookups of `lookup_type` that `feature_tag` uses, in feature order.
    pub fn lookup_tables(
        &self,
        script: Option<u32>,
        language: Option<u32>,
        feature_tag: u32,
        lookup_type: u16,
    ) -> Vec<usize> {
        match self.feature_table(script, language, feature_tag) {
            Some(feature_table) => self.lookups_of_type(feature_table, lookup_type),
            None => Vec::new(),
        }
    }

    /// Like [`lookup_tables`](Self::lookup_tables), but creates whatever is missing.
    ///
    /// Missing scripts and language systems are inserted in tag order. A missing feature is
    /// inserted in tag order, shifting existing feature indices, and added to the language
    /// system. If the feature has no lookup of `lookup_type` an empty one is appended to the
    /// lookup list. Calling this again with the same arguments returns the same lookups.
    pub fn get_or_create_lookup_tables(
        &mut self,
        script: Option<u32>,
        language: Option<u32>,
        feature_tag: u32,
        lookup_type: u16,
    ) -> Result<Vec<usize>, LayoutError> {
        let feature_index = self.get_or_create_feature(script, language, feature_tag)?;
        let feature_table = &self.feature_list.feature_records[feature_index].feature_table;
        let existing = self.lookups_of_type(feature_table, lookup_type);
        if !existing.is_empty() {
            return Ok(existing);
        }

        let index = self.lookup_list.lookups.len();
        let lookup_index = u16::try_from(index)?;
        debug!(
            "creating lookup {} of type {} for feature '{}'",
            index,
            lookup_type,
            DisplayTag(feature_tag)
        );
        self.lookup_list.lookups.push(Lookup::new(lookup_type));
        self.feature_list.feature_records[feature_index]
            .feature_table
            .lookup_indices
            .push(lookup_index);
        Ok(vec![index])
    }

    fn lookups_of_type(&self, feature_table: &FeatureTable, lookup_type: u16) -> Vec<usize> {
        feature_table
            .lookup_indices
            .iter()
            .map(|&index| usize::from(index))
            .filter(|&index| {
                self.lookup_list
                    .lookups
                    .get(index)
                    .map_or(false, |lookup| lookup.lookup_type == lookup_type)
            })
            .collect()
    }

    fn get_or_create_feature(
        &mut self,
        script: Option<u32>,
        language: Option<u32>,
        feature_tag: u32,
    ) -> Result<usize, LayoutError> {
        let script_index = self.script_list.get_or_create_script(script);
        let script_table = &mut self.script_list.script_records[script_index].script_table;
        let langsys = script_table.get_or_create_langsys(language);
        if let Some(index) = self.feature_list.find_in(&langsys.feature_indices, feature_tag) {
            return Ok(index);
        }

        let records = &mut self.feature_list.feature_records;
        let index = records.partition_point(|record| record.feature_tag <= feature_tag);
        let position = u16::try_from(index)?;
        // After the shift the largest feature index is the current length, which must stay
        // below the no-required-feature marker
        if records.len() >= usize::from(LangSys::NO_REQUIRED_FEATURE) {
            return Err(LayoutError::Write(WriteError::BadValue));
        }
        debug!(
            "creating feature '{}' at index {}",
            DisplayTag(feature_tag),
            index
        );
        records.insert(
            index,
            FeatureRecord {
                feature_tag,
                feature_table: FeatureTable::default(),
            },
        );

        for script_record in self.script_list.script_records.iter_mut() {
            for langsys in script_record.script_table.all_langsys_mut() {
                langsys.shift_feature_indices(position);
            }
        }

        self.script_list.script_records[script_index]
            .script_table
            .get_or_create_langsys(language)
            .feature_indices
            .push(position);
        Ok(index)
    }
}
