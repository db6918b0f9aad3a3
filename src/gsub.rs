//! Glyph substitution (`gsub`) table editing.
//!
//! > The Glyph Substitution (GSUB) table provides data for substition of glyphs for appropriate
//! > rendering of scripts, such as cursively-connecting forms in Arabic script, or for advanced
//! > typographic effects, such as ligatures.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>
//!
//! Single, multiple, alternate and ligature substitutions (lookup types 1 to 4) can be read and
//! added per feature through [`Substitution`].

use std::convert::TryFrom;

use lazy_static::lazy_static;
use log::warn;
use rustc_hash::FxHashMap;

use crate::error::LayoutError;
use crate::layout::builder::{BuildTable, SubtableBuilders};
use crate::layout::{
    bin_search, expand_coverage, Coverage, LangSys, LayoutTable, Lookup, ScriptRecord,
    ScriptTable,
};
use crate::table::{table_list, ushort_list, Field, Table};
use crate::tag::{self, DisplayTag};
use crate::types::Scalar;

pub const SINGLE: u16 = 1;
pub const MULTIPLE: u16 = 2;
pub const ALTERNATE: u16 = 3;
pub const LIGATURE: u16 = 4;

pub type GsubTable = LayoutTable<SubstSubtable>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubstSubtable {
    Single(SingleSubst),
    Multiple(MultipleSubst),
    Alternate(AlternateSubst),
    Ligature(LigatureSubst),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SingleSubst {
    Format1 {
        coverage: Coverage,
        delta_glyph_id: i16,
    },
    Format2 {
        coverage: Coverage,
        substitutes: Vec<u16>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipleSubst {
    pub coverage: Coverage,
    pub sequences: Vec<Vec<u16>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternateSubst {
    pub coverage: Coverage,
    pub alternate_sets: Vec<Vec<u16>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LigatureSubst {
    pub coverage: Coverage,
    pub ligature_sets: Vec<Vec<Ligature>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ligature {
    pub ligature_glyph: u16,
    /// Components after the first, which is given by the coverage table.
    pub component_glyphs: Vec<u16>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SingleSubstitution {
    pub sub: u16,
    pub by: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipleSubstitution {
    pub sub: u16,
    pub by: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternateSubstitution {
    pub sub: u16,
    pub by: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LigatureSubstitution {
    pub sub: Vec<u16>,
    pub by: u16,
}

/// One side of a substitution rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Glyphs {
    Single(u16),
    Sequence(Vec<u16>),
}

/// A substitution of any of the supported lookup types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub sub: Glyphs,
    pub by: Glyphs,
}

type GetRules = fn(&Substitution, u32, Option<u32>, Option<u32>) -> Result<Vec<Rule>, LayoutError>;
type AddRule = fn(&mut Substitution, u32, Rule, Option<u32>, Option<u32>) -> Result<(), LayoutError>;

/// How the rules of a feature are stored.
#[derive(Copy, Clone)]
pub struct FeatureHandler {
    pub lookup_types: &'static [u16],
    get: GetRules,
    add: AddRule,
}

const SINGLES: FeatureHandler = FeatureHandler {
    lookup_types: &[SINGLE],
    get: Substitution::single_rules,
    add: Substitution::add_single_rule,
};

const SINGLES_AND_ALTERNATES: FeatureHandler = FeatureHandler {
    lookup_types: &[SINGLE, ALTERNATE],
    get: Substitution::single_and_alternate_rules,
    add: Substitution::add_single_or_alternate_rule,
};

const LIGATURES: FeatureHandler = FeatureHandler {
    lookup_types: &[LIGATURE],
    get: Substitution::ligature_rules,
    add: Substitution::add_ligature_rule,
};

const MULTIPLES_AND_LIGATURES: FeatureHandler = FeatureHandler {
    lookup_types: &[MULTIPLE, LIGATURE],
    get: Substitution::multiple_and_ligature_rules,
    add: Substitution::add_multiple_or_ligature_rule,
};

const MULTIPLES: FeatureHandler = FeatureHandler {
    lookup_types: &[MULTIPLE],
    get: Substitution::multiple_rules,
    add: Substitution::add_multiple_rule,
};

lazy_static! {
    static ref FEATURE_HANDLERS: FxHashMap<u32, FeatureHandler> = {
        let mut handlers = FxHashMap::default();
        for feature_tag in (1..=20).filter_map(tag::stylistic_set) {
            handlers.insert(feature_tag, SINGLES);
        }
        handlers.insert(tag::AALT, SINGLES_AND_ALTERNATES);
        handlers.insert(tag::SALT, SINGLES_AND_ALTERNATES);
        handlers.insert(tag::DLIG, LIGATURES);
        handlers.insert(tag::LIGA, LIGATURES);
        handlers.insert(tag::RLIG, LIGATURES);
        handlers.insert(tag::CCMP, MULTIPLES_AND_LIGATURES);
        handlers.insert(tag::STCH, MULTIPLES);
        handlers
    };
}

/// The handler for `feature_tag`, if substitutions for that feature are supported.
pub fn feature_handler(feature_tag: u32) -> Option<&'static FeatureHandler> {
    FEATURE_HANDLERS.get(&feature_tag)
}

/// Subtable builders for lookup types 1 to 4.
pub fn subtable_builders() -> SubtableBuilders<SubstSubtable> {
    SubtableBuilders::new()
        .with(SINGLE, build_single)
        .with(MULTIPLE, build_multiple)
        .with(ALTERNATE, build_alternate)
        .with(LIGATURE, build_ligature)
}

impl SubstSubtable {
    pub fn lookup_type(&self) -> u16 {
        match self {
            SubstSubtable::Single(_) => SINGLE,
            SubstSubtable::Multiple(_) => MULTIPLE,
            SubstSubtable::Alternate(_) => ALTERNATE,
            SubstSubtable::Ligature(_) => LIGATURE,
        }
    }
}

impl Glyphs {
    pub fn into_vec(self) -> Vec<u16> {
        match self {
            Glyphs::Single(glyph) => vec![glyph],
            Glyphs::Sequence(glyphs) => glyphs,
        }
    }
}

impl From<SingleSubstitution> for Rule {
    fn from(subst: SingleSubstitution) -> Rule {
        Rule {
            sub: Glyphs::Single(subst.sub),
            by: Glyphs::Single(subst.by),
        }
    }
}

impl From<MultipleSubstitution> for Rule {
    fn from(subst: MultipleSubstitution) -> Rule {
        Rule {
            sub: Glyphs::Single(subst.sub),
            by: Glyphs::Sequence(subst.by),
        }
    }
}

impl From<AlternateSubstitution> for Rule {
    fn from(subst: AlternateSubstitution) -> Rule {
        Rule {
            sub: Glyphs::Single(subst.sub),
            by: Glyphs::Sequence(subst.by),
        }
    }
}

impl From<LigatureSubstitution> for Rule {
    fn from(subst: LigatureSubstitution) -> Rule {
        Rule {
            sub: Glyphs::Sequence(subst.sub),
            by: Glyphs::Single(subst.by),
        }
    }
}

impl TryFrom<Rule> for SingleSubstitution {
    type Error = LayoutError;

    fn try_from(rule: Rule) -> Result<Self, Self::Error> {
        match rule {
            Rule {
                sub: Glyphs::Single(sub),
                by: Glyphs::Single(by),
            } => Ok(SingleSubstitution { sub, by }),
            _ => Err(LayoutError::InvalidArgument(
                "single substitution replaces one glyph with one glyph",
            )),
        }
    }
}

impl TryFrom<Rule> for MultipleSubstitution {
    type Error = LayoutError;

    fn try_from(rule: Rule) -> Result<Self, Self::Error> {
        match rule {
            Rule {
                sub: Glyphs::Single(sub),
                by: Glyphs::Sequence(by),
            } => Ok(MultipleSubstitution { sub, by }),
            _ => Err(LayoutError::InvalidArgument(
                "multiple substitution replaces one glyph with a sequence",
            )),
        }
    }
}

impl TryFrom<Rule> for AlternateSubstitution {
    type Error = LayoutError;

    fn try_from(rule: Rule) -> Result<Self, Self::Error> {
        match rule {
            Rule {
                sub: Glyphs::Single(sub),
                by: Glyphs::Sequence(by),
            } => Ok(AlternateSubstitution { sub, by }),
            _ => Err(LayoutError::InvalidArgument(
                "alternate substitution maps one glyph to a set of glyphs",
            )),
        }
    }
}

impl TryFrom<Rule> for LigatureSubstitution {
    type Error = LayoutError;

    fn try_from(rule: Rule) -> Result<Self, Self::Error> {
        match rule.by {
            Glyphs::Single(by) => Ok(LigatureSubstitution {
                sub: rule.sub.into_vec(),
                by,
            }),
            Glyphs::Sequence(_) => Err(LayoutError::InvalidArgument(
                "ligature substitution produces one glyph",
            )),
        }
    }
}

/// Ensure a coverage table covers as many glyphs as its parallel array has entries.
fn check_coverage(coverage: &Coverage, array_len: usize) -> Result<(), LayoutError> {
    let glyph_count = coverage.glyph_count();
    if glyph_count == array_len {
        Ok(())
    } else {
        Err(LayoutError::CoverageMismatch {
            coverage: glyph_count,
            array: array_len,
        })
    }
}

/// Covered glyphs paired with their entries in the parallel array `values`.
fn covered<'a, T>(
    coverage: &Coverage,
    values: &'a [T],
) -> Result<impl Iterator<Item = (u16, &'a T)>, LayoutError> {
    check_coverage(coverage, values.len())?;
    Ok(expand_coverage(coverage).into_iter().zip(values.iter()))
}

/// The entry for `glyph` in the parallel array `values`.
///
/// When `glyph` is not yet covered it is added to `coverage` and `empty()` is inserted into
/// `values` at the same position. Only format 1 coverage tables can be modified.
fn coverage_slot<'a, T>(
    coverage: &mut Coverage,
    values: &'a mut Vec<T>,
    glyph: u16,
    empty: impl FnOnce() -> T,
) -> Result<&'a mut T, LayoutError> {
    let glyphs = match coverage {
        Coverage::Format1 { glyphs } => glyphs,
        Coverage::Format2 { .. } => {
            return Err(LayoutError::InvalidFormat {
                table: "Coverage",
                format: 2,
            })
        }
    };
    if glyphs.len() != values.len() {
        return Err(LayoutError::CoverageMismatch {
            coverage: glyphs.len(),
            array: values.len(),
        });
    }

    let pos = bin_search(glyphs, glyph);
    let index = if pos >= 0 {
        pos as usize
    } else {
        let index = (-1 - pos) as usize;
        glyphs.insert(index, glyph);
        values.insert(index, empty());
        index
    };
    Ok(&mut values[index])
}

/// The first subtable that satisfies `is_match`, appending `new()` if there is none.
fn find_or_push<F, N>(subtables: &mut Vec<SubstSubtable>, is_match: F, new: N) -> &mut SubstSubtable
where
    F: Fn(&SubstSubtable) -> bool,
    N: FnOnce() -> SubstSubtable,
{
    let index = match subtables.iter().position(is_match) {
        Some(index) => index,
        None => {
            subtables.push(new());
            subtables.len() - 1
        }
    };
    &mut subtables[index]
}

fn empty_coverage() -> Coverage {
    Coverage::Format1 { glyphs: Vec::new() }
}

/// Editor for the `GSUB` table of a font.
///
/// The table is created on the first addition if the font does not have one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    table: Option<GsubTable>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution { table: None }
    }

    pub fn from_table(table: GsubTable) -> Self {
        Substitution { table: Some(table) }
    }

    pub fn table(&self) -> Option<&GsubTable> {
        self.table.as_ref()
    }

    pub fn into_table(self) -> Option<GsubTable> {
        self.table
    }

    /// A `GSUB` table with a `DFLT` script that has an empty default language system.
    pub fn create_default_table() -> GsubTable {
        let mut table = GsubTable::default();
        table.script_list.script_records.push(ScriptRecord {
            script_tag: tag::DFLT,
            script_table: ScriptTable {
                default_langsys: Some(LangSys::default()),
                langsys_records: Vec::new(),
            },
        });
        table
    }

    fn lookups(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
        lookup_type: u16,
    ) -> Vec<&Lookup<SubstSubtable>> {
        match &self.table {
            Some(table) => table
                .lookup_tables(script, language, feature_tag, lookup_type)
                .into_iter()
                .filter_map(|index| table.lookup_list.lookups.get(index))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The first lookup of `lookup_type` for the feature, created if necessary.
    fn lookup_mut(
        &mut self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
        lookup_type: u16,
    ) -> Result<&mut Lookup<SubstSubtable>, LayoutError> {
        let table = self
            .table
            .get_or_insert_with(Substitution::create_default_table);
        // Always at least one valid lookup index
        let indices =
            table.get_or_create_lookup_tables(script, language, feature_tag, lookup_type)?;
        Ok(&mut table.lookup_list.lookups[indices[0]])
    }

    /// All single substitutions of the feature, from every type 1 subtable.
    pub fn get_single(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<SingleSubstitution>, LayoutError> {
        let mut substitutions = Vec::new();
        for lookup in self.lookups(feature_tag, script, language, SINGLE) {
            for subtable in &lookup.subtables {
                match subtable {
                    SubstSubtable::Single(SingleSubst::Format1 {
                        coverage,
                        delta_glyph_id,
                    }) => {
                        // Addition of the delta is modulo 65536
                        let delta = *delta_glyph_id as u16;
                        substitutions.extend(expand_coverage(coverage).into_iter().map(|sub| {
                            SingleSubstitution {
                                sub,
                                by: sub.wrapping_add(delta),
                            }
                        }));
                    }
                    SubstSubtable::Single(SingleSubst::Format2 {
                        coverage,
                        substitutes,
                    }) => {
                        substitutions.extend(
                            covered(coverage, substitutes)?
                                .map(|(sub, &by)| SingleSubstitution { sub, by }),
                        );
                    }
                    _ => return Err(LayoutError::SubtableMismatch { lookup_type: SINGLE }),
                }
            }
        }
        Ok(substitutions)
    }

    pub fn get_multiple(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<MultipleSubstitution>, LayoutError> {
        let mut substitutions = Vec::new();
        for lookup in self.lookups(feature_tag, script, language, MULTIPLE) {
            for subtable in &lookup.subtables {
                match subtable {
                    SubstSubtable::Multiple(MultipleSubst {
                        coverage,
                        sequences,
                    }) => substitutions.extend(covered(coverage, sequences)?.map(
                        |(sub, sequence)| MultipleSubstitution {
                            sub,
                            by: sequence.clone(),
                        },
                    )),
                    _ => {
                        return Err(LayoutError::SubtableMismatch {
                            lookup_type: MULTIPLE,
                        })
                    }
                }
            }
        }
        Ok(substitutions)
    }

    pub fn get_alternates(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<AlternateSubstitution>, LayoutError> {
        let mut substitutions = Vec::new();
        for lookup in self.lookups(feature_tag, script, language, ALTERNATE) {
            for subtable in &lookup.subtables {
                match subtable {
                    SubstSubtable::Alternate(AlternateSubst {
                        coverage,
                        alternate_sets,
                    }) => substitutions.extend(covered(coverage, alternate_sets)?.map(
                        |(sub, alternates)| AlternateSubstitution {
                            sub,
                            by: alternates.clone(),
                        },
                    )),
                    _ => {
                        return Err(LayoutError::SubtableMismatch {
                            lookup_type: ALTERNATE,
                        })
                    }
                }
            }
        }
        Ok(substitutions)
    }

    pub fn get_ligatures(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<LigatureSubstitution>, LayoutError> {
        let mut substitutions = Vec::new();
        for lookup in self.lookups(feature_tag, script, language, LIGATURE) {
            for subtable in &lookup.subtables {
                let (coverage, ligature_sets) = match subtable {
                    SubstSubtable::Ligature(LigatureSubst {
                        coverage,
                        ligature_sets,
                    }) => (coverage, ligature_sets),
                    _ => {
                        return Err(LayoutError::SubtableMismatch {
                            lookup_type: LIGATURE,
                        })
                    }
                };
                for (first, ligature_set) in covered(coverage, ligature_sets)? {
                    substitutions.extend(ligature_set.iter().map(|ligature| {
                        let mut sub = Vec::with_capacity(ligature.component_glyphs.len() + 1);
                        sub.push(first);
                        sub.extend_from_slice(&ligature.component_glyphs);
                        LigatureSubstitution {
                            sub,
                            by: ligature.ligature_glyph,
                        }
                    }));
                }
            }
        }
        Ok(substitutions)
    }

    /// Add or replace the single substitution for `substitution.sub`.
    ///
    /// Substitutions are always added to a format 2 subtable. Format 1 subtables are left as
    /// they are.
    pub fn add_single(
        &mut self,
        feature_tag: u32,
        substitution: SingleSubstitution,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let lookup = self.lookup_mut(feature_tag, script, language, SINGLE)?;
        let subtable = find_or_push(
            &mut lookup.subtables,
            |subtable| matches!(subtable, SubstSubtable::Single(SingleSubst::Format2 { .. })),
            || {
                SubstSubtable::Single(SingleSubst::Format2 {
                    coverage: empty_coverage(),
                    substitutes: Vec::new(),
                })
            },
        );
        match subtable {
            SubstSubtable::Single(SingleSubst::Format2 {
                coverage,
                substitutes,
            }) => {
                *coverage_slot(coverage, substitutes, substitution.sub, || 0)? = substitution.by;
                Ok(())
            }
            _ => Err(LayoutError::SubtableMismatch { lookup_type: SINGLE }),
        }
    }

    /// Add or replace the sequence that `substitution.sub` is replaced by.
    pub fn add_multiple(
        &mut self,
        feature_tag: u32,
        substitution: MultipleSubstitution,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        if substitution.by.len() < 2 {
            return Err(LayoutError::InvalidArgument(
                "multiple substitution needs at least two replacement glyphs",
            ));
        }
        let lookup = self.lookup_mut(feature_tag, script, language, MULTIPLE)?;
        let subtable = find_or_push(
            &mut lookup.subtables,
            |subtable| matches!(subtable, SubstSubtable::Multiple(_)),
            || {
                SubstSubtable::Multiple(MultipleSubst {
                    coverage: empty_coverage(),
                    sequences: Vec::new(),
                })
            },
        );
        match subtable {
            SubstSubtable::Multiple(MultipleSubst {
                coverage,
                sequences,
            }) => {
                *coverage_slot(coverage, sequences, substitution.sub, Vec::new)? = substitution.by;
                Ok(())
            }
            _ => Err(LayoutError::SubtableMismatch {
                lookup_type: MULTIPLE,
            }),
        }
    }

    /// Add or replace the alternates of `substitution.sub`.
    pub fn add_alternate(
        &mut self,
        feature_tag: u32,
        substitution: AlternateSubstitution,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        if substitution.by.is_empty() {
            return Err(LayoutError::InvalidArgument(
                "alternate substitution needs at least one alternate",
            ));
        }
        let lookup = self.lookup_mut(feature_tag, script, language, ALTERNATE)?;
        let subtable = find_or_push(
            &mut lookup.subtables,
            |subtable| matches!(subtable, SubstSubtable::Alternate(_)),
            || {
                SubstSubtable::Alternate(AlternateSubst {
                    coverage: empty_coverage(),
                    alternate_sets: Vec::new(),
                })
            },
        );
        match subtable {
            SubstSubtable::Alternate(AlternateSubst {
                coverage,
                alternate_sets,
            }) => {
                *coverage_slot(coverage, alternate_sets, substitution.sub, Vec::new)? =
                    substitution.by;
                Ok(())
            }
            _ => Err(LayoutError::SubtableMismatch {
                lookup_type: ALTERNATE,
            }),
        }
    }

    /// Add a ligature to the set of its first glyph.
    ///
    /// Ligatures are kept in the order they are added, so longer ligatures sharing a first glyph
    /// must be added before shorter ones. Adding a ligature with the same components as an
    /// existing one changes nothing.
    pub fn add_ligature(
        &mut self,
        feature_tag: u32,
        substitution: LigatureSubstitution,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let (&first, components) = substitution.sub.split_first().ok_or(
            LayoutError::InvalidArgument("ligature substitution needs at least one glyph"),
        )?;
        let lookup = self.lookup_mut(feature_tag, script, language, LIGATURE)?;
        let subtable = find_or_push(
            &mut lookup.subtables,
            |subtable| matches!(subtable, SubstSubtable::Ligature(_)),
            || {
                SubstSubtable::Ligature(LigatureSubst {
                    coverage: empty_coverage(),
                    ligature_sets: Vec::new(),
                })
            },
        );
        let (coverage, ligature_sets) = match subtable {
            SubstSubtable::Ligature(LigatureSubst {
                coverage,
                ligature_sets,
            }) => (coverage, ligature_sets),
            _ => {
                return Err(LayoutError::SubtableMismatch {
                    lookup_type: LIGATURE,
                })
            }
        };

        let ligature_set = coverage_slot(coverage, ligature_sets, first, Vec::new)?;
        let existing = ligature_set
            .iter()
            .find(|ligature| ligature.component_glyphs == components)
            .map(|ligature| ligature.ligature_glyph);
        match existing {
            Some(ligature_glyph) if ligature_glyph != substitution.by => warn!(
                "feature '{}': ligature {:?} already maps to glyph {}, ignoring glyph {}",
                DisplayTag(feature_tag),
                substitution.sub,
                ligature_glyph,
                substitution.by
            ),
            Some(_) => {}
            None => ligature_set.push(Ligature {
                ligature_glyph: substitution.by,
                component_glyphs: components.to_vec(),
            }),
        }
        Ok(())
    }

    /// All substitutions of a feature, or `None` if the feature is not supported.
    pub fn get_feature(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Option<Vec<Rule>>, LayoutError> {
        match feature_handler(feature_tag) {
            Some(handler) => (handler.get)(self, feature_tag, script, language).map(Some),
            None => Ok(None),
        }
    }

    /// Add a substitution to a feature, choosing the lookup type from the feature and the rule.
    pub fn add(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let handler =
            feature_handler(feature_tag).ok_or(LayoutError::UnsupportedFeature(feature_tag))?;
        (handler.add)(self, feature_tag, rule, script, language)
    }

    fn single_rules(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<Rule>, LayoutError> {
        let singles = self.get_single(feature_tag, script, language)?;
        Ok(singles.into_iter().map(Rule::from).collect())
    }

    fn single_and_alternate_rules(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<Rule>, LayoutError> {
        let mut rules = self.single_rules(feature_tag, script, language)?;
        let alternates = self.get_alternates(feature_tag, script, language)?;
        rules.extend(alternates.into_iter().map(Rule::from));
        Ok(rules)
    }

    fn ligature_rules(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<Rule>, LayoutError> {
        let ligatures = self.get_ligatures(feature_tag, script, language)?;
        Ok(ligatures.into_iter().map(Rule::from).collect())
    }

    fn multiple_rules(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<Rule>, LayoutError> {
        let multiples = self.get_multiple(feature_tag, script, language)?;
        Ok(multiples.into_iter().map(Rule::from).collect())
    }

    fn multiple_and_ligature_rules(
        &self,
        feature_tag: u32,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<Vec<Rule>, LayoutError> {
        let mut rules = self.multiple_rules(feature_tag, script, language)?;
        rules.extend(self.ligature_rules(feature_tag, script, language)?);
        Ok(rules)
    }

    fn add_single_rule(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let substitution = SingleSubstitution::try_from(rule)?;
        self.add_single(feature_tag, substitution, script, language)
    }

    fn add_single_or_alternate_rule(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        match rule.by {
            Glyphs::Single(_) => self.add_single_rule(feature_tag, rule, script, language),
            Glyphs::Sequence(_) => {
                let substitution = AlternateSubstitution::try_from(rule)?;
                self.add_alternate(feature_tag, substitution, script, language)
            }
        }
    }

    fn add_ligature_rule(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let substitution = LigatureSubstitution::try_from(rule)?;
        self.add_ligature(feature_tag, substitution, script, language)
    }

    fn add_multiple_rule(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        let substitution = MultipleSubstitution::try_from(rule)?;
        self.add_multiple(feature_tag, substitution, script, language)
    }

    fn add_multiple_or_ligature_rule(
        &mut self,
        feature_tag: u32,
        rule: Rule,
        script: Option<u32>,
        language: Option<u32>,
    ) -> Result<(), LayoutError> {
        match rule.by {
            Glyphs::Sequence(_) => self.add_multiple_rule(feature_tag, rule, script, language),
            Glyphs::Single(_) => self.add_ligature_rule(feature_tag, rule, script, language),
        }
    }

    /// The `GSUB` table as an encodable [`Table`], `None` if there is no table.
    pub fn build_table(&self) -> Result<Option<Table>, LayoutError> {
        self.table
            .as_ref()
            .map(|table| table.build_table("GSUB", &subtable_builders()))
            .transpose()
    }

    pub fn encode(&self) -> Result<Option<Vec<u8>>, LayoutError> {
        match self.build_table()? {
            Some(table) => Ok(Some(table.encode()?)),
            None => Ok(None),
        }
    }

    pub fn size_of(&self) -> Result<Option<usize>, LayoutError> {
        match self.build_table()? {
            Some(table) => Ok(Some(table.size_of()?)),
            None => Ok(None),
        }
    }
}

fn build_single(subtable: &SubstSubtable) -> Result<Table, LayoutError> {
    let fields = match subtable {
        SubstSubtable::Single(SingleSubst::Format1 {
            coverage,
            delta_glyph_id,
        }) => vec![
            Field::ushort("substFormat", 1),
            Field::table("coverage", coverage.build_table()?),
            Field::scalar("deltaGlyphID", Scalar::Short(*delta_glyph_id)),
        ],
        SubstSubtable::Single(SingleSubst::Format2 {
            coverage,
            substitutes,
        }) => {
            check_coverage(coverage, substitutes.len())?;
            let mut fields = vec![
                Field::ushort("substFormat", 2),
                Field::table("coverage", coverage.build_table()?),
            ];
            fields.extend(ushort_list("substitute", substitutes, None)?);
            fields
        }
        _ => return Err(LayoutError::SubtableMismatch { lookup_type: SINGLE }),
    };
    Ok(Table::new("SingleSubst", fields))
}

fn build_multiple(subtable: &SubstSubtable) -> Result<Table, LayoutError> {
    let (coverage, sequences) = match subtable {
        SubstSubtable::Multiple(MultipleSubst {
            coverage,
            sequences,
        }) => (coverage, sequences),
        _ => {
            return Err(LayoutError::SubtableMismatch {
                lookup_type: MULTIPLE,
            })
        }
    };
    check_coverage(coverage, sequences.len())?;

    let mut fields = vec![
        Field::ushort("substFormat", 1),
        Field::table("coverage", coverage.build_table()?),
    ];
    fields.extend(table_list(
        "sequence",
        sequences,
        |sequence, _| -> Result<Table, LayoutError> {
            Ok(Table::new(
                "Sequence",
                ushort_list("substitute", sequence, None)?,
            ))
        },
    )?);
    Ok(Table::new("MultipleSubst", fields))
}

fn build_alternate(subtable: &SubstSubtable) -> Result<Table, LayoutError> {
    let (coverage, alternate_sets) = match subtable {
        SubstSubtable::Alternate(AlternateSubst {
            coverage,
            alternate_sets,
        }) => (coverage, alternate_sets),
        _ => {
            return Err(LayoutError::SubtableMismatch {
                lookup_type: ALTERNATE,
            })
        }
    };
    check_coverage(coverage, alternate_sets.len())?;

    let mut fields = vec![
        Field::ushort("substFormat", 1),
        Field::table("coverage", coverage.build_table()?),
    ];
    fields.extend(table_list(
        "alternateSet",
        alternate_sets,
        |alternates, _| -> Result<Table, LayoutError> {
            Ok(Table::new(
                "AlternateSet",
                ushort_list("alternate", alternates, None)?,
            ))
        },
    )?);
    Ok(Table::new("AlternateSubst", fields))
}

fn build_ligature(subtable: &SubstSubtable) -> Result<Table, LayoutError> {
    let (coverage, ligature_sets) = match subtable {
        SubstSubtable::Ligature(LigatureSubst {
            coverage,
            ligature_sets,
        }) => (coverage, ligature_sets),
        _ => {
            return Err(LayoutError::SubtableMismatch {
                lookup_type: LIGATURE,
            })
        }
    };
    check_coverage(coverage, ligature_sets.len())?;

    let mut fields = vec![
        Field::ushort("substFormat", 1),
        Field::table("coverage", coverage.build_table()?),
    ];
    fields.extend(table_list("ligatureSet", ligature_sets, |ligature_set, _| {
        build_ligature_set(ligature_set)
    })?);
    Ok(Table::new("LigatureSubst", fields))
}

fn build_ligature_set(ligature_set: &[Ligature]) -> Result<Table, LayoutError> {
    let fields = table_list("ligature", ligature_set, |ligature, _| {
        build_ligature_table(ligature)
    })?;
    Ok(Table::new("LigatureSet", fields))
}

fn build_ligature_table(ligature: &Ligature) -> Result<Table, LayoutError> {
    // The count includes the first component, which is not stored
    let component_count = u16::try_from(ligature.component_glyphs.len() + 1)?;
    let mut fields = vec![Field::ushort("ligatureGlyph", ligature.ligature_glyph)];
    fields.extend(ushort_list(
        "component",
        &ligature.component_glyphs,
        Some(component_count),
    )?);
    Ok(Table::new("Ligature", fields))
}
