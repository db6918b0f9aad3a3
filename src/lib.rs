#![warn(rust_2018_idioms)]

//! # otlayout
//!
//! Writing of OpenType tables and editing of the `GSUB` layout table.
//!
//! Tables are described as trees of [`table::Table`] values that are encoded with 16-bit
//! offsets to their subtables. The [`layout`] module resolves scripts, language systems and
//! features to lookups and builds the shared layout structures. [`gsub::Substitution`] reads and
//! adds single, multiple, alternate and ligature substitutions, and [`sfnt::FontBuilder`]
//! assembles encoded tables into a font file.

/// Reading and writing of binary data.
pub mod binary;
/// Checksum calculation routines.
pub mod checksum;
pub mod error;
pub mod gsub;
pub mod layout;
pub mod sfnt;
pub mod size;
pub mod table;
pub mod tag;
pub mod types;
