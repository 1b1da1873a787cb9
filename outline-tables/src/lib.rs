//! Reading, writing and subsetting glyph outline tables.
//!
//! This crate implements codecs for the two outline formats used by
//! OpenType fonts:
//!
//! * the Compact Font Format ([`tables::cff`]) with its Type 2 charstring
//!   virtual machine ([`tables::type2`]), and
//! * the TrueType [`glyf`/`loca`](tables::glyf) tables with simple and
//!   composite glyphs.
//!
//! Both formats parse into owned containers that can be mutated, subset
//! ([`tables::cff::Outlines::subset`], [`tables::glyf::Outlines::subset`])
//! and serialized back. Charstrings are re-encoded through an optimizer that
//! finds the shortest operator sequence for each subpath.

#![deny(rustdoc::broken_intra_doc_links)]

mod error;
pub mod font_data;
pub(crate) mod write;

pub mod glyph;
pub mod tables;

mod subset;

pub use error::Error;
