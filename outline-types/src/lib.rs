//! Common scalar data types used in font outline tables.

#![deny(rustdoc::broken_intra_doc_links)]

mod fixed;
mod glyph_id;

pub use fixed::{F2Dot14, Fixed};
pub use glyph_id::GlyphId;
