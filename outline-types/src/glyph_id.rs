//! Glyph identifiers.

use std::fmt;

/// A 16-bit glyph identifier.
///
/// Glyph index 0 is reserved for the `.notdef` glyph.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GlyphId(u16);

impl GlyphId {
    /// The identifier reserved for the `.notdef` glyph.
    pub const NOTDEF: Self = Self(0);

    /// Creates a new glyph identifier.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the identifier as a 16-bit unsigned integer.
    pub const fn to_u16(self) -> u16 {
        self.0
    }

    /// Returns the identifier as a usize, for indexing.
    pub const fn to_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for GlyphId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlyphId({})", self.0)
    }
}

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
