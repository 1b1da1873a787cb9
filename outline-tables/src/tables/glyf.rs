//! The TrueType `glyf` and `loca` tables.
//!
//! Glyphs are parsed into owned [`SimpleGlyph`] and [`CompositeGlyph`]
//! structures that serialize back bit-exactly: flag combinations, point
//! matching anchors and hinting bytecode are all preserved.

pub mod composite;
pub mod loca;
pub mod outline;
pub mod simple;

pub use composite::{Anchor, Component, ComponentFlags, CompositeGlyph, Transform};
pub use loca::LocaFormat;
pub use simple::{Contour, CurvePoint, SimpleGlyph};

use kurbo::{Affine, BezPath};
use outline_types::GlyphId;

use crate::font_data::FontData;
use crate::write::{FontWrite, TableWriter};
use crate::Error;

/// A glyph bounding box, stored in the glyph header.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Bbox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl Bbox {
    pub fn union(self, other: Bbox) -> Bbox {
        Bbox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

impl FontWrite for Bbox {
    fn write_into(&self, writer: &mut TableWriter) {
        [self.x_min, self.y_min, self.x_max, self.y_max].write_into(writer);
    }
}

/// Either a simple (contour) or composite (component) glyph.
///
/// A simple glyph without contours stands for an empty glyph and occupies
/// no bytes in the table.
#[derive(Clone, PartialEq, Debug)]
pub enum Glyph {
    Simple(SimpleGlyph),
    Composite(CompositeGlyph),
}

impl Default for Glyph {
    fn default() -> Self {
        Self::Simple(SimpleGlyph::default())
    }
}

impl Glyph {
    /// True if the glyph serializes to an empty record.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Simple(simple) if simple.contours.is_empty())
    }

    pub fn bbox(&self) -> Bbox {
        match self {
            Self::Simple(simple) => simple.bbox,
            Self::Composite(composite) => composite.bbox,
        }
    }
}

/// The serialized pair of tables, plus the format flag that the `head`
/// table's `indexToLocFormat` field carries.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GlyfLoca {
    pub glyf: Vec<u8>,
    pub loca: Vec<u8>,
    pub format: LocaFormat,
}

/// Parses a glyph list from `glyf` and `loca` data.
pub fn decode(glyf: &[u8], loca: &[u8], format: LocaFormat) -> Result<Vec<Glyph>, Error> {
    let offsets = loca::read_offsets(loca, format)?;
    if offsets.last().copied().unwrap_or(0) as usize > glyf.len() {
        return Err(Error::invalid("glyf", "loca points past the glyph data"));
    }
    let mut glyphs = Vec::with_capacity(offsets.len().saturating_sub(1));
    for pair in offsets.windows(2) {
        let record = &glyf[pair[0] as usize..pair[1] as usize];
        glyphs.push(decode_glyph(record)?);
    }
    Ok(glyphs)
}

fn decode_glyph(record: &[u8]) -> Result<Glyph, Error> {
    if record.is_empty() {
        return Ok(Glyph::default());
    }
    let mut cursor = FontData::new(record).cursor("glyf");
    let n_contours = cursor.read_i16()?;
    let bbox = Bbox {
        x_min: cursor.read_i16()?,
        y_min: cursor.read_i16()?,
        x_max: cursor.read_i16()?,
        y_max: cursor.read_i16()?,
    };
    if n_contours >= 0 {
        simple::read_body(&mut cursor, n_contours as usize, bbox).map(Glyph::Simple)
    } else {
        composite::read_body(&mut cursor, bbox).map(Glyph::Composite)
    }
}

/// Serializes a glyph list.
///
/// Glyph records are 2-byte aligned and the resulting `loca` is strictly
/// non-decreasing with its final entry at the end of the glyph data.
pub fn encode(glyphs: &[Glyph]) -> GlyfLoca {
    let mut writer = TableWriter::new();
    let mut offsets = Vec::with_capacity(glyphs.len() + 1);
    offsets.push(0u32);
    for glyph in glyphs {
        match glyph {
            Glyph::Simple(simple) => simple.write_into(&mut writer),
            Glyph::Composite(composite) => composite.write_into(&mut writer),
        }
        writer.pad_to_2byte_aligned();
        offsets.push(writer.len() as u32);
    }
    let (loca, format) = loca::write_offsets(&offsets);
    GlyfLoca {
        glyf: writer.into_data(),
        loca,
        format,
    }
}

/// Capacity hints for the `maxp` table, computed from the glyph list.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct MaxpHints {
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

impl MaxpHints {
    pub fn compute(glyphs: &[Glyph]) -> Self {
        let mut hints = Self::default();
        for (gid, glyph) in glyphs.iter().enumerate() {
            match glyph {
                Glyph::Simple(simple) => {
                    let points: usize = simple.contours.iter().map(Contour::len).sum();
                    hints.max_points = hints.max_points.max(points as u16);
                    hints.max_contours = hints.max_contours.max(simple.contours.len() as u16);
                }
                Glyph::Composite(composite) => {
                    hints.max_component_elements = hints
                        .max_component_elements
                        .max(composite.components.len() as u16);
                    let mut chain = Vec::new();
                    let (points, contours, depth) =
                        composite_extent(glyphs, GlyphId::new(gid as u16), &mut chain);
                    hints.max_composite_points = hints.max_composite_points.max(points as u16);
                    hints.max_composite_contours =
                        hints.max_composite_contours.max(contours as u16);
                    hints.max_component_depth = hints.max_component_depth.max(depth as u16);
                }
            }
        }
        hints
    }
}

fn composite_extent(
    glyphs: &[Glyph],
    gid: GlyphId,
    chain: &mut Vec<GlyphId>,
) -> (usize, usize, usize) {
    if chain.contains(&gid) {
        return (0, 0, 0);
    }
    match glyphs.get(gid.to_usize()) {
        Some(Glyph::Simple(simple)) => (
            simple.contours.iter().map(Contour::len).sum(),
            simple.contours.len(),
            0,
        ),
        Some(Glyph::Composite(composite)) => {
            chain.push(gid);
            let mut points = 0;
            let mut contours = 0;
            let mut depth = 0;
            for component in &composite.components {
                let (p, c, d) = composite_extent(glyphs, component.glyph, chain);
                points += p;
                contours += c;
                depth = depth.max(d);
            }
            chain.pop();
            (points, contours, depth + 1)
        }
        None => (0, 0, 0),
    }
}

/// An owned set of TrueType outlines with their sibling table data.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Outlines {
    pub glyphs: Vec<Glyph>,
    /// Advance widths, one per glyph.
    pub advances: Vec<u16>,
    /// Glyph names, when the font carries them.
    pub names: Option<Vec<String>>,
    /// Untouched rendering table blobs (`cvt `, `fpgm`, `prep`).
    pub hint_tables: Vec<([u8; 4], Vec<u8>)>,
}

impl Outlines {
    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    /// Returns the fully expanded outline of a glyph as a path.
    ///
    /// Composite references are resolved recursively; a reference cycle
    /// yields an empty path for the offending child. Missing glyphs yield
    /// an empty path.
    pub fn glyph_path(&self, glyph: GlyphId, matrix: &Affine) -> BezPath {
        outline::glyph_path(&self.glyphs, glyph, matrix)
    }

    /// Recomputes the `maxp` capacity hints.
    pub fn maxp_hints(&self) -> MaxpHints {
        MaxpHints::compute(&self.glyphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(super) fn triangle() -> SimpleGlyph {
        SimpleGlyph {
            bbox: Bbox {
                x_min: 0,
                y_min: 0,
                x_max: 100,
                y_max: 120,
            },
            contours: vec![Contour::from(vec![
                CurvePoint::on_curve(0, 0),
                CurvePoint::on_curve(100, 0),
                CurvePoint::on_curve(50, 120),
            ])],
            instructions: Vec::new(),
        }
    }

    #[test]
    fn empty_glyphs_have_zero_length_records() {
        let glyphs = vec![Glyph::default(), Glyph::Simple(triangle())];
        let tables = encode(&glyphs);
        let offsets = loca::read_offsets(&tables.loca, tables.format).unwrap();
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[1], 0);
        assert_eq!(*offsets.last().unwrap() as usize, tables.glyf.len());
        let decoded = decode(&tables.glyf, &tables.loca, tables.format).unwrap();
        assert_eq!(decoded, glyphs);
    }

    #[test]
    fn loca_is_non_decreasing() {
        let glyphs = vec![
            Glyph::Simple(triangle()),
            Glyph::default(),
            Glyph::Simple(triangle()),
        ];
        let tables = encode(&glyphs);
        let offsets = loca::read_offsets(&tables.loca, tables.format).unwrap();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(offsets.len(), glyphs.len() + 1);
    }

    #[test]
    fn records_are_2_byte_aligned() {
        let glyphs = vec![Glyph::Simple(triangle()); 3];
        let tables = encode(&glyphs);
        let offsets = loca::read_offsets(&tables.loca, tables.format).unwrap();
        assert!(offsets.iter().all(|off| off % 2 == 0));
    }

    #[test]
    fn loca_past_glyf_end_is_invalid() {
        let glyphs = vec![Glyph::Simple(triangle())];
        let tables = encode(&glyphs);
        let err = decode(&tables.glyf[..4], &tables.loca, tables.format).unwrap_err();
        assert!(matches!(err, Error::InvalidFont { table: "glyf", .. }));
    }

    #[test]
    fn maxp_hints() {
        let simple = Glyph::Simple(triangle());
        let composite = Glyph::Composite(CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![
                Component::new(GlyphId::new(0), Anchor::Offset { x: 0, y: 0 }),
                Component::new(GlyphId::new(0), Anchor::Offset { x: 10, y: 0 }),
            ],
            instructions: Vec::new(),
        });
        let hints = MaxpHints::compute(&[simple, composite]);
        assert_eq!(hints.max_points, 3);
        assert_eq!(hints.max_contours, 1);
        assert_eq!(hints.max_composite_points, 6);
        assert_eq!(hints.max_composite_contours, 2);
        assert_eq!(hints.max_component_elements, 2);
        assert_eq!(hints.max_component_depth, 1);
    }
}
