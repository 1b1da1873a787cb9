//! Composite glyphs (containing other glyphs as components).

use outline_types::{F2Dot14, GlyphId};

use crate::font_data::Cursor;
use crate::write::{FontWrite, TableWriter};
use crate::Error;

use super::Bbox;

/// Component flag bits.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf#compositeGlyphFlags>
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct CompositeGlyphFlags(u16);

impl CompositeGlyphFlags {
    pub const ARG_1_AND_2_ARE_WORDS: Self = Self(0x0001);
    pub const ARGS_ARE_XY_VALUES: Self = Self(0x0002);
    pub const ROUND_XY_TO_GRID: Self = Self(0x0004);
    pub const WE_HAVE_A_SCALE: Self = Self(0x0008);
    pub const MORE_COMPONENTS: Self = Self(0x0020);
    pub const WE_HAVE_AN_X_AND_Y_SCALE: Self = Self(0x0040);
    pub const WE_HAVE_A_TWO_BY_TWO: Self = Self(0x0080);
    pub const WE_HAVE_INSTRUCTIONS: Self = Self(0x0100);
    pub const USE_MY_METRICS: Self = Self(0x0200);
    pub const OVERLAP_COMPOUND: Self = Self(0x0400);
    pub const SCALED_COMPONENT_OFFSET: Self = Self(0x0800);
    pub const UNSCALED_COMPONENT_OFFSET: Self = Self(0x1000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CompositeGlyphFlags {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOrAssign for CompositeGlyphFlags {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

/// Anchor position for a component: either an offset applied as a
/// translation, or a pair of point indices to align.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Anchor {
    Offset { x: i16, y: i16 },
    /// Translate the component so that its point `component` lands on the
    /// parent's already-laid-out point `base`.
    Point { base: u16, component: u16 },
}

impl Anchor {
    /// Computes the flags that describe this anchor.
    pub fn compute_flags(&self) -> CompositeGlyphFlags {
        const I8_RANGE: std::ops::Range<i16> = i8::MIN as i16..i8::MAX as i16 + 1;
        const U8_MAX: u16 = u8::MAX as u16;
        let mut flags = CompositeGlyphFlags::empty();
        match self {
            Anchor::Offset { x, y } => {
                flags |= CompositeGlyphFlags::ARGS_ARE_XY_VALUES;
                if !I8_RANGE.contains(x) || !I8_RANGE.contains(y) {
                    flags |= CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS;
                }
            }
            Anchor::Point { base, component } => {
                if *base > U8_MAX || *component > U8_MAX {
                    flags |= CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS;
                }
            }
        }
        flags
    }
}

/// Transform for a composite component.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transform {
    pub xx: F2Dot14,
    pub yx: F2Dot14,
    pub xy: F2Dot14,
    pub yy: F2Dot14,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            xx: F2Dot14::ONE,
            yx: F2Dot14::ZERO,
            xy: F2Dot14::ZERO,
            yy: F2Dot14::ONE,
        }
    }
}

impl Transform {
    /// A uniform scale, quantized through 2.14 fixed point.
    pub fn scale(scale: f32) -> Self {
        let scale = F2Dot14::from_f32(scale);
        Self {
            xx: scale,
            yy: scale,
            ..Default::default()
        }
    }

    /// Computes the flags that describe this transform.
    pub fn compute_flags(&self) -> CompositeGlyphFlags {
        if self.yx != F2Dot14::ZERO || self.xy != F2Dot14::ZERO {
            CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO
        } else if self.xx != self.yy {
            CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE
        } else if self.xx != F2Dot14::ONE {
            CompositeGlyphFlags::WE_HAVE_A_SCALE
        } else {
            CompositeGlyphFlags::empty()
        }
    }
}

/// Boolean component attributes that are not derived from the anchor or
/// transform.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ComponentFlags {
    /// Round the translation to the pixel grid when rendering.
    pub round_xy_to_grid: bool,
    /// Use this component's metrics for the whole composite.
    pub use_my_metrics: bool,
    /// The components of the composite overlap.
    pub overlap_compound: bool,
    /// The offset is in the component's scaled coordinate space.
    pub scaled_component_offset: bool,
    /// The explicit counterpart flag: the offset is unscaled.
    pub unscaled_component_offset: bool,
}

impl From<CompositeGlyphFlags> for ComponentFlags {
    fn from(src: CompositeGlyphFlags) -> Self {
        ComponentFlags {
            round_xy_to_grid: src.contains(CompositeGlyphFlags::ROUND_XY_TO_GRID),
            use_my_metrics: src.contains(CompositeGlyphFlags::USE_MY_METRICS),
            overlap_compound: src.contains(CompositeGlyphFlags::OVERLAP_COMPOUND),
            scaled_component_offset: src.contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET),
            unscaled_component_offset: src
                .contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET),
        }
    }
}

impl From<ComponentFlags> for CompositeGlyphFlags {
    fn from(value: ComponentFlags) -> Self {
        let mut flags = CompositeGlyphFlags::empty();
        if value.round_xy_to_grid {
            flags |= CompositeGlyphFlags::ROUND_XY_TO_GRID;
        }
        if value.use_my_metrics {
            flags |= CompositeGlyphFlags::USE_MY_METRICS;
        }
        if value.overlap_compound {
            flags |= CompositeGlyphFlags::OVERLAP_COMPOUND;
        }
        if value.scaled_component_offset {
            flags |= CompositeGlyphFlags::SCALED_COMPONENT_OFFSET;
        }
        if value.unscaled_component_offset {
            flags |= CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET;
        }
        flags
    }
}

/// A single component of a [`CompositeGlyph`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Component {
    pub glyph: GlyphId,
    pub anchor: Anchor,
    pub flags: ComponentFlags,
    pub transform: Transform,
}

impl Component {
    pub fn new(glyph: GlyphId, anchor: Anchor) -> Self {
        Self {
            glyph,
            anchor,
            flags: ComponentFlags::default(),
            transform: Transform::default(),
        }
    }

    /// True when the component is placed by point matching instead of an
    /// offset.
    pub fn uses_point_matching(&self) -> bool {
        matches!(self.anchor, Anchor::Point { .. })
    }

    /// Computes this component's flag word, excepting `MORE_COMPONENTS` and
    /// `WE_HAVE_INSTRUCTIONS` which depend on the component's position in
    /// the glyph.
    fn compute_flags(&self) -> CompositeGlyphFlags {
        let transform_flags = self.transform.compute_flags();
        let mut flags = self.anchor.compute_flags()
            | transform_flags
            | CompositeGlyphFlags::from(self.flags);
        // a transformed component with unspecified offset scaling gets the
        // explicit unscaled flag, disambiguating renderer defaults
        if transform_flags != CompositeGlyphFlags::empty()
            && !flags.contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET)
            && !flags.contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET)
        {
            flags |= CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET;
        }
        flags
    }

    fn write_into(&self, writer: &mut TableWriter, extra_flags: CompositeGlyphFlags) {
        let flags = self.compute_flags() | extra_flags;
        flags.bits().write_into(writer);
        self.glyph.to_u16().write_into(writer);
        let two_bytes = flags.contains(CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS);
        match self.anchor {
            Anchor::Offset { x, y } if !two_bytes => [x as i8, y as i8].write_into(writer),
            Anchor::Offset { x, y } => [x, y].write_into(writer),
            Anchor::Point { base, component } if !two_bytes => {
                [base as u8, component as u8].write_into(writer)
            }
            Anchor::Point { base, component } => [base, component].write_into(writer),
        }
        let transform = &self.transform;
        if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
            for value in [transform.xx, transform.yx, transform.xy, transform.yy] {
                value.to_bits().write_into(writer);
            }
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
            transform.xx.to_bits().write_into(writer);
            transform.yy.to_bits().write_into(writer);
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE) {
            transform.xx.to_bits().write_into(writer);
        }
    }
}

/// A glyph consisting of component references.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CompositeGlyph {
    pub bbox: Bbox,
    pub components: Vec<Component>,
    /// Hinting bytecode, preserved as an opaque blob.
    pub instructions: Vec<u8>,
}

/// Reads a composite glyph body, after the header and bounding box.
pub(super) fn read_body(cursor: &mut Cursor, bbox: Bbox) -> Result<CompositeGlyph, Error> {
    let mut components = Vec::new();
    let mut have_instructions = false;
    loop {
        let flags = CompositeGlyphFlags::from_bits(cursor.read_u16()?);
        let glyph = GlyphId::new(cursor.read_u16()?);
        let args_are_words = flags.contains(CompositeGlyphFlags::ARG_1_AND_2_ARE_WORDS);
        let args_are_xy = flags.contains(CompositeGlyphFlags::ARGS_ARE_XY_VALUES);
        let anchor = match (args_are_xy, args_are_words) {
            (true, true) => Anchor::Offset {
                x: cursor.read_i16()?,
                y: cursor.read_i16()?,
            },
            (true, false) => Anchor::Offset {
                x: cursor.read_i8()? as i16,
                y: cursor.read_i8()? as i16,
            },
            (false, true) => Anchor::Point {
                base: cursor.read_u16()?,
                component: cursor.read_u16()?,
            },
            (false, false) => Anchor::Point {
                base: cursor.read_u8()? as u16,
                component: cursor.read_u8()? as u16,
            },
        };
        let mut transform = Transform::default();
        if flags.contains(CompositeGlyphFlags::WE_HAVE_A_SCALE) {
            transform.xx = F2Dot14::from_bits(cursor.read_i16()?);
            transform.yy = transform.xx;
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_AN_X_AND_Y_SCALE) {
            transform.xx = F2Dot14::from_bits(cursor.read_i16()?);
            transform.yy = F2Dot14::from_bits(cursor.read_i16()?);
        } else if flags.contains(CompositeGlyphFlags::WE_HAVE_A_TWO_BY_TWO) {
            transform.xx = F2Dot14::from_bits(cursor.read_i16()?);
            transform.yx = F2Dot14::from_bits(cursor.read_i16()?);
            transform.xy = F2Dot14::from_bits(cursor.read_i16()?);
            transform.yy = F2Dot14::from_bits(cursor.read_i16()?);
        }
        components.push(Component {
            glyph,
            anchor,
            flags: flags.into(),
            transform,
        });
        if !flags.contains(CompositeGlyphFlags::MORE_COMPONENTS) {
            have_instructions = flags.contains(CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS);
            break;
        }
    }
    let instructions = if have_instructions {
        let len = cursor.read_u16()? as usize;
        cursor.read_array(len)?.to_vec()
    } else {
        Vec::new()
    };
    Ok(CompositeGlyph {
        bbox,
        components,
        instructions,
    })
}

impl FontWrite for CompositeGlyph {
    fn write_into(&self, writer: &mut TableWriter) {
        const N_CONTOURS: i16 = -1;
        N_CONTOURS.write_into(writer);
        self.bbox.write_into(writer);
        let Some((last, rest)) = self.components.split_last() else {
            return;
        };
        for component in rest {
            component.write_into(writer, CompositeGlyphFlags::MORE_COMPONENTS);
        }
        let last_flags = if self.instructions.is_empty() {
            CompositeGlyphFlags::empty()
        } else {
            CompositeGlyphFlags::WE_HAVE_INSTRUCTIONS
        };
        last.write_into(writer, last_flags);
        if !self.instructions.is_empty() {
            (self.instructions.len() as u16).write_into(writer);
            self.instructions.write_into(writer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_data::FontData;
    use pretty_assertions::assert_eq;

    fn round_trip(glyph: &CompositeGlyph) -> (Vec<u8>, CompositeGlyph) {
        let mut writer = TableWriter::new();
        glyph.write_into(&mut writer);
        let data = writer.into_data();
        let mut cursor = FontData::new(&data).cursor("glyf");
        assert_eq!(cursor.read_i16().unwrap(), -1);
        let bbox = Bbox {
            x_min: cursor.read_i16().unwrap(),
            y_min: cursor.read_i16().unwrap(),
            x_max: cursor.read_i16().unwrap(),
            y_max: cursor.read_i16().unwrap(),
        };
        let decoded = read_body(&mut cursor, bbox).unwrap();
        (data, decoded)
    }

    // A scaled, grid-rounded component packs its offset as bytes, the
    // scale as one 2.14 value and carries the explicit unscaled-offset
    // flag.
    #[test]
    fn packed_scale_component() {
        let mut component = Component::new(
            GlyphId::new(5),
            Anchor::Offset { x: 10, y: 20 },
        );
        component.flags.round_xy_to_grid = true;
        component.transform = Transform::scale(0.5);
        let glyph = CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![component.clone()],
            instructions: Vec::new(),
        };
        let (data, decoded) = round_trip(&glyph);
        let body = &data[10..];
        let expected_flags = CompositeGlyphFlags::ARGS_ARE_XY_VALUES
            | CompositeGlyphFlags::ROUND_XY_TO_GRID
            | CompositeGlyphFlags::WE_HAVE_A_SCALE
            | CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET;
        assert_eq!(&body[..2], expected_flags.bits().to_be_bytes());
        assert_eq!(&body[2..4], 5u16.to_be_bytes());
        // offset bytes then 2.14 of 0.5 (exact)
        assert_eq!(&body[4..8], &[0x0A, 0x14, 0x20, 0x00]);
        let read_back = &decoded.components[0];
        assert_eq!(read_back.glyph, GlyphId::new(5));
        assert_eq!(read_back.anchor, Anchor::Offset { x: 10, y: 20 });
        assert_eq!(read_back.transform, Transform::scale(0.5));
        assert!(read_back.flags.round_xy_to_grid);
        assert!(read_back.flags.unscaled_component_offset);
        // a second pass over the decoded structure is byte identical
        let (data2, _) = round_trip(&decoded);
        assert_eq!(data, data2);
    }

    #[test]
    fn word_sized_offsets() {
        let component = Component::new(
            GlyphId::new(1),
            Anchor::Offset { x: -300, y: 5 },
        );
        let glyph = CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![component],
            instructions: Vec::new(),
        };
        let (_, decoded) = round_trip(&glyph);
        assert_eq!(
            decoded.components[0].anchor,
            Anchor::Offset { x: -300, y: 5 }
        );
    }

    #[test]
    fn point_matching_anchor() {
        let component = Component::new(
            GlyphId::new(7),
            Anchor::Point {
                base: 300,
                component: 2,
            },
        );
        let glyph = CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![component],
            instructions: Vec::new(),
        };
        let (_, decoded) = round_trip(&glyph);
        assert!(decoded.components[0].uses_point_matching());
        assert_eq!(
            decoded.components[0].anchor,
            Anchor::Point {
                base: 300,
                component: 2
            }
        );
    }

    #[test]
    fn two_by_two_transform_and_instructions() {
        let mut component = Component::new(
            GlyphId::new(3),
            Anchor::Offset { x: 1, y: 2 },
        );
        component.transform = Transform {
            xx: F2Dot14::from_f32(1.0),
            yx: F2Dot14::from_f32(0.25),
            xy: F2Dot14::from_f32(-0.25),
            yy: F2Dot14::from_f32(1.0),
        };
        component.flags.use_my_metrics = true;
        component.flags.overlap_compound = true;
        let glyph = CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![component.clone(), Component::new(GlyphId::new(4), Anchor::Offset { x: 0, y: 0 })],
            instructions: vec![0x4B, 0x00],
        };
        let (_, decoded) = round_trip(&glyph);
        assert_eq!(decoded.components.len(), 2);
        assert_eq!(decoded.components[0].transform, component.transform);
        assert!(decoded.components[0].flags.use_my_metrics);
        assert!(decoded.components[0].flags.overlap_compound);
        assert_eq!(decoded.instructions, vec![0x4B, 0x00]);
    }

    #[test]
    fn truncated_component_is_invalid() {
        let component = Component::new(GlyphId::new(1), Anchor::Offset { x: 0, y: 0 });
        let glyph = CompositeGlyph {
            bbox: Bbox::default(),
            components: vec![component],
            instructions: Vec::new(),
        };
        let mut writer = TableWriter::new();
        glyph.write_into(&mut writer);
        let data = writer.into_data();
        let mut cursor = FontData::new(&data[..data.len() - 1]).cursor("glyf");
        cursor.advance_by(10).unwrap();
        assert!(read_body(&mut cursor, Bbox::default()).is_err());
    }
}
