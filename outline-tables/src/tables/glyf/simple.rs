//! Simple glyphs (glyphs which do not contain components).

use crate::font_data::Cursor;
use crate::write::{FontWrite, TableWriter};
use crate::Error;

use super::Bbox;

/// Flag bits of the point stream.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/glyf#simple-glyph-description>
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct SimpleGlyphFlags(u8);

impl SimpleGlyphFlags {
    pub const ON_CURVE_POINT: Self = Self(0x01);
    pub const X_SHORT_VECTOR: Self = Self(0x02);
    pub const Y_SHORT_VECTOR: Self = Self(0x04);
    pub const REPEAT_FLAG: Self = Self(0x08);
    pub const X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR: Self = Self(0x10);
    pub const Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SimpleGlyphFlags {
    type Output = Self;
    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOrAssign for SimpleGlyphFlags {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::Not for SimpleGlyphFlags {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl std::ops::BitAnd for SimpleGlyphFlags {
    type Output = Self;
    fn bitand(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

/// Point with an associated on-curve flag.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CurvePoint {
    pub x: i16,
    pub y: i16,
    /// True for on-curve points; off-curve points are quadratic controls.
    pub on_curve: bool,
}

impl CurvePoint {
    pub fn new(x: i16, y: i16, on_curve: bool) -> Self {
        Self { x, y, on_curve }
    }

    pub fn on_curve(x: i16, y: i16) -> Self {
        Self::new(x, y, true)
    }

    pub fn off_curve(x: i16, y: i16) -> Self {
        Self::new(x, y, false)
    }
}

/// A single closed contour of tagged points.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Contour(Vec<CurvePoint>);

impl Contour {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurvePoint> {
        self.0.iter()
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.0
    }
}

impl From<Vec<CurvePoint>> for Contour {
    fn from(points: Vec<CurvePoint>) -> Self {
        Self(points)
    }
}

/// A simple (without components) glyph.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct SimpleGlyph {
    pub bbox: Bbox,
    pub contours: Vec<Contour>,
    /// Hinting bytecode, preserved as an opaque blob.
    pub instructions: Vec<u8>,
}

impl SimpleGlyph {
    /// Recomputes the bounding box from the current contours.
    pub fn recompute_bounding_box(&mut self) {
        let mut points = self.contours.iter().flat_map(Contour::iter);
        if let Some(first) = points.next() {
            let mut bbox = Bbox {
                x_min: first.x,
                y_min: first.y,
                x_max: first.x,
                y_max: first.y,
            };
            for point in points {
                bbox.x_min = bbox.x_min.min(point.x);
                bbox.y_min = bbox.y_min.min(point.y);
                bbox.x_max = bbox.x_max.max(point.x);
                bbox.y_max = bbox.y_max.max(point.y);
            }
            self.bbox = bbox;
        }
    }

    /// Computes the flag and per-axis delta for each point.
    ///
    /// This does not apply flag repetition; that happens during the final
    /// byte encoding.
    fn compute_point_deltas(
        &self,
    ) -> impl Iterator<Item = (SimpleGlyphFlags, CoordDelta, CoordDelta)> + '_ {
        // reused for x & y by passing in the flags
        fn flag_and_delta(
            value: i16,
            short_flag: SimpleGlyphFlags,
            same_or_pos: SimpleGlyphFlags,
        ) -> (SimpleGlyphFlags, CoordDelta) {
            const SHORT_MAX: i16 = u8::MAX as i16;
            const SHORT_MIN: i16 = -SHORT_MAX;
            match value {
                0 => (same_or_pos, CoordDelta::Skip),
                SHORT_MIN..=-1 => (short_flag, CoordDelta::Short(value.unsigned_abs() as u8)),
                1..=SHORT_MAX => (short_flag | same_or_pos, CoordDelta::Short(value as _)),
                _other => (SimpleGlyphFlags::empty(), CoordDelta::Long(value)),
            }
        }

        let (mut last_x, mut last_y) = (0i16, 0i16);
        let mut iter = self.contours.iter().flat_map(Contour::iter);
        std::iter::from_fn(move || {
            let point = iter.next()?;
            let mut flag = SimpleGlyphFlags::empty();
            let d_x = point.x.wrapping_sub(last_x);
            let d_y = point.y.wrapping_sub(last_y);
            last_x = point.x;
            last_y = point.y;
            if point.on_curve {
                flag |= SimpleGlyphFlags::ON_CURVE_POINT;
            }
            let (x_flag, x_data) = flag_and_delta(
                d_x,
                SimpleGlyphFlags::X_SHORT_VECTOR,
                SimpleGlyphFlags::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR,
            );
            let (y_flag, y_data) = flag_and_delta(
                d_y,
                SimpleGlyphFlags::Y_SHORT_VECTOR,
                SimpleGlyphFlags::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR,
            );
            flag |= x_flag | y_flag;
            Some((flag, x_data, y_data))
        })
    }
}

/// How a single delta is stored, given its flag bits.
#[derive(Clone, Copy, Debug)]
enum CoordDelta {
    // a repeat of the previous position; nothing is written
    Skip,
    Short(u8),
    Long(i16),
}

impl FontWrite for CoordDelta {
    fn write_into(&self, writer: &mut TableWriter) {
        match self {
            CoordDelta::Skip => (),
            CoordDelta::Short(val) => val.write_into(writer),
            CoordDelta::Long(val) => val.write_into(writer),
        }
    }
}

/// A flag with its optional repeat count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RepeatableFlag {
    flag: SimpleGlyphFlags,
    repeat: u8,
}

impl FontWrite for RepeatableFlag {
    fn write_into(&self, writer: &mut TableWriter) {
        self.flag.bits().write_into(writer);
        if self.flag.contains(SimpleGlyphFlags::REPEAT_FLAG) {
            self.repeat.write_into(writer);
        }
    }
}

impl RepeatableFlag {
    /// Compresses raw flags into flag + repeat-count pairs.
    ///
    /// A flag repeating exactly once costs the same either way; it is
    /// written as two plain flags.
    fn iter_from_flags(
        flags: impl IntoIterator<Item = SimpleGlyphFlags>,
    ) -> impl Iterator<Item = RepeatableFlag> {
        let mut iter = flags.into_iter();
        let mut prev = None;
        let mut decompose_single_repeat = None;
        std::iter::from_fn(move || loop {
            if let Some(repeat) = decompose_single_repeat.take() {
                return Some(repeat);
            }
            match (iter.next(), prev.take()) {
                (None, Some(RepeatableFlag { flag, repeat: 1 })) => {
                    let flag = flag & !SimpleGlyphFlags::REPEAT_FLAG;
                    decompose_single_repeat = Some(RepeatableFlag { flag, repeat: 0 });
                    return decompose_single_repeat;
                }
                (None, prev) => return prev,
                (Some(flag), None) => prev = Some(RepeatableFlag { flag, repeat: 0 }),
                (Some(flag), Some(mut last)) => {
                    if (last.flag & !SimpleGlyphFlags::REPEAT_FLAG) == flag && last.repeat < u8::MAX
                    {
                        last.repeat += 1;
                        last.flag |= SimpleGlyphFlags::REPEAT_FLAG;
                        prev = Some(last);
                    } else {
                        if last.repeat == 1 {
                            last.flag = last.flag & !SimpleGlyphFlags::REPEAT_FLAG;
                            last.repeat = 0;
                            decompose_single_repeat = Some(last);
                        }
                        prev = Some(RepeatableFlag { flag, repeat: 0 });
                        return Some(last);
                    }
                }
            }
        })
    }
}

/// Reads a simple glyph body, after the header and bounding box.
pub(super) fn read_body(
    cursor: &mut Cursor,
    n_contours: usize,
    bbox: Bbox,
) -> Result<SimpleGlyph, Error> {
    let mut end_pts = Vec::with_capacity(n_contours);
    for _ in 0..n_contours {
        end_pts.push(cursor.read_u16()?);
    }
    let n_points = end_pts.last().map(|last| *last as usize + 1).unwrap_or(0);
    let instruction_len = cursor.read_u16()? as usize;
    let instructions = cursor.read_array(instruction_len)?.to_vec();

    // expand the flag stream; bit 0x08 turns the next byte into a repeat
    // count for the previous flag
    let mut flags = Vec::with_capacity(n_points);
    while flags.len() < n_points {
        let flag = SimpleGlyphFlags::from_bits(cursor.read_u8()?);
        flags.push(flag);
        if flag.contains(SimpleGlyphFlags::REPEAT_FLAG) {
            let count = cursor.read_u8()? as usize;
            if count > n_points - flags.len() {
                return Err(Error::invalid("glyf", "flag repeat count too large"));
            }
            for _ in 0..count {
                flags.push(flag);
            }
        }
    }

    let mut xs = Vec::with_capacity(n_points);
    let mut x = 0i16;
    for flag in &flags {
        x = x.wrapping_add(read_delta(
            cursor,
            *flag,
            SimpleGlyphFlags::X_SHORT_VECTOR,
            SimpleGlyphFlags::X_IS_SAME_OR_POSITIVE_X_SHORT_VECTOR,
        )?);
        xs.push(x);
    }
    let mut points = Vec::with_capacity(n_points);
    let mut y = 0i16;
    for (flag, x) in flags.iter().zip(xs) {
        y = y.wrapping_add(read_delta(
            cursor,
            *flag,
            SimpleGlyphFlags::Y_SHORT_VECTOR,
            SimpleGlyphFlags::Y_IS_SAME_OR_POSITIVE_Y_SHORT_VECTOR,
        )?);
        points.push(CurvePoint::new(
            x,
            y,
            flag.contains(SimpleGlyphFlags::ON_CURVE_POINT),
        ));
    }

    let mut contours = Vec::with_capacity(n_contours);
    let mut start = 0usize;
    for end in end_pts {
        let end = end as usize + 1;
        if end <= start || end > points.len() {
            return Err(Error::invalid("glyf", "contour end points out of order"));
        }
        contours.push(Contour(points[start..end].to_vec()));
        start = end;
    }
    Ok(SimpleGlyph {
        bbox,
        contours,
        instructions,
    })
}

fn read_delta(
    cursor: &mut Cursor,
    flag: SimpleGlyphFlags,
    short: SimpleGlyphFlags,
    same_or_positive: SimpleGlyphFlags,
) -> Result<i16, Error> {
    Ok(match (
        flag.contains(short),
        flag.contains(same_or_positive),
    ) {
        (true, true) => cursor.read_u8()? as i16,
        (true, false) => -(cursor.read_u8()? as i16),
        (false, false) => cursor.read_i16()?,
        (false, true) => 0,
    })
}

impl FontWrite for SimpleGlyph {
    fn write_into(&self, writer: &mut TableWriter) {
        let n_contours = self.contours.len() as i16;
        if n_contours == 0 {
            // empty glyphs occupy no bytes
            return;
        }
        n_contours.write_into(writer);
        self.bbox.write_into(writer);
        let mut cur = 0;
        for contour in &self.contours {
            cur += contour.len();
            (cur as u16 - 1).write_into(writer);
        }
        (self.instructions.len() as u16).write_into(writer);
        self.instructions.write_into(writer);

        let deltas = self.compute_point_deltas().collect::<Vec<_>>();
        RepeatableFlag::iter_from_flags(deltas.iter().map(|(flag, _, _)| *flag))
            .for_each(|flag| flag.write_into(writer));
        deltas.iter().for_each(|(_, x, _)| x.write_into(writer));
        deltas.iter().for_each(|(_, _, y)| y.write_into(writer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font_data::FontData;
    use pretty_assertions::assert_eq;

    fn round_trip(glyph: &SimpleGlyph) -> (Vec<u8>, SimpleGlyph) {
        let mut writer = TableWriter::new();
        glyph.write_into(&mut writer);
        let data = writer.into_data();
        let mut cursor = FontData::new(&data).cursor("glyf");
        let n_contours = cursor.read_i16().unwrap();
        let bbox = Bbox {
            x_min: cursor.read_i16().unwrap(),
            y_min: cursor.read_i16().unwrap(),
            x_max: cursor.read_i16().unwrap(),
            y_max: cursor.read_i16().unwrap(),
        };
        let decoded = read_body(&mut cursor, n_contours as usize, bbox).unwrap();
        (data, decoded)
    }

    fn glyph_with_points(points: Vec<CurvePoint>) -> SimpleGlyph {
        let mut glyph = SimpleGlyph {
            bbox: Bbox::default(),
            contours: vec![Contour(points)],
            instructions: Vec::new(),
        };
        glyph.recompute_bounding_box();
        glyph
    }

    #[test]
    fn round_trip_lines_and_curves() {
        let glyph = glyph_with_points(vec![
            CurvePoint::on_curve(20, -100),
            CurvePoint::off_curve(1337, 1338),
            CurvePoint::off_curve(-50, -69),
            CurvePoint::on_curve(-255, 256),
        ]);
        let (_, decoded) = round_trip(&glyph);
        assert_eq!(decoded, glyph);
    }

    #[test]
    fn repeated_flags_are_compressed() {
        let points: Vec<CurvePoint> = (0..8)
            .map(|i| CurvePoint::on_curve(i * 10, 5))
            .collect();
        let glyph = glyph_with_points(points);
        let (data, decoded) = round_trip(&glyph);
        assert_eq!(decoded, glyph);
        // the first point gets its own flag; the other seven share one
        // flag with a repeat byte
        let flags_len = 1 + 2;
        let x_len = 7; // the first delta is 0 (skipped), then short deltas
        let y_len = 1; // first delta 5, the rest skip
        assert_eq!(data.len(), 10 + 2 + 2 + flags_len + x_len + y_len);
    }

    #[test]
    fn multiple_contours() {
        let mut glyph = SimpleGlyph {
            bbox: Bbox::default(),
            contours: vec![
                Contour(vec![
                    CurvePoint::on_curve(0, 0),
                    CurvePoint::on_curve(10, 0),
                    CurvePoint::on_curve(10, 10),
                ]),
                Contour(vec![
                    CurvePoint::on_curve(100, 100),
                    CurvePoint::on_curve(300, 100),
                    CurvePoint::on_curve(300, 300),
                ]),
            ],
            instructions: vec![0xB0, 0x01],
        };
        glyph.recompute_bounding_box();
        let (_, decoded) = round_trip(&glyph);
        assert_eq!(decoded, glyph);
        assert_eq!(decoded.instructions, vec![0xB0, 0x01]);
    }

    #[test]
    fn large_deltas_use_two_bytes() {
        let glyph = glyph_with_points(vec![
            CurvePoint::on_curve(0, 0),
            CurvePoint::on_curve(1000, -2000),
            CurvePoint::on_curve(-3000, 4000),
        ]);
        let (_, decoded) = round_trip(&glyph);
        assert_eq!(decoded, glyph);
    }

    #[test]
    fn bad_repeat_count_is_invalid() {
        // 1 contour, end_pt 1 (2 points), no instructions, then a flag
        // repeating 200 times
        let mut data = Vec::new();
        data.extend(1u16.to_be_bytes()); // end_pts[0] = 1
        data.extend(0u16.to_be_bytes()); // instruction length
        data.push(0x09); // on curve | repeat
        data.push(200);
        let mut cursor = FontData::new(&data).cursor("glyf");
        assert!(read_body(&mut cursor, 1, Bbox::default()).is_err());
    }

    #[test]
    fn recompute_bounding_box() {
        let glyph = glyph_with_points(vec![
            CurvePoint::on_curve(-5, 10),
            CurvePoint::on_curve(300, -20),
        ]);
        assert_eq!(
            glyph.bbox,
            Bbox {
                x_min: -5,
                y_min: -20,
                x_max: 300,
                y_max: 10
            }
        );
    }
}
