//! The charstring glyph model: absolute drawing commands, stem hints and an
//! advance width.

use outline_types::Fixed;

/// A point with 16.16 fixed-point coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Point {
    pub x: Fixed,
    pub y: Fixed,
}

impl Point {
    pub fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }
}

/// A single drawing command with absolute coordinates.
///
/// Subpaths are implicitly closed; a [`MoveTo`](Command::MoveTo) starts the
/// next one. Hint masks appear between commands at the position they held in
/// the charstring.
#[derive(Clone, PartialEq, Debug)]
pub enum Command {
    MoveTo(Point),
    LineTo(Point),
    /// A cubic Bézier segment: two control points and the end point.
    CurveTo(Point, Point, Point),
    HintMask(Vec<u8>),
    CntrMask(Vec<u8>),
}

/// A stem hint interval.
///
/// The endpoints are stored exactly as decoded; ghost hints keep their
/// negative widths so they re-encode to the original deltas.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Stem {
    pub start: Fixed,
    pub end: Fixed,
}

impl Stem {
    pub fn new(start: Fixed, end: Fixed) -> Self {
        Self { start, end }
    }
}

/// One glyph outline: a command list, optional stem hints and the advance
/// width.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Glyph {
    /// The glyph name; `None` for CID-keyed fonts and unnamed glyphs.
    pub name: Option<String>,
    pub commands: Vec<Command>,
    pub hstems: Vec<Stem>,
    pub vstems: Vec<Stem>,
    pub width: Fixed,
}

impl Glyph {
    /// Creates an empty glyph with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Starts a new subpath at the given position.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.commands
            .push(Command::MoveTo(point_from_f64(x, y)));
    }

    /// Appends a line segment.
    pub fn line_to(&mut self, x: f64, y: f64) {
        self.commands
            .push(Command::LineTo(point_from_f64(x, y)));
    }

    /// Appends a cubic Bézier segment.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) {
        self.commands.push(Command::CurveTo(
            point_from_f64(x1, y1),
            point_from_f64(x2, y2),
            point_from_f64(x3, y3),
        ));
    }

    /// Returns true if the glyph draws nothing.
    pub fn is_blank(&self) -> bool {
        !self
            .commands
            .iter()
            .any(|cmd| matches!(cmd, Command::MoveTo(_)))
    }

    /// True if the command list contains a hint or counter mask.
    pub fn has_hint_masks(&self) -> bool {
        self.commands
            .iter()
            .any(|cmd| matches!(cmd, Command::HintMask(_) | Command::CntrMask(_)))
    }
}

fn point_from_f64(x: f64, y: f64) -> Point {
    Point::new(Fixed::from_f64(x), Fixed::from_f64(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let mut glyph = Glyph::new("I");
        glyph.move_to(100.0, 0.0);
        glyph.line_to(100.0, 700.0);
        assert_eq!(glyph.name.as_deref(), Some("I"));
        assert_eq!(glyph.commands.len(), 2);
        assert!(!glyph.is_blank());
        assert!(!glyph.has_hint_masks());
    }

    #[test]
    fn blank_glyph() {
        let glyph = Glyph::default();
        assert!(glyph.is_blank());
    }
}
