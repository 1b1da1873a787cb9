//! Evaluation of Type 2 charstrings.

use outline_types::Fixed;

use super::stack::{Number, Stack};
use super::{ops, parse_int, subr_bias, Widths, NESTING_DEPTH_LIMIT, TRANSIENT_SLOTS};
use crate::font_data::FontData;
use crate::glyph::{Command, Glyph, Point, Stem};
use crate::tables::cff::index::Index;
use crate::Error;

/// Trait for processing commands resulting from charstring evaluation.
#[allow(unused_variables)]
pub trait CommandSink {
    /// The glyph advance width, reported exactly once per charstring.
    fn width(&mut self, width: Fixed) {}
    /// Horizontal stem hint from `start` to `end`.
    fn hstem(&mut self, start: Fixed, end: Fixed) {}
    /// Vertical stem hint from `start` to `end`.
    fn vstem(&mut self, start: Fixed, end: Fixed) {}
    /// Bitmask defining the hints that are active for the commands that
    /// follow.
    fn hint_mask(&mut self, mask: &[u8]) {}
    /// Bitmask defining the active counter hints.
    fn counter_mask(&mut self, mask: &[u8]) {}
    fn move_to(&mut self, x: Fixed, y: Fixed);
    fn line_to(&mut self, x: Fixed, y: Fixed);
    fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed);
}

/// Evaluates the given charstring and emits the resulting commands to the
/// specified sink.
pub fn evaluate(
    charstring: &[u8],
    global_subrs: &Index,
    local_subrs: &Index,
    widths: Widths,
    sink: &mut impl CommandSink,
) -> Result<(), Error> {
    let mut evaluator = Evaluator::new(global_subrs, local_subrs, widths);
    evaluator.evaluate(charstring, Fixed::ZERO, Fixed::ZERO, sink, 0)?;
    if !evaluator.ended {
        return Err(Error::invalid("type2", "charstring ended without endchar"));
    }
    if !evaluator.have_read_width {
        sink.width(widths.default);
    }
    Ok(())
}

/// Parses a charstring into an owned [`Glyph`].
pub fn parse_glyph(
    charstring: &[u8],
    global_subrs: &Index,
    local_subrs: &Index,
    widths: Widths,
) -> Result<Glyph, Error> {
    let mut builder = GlyphBuilder {
        glyph: Glyph::default(),
    };
    evaluate(charstring, global_subrs, local_subrs, widths, &mut builder)?;
    Ok(builder.glyph)
}

struct GlyphBuilder {
    glyph: Glyph,
}

impl CommandSink for GlyphBuilder {
    fn width(&mut self, width: Fixed) {
        self.glyph.width = width;
    }

    fn hstem(&mut self, start: Fixed, end: Fixed) {
        self.glyph.hstems.push(Stem::new(start, end));
    }

    fn vstem(&mut self, start: Fixed, end: Fixed) {
        self.glyph.vstems.push(Stem::new(start, end));
    }

    fn hint_mask(&mut self, mask: &[u8]) {
        self.glyph.commands.push(Command::HintMask(mask.to_vec()));
    }

    fn counter_mask(&mut self, mask: &[u8]) {
        self.glyph.commands.push(Command::CntrMask(mask.to_vec()));
    }

    fn move_to(&mut self, x: Fixed, y: Fixed) {
        self.glyph
            .commands
            .push(Command::MoveTo(Point::new(x, y)));
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) {
        self.glyph
            .commands
            .push(Command::LineTo(Point::new(x, y)));
    }

    fn curve_to(&mut self, cx0: Fixed, cy0: Fixed, cx1: Fixed, cy1: Fixed, x: Fixed, y: Fixed) {
        self.glyph.commands.push(Command::CurveTo(
            Point::new(cx0, cy0),
            Point::new(cx1, cy1),
            Point::new(x, y),
        ));
    }
}

struct Evaluator<'a> {
    global_subrs: &'a Index<'a>,
    local_subrs: &'a Index<'a>,
    widths: Widths,
    is_open: bool,
    have_read_width: bool,
    seen_hint_mask: bool,
    ended: bool,
    stem_count: usize,
    stack: Stack,
    transient: [Number; TRANSIENT_SLOTS],
}

impl<'a> Evaluator<'a> {
    fn new(global_subrs: &'a Index<'a>, local_subrs: &'a Index<'a>, widths: Widths) -> Self {
        Self {
            global_subrs,
            local_subrs,
            widths,
            is_open: false,
            have_read_width: false,
            seen_hint_mask: false,
            ended: false,
            stem_count: 0,
            stack: Stack::new(),
            transient: [Number::I32(0); TRANSIENT_SLOTS],
        }
    }

    fn evaluate(
        &mut self,
        charstring: &[u8],
        mut x: Fixed,
        mut y: Fixed,
        sink: &mut impl CommandSink,
        nesting_depth: u32,
    ) -> Result<(Fixed, Fixed), Error> {
        if nesting_depth > NESTING_DEPTH_LIMIT {
            return Err(Error::invalid(
                "type2",
                "subroutine nesting depth limit exceeded",
            ));
        }
        use ops::*;
        let mut cursor = FontData::new(charstring).cursor("type2");
        while cursor.remaining_bytes() != 0 {
            let op = cursor.read_u8()?;
            if op == ESCAPE {
                let two_byte_op = cursor.read_u8()?;
                match two_byte_op {
                    // The flex operators emit two curves; the flex depth
                    // operand only matters to renderers that may flatten
                    // the pair into a line, so it is consumed and ignored.
                    HFLEX => {
                        let dx1 = x + self.stack.get_fixed(0)?;
                        let dy1 = y;
                        let dx2 = dx1 + self.stack.get_fixed(1)?;
                        let dy2 = dy1 + self.stack.get_fixed(2)?;
                        let dx3 = dx2 + self.stack.get_fixed(3)?;
                        let dy3 = dy2;
                        let dx4 = dx3 + self.stack.get_fixed(4)?;
                        let dy4 = dy2;
                        let dx5 = dx4 + self.stack.get_fixed(5)?;
                        let dy5 = y;
                        x = dx5 + self.stack.get_fixed(6)?;
                        self.check_open()?;
                        sink.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        sink.curve_to(dx4, dy4, dx5, dy5, x, y);
                        self.stack.clear();
                    }
                    FLEX => {
                        let dx1 = x + self.stack.get_fixed(0)?;
                        let dy1 = y + self.stack.get_fixed(1)?;
                        let dx2 = dx1 + self.stack.get_fixed(2)?;
                        let dy2 = dy1 + self.stack.get_fixed(3)?;
                        let dx3 = dx2 + self.stack.get_fixed(4)?;
                        let dy3 = dy2 + self.stack.get_fixed(5)?;
                        let dx4 = dx3 + self.stack.get_fixed(6)?;
                        let dy4 = dy3 + self.stack.get_fixed(7)?;
                        let dx5 = dx4 + self.stack.get_fixed(8)?;
                        let dy5 = dy4 + self.stack.get_fixed(9)?;
                        x = dx5 + self.stack.get_fixed(10)?;
                        y = dy5 + self.stack.get_fixed(11)?;
                        self.check_open()?;
                        sink.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        sink.curve_to(dx4, dy4, dx5, dy5, x, y);
                        self.stack.clear();
                    }
                    HFLEX1 => {
                        let dx1 = x + self.stack.get_fixed(0)?;
                        let dy1 = y + self.stack.get_fixed(1)?;
                        let dx2 = dx1 + self.stack.get_fixed(2)?;
                        let dy2 = dy1 + self.stack.get_fixed(3)?;
                        let dx3 = dx2 + self.stack.get_fixed(4)?;
                        let dy3 = dy2;
                        let dx4 = dx3 + self.stack.get_fixed(5)?;
                        let dy4 = dy2;
                        let dx5 = dx4 + self.stack.get_fixed(6)?;
                        let dy5 = dy4 + self.stack.get_fixed(7)?;
                        x = dx5 + self.stack.get_fixed(8)?;
                        self.check_open()?;
                        sink.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        sink.curve_to(dx4, dy4, dx5, dy5, x, y);
                        self.stack.clear();
                    }
                    FLEX1 => {
                        let start_x = x;
                        let start_y = y;
                        let dx1 = x + self.stack.get_fixed(0)?;
                        let dy1 = y + self.stack.get_fixed(1)?;
                        let dx2 = dx1 + self.stack.get_fixed(2)?;
                        let dy2 = dy1 + self.stack.get_fixed(3)?;
                        let dx3 = dx2 + self.stack.get_fixed(4)?;
                        let dy3 = dy2 + self.stack.get_fixed(5)?;
                        let dx4 = dx3 + self.stack.get_fixed(6)?;
                        let dy4 = dy3 + self.stack.get_fixed(7)?;
                        let dx5 = dx4 + self.stack.get_fixed(8)?;
                        let dy5 = dy4 + self.stack.get_fixed(9)?;
                        if (dx5 - start_x).abs() > (dy5 - start_y).abs() {
                            x = dx5 + self.stack.get_fixed(10)?;
                        } else {
                            y = dy5 + self.stack.get_fixed(10)?;
                        }
                        self.check_open()?;
                        sink.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        sink.curve_to(dx4, dy4, dx5, dy5, x, y);
                        self.stack.clear();
                    }
                    DOTSECTION => {
                        // deprecated; accepted and ignored
                        self.stack.clear();
                    }
                    AND => {
                        let b = self.stack.pop_fixed()?;
                        let a = self.stack.pop_fixed()?;
                        self.stack
                            .push((a != Fixed::ZERO && b != Fixed::ZERO) as i32)?;
                    }
                    OR => {
                        let b = self.stack.pop_fixed()?;
                        let a = self.stack.pop_fixed()?;
                        self.stack
                            .push((a != Fixed::ZERO || b != Fixed::ZERO) as i32)?;
                    }
                    NOT => {
                        let a = self.stack.pop_fixed()?;
                        self.stack.push((a == Fixed::ZERO) as i32)?;
                    }
                    ABS => {
                        let a = self.stack.pop_number()?;
                        self.stack.push(match a {
                            Number::I32(v) => Number::I32(v.saturating_abs()),
                            Number::Fixed(v) => Number::Fixed(v.abs()),
                        })?;
                    }
                    ADD => {
                        let (a, b) = self.pop_binary()?;
                        self.stack.push(match (a, b) {
                            (Number::I32(a), Number::I32(b)) => Number::I32(a.saturating_add(b)),
                            _ => Number::Fixed(to_fixed(a) + to_fixed(b)),
                        })?;
                    }
                    SUB => {
                        let (a, b) = self.pop_binary()?;
                        self.stack.push(match (a, b) {
                            (Number::I32(a), Number::I32(b)) => Number::I32(a.saturating_sub(b)),
                            _ => Number::Fixed(to_fixed(a) - to_fixed(b)),
                        })?;
                    }
                    DIV => {
                        let (a, b) = self.pop_binary()?;
                        self.stack.push(to_fixed(a) / to_fixed(b))?;
                    }
                    NEG => {
                        let a = self.stack.pop_number()?;
                        self.stack.push(match a {
                            Number::I32(v) => Number::I32(v.saturating_neg()),
                            Number::Fixed(v) => Number::Fixed(-v),
                        })?;
                    }
                    EQ => {
                        let b = self.stack.pop_fixed()?;
                        let a = self.stack.pop_fixed()?;
                        self.stack.push((a == b) as i32)?;
                    }
                    DROP => {
                        self.stack.pop_number()?;
                    }
                    PUT => {
                        let slot = self.stack.pop_i32()?;
                        let value = self.stack.pop_number()?;
                        *self.transient_slot(slot)? = value;
                    }
                    GET => {
                        let slot = self.stack.pop_i32()?;
                        let value = *self.transient_slot(slot)?;
                        self.stack.push(value)?;
                    }
                    IFELSE => {
                        let v2 = self.stack.pop_fixed()?;
                        let v1 = self.stack.pop_fixed()?;
                        let s2 = self.stack.pop_number()?;
                        let s1 = self.stack.pop_number()?;
                        self.stack.push(if v1 <= v2 { s1 } else { s2 })?;
                    }
                    // A fixed value keeps charstring evaluation
                    // deterministic; any constant in (0, 1] conforms.
                    RANDOM => {
                        self.stack.push(Fixed::from_bits(40501))?;
                    }
                    MUL => {
                        let (a, b) = self.pop_binary()?;
                        self.stack.push(to_fixed(a) * to_fixed(b))?;
                    }
                    SQRT => {
                        let a = self.stack.pop_fixed()?;
                        let root = if a <= Fixed::ZERO {
                            Fixed::ZERO
                        } else {
                            Fixed::from_f64(a.to_f64().sqrt())
                        };
                        self.stack.push(root)?;
                    }
                    DUP => self.stack.dup()?,
                    EXCH => self.stack.exch()?,
                    INDEX => {
                        let n = self.stack.pop_i32()?;
                        self.stack.index(n)?;
                    }
                    ROLL => {
                        let j = self.stack.pop_i32()?;
                        let n = self.stack.pop_i32()?;
                        self.stack.roll(n, j)?;
                    }
                    _ => {
                        return Err(Error::unsupported(
                            "type2",
                            format!("charstring operator 12 {two_byte_op}"),
                        ))
                    }
                }
            } else {
                match op {
                    // Push a number to the stack
                    28 | 32..=254 => {
                        self.stack.push(parse_int(&mut cursor, op)?)?;
                    }
                    255 => {
                        self.stack.push(Fixed::from_bits(cursor.read_i32()?))?;
                    }
                    // Return from the current subroutine
                    RETURN => {
                        break;
                    }
                    // End the whole charstring
                    ENDCHAR => {
                        if !self.have_read_width
                            && (self.stack.len() == 1 || self.stack.len() > 4)
                        {
                            self.read_width(sink)?;
                        }
                        self.stack.clear();
                        self.ended = true;
                        break;
                    }
                    // Emits a sequence of stem hints from delta encoded
                    // interval endpoints
                    HSTEM | VSTEM | HSTEMHM | VSTEMHM => {
                        if self.seen_hint_mask {
                            return Err(Error::invalid(
                                "type2",
                                "stem operator after hint mask",
                            ));
                        }
                        let is_horizontal = op == HSTEM || op == HSTEMHM;
                        self.emit_stems(is_horizontal, sink)?;
                    }
                    // Applies a hint or counter mask. Any operands left on
                    // the stack are an implied series of vstem hints. The
                    // mask bytes live in the instruction stream, not on the
                    // operand stack.
                    HINTMASK | CNTRMASK => {
                        self.emit_stems(false, sink)?;
                        self.seen_hint_mask = true;
                        let count = (self.stem_count + 7) / 8;
                        let mask = cursor.read_array(count)?;
                        if op == HINTMASK {
                            sink.hint_mask(mask);
                        } else {
                            sink.counter_mask(mask);
                        }
                    }
                    // Starts a new subpath
                    RMOVETO => {
                        let mut i = 0;
                        if !self.have_read_width && self.stack.len() > 2 {
                            self.read_width(sink)?;
                            i = 1;
                        }
                        self.is_open = true;
                        x += self.stack.get_fixed(i)?;
                        y += self.stack.get_fixed(i + 1)?;
                        sink.move_to(x, y);
                        self.stack.clear();
                    }
                    // Starts a new subpath by moving in one axis
                    HMOVETO | VMOVETO => {
                        let mut i = 0;
                        if !self.have_read_width && self.stack.len() > 1 {
                            self.read_width(sink)?;
                            i = 1;
                        }
                        self.is_open = true;
                        if op == HMOVETO {
                            x += self.stack.get_fixed(i)?;
                        } else {
                            y += self.stack.get_fixed(i)?;
                        }
                        sink.move_to(x, y);
                        self.stack.clear();
                    }
                    // Emits a sequence of lines
                    RLINETO => {
                        self.check_open()?;
                        let mut i = 0;
                        while i + 2 <= self.stack.len() {
                            x += self.stack.get_fixed(i)?;
                            y += self.stack.get_fixed(i + 1)?;
                            sink.line_to(x, y);
                            i += 2;
                        }
                        self.stack.clear();
                    }
                    // Emits alternating horizontal and vertical lines
                    HLINETO | VLINETO => {
                        self.check_open()?;
                        let mut is_x = op == HLINETO;
                        for i in 0..self.stack.len() {
                            let value = self.stack.get_fixed(i)?;
                            if is_x {
                                x += value;
                            } else {
                                y += value;
                            }
                            is_x = !is_x;
                            sink.line_to(x, y);
                        }
                        self.stack.clear();
                    }
                    // Emits a sequence of curves, possibly followed by a
                    // line
                    RRCURVETO | RCURVELINE => {
                        self.check_open()?;
                        let count = self.stack.len();
                        let mut i = 0;
                        while i + 6 <= count {
                            let x1 = x + self.stack.get_fixed(i)?;
                            let y1 = y + self.stack.get_fixed(i + 1)?;
                            let x2 = x1 + self.stack.get_fixed(i + 2)?;
                            let y2 = y1 + self.stack.get_fixed(i + 3)?;
                            x = x2 + self.stack.get_fixed(i + 4)?;
                            y = y2 + self.stack.get_fixed(i + 5)?;
                            sink.curve_to(x1, y1, x2, y2, x, y);
                            i += 6;
                        }
                        if op == RCURVELINE {
                            x += self.stack.get_fixed(i)?;
                            y += self.stack.get_fixed(i + 1)?;
                            sink.line_to(x, y);
                        }
                        self.stack.clear();
                    }
                    // Emits a sequence of lines followed by a curve
                    RLINECURVE => {
                        self.check_open()?;
                        let count = self.stack.len();
                        if count < 6 {
                            return Err(Error::invalid(
                                "type2",
                                "operand stack underflow",
                            ));
                        }
                        let mut i = 0;
                        while i < count - 6 {
                            x += self.stack.get_fixed(i)?;
                            y += self.stack.get_fixed(i + 1)?;
                            sink.line_to(x, y);
                            i += 2;
                        }
                        let x1 = x + self.stack.get_fixed(i)?;
                        let y1 = y + self.stack.get_fixed(i + 1)?;
                        let x2 = x1 + self.stack.get_fixed(i + 2)?;
                        let y2 = y1 + self.stack.get_fixed(i + 3)?;
                        x = x2 + self.stack.get_fixed(i + 4)?;
                        y = y2 + self.stack.get_fixed(i + 5)?;
                        sink.curve_to(x1, y1, x2, y2, x, y);
                        self.stack.clear();
                    }
                    // Curves that start and end vertical, unless the stack
                    // count is odd, in which case the first curve starts
                    // with a free delta
                    VVCURVETO => {
                        self.check_open()?;
                        let mut i = 0;
                        if self.stack.len_is_odd() {
                            x += self.stack.get_fixed(0)?;
                            i += 1;
                        }
                        while i + 4 <= self.stack.len() {
                            let x1 = x;
                            let y1 = y + self.stack.get_fixed(i)?;
                            let x2 = x1 + self.stack.get_fixed(i + 1)?;
                            let y2 = y1 + self.stack.get_fixed(i + 2)?;
                            x = x2;
                            y = y2 + self.stack.get_fixed(i + 3)?;
                            sink.curve_to(x1, y1, x2, y2, x, y);
                            i += 4;
                        }
                        self.stack.clear();
                    }
                    // Curves that start and end horizontal
                    HHCURVETO => {
                        self.check_open()?;
                        let mut i = 0;
                        if self.stack.len_is_odd() {
                            y += self.stack.get_fixed(0)?;
                            i += 1;
                        }
                        while i + 4 <= self.stack.len() {
                            let x1 = x + self.stack.get_fixed(i)?;
                            let y1 = y;
                            let x2 = x1 + self.stack.get_fixed(i + 1)?;
                            let y2 = y1 + self.stack.get_fixed(i + 2)?;
                            x = x2 + self.stack.get_fixed(i + 3)?;
                            y = y2;
                            sink.curve_to(x1, y1, x2, y2, x, y);
                            i += 4;
                        }
                        self.stack.clear();
                    }
                    // Alternates between curves with horizontal and
                    // vertical tangents; the final curve may carry one
                    // extra operand for its off-axis ending delta
                    HVCURVETO | VHCURVETO => {
                        self.check_open()?;
                        let count = self.stack.len();
                        if count % 4 > 1 {
                            return Err(Error::invalid(
                                "type2",
                                "bad operand count for alternating curve",
                            ));
                        }
                        let mut horizontal = op == HVCURVETO;
                        let mut i = 0;
                        while i + 4 <= count {
                            let (x1, y1, x2, y2, x3, y3);
                            if horizontal {
                                x1 = x + self.stack.get_fixed(i)?;
                                y1 = y;
                                x2 = x1 + self.stack.get_fixed(i + 1)?;
                                y2 = y1 + self.stack.get_fixed(i + 2)?;
                                y3 = y2 + self.stack.get_fixed(i + 3)?;
                                x3 = if count - i == 5 {
                                    x2 + self.stack.get_fixed(i + 4)?
                                } else {
                                    x2
                                };
                            } else {
                                x1 = x;
                                y1 = y + self.stack.get_fixed(i)?;
                                x2 = x1 + self.stack.get_fixed(i + 1)?;
                                y2 = y1 + self.stack.get_fixed(i + 2)?;
                                x3 = x2 + self.stack.get_fixed(i + 3)?;
                                y3 = if count - i == 5 {
                                    y2 + self.stack.get_fixed(i + 4)?
                                } else {
                                    y2
                                };
                            }
                            horizontal = !horizontal;
                            sink.curve_to(x1, y1, x2, y2, x3, y3);
                            x = x3;
                            y = y3;
                            i += 4;
                        }
                        self.stack.clear();
                    }
                    // Call a local or global subroutine
                    CALLSUBR | CALLGSUBR => {
                        let subrs = if op == CALLSUBR {
                            self.local_subrs
                        } else {
                            self.global_subrs
                        };
                        let bias = subr_bias(subrs.count());
                        let index = self.stack.pop_i32()? + bias;
                        let subr = usize::try_from(index)
                            .ok()
                            .and_then(|i| subrs.get(i).ok())
                            .ok_or_else(|| {
                                Error::invalid("type2", "subroutine index out of range")
                            })?;
                        let pos = self.evaluate(subr, x, y, sink, nesting_depth + 1)?;
                        x = pos.0;
                        y = pos.1;
                        if self.ended {
                            break;
                        }
                    }
                    _ => {
                        return Err(Error::unsupported(
                            "type2",
                            format!("charstring operator {op}"),
                        ))
                    }
                }
            }
        }
        Ok((x, y))
    }

    /// Consumes the bottom stack entry as the advance width offset.
    fn read_width(&mut self, sink: &mut impl CommandSink) -> Result<(), Error> {
        let delta = self.stack.get_fixed(0)?;
        sink.width(self.widths.nominal + delta);
        self.have_read_width = true;
        Ok(())
    }

    /// Decodes the operand stack as delta encoded stem intervals, taking an
    /// advance width off the bottom when the count is odd.
    fn emit_stems(&mut self, is_horizontal: bool, sink: &mut impl CommandSink) -> Result<(), Error> {
        let mut i = 0;
        if self.stack.len_is_odd() && !self.have_read_width {
            self.read_width(sink)?;
            i = 1;
        }
        let mut start = Fixed::ZERO;
        while i + 2 <= self.stack.len() {
            start += self.stack.get_fixed(i)?;
            let end = start.wrapping_add(self.stack.get_fixed(i + 1)?);
            if is_horizontal {
                sink.hstem(start, end);
            } else {
                sink.vstem(start, end);
            }
            start = end;
            self.stem_count += 1;
            i += 2;
        }
        self.stack.clear();
        Ok(())
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.is_open {
            Ok(())
        } else {
            Err(Error::invalid("type2", "path operator before moveto"))
        }
    }

    fn pop_binary(&mut self) -> Result<(Number, Number), Error> {
        let b = self.stack.pop_number()?;
        let a = self.stack.pop_number()?;
        Ok((a, b))
    }

    fn transient_slot(&mut self, slot: i32) -> Result<&mut Number, Error> {
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.transient.get_mut(i))
            .ok_or_else(|| Error::invalid("type2", format!("transient store index {slot}")))
    }
}

fn to_fixed(number: Number) -> Fixed {
    match number {
        Number::I32(value) => Fixed::from_i32(value),
        Number::Fixed(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, PartialEq, Debug)]
    enum Cmd {
        Width(Fixed),
        HStem(Fixed, Fixed),
        VStem(Fixed, Fixed),
        Mask(usize),
        MoveTo(Fixed, Fixed),
        LineTo(Fixed, Fixed),
        CurveTo(Fixed, Fixed, Fixed, Fixed, Fixed, Fixed),
    }

    #[derive(Default)]
    struct Capture(Vec<Cmd>);

    impl CommandSink for Capture {
        fn width(&mut self, width: Fixed) {
            self.0.push(Cmd::Width(width));
        }
        fn hstem(&mut self, a: Fixed, b: Fixed) {
            self.0.push(Cmd::HStem(a, b));
        }
        fn vstem(&mut self, a: Fixed, b: Fixed) {
            self.0.push(Cmd::VStem(a, b));
        }
        fn hint_mask(&mut self, mask: &[u8]) {
            self.0.push(Cmd::Mask(mask.len()));
        }
        fn move_to(&mut self, x: Fixed, y: Fixed) {
            self.0.push(Cmd::MoveTo(x, y));
        }
        fn line_to(&mut self, x: Fixed, y: Fixed) {
            self.0.push(Cmd::LineTo(x, y));
        }
        fn curve_to(&mut self, a: Fixed, b: Fixed, c: Fixed, d: Fixed, x: Fixed, y: Fixed) {
            self.0.push(Cmd::CurveTo(a, b, c, d, x, y));
        }
    }

    fn eval(charstring: &[u8]) -> Result<Vec<Cmd>, Error> {
        let empty = Index::empty();
        let mut capture = Capture::default();
        evaluate(
            charstring,
            &empty,
            &empty,
            Widths::default(),
            &mut capture,
        )?;
        Ok(capture.0)
    }

    fn fx(v: f64) -> Fixed {
        Fixed::from_f64(v)
    }

    // 50 0 rmoveto 500 hlineto 500 vlineto -500 hlineto endchar
    #[test]
    fn rectangle() {
        let mut cs = Vec::new();
        super::super::push_int(50, &mut cs);
        super::super::push_int(0, &mut cs);
        cs.push(ops::RMOVETO);
        super::super::push_int(500, &mut cs);
        cs.push(ops::HLINETO);
        super::super::push_int(500, &mut cs);
        cs.push(ops::VLINETO);
        super::super::push_int(-500, &mut cs);
        cs.push(ops::HLINETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert_eq!(
            cmds,
            vec![
                Cmd::MoveTo(fx(50.0), fx(0.0)),
                Cmd::LineTo(fx(550.0), fx(0.0)),
                Cmd::LineTo(fx(550.0), fx(500.0)),
                Cmd::LineTo(fx(50.0), fx(500.0)),
                Cmd::Width(fx(0.0)),
            ]
        );
    }

    // An odd operand count on the first stem operator carries the width.
    #[test]
    fn width_from_stem_parity() {
        let mut cs = Vec::new();
        super::super::push_int(120, &mut cs); // width - nominal
        super::super::push_int(10, &mut cs);
        super::super::push_int(20, &mut cs);
        cs.push(ops::HSTEM);
        super::super::push_int(0, &mut cs);
        super::super::push_int(0, &mut cs);
        cs.push(ops::RMOVETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert_eq!(
            cmds,
            vec![
                Cmd::Width(fx(120.0)),
                Cmd::HStem(fx(10.0), fx(30.0)),
                Cmd::MoveTo(fx(0.0), fx(0.0)),
            ]
        );
    }

    // Operands pending before the first hintmask are implicit vstems and
    // the mask bytes come from the instruction stream.
    #[test]
    fn hintmask_with_implicit_vstems() {
        let mut cs = Vec::new();
        super::super::push_int(10, &mut cs);
        super::super::push_int(20, &mut cs);
        cs.push(ops::HSTEMHM);
        super::super::push_int(30, &mut cs);
        super::super::push_int(40, &mut cs);
        cs.push(ops::HINTMASK);
        cs.push(0b1100_0000);
        super::super::push_int(5, &mut cs);
        cs.push(ops::VMOVETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert_eq!(
            cmds,
            vec![
                Cmd::HStem(fx(10.0), fx(30.0)),
                Cmd::VStem(fx(30.0), fx(70.0)),
                Cmd::Mask(1),
                Cmd::MoveTo(fx(0.0), fx(5.0)),
                Cmd::Width(fx(0.0)),
            ]
        );
    }

    #[test]
    fn stem_after_hintmask_is_an_error() {
        let mut cs = Vec::new();
        super::super::push_int(10, &mut cs);
        super::super::push_int(20, &mut cs);
        cs.push(ops::HSTEMHM);
        cs.push(ops::HINTMASK);
        cs.push(0);
        super::super::push_int(1, &mut cs);
        super::super::push_int(2, &mut cs);
        cs.push(ops::VSTEM);
        cs.push(ops::ENDCHAR);
        assert!(matches!(eval(&cs), Err(Error::InvalidFont { .. })));
    }

    #[test]
    fn line_before_moveto_is_an_error() {
        let mut cs = Vec::new();
        super::super::push_int(1, &mut cs);
        super::super::push_int(2, &mut cs);
        cs.push(ops::RLINETO);
        cs.push(ops::ENDCHAR);
        assert!(matches!(eval(&cs), Err(Error::InvalidFont { .. })));
    }

    #[test]
    fn missing_endchar_is_an_error() {
        let mut cs = Vec::new();
        super::super::push_int(0, &mut cs);
        super::super::push_int(0, &mut cs);
        cs.push(ops::RMOVETO);
        assert!(matches!(eval(&cs), Err(Error::InvalidFont { .. })));
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        let cs = [16u8, ops::ENDCHAR];
        assert!(matches!(eval(&cs), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn arithmetic() {
        // 3 4 add 2 mul 0 exch rmoveto => moveto (0, 14)
        let mut cs = Vec::new();
        super::super::push_int(3, &mut cs);
        super::super::push_int(4, &mut cs);
        cs.extend([ops::ESCAPE, ops::ADD]);
        super::super::push_int(2, &mut cs);
        cs.extend([ops::ESCAPE, ops::MUL]);
        super::super::push_int(0, &mut cs);
        cs.extend([ops::ESCAPE, ops::EXCH]);
        cs.push(ops::RMOVETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert!(cmds.contains(&Cmd::MoveTo(fx(0.0), fx(14.0))));
    }

    #[test]
    fn sqrt_of_negative_is_zero() {
        let mut cs = Vec::new();
        super::super::push_int(-4, &mut cs);
        cs.extend([ops::ESCAPE, ops::SQRT]);
        super::super::push_int(0, &mut cs);
        cs.extend([ops::ESCAPE, ops::EXCH]);
        cs.push(ops::RMOVETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert!(cmds.contains(&Cmd::MoveTo(fx(0.0), fx(0.0))));
    }

    #[test]
    fn put_get_round_trip() {
        let mut cs = Vec::new();
        super::super::push_int(42, &mut cs);
        super::super::push_int(7, &mut cs);
        cs.extend([ops::ESCAPE, ops::PUT]);
        super::super::push_int(0, &mut cs);
        super::super::push_int(7, &mut cs);
        cs.extend([ops::ESCAPE, ops::GET]);
        cs.push(ops::RMOVETO);
        cs.push(ops::ENDCHAR);
        let cmds = eval(&cs).unwrap();
        assert!(cmds.contains(&Cmd::MoveTo(fx(0.0), fx(42.0))));
    }

    #[test]
    fn deep_recursion_is_an_error() {
        // one global subr that calls itself: 0 is biased to index 107
        let subr = {
            let mut cs = Vec::new();
            super::super::push_int(-107, &mut cs);
            cs.push(ops::CALLGSUBR);
            cs
        };
        let index_data = {
            let mut data = vec![0u8, 1, 1]; // count 1, offSize 1
            data.push(1);
            data.push(1 + subr.len() as u8);
            data.extend(&subr);
            data
        };
        let gsubrs = Index::read_from(&index_data).unwrap();
        let empty = Index::empty();
        let mut capture = Capture::default();
        let mut charstring = Vec::new();
        super::super::push_int(-107, &mut charstring);
        charstring.push(ops::CALLGSUBR);
        charstring.push(ops::ENDCHAR);
        let result = evaluate(
            &charstring,
            &gsubrs,
            &empty,
            Widths::default(),
            &mut capture,
        );
        assert!(matches!(result, Err(Error::InvalidFont { .. })));
    }
}
