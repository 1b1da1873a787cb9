//! The Type 2 charstring virtual machine.
//!
//! [`decode`] evaluates charstring bytecode against an operand stack and
//! emits absolute drawing commands; [`encode`] performs the inverse,
//! producing the shortest operator sequence known for a glyph.
//!
//! Evaluation is deterministic: the `random` operator returns a fixed
//! constant, so the same charstring always yields the same outline.

mod stack;

pub mod decode;
pub mod encode;

pub use decode::{evaluate, CommandSink};
pub use encode::encode_glyph;
pub use stack::Stack;

use crate::font_data::Cursor;
use crate::Error;
use outline_types::Fixed;

/// Maximum nesting depth for subroutine calls.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" in
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>
pub const NESTING_DEPTH_LIMIT: u32 = 10;

/// Number of slots in the transient store used by `put` and `get`.
pub const TRANSIENT_SLOTS: usize = 32;

/// The default and nominal advance widths from a private dictionary.
///
/// A charstring encodes its advance width, if at all, as a single extra
/// operand holding the offset from the nominal width; when absent the width
/// is the default width.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Widths {
    pub default: Fixed,
    pub nominal: Fixed,
}

/// Computes the bias added to subroutine call operands for a subroutine
/// table of the given size.
pub fn subr_bias(count: usize) -> i32 {
    if count < 1240 {
        107
    } else if count < 33900 {
        1131
    } else {
        32768
    }
}

/// Parses a charstring integer whose first byte is `b0`.
///
/// Unlike DICT data, charstrings reserve byte 29 for `callgsubr`, so only
/// the one, two and three byte integer forms appear here.
pub(crate) fn parse_int(cursor: &mut Cursor, b0: u8) -> Result<i32, Error> {
    Ok(match b0 {
        32..=246 => b0 as i32 - 139,
        247..=250 => (b0 as i32 - 247) * 256 + cursor.read_u8()? as i32 + 108,
        251..=254 => -(b0 as i32 - 251) * 256 - cursor.read_u8()? as i32 - 108,
        28 => cursor.read_i16()? as i32,
        _ => return Err(Error::invalid("type2", format!("invalid number byte {b0}"))),
    })
}

/// Appends the shortest charstring encoding of an integer.
pub(crate) fn push_int(value: i32, out: &mut Vec<u8>) {
    match value {
        -107..=107 => out.push((value + 139) as u8),
        108..=1131 => {
            let v = value - 108;
            out.push((v >> 8) as u8 + 247);
            out.push(v as u8);
        }
        -1131..=-108 => {
            let v = -value - 108;
            out.push((v >> 8) as u8 + 251);
            out.push(v as u8);
        }
        _ if (i16::MIN as i32..=i16::MAX as i32).contains(&value) => {
            out.push(28);
            out.extend((value as i16).to_be_bytes());
        }
        _ => {
            // integral 16.16 values always have an int16 integer part, so
            // this arm only sees values that saturate
            out.push(255);
            let bits = ((value as i64) << 16).clamp(i32::MIN as i64, i32::MAX as i64);
            out.extend((bits as i32).to_be_bytes());
        }
    }
}

/// Appends the shortest charstring encoding of a 16.16 number.
///
/// A value with a zero fractional part encodes through the integer forms;
/// anything else takes the five byte fixed-point form.
pub(crate) fn push_number(value: Fixed, out: &mut Vec<u8>) {
    if value.is_integer() {
        push_int(value.to_bits() >> 16, out);
    } else {
        out.push(255);
        out.extend(value.to_bits().to_be_bytes());
    }
}

/// Charstring operators.
///
/// See "Appendix A Type 2 Charstring Command Codes" in
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>
pub(crate) mod ops {
    // One byte operators
    pub const HSTEM: u8 = 1;
    pub const VSTEM: u8 = 3;
    pub const VMOVETO: u8 = 4;
    pub const RLINETO: u8 = 5;
    pub const HLINETO: u8 = 6;
    pub const VLINETO: u8 = 7;
    pub const RRCURVETO: u8 = 8;
    pub const CALLSUBR: u8 = 10;
    pub const RETURN: u8 = 11;
    pub const ENDCHAR: u8 = 14;
    pub const HSTEMHM: u8 = 18;
    pub const HINTMASK: u8 = 19;
    pub const CNTRMASK: u8 = 20;
    pub const RMOVETO: u8 = 21;
    pub const HMOVETO: u8 = 22;
    pub const VSTEMHM: u8 = 23;
    pub const RCURVELINE: u8 = 24;
    pub const RLINECURVE: u8 = 25;
    pub const VVCURVETO: u8 = 26;
    pub const HHCURVETO: u8 = 27;
    pub const CALLGSUBR: u8 = 29;
    pub const VHCURVETO: u8 = 30;
    pub const HVCURVETO: u8 = 31;

    // Escape code to trigger processing of a two byte operator
    pub const ESCAPE: u8 = 12;

    // Two byte operators
    pub const DOTSECTION: u8 = 0;
    pub const AND: u8 = 3;
    pub const OR: u8 = 4;
    pub const NOT: u8 = 5;
    pub const ABS: u8 = 9;
    pub const ADD: u8 = 10;
    pub const SUB: u8 = 11;
    pub const DIV: u8 = 12;
    pub const NEG: u8 = 14;
    pub const EQ: u8 = 15;
    pub const DROP: u8 = 18;
    pub const PUT: u8 = 20;
    pub const GET: u8 = 21;
    pub const IFELSE: u8 = 22;
    pub const RANDOM: u8 = 23;
    pub const MUL: u8 = 24;
    pub const SQRT: u8 = 26;
    pub const DUP: u8 = 27;
    pub const EXCH: u8 = 28;
    pub const INDEX: u8 = 29;
    pub const ROLL: u8 = 30;
    pub const HFLEX: u8 = 34;
    pub const FLEX: u8 = 35;
    pub const HFLEX1: u8 = 36;
    pub const FLEX1: u8 = 37;
}
