//! CFF DICT structures.
//!
//! A DICT is a sequence of `(operand*, operator)` groups. Operands use the
//! charstring integer forms plus a five byte integer (operator 29) and
//! nibble-coded reals (operator 30); operators are one byte or an escape
//! pair. The reader accumulates operands per operator key; the writer emits
//! entries in numerical key order, omitting values equal to their defaults.

use std::collections::BTreeMap;

use crate::font_data::{Cursor, FontData};
use crate::Error;

/// A DICT operator key: the opcode, or `0x0c00 | opcode` for escaped
/// operators. Keys sort in the numerical order the writer needs.
pub type Key = u16;

/// Builds the key for an escaped (two byte) operator.
pub const fn esc(opcode: u8) -> Key {
    0x0c00 | opcode as Key
}

/// Top and Private DICT operators used by this crate.
///
/// See "Table 9 Top DICT Operator Entries" and "Table 23 Private DICT
/// Operators" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf>
pub mod op {
    use super::{esc, Key};

    pub const VERSION: Key = 0;
    pub const NOTICE: Key = 1;
    pub const FULL_NAME: Key = 2;
    pub const FAMILY_NAME: Key = 3;
    pub const WEIGHT: Key = 4;
    pub const FONT_BBOX: Key = 5;
    pub const BLUE_VALUES: Key = 6;
    pub const OTHER_BLUES: Key = 7;
    pub const FAMILY_BLUES: Key = 8;
    pub const FAMILY_OTHER_BLUES: Key = 9;
    pub const STD_HW: Key = 10;
    pub const STD_VW: Key = 11;
    pub const UNIQUE_ID: Key = 13;
    pub const XUID: Key = 14;
    pub const CHARSET: Key = 15;
    pub const ENCODING: Key = 16;
    pub const CHARSTRINGS: Key = 17;
    pub const PRIVATE: Key = 18;
    pub const SUBRS: Key = 19;
    pub const DEFAULT_WIDTH_X: Key = 20;
    pub const NOMINAL_WIDTH_X: Key = 21;

    pub const COPYRIGHT: Key = esc(0);
    pub const IS_FIXED_PITCH: Key = esc(1);
    pub const ITALIC_ANGLE: Key = esc(2);
    pub const UNDERLINE_POSITION: Key = esc(3);
    pub const UNDERLINE_THICKNESS: Key = esc(4);
    pub const PAINT_TYPE: Key = esc(5);
    pub const CHARSTRING_TYPE: Key = esc(6);
    pub const FONT_MATRIX: Key = esc(7);
    pub const STROKE_WIDTH: Key = esc(8);
    pub const BLUE_SCALE: Key = esc(9);
    pub const BLUE_SHIFT: Key = esc(10);
    pub const BLUE_FUZZ: Key = esc(11);
    pub const STEM_SNAP_H: Key = esc(12);
    pub const STEM_SNAP_V: Key = esc(13);
    pub const FORCE_BOLD: Key = esc(14);
    pub const LANGUAGE_GROUP: Key = esc(17);
    pub const EXPANSION_FACTOR: Key = esc(18);
    pub const INITIAL_RANDOM_SEED: Key = esc(19);
    pub const SYNTHETIC_BASE: Key = esc(20);
    pub const POSTSCRIPT: Key = esc(21);
    pub const BASE_FONT_NAME: Key = esc(22);
    pub const BASE_FONT_BLEND: Key = esc(23);
    pub const ROS: Key = esc(30);
    pub const CID_FONT_VERSION: Key = esc(31);
    pub const CID_FONT_REVISION: Key = esc(32);
    pub const CID_FONT_TYPE: Key = esc(33);
    pub const CID_COUNT: Key = esc(34);
    pub const UID_BASE: Key = esc(35);
    pub const FD_ARRAY: Key = esc(36);
    pub const FD_SELECT: Key = esc(37);
    pub const FONT_NAME: Key = esc(38);
}

/// A single DICT operand slot.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Operand {
    Int(i32),
    Real(f64),
    /// A string index; encodes like an integer but is tracked separately so
    /// callers can tell string references from plain numbers.
    Sid(u16),
}

impl Operand {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(value) => *value as f64,
            Self::Real(value) => *value,
            Self::Sid(value) => *value as f64,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Int(value) => *value,
            Self::Real(value) => *value as i32,
            Self::Sid(value) => *value as i32,
        }
    }
}

/// An ordered operator → operands map.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Dict {
    entries: BTreeMap<Key, Vec<Operand>>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses DICT data, accumulating the operands for each operator.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut entries = BTreeMap::new();
        let mut operands = Vec::new();
        let mut cursor = FontData::new(data).cursor("cff");
        while cursor.remaining_bytes() != 0 {
            let b0 = cursor.read_u8()?;
            match b0 {
                28 | 32..=254 => {
                    operands.push(Operand::Int(parse_int(&mut cursor, b0)?));
                }
                29 => operands.push(Operand::Int(cursor.read_i32()?)),
                30 => operands.push(Operand::Real(parse_real(&mut cursor)?)),
                12 => {
                    let b1 = cursor.read_u8()?;
                    entries.insert(esc(b1), std::mem::take(&mut operands));
                }
                0..=21 => {
                    entries.insert(b0 as Key, std::mem::take(&mut operands));
                }
                _ => {
                    return Err(Error::invalid(
                        "cff",
                        format!("invalid DICT operator {b0}"),
                    ))
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn contains(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: Key) -> Option<&[Operand]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    pub fn set(&mut self, key: Key, operands: Vec<Operand>) {
        self.entries.insert(key, operands);
    }

    pub fn set_int(&mut self, key: Key, value: i32) {
        self.set(key, vec![Operand::Int(value)]);
    }

    pub fn remove(&mut self, key: Key) -> Option<Vec<Operand>> {
        self.entries.remove(&key)
    }

    /// Returns a single-operand entry as an integer.
    pub fn int(&self, key: Key) -> Option<i32> {
        Some(self.get(key)?.first()?.as_i32())
    }

    /// Returns a single-operand entry as a float.
    pub fn real(&self, key: Key) -> Option<f64> {
        Some(self.get(key)?.first()?.as_f64())
    }

    /// Returns an array-valued entry as floats.
    pub fn array(&self, key: Key) -> Option<Vec<f64>> {
        Some(self.get(key)?.iter().map(Operand::as_f64).collect())
    }

    /// Returns a delta encoded array entry, decoded by prefix sum.
    pub fn delta(&self, key: Key) -> Option<Vec<f64>> {
        let mut values = self.array(key)?;
        let mut sum = 0.0;
        for value in &mut values {
            sum += *value;
            *value = sum;
        }
        Some(values)
    }

    /// Stores an array with delta encoding.
    pub fn set_delta(&mut self, key: Key, values: &[f64]) {
        let mut prev = 0.0;
        let operands = values
            .iter()
            .map(|value| {
                let delta = value - prev;
                prev = *value;
                number_operand(delta)
            })
            .collect();
        self.set(key, operands);
    }

    /// Serializes the entries in numerical key order.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_priority(&[])
    }

    /// Serializes with the listed keys emitted first, then the remaining
    /// entries in numerical key order.
    ///
    /// A CID-keyed Top DICT must lead with its `ROS` entry.
    pub fn encode_priority(&self, first: &[Key]) -> Vec<u8> {
        let mut out = Vec::new();
        for key in first {
            if let Some(operands) = self.entries.get(key) {
                push_entry(*key, operands, &mut out);
            }
        }
        for (key, operands) in &self.entries {
            if first.contains(key) {
                continue;
            }
            push_entry(*key, operands, &mut out);
        }
        out
    }
}

fn push_entry(key: Key, operands: &[Operand], out: &mut Vec<u8>) {
    for operand in operands {
        push_operand(*operand, out);
    }
    if key >= 0x0c00 {
        out.push(12);
        out.push(key as u8);
    } else {
        out.push(key as u8);
    }
}

/// Picks the integer operand when the value is integral.
pub fn number_operand(value: f64) -> Operand {
    if value.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(&value) {
        Operand::Int(value as i32)
    } else {
        Operand::Real(value)
    }
}

fn parse_int(cursor: &mut Cursor, b0: u8) -> Result<i32, Error> {
    Ok(match b0 {
        32..=246 => b0 as i32 - 139,
        247..=250 => (b0 as i32 - 247) * 256 + cursor.read_u8()? as i32 + 108,
        251..=254 => -(b0 as i32 - 251) * 256 - cursor.read_u8()? as i32 - 108,
        28 => cursor.read_i16()? as i32,
        _ => return Err(Error::invalid("cff", format!("invalid number byte {b0}"))),
    })
}

// Nibble values for real number operands.
// 0-9: digits, a: decimal point, b: E, c: E-, e: minus, f: end of number
fn parse_real(cursor: &mut Cursor) -> Result<f64, Error> {
    let mut text = String::new();
    'outer: loop {
        let byte = cursor.read_u8()?;
        for nibble in [byte >> 4, byte & 0xF] {
            match nibble {
                0x0..=0x9 => text.push((b'0' + nibble) as char),
                0xA => text.push('.'),
                0xB => text.push('E'),
                0xC => text.push_str("E-"),
                0xE => text.push('-'),
                0xF => break 'outer,
                _ => return Err(Error::invalid("cff", "invalid real number nibble")),
            }
        }
    }
    text.parse()
        .map_err(|_| Error::invalid("cff", format!("malformed real number '{text}'")))
}

fn push_real(value: f64, out: &mut Vec<u8>) {
    // the shortest decimal form that round-trips through f64
    let text = format!("{value}");
    let mut nibbles = Vec::with_capacity(text.len() + 1);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '0'..='9' => nibbles.push(ch as u8 - b'0'),
            '.' => nibbles.push(0xA),
            '-' => nibbles.push(0xE),
            'e' | 'E' => {
                if chars.peek() == Some(&'-') {
                    chars.next();
                    nibbles.push(0xC);
                } else {
                    nibbles.push(0xB);
                }
            }
            // "+" never appears in Rust's shortest formatting
            _ => debug_assert!(false, "unexpected char in float format: {ch}"),
        }
    }
    nibbles.push(0xF);
    if nibbles.len() % 2 != 0 {
        nibbles.push(0xF);
    }
    out.push(30);
    for pair in nibbles.chunks(2) {
        out.push(pair[0] << 4 | pair[1]);
    }
}

fn push_operand(operand: Operand, out: &mut Vec<u8>) {
    match operand {
        Operand::Int(value) => push_int(value, out),
        Operand::Sid(value) => push_int(value as i32, out),
        Operand::Real(value) => push_real(value, out),
    }
}

/// The DICT integer forms: one, two, three or five bytes.
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
            out.push(29);
            out.extend(value.to_be_bytes());
        }
    }
}
