//! CFF encodings.
//!
//! An encoding maps the 256 character codes of a simple font to glyphs.
//! The serialized form lists one code per encoded glyph in glyph order;
//! glyphs reachable from additional codes are written as supplement
//! `(code, SID)` pairs behind the 0x80 flag on the format byte.

use outline_types::GlyphId;

use crate::font_data::FontData;
use crate::Error;

/// A 256-entry code to glyph mapping. Code points that map to glyph 0 are
/// unencoded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Encoding {
    codes: Vec<GlyphId>,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            codes: vec![GlyphId::NOTDEF; 256],
        }
    }
}

impl Encoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the glyph for a character code.
    pub fn glyph(&self, code: u8) -> GlyphId {
        self.codes[code as usize]
    }

    pub fn set(&mut self, code: u8, glyph: GlyphId) {
        self.codes[code as usize] = glyph;
    }

    /// Iterates over the encoded `(code, glyph)` pairs.
    pub fn mappings(&self) -> impl Iterator<Item = (u8, GlyphId)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, gid)| **gid != GlyphId::NOTDEF)
            .map(|(code, gid)| (code as u8, *gid))
    }

    /// Remaps glyph ids through `map`, dropping codes whose glyph is gone.
    pub fn remap(&self, map: impl Fn(GlyphId) -> Option<GlyphId>) -> Encoding {
        let mut out = Encoding::new();
        for (code, gid) in self.mappings() {
            if let Some(new_gid) = map(gid) {
                out.set(code, new_gid);
            }
        }
        out
    }

    /// Computes the Standard Encoding for glyphs with the given name SIDs.
    pub fn standard(sids: &[u16]) -> Encoding {
        let mut out = Encoding::new();
        for (code, sid) in STANDARD_ENCODING.iter().enumerate() {
            if *sid == 0 {
                continue;
            }
            if let Some(gid) = sids.iter().position(|s| *s == *sid) {
                out.set(code as u8, GlyphId::new(gid as u16));
            }
        }
        out
    }

    fn expert(sids: &[u16]) -> Encoding {
        let mut out = Encoding::new();
        for (code, sid) in EXPERT_ENCODING.iter().enumerate() {
            if *sid == 0 {
                continue;
            }
            if let Some(gid) = sids.iter().position(|s| *s == *sid) {
                out.set(code as u8, GlyphId::new(gid as u16));
            }
        }
        out
    }
}

/// An encoding ready for serialization.
#[derive(Clone, PartialEq, Debug)]
pub enum BuiltEncoding {
    /// The predefined Standard (0) or Expert (1) encoding.
    Predefined(u8),
    Custom(Vec<u8>),
}

/// Reads an encoding.
///
/// `offset` is the Top DICT encoding operand; 0 and 1 select the predefined
/// Standard and Expert encodings, which are resolved against the font's
/// glyph name SIDs (`sids`).
pub fn read(cff: FontData, offset: usize, sids: &[u16]) -> Result<Encoding, Error> {
    match offset {
        0 => Ok(Encoding::standard(sids)),
        1 => Ok(Encoding::expert(sids)),
        _ => {
            let data = cff
                .split_off(offset)
                .ok_or_else(|| Error::invalid("cff", "encoding offset out of bounds"))?;
            read_custom(data, sids)
        }
    }
}

fn read_custom(data: FontData, sids: &[u16]) -> Result<Encoding, Error> {
    let mut cursor = data.cursor("cff");
    let format = cursor.read_u8()?;
    let has_supplements = format & 0x80 != 0;
    let mut encoding = Encoding::new();
    match format & 0x7F {
        0 => {
            let n_codes = cursor.read_u8()? as usize;
            for gid in 1..=n_codes {
                let code = cursor.read_u8()?;
                encoding.set(code, GlyphId::new(gid as u16));
            }
        }
        1 => {
            let n_ranges = cursor.read_u8()? as usize;
            let mut gid = 1u16;
            for _ in 0..n_ranges {
                let first = cursor.read_u8()?;
                let n_left = cursor.read_u8()?;
                for i in 0..=n_left as u16 {
                    let code = first as u16 + i;
                    if code > u8::MAX as u16 {
                        return Err(Error::invalid("cff", "encoding range overflows"));
                    }
                    encoding.set(code as u8, GlyphId::new(gid));
                    gid += 1;
                }
            }
        }
        bad => {
            return Err(Error::invalid(
                "cff",
                format!("invalid encoding format {bad}"),
            ))
        }
    }
    if has_supplements {
        let n_sups = cursor.read_u8()?;
        for _ in 0..n_sups {
            let code = cursor.read_u8()?;
            let sid = cursor.read_u16()?;
            let gid = sids
                .iter()
                .position(|s| *s == sid)
                .ok_or_else(|| Error::invalid("cff", "encoding supplement names a missing glyph"))?;
            encoding.set(code, GlyphId::new(gid as u16));
        }
    }
    Ok(encoding)
}

/// Builds the shortest serialization of an encoding.
///
/// `sids` holds the glyph name SID for every glyph, used both to detect the
/// predefined encodings and to emit supplement entries.
pub fn build(encoding: &Encoding, sids: &[u16]) -> BuiltEncoding {
    if *encoding == Encoding::standard(sids) {
        return BuiltEncoding::Predefined(0);
    }
    if *encoding == Encoding::expert(sids) {
        return BuiltEncoding::Predefined(1);
    }
    // the base encoding covers the run of encoded glyphs starting at gid 1;
    // everything else becomes a supplement
    let mut primary: Vec<Option<u8>> = vec![None; sids.len().max(1)];
    let mut supplements: Vec<(u8, u16)> = Vec::new();
    for (code, gid) in encoding.mappings() {
        let slot = &mut primary[gid.to_usize()];
        if slot.is_none() {
            *slot = Some(code);
        } else {
            supplements.push((code, sids[gid.to_usize()]));
        }
    }
    let mut codes = Vec::new();
    for gid in 1..primary.len() {
        match primary[gid] {
            Some(code) if codes.len() == gid - 1 => codes.push(code),
            Some(code) => supplements.push((code, sids[gid])),
            None => {}
        }
    }
    let mut ranges: Vec<(u8, u8)> = Vec::new();
    for code in &codes {
        match ranges.last_mut() {
            Some((first, n_left))
                if *code as usize == *first as usize + *n_left as usize + 1
                    && *n_left < u8::MAX =>
            {
                *n_left += 1;
            }
            _ => ranges.push((*code, 0)),
        }
    }
    let format0_size = 2 + codes.len();
    let format1_size = 2 + 2 * ranges.len();
    let mut data = Vec::new();
    let mut format = if format0_size <= format1_size { 0u8 } else { 1 };
    if !supplements.is_empty() {
        format |= 0x80;
    }
    data.push(format);
    if format & 0x7F == 0 {
        data.push(codes.len() as u8);
        data.extend(&codes);
    } else {
        data.push(ranges.len() as u8);
        for (first, n_left) in ranges {
            data.push(first);
            data.push(n_left);
        }
    }
    if !supplements.is_empty() {
        supplements.sort();
        data.push(supplements.len() as u8);
        for (code, sid) in supplements {
            data.push(code);
            data.extend(sid.to_be_bytes());
        }
    }
    BuiltEncoding::Custom(data)
}

/// Code to SID mapping of the Standard Encoding.
///
/// See "Appendix B Predefined Encodings" in
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf>
#[rustfmt::skip]
const STANDARD_ENCODING: [u16; 256] = [
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      1,   2,   3,   4,   5,   6,   7,   8,   9,  10,  11,  12,  13,  14,  15,  16,
     17,  18,  19,  20,  21,  22,  23,  24,  25,  26,  27,  28,  29,  30,  31,  32,
     33,  34,  35,  36,  37,  38,  39,  40,  41,  42,  43,  44,  45,  46,  47,  48,
     49,  50,  51,  52,  53,  54,  55,  56,  57,  58,  59,  60,  61,  62,  63,  64,
     65,  66,  67,  68,  69,  70,  71,  72,  73,  74,  75,  76,  77,  78,  79,  80,
     81,  82,  83,  84,  85,  86,  87,  88,  89,  90,  91,  92,  93,  94,  95,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,  96,  97,  98,  99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110,
      0, 111, 112, 113, 114,   0, 115, 116, 117, 118, 119, 120, 121, 122,   0, 123,
      0, 124, 125, 126, 127, 128, 129, 130, 131,   0, 132, 133,   0, 134, 135, 136,
    137,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0, 138,   0, 139,   0,   0,   0,   0, 140, 141, 142, 143,   0,   0,   0,   0,
      0, 144,   0,   0,   0, 145,   0,   0, 146, 147, 148, 149,   0,   0,   0,   0,
];

/// Code to SID mapping of the Expert Encoding.
#[rustfmt::skip]
const EXPERT_ENCODING: [u16; 256] = [
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      1, 229, 230,   0, 231, 232, 233, 234, 235, 236, 237, 238,  13,  14,  15,  99,
    239, 240, 241, 242, 243, 244, 245, 246, 247, 248,  27,  28, 249, 250, 251, 252,
      0, 253, 254, 255, 256, 257,   0,   0,   0, 258,   0,   0, 259, 260, 261, 262,
      0,   0, 263, 264, 265,   0, 266, 109, 110, 267, 268, 269,   0, 270, 271, 272,
    273, 274, 275, 276, 277, 278, 279, 280, 281, 282, 283, 284, 285, 286, 287, 288,
    289, 290, 291, 292, 293, 294, 295, 296, 297, 298, 299, 300, 301, 302, 303,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,   0,
      0, 304, 305, 306,   0,   0, 307, 308, 309, 310, 311,   0, 312,   0,   0, 313,
      0,   0, 314, 315,   0,   0, 316, 317, 318,   0,   0,   0, 158, 155, 163, 319,
    320, 321, 322, 323, 324, 325,   0,   0, 326, 150, 164, 169, 327, 328, 329, 330,
    331, 332, 333, 334, 335, 336, 337, 338, 339, 340, 341, 342, 343, 344, 345, 346,
    347, 348, 349, 350, 351, 352, 353, 354, 355, 356, 357, 358, 359, 360, 361, 362,
    363, 364, 365, 366, 367, 368, 369, 370, 371, 372, 373, 374, 375, 376, 377, 378,
];
