//! CFF charsets.
//!
//! A charset maps each glyph to a string identifier (glyph name) for simple
//! fonts, or to a CID for CID-keyed fonts. Glyph 0 is excluded from the
//! serialized data and always maps to identifier 0.

use crate::font_data::FontData;
use crate::Error;

/// A charset ready for serialization.
#[derive(Clone, PartialEq, Debug)]
pub enum Charset {
    /// One of the predefined charsets; the value is the charset operand
    /// (0 = ISOAdobe, 1 = Expert, 2 = ExpertSubset).
    Predefined(u8),
    Custom(Vec<u8>),
}

/// Reads a charset as one identifier per glyph.
///
/// `offset` is the Top DICT charset operand: 0, 1 and 2 select the
/// predefined charsets, anything else is an offset into the table data.
pub fn read(cff: FontData, offset: usize, num_glyphs: usize) -> Result<Vec<u16>, Error> {
    match offset {
        0 => predefined(&iso_adobe(), num_glyphs),
        1 => predefined(EXPERT_CHARSET, num_glyphs),
        2 => predefined(EXPERT_SUBSET_CHARSET, num_glyphs),
        _ => {
            let data = cff
                .split_off(offset)
                .ok_or_else(|| Error::invalid("cff", "charset offset out of bounds"))?;
            read_custom(data, num_glyphs)
        }
    }
}

fn predefined(table: &[u16], num_glyphs: usize) -> Result<Vec<u16>, Error> {
    if num_glyphs > table.len() {
        return Err(Error::invalid(
            "cff",
            "predefined charset is smaller than the glyph count",
        ));
    }
    Ok(table[..num_glyphs].to_vec())
}

fn iso_adobe() -> Vec<u16> {
    // an identity mapping of gid to sid, up to 229 glyphs
    (0..229).collect()
}

fn read_custom(data: FontData, num_glyphs: usize) -> Result<Vec<u16>, Error> {
    let mut cursor = data.cursor("cff");
    let format = cursor.read_u8()?;
    let mut ids = Vec::with_capacity(num_glyphs);
    ids.push(0);
    match format {
        0 => {
            while ids.len() < num_glyphs {
                ids.push(cursor.read_u16()?);
            }
        }
        1 | 2 => {
            while ids.len() < num_glyphs {
                let first = cursor.read_u16()?;
                let n_left = if format == 1 {
                    cursor.read_u8()? as u32
                } else {
                    cursor.read_u16()? as u32
                };
                for i in 0..=n_left {
                    if ids.len() == num_glyphs {
                        break;
                    }
                    ids.push(
                        first
                            .checked_add(i as u16)
                            .ok_or_else(|| Error::invalid("cff", "charset range overflow"))?,
                    );
                }
            }
        }
        _ => {
            return Err(Error::invalid(
                "cff",
                format!("invalid charset format {format}"),
            ))
        }
    }
    Ok(ids)
}

/// Builds the shortest charset for the given per-glyph identifiers.
///
/// Predefined charsets are only considered for simple fonts, where the
/// identifiers are glyph name SIDs.
pub fn build(ids: &[u16], allow_predefined: bool) -> Charset {
    if allow_predefined {
        let identity = iso_adobe();
        for (operand, table) in [
            (0u8, identity.as_slice()),
            (1, EXPERT_CHARSET),
            (2, EXPERT_SUBSET_CHARSET),
        ] {
            if ids.len() <= table.len() && ids == &table[..ids.len()] {
                return Charset::Predefined(operand);
            }
        }
    }
    let ranges = ranges(ids);
    let format0_size = 1 + 2 * ids.len().saturating_sub(1);
    let format1_size = 1 + 3 * split_ranges(&ranges, u8::MAX as usize).len();
    let format2_size = 1 + 4 * ranges.len();
    let mut data = Vec::new();
    if format0_size <= format1_size && format0_size <= format2_size {
        data.push(0);
        for id in &ids[1..] {
            data.extend(id.to_be_bytes());
        }
    } else if format1_size <= format2_size {
        data.push(1);
        for (first, n_left) in split_ranges(&ranges, u8::MAX as usize) {
            data.extend(first.to_be_bytes());
            data.push(n_left as u8);
        }
    } else {
        data.push(2);
        for (first, n_left) in ranges {
            data.extend(first.to_be_bytes());
            data.extend((n_left as u16).to_be_bytes());
        }
    }
    Charset::Custom(data)
}

/// Splits the glyphs after `.notdef` into maximal runs of consecutive
/// identifiers, as `(first, n_left)` pairs.
fn ranges(ids: &[u16]) -> Vec<(u16, usize)> {
    let mut ranges: Vec<(u16, usize)> = Vec::new();
    for id in ids.iter().skip(1) {
        match ranges.last_mut() {
            Some((first, n_left))
                if *id as usize == *first as usize + *n_left + 1
                    && *n_left < u16::MAX as usize =>
            {
                *n_left += 1;
            }
            _ => ranges.push((*id, 0)),
        }
    }
    ranges
}

fn split_ranges(ranges: &[(u16, usize)], max_left: usize) -> Vec<(u16, usize)> {
    let mut out = Vec::new();
    for (first, n_left) in ranges {
        let mut first = *first;
        let mut remaining = *n_left + 1;
        while remaining > 0 {
            let take = remaining.min(max_left + 1);
            out.push((first, take - 1));
            first = first.wrapping_add(take as u16);
            remaining -= take;
        }
    }
    out
}

/// See "Expert" charset at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=47>
#[rustfmt::skip]
const EXPERT_CHARSET: &[u16] = &[
      0,    1,  229,  230,  231,  232,  233,  234,  235,  236,  237,  238,   13,   14,   15,   99,
    239,  240,  241,  242,  243,  244,  245,  246,  247,  248,   27,   28,  249,  250,  251,  252,
    253,  254,  255,  256,  257,  258,  259,  260,  261,  262,  263,  264,  265,  266,  109,  110,
    267,  268,  269,  270,  271,  272,  273,  274,  275,  276,  277,  278,  279,  280,  281,  282,
    283,  284,  285,  286,  287,  288,  289,  290,  291,  292,  293,  294,  295,  296,  297,  298,
    299,  300,  301,  302,  303,  304,  305,  306,  307,  308,  309,  310,  311,  312,  313,  314,
    315,  316,  317,  318,  158,  155,  163,  319,  320,  321,  322,  323,  324,  325,  326,  150,
    164,  169,  327,  328,  329,  330,  331,  332,  333,  334,  335,  336,  337,  338,  339,  340,
    341,  342,  343,  344,  345,  346,  347,  348,  349,  350,  351,  352,  353,  354,  355,  356,
    357,  358,  359,  360,  361,  362,  363,  364,  365,  366,  367,  368,  369,  370,  371,  372,
    373,  374,  375,  376,  377,  378,
];

/// See "Expert Subset" charset at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=49>
#[rustfmt::skip]
const EXPERT_SUBSET_CHARSET: &[u16] = &[
      0,    1,  231,  232,  235,  236,  237,  238,   13,   14,   15,   99,  239,  240,  241,  242,
    243,  244,  245,  246,  247,  248,   27,   28,  249,  250,  251,  253,  254,  255,  256,  257,
    258,  259,  260,  261,  262,  263,  264,  265,  266,  109,  110,  267,  268,  269,  270,  272,
    300,  301,  302,  305,  314,  315,  158,  155,  163,  320,  321,  322,  323,  324,  325,  326,
    150,  164,  169,  327,  328,  329,  330,  331,  332,  333,  334,  335,  336,  337,  338,  339,
    340,  341,  342,  343,  344,  345,  346,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(ids: &[u16]) -> Vec<u16> {
        match build(ids, false) {
            Charset::Custom(data) => read_custom(FontData::new(&data), ids.len()).unwrap(),
            Charset::Predefined(_) => panic!("expected custom charset"),
        }
    }

    #[test]
    fn iso_adobe_detection() {
        let ids: Vec<u16> = (0..40).collect();
        assert_eq!(build(&ids, true), Charset::Predefined(0));
        // the same mapping in a CID font is written explicitly
        assert!(matches!(build(&ids, false), Charset::Custom(_)));
    }

    #[test]
    fn expert_detection() {
        assert_eq!(
            build(&EXPERT_CHARSET[..50], true),
            Charset::Predefined(1)
        );
        assert_eq!(
            build(&EXPERT_SUBSET_CHARSET[..30], true),
            Charset::Predefined(2)
        );
    }

    #[test]
    fn consecutive_ids_use_ranges() {
        let mut ids = vec![0u16];
        ids.extend(391..391 + 200);
        let charset = build(&ids, false);
        match &charset {
            // format 1: one range of 200 splits into 200 <= 256 so a
            // single (first, nLeft) pair
            Charset::Custom(data) => assert_eq!(data.len(), 1 + 3),
            _ => panic!("expected custom"),
        }
        assert_eq!(round_trip(&ids), ids);
    }

    #[test]
    fn scattered_ids_use_format_0() {
        let ids = vec![0u16, 5, 100, 42, 391, 7];
        match build(&ids, false) {
            Charset::Custom(data) => assert_eq!(data[0], 0),
            _ => panic!("expected custom"),
        }
        assert_eq!(round_trip(&ids), ids);
    }

    #[test]
    fn long_runs_use_format_2() {
        let mut ids = vec![0u16];
        ids.extend(1000..1000 + 2000);
        match build(&ids, false) {
            // one 2000-glyph run: format 1 needs 8 ranges, format 2 one
            Charset::Custom(data) => assert_eq!(data[0], 2),
            _ => panic!("expected custom"),
        }
        assert_eq!(round_trip(&ids), ids);
    }

    #[test]
    fn predefined_read() {
        let data = FontData::new(&[]);
        let ids = read(data, 0, 10).unwrap();
        assert_eq!(ids, (0..10).collect::<Vec<u16>>());
        let ids = read(data, 1, 5).unwrap();
        assert_eq!(ids, &EXPERT_CHARSET[..5]);
    }

    #[test]
    fn oversized_predefined_is_invalid() {
        let data = FontData::new(&[]);
        assert!(read(data, 0, 500).is_err());
    }
}
