//! The `loca` (index to location) table.
//!
//! `n + 1` offsets describe `n` glyph records. Whether offsets are stored
//! as 16-bit half-values or full 32-bit values is recorded in the `head`
//! table's `indexToLocFormat` field, which travels alongside the data here.

use crate::font_data::FontData;
use crate::Error;

/// Whether the table uses short or long offsets.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LocaFormat {
    /// 16-bit offsets, stored divided by 2.
    Short = 0,
    /// 32-bit offsets.
    Long = 1,
}

/// Reads and validates the offset array.
pub fn read_offsets(loca: &[u8], format: LocaFormat) -> Result<Vec<u32>, Error> {
    let mut cursor = FontData::new(loca).cursor("glyf");
    let count = match format {
        LocaFormat::Short => loca.len() / 2,
        LocaFormat::Long => loca.len() / 4,
    };
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(match format {
            LocaFormat::Short => cursor.read_u16()? as u32 * 2,
            LocaFormat::Long => cursor.read_u32()?,
        });
    }
    if offsets.is_empty() {
        return Err(Error::invalid("glyf", "empty loca table"));
    }
    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(Error::invalid("glyf", "loca offsets out of order"));
    }
    Ok(offsets)
}

/// Serializes the offset array, choosing the format.
///
/// The short format applies when every offset is even and the final offset
/// fits; this mirrors what common font compilers produce.
pub fn write_offsets(offsets: &[u32]) -> (Vec<u8>, LocaFormat) {
    const MAX_SHORT_LOCA_VALUE: u32 = 0x20000;
    let format = if offsets.last().copied().unwrap_or_default() < MAX_SHORT_LOCA_VALUE
        && offsets.iter().all(|offset| offset % 2 == 0)
    {
        LocaFormat::Short
    } else {
        LocaFormat::Long
    };
    let mut out = Vec::new();
    for offset in offsets {
        match format {
            LocaFormat::Short => out.extend(((offset >> 1) as u16).to_be_bytes()),
            LocaFormat::Long => out.extend(offset.to_be_bytes()),
        }
    }
    (out, format)
}
