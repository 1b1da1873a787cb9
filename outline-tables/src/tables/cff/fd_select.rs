//! CFF FDSelect: the glyph to font DICT mapping of CID-keyed fonts.

use outline_types::GlyphId;

use crate::font_data::FontData;
use crate::Error;

/// Maps each glyph to the private dictionary that applies to it.
///
/// Simple fonts have a single private dictionary and use the constant form;
/// subsetting inspects the structure instead of sampling the mapping.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FdSelect {
    /// Every glyph maps to the same dictionary.
    Constant(u8),
    /// One entry per glyph.
    Table(Vec<u8>),
}

impl Default for FdSelect {
    fn default() -> Self {
        Self::Constant(0)
    }
}

impl FdSelect {
    /// Returns the font DICT index for a glyph.
    pub fn font_index(&self, glyph: GlyphId) -> u8 {
        match self {
            Self::Constant(fd) => *fd,
            Self::Table(fds) => fds.get(glyph.to_usize()).copied().unwrap_or_default(),
        }
    }

    /// Returns the highest dictionary index in use.
    pub fn max_fd(&self) -> u8 {
        match self {
            Self::Constant(fd) => *fd,
            Self::Table(fds) => fds.iter().copied().max().unwrap_or_default(),
        }
    }

    /// Reads format 0 or 3 FDSelect data.
    pub fn read(data: FontData, num_glyphs: usize) -> Result<Self, Error> {
        let mut cursor = data.cursor("cff");
        let format = cursor.read_u8()?;
        match format {
            0 => {
                let fds = cursor.read_array(num_glyphs)?;
                Ok(Self::Table(fds.to_vec()))
            }
            3 => {
                let n_ranges = cursor.read_u16()? as usize;
                let mut fds = vec![0u8; num_glyphs];
                let mut first = cursor.read_u16()? as usize;
                for _ in 0..n_ranges {
                    let fd = cursor.read_u8()?;
                    let next = cursor.read_u16()? as usize;
                    if next < first || next > num_glyphs {
                        return Err(Error::invalid("cff", "FDSelect ranges out of order"));
                    }
                    fds[first..next].fill(fd);
                    first = next;
                }
                if first != num_glyphs {
                    return Err(Error::invalid("cff", "FDSelect sentinel mismatch"));
                }
                Ok(Self::Table(fds))
            }
            _ => Err(Error::invalid(
                "cff",
                format!("invalid FDSelect format {format}"),
            )),
        }
    }

    /// Serializes as format 0 or 3, whichever is shorter.
    pub fn encode(&self, num_glyphs: usize) -> Vec<u8> {
        let fds: Vec<u8> = match self {
            Self::Constant(fd) => vec![*fd; num_glyphs],
            Self::Table(fds) => {
                let mut fds = fds.clone();
                fds.resize(num_glyphs, 0);
                fds
            }
        };
        let mut ranges: Vec<(usize, u8)> = Vec::new();
        for (gid, fd) in fds.iter().enumerate() {
            match ranges.last() {
                Some((_, last_fd)) if last_fd == fd => {}
                _ => ranges.push((gid, *fd)),
            }
        }
        let format0_size = 1 + num_glyphs;
        let format3_size = 1 + 2 + 3 * ranges.len() + 2;
        let mut out = Vec::new();
        if format3_size < format0_size {
            out.push(3);
            out.extend((ranges.len() as u16).to_be_bytes());
            for (first, fd) in ranges {
                out.extend((first as u16).to_be_bytes());
                out.push(fd);
            }
            out.extend((num_glyphs as u16).to_be_bytes());
        } else {
            out.push(0);
            out.extend(fds);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_mapping_uses_format_3() {
        // 100 glyphs on one dictionary: 8 bytes against 101 for format 0
        let select = FdSelect::Constant(0);
        let data = select.encode(100);
        assert_eq!(data.len(), 8);
        assert_eq!(data[0], 3);
        let read = FdSelect::read(FontData::new(&data), 100).unwrap();
        for gid in 0..100 {
            assert_eq!(read.font_index(GlyphId::new(gid)), 0);
        }
    }

    #[test]
    fn alternating_mapping_uses_format_0() {
        let fds: Vec<u8> = (0..50).map(|i| (i % 2) as u8).collect();
        let select = FdSelect::Table(fds.clone());
        let data = select.encode(50);
        assert_eq!(data[0], 0);
        assert_eq!(data.len(), 51);
        let read = FdSelect::read(FontData::new(&data), 50).unwrap();
        assert_eq!(read, FdSelect::Table(fds));
    }

    #[test]
    fn format_3_round_trip() {
        let mut fds = vec![0u8; 10];
        fds.extend(vec![4u8; 22]);
        fds.extend(vec![1u8; 2]);
        fds.extend(vec![12u8; 94]);
        let select = FdSelect::Table(fds.clone());
        let data = select.encode(fds.len());
        assert_eq!(data[0], 3);
        let read = FdSelect::read(FontData::new(&data), fds.len()).unwrap();
        assert_eq!(read, FdSelect::Table(fds));
    }

    #[test]
    fn sentinel_mismatch_is_invalid() {
        // format 3, 1 range, first gid 0, fd 0, sentinel 5 but 10 glyphs
        let data = [3u8, 0, 1, 0, 0, 0, 0, 5];
        assert!(FdSelect::read(FontData::new(&data), 10).is_err());
    }

    #[test]
    fn random_tables_round_trip_no_longer() {
        // any table re-encodes into no more bytes than format 0
        let fds: Vec<u8> = (0..100).map(|i| (i * 7 % 5) as u8).collect();
        let select = FdSelect::Table(fds);
        let encoded = select.encode(100);
        assert!(encoded.len() <= 101);
        let read = FdSelect::read(FontData::new(&encoded), 100).unwrap();
        let reencoded = read.encode(100);
        assert_eq!(encoded, reencoded);
    }
}
