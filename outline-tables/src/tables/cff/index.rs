//! CFF INDEX structures.

use crate::font_data::{Cursor, FontData};
use crate::write::TableWriter;
use crate::Error;

/// A parsed INDEX: a packed array of variable length byte records.
///
/// Offsets are 1-based and relative to the byte preceding the object data,
/// so the first offset is always 1.
#[derive(Clone, Default, Debug)]
pub struct Index<'a> {
    count: usize,
    off_size: u8,
    offsets: &'a [u8],
    data: &'a [u8],
}

impl<'a> Index<'a> {
    /// Returns an empty index.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads an index, leaving the cursor on the byte following it.
    pub fn read(cursor: &mut Cursor<'a>) -> Result<Self, Error> {
        let count = cursor.read_u16()? as usize;
        if count == 0 {
            // an empty INDEX is just the count field
            return Ok(Self::empty());
        }
        let off_size = cursor.read_u8()?;
        if !(1..=4).contains(&off_size) {
            return Err(Error::invalid(
                "cff",
                format!("invalid INDEX offset size {off_size}"),
            ));
        }
        let offsets = cursor.read_array((count + 1) * off_size as usize)?;
        let data_len = read_offset(offsets, count, off_size)?;
        let data = cursor.read_array(data_len)?;
        Ok(Self {
            count,
            off_size,
            offsets,
            data,
        })
    }

    /// Reads an index from the start of the given data.
    pub fn read_from(data: &'a [u8]) -> Result<Self, Error> {
        Self::read(&mut FontData::new(data).cursor("cff"))
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the data for the object at the given index.
    pub fn get(&self, index: usize) -> Result<&'a [u8], Error> {
        if index >= self.count {
            return Err(Error::invalid(
                "cff",
                format!("INDEX object {index} out of range"),
            ));
        }
        let start = read_offset(self.offsets, index, self.off_size)?;
        let end = read_offset(self.offsets, index + 1, self.off_size)?;
        self.data
            .get(start..end)
            .ok_or_else(|| Error::invalid("cff", "INDEX offsets out of bounds"))
    }

    /// Returns an iterator over all records.
    pub fn iter(&self) -> impl Iterator<Item = Result<&'a [u8], Error>> + '_ {
        (0..self.count).map(|i| self.get(i))
    }
}

/// Reads the offset at `index`, converted to 0-based.
fn read_offset(offsets: &[u8], index: usize, off_size: u8) -> Result<usize, Error> {
    let start = index * off_size as usize;
    let bytes = offsets
        .get(start..start + off_size as usize)
        .ok_or_else(|| Error::invalid("cff", "INDEX offset out of bounds"))?;
    let raw = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    // offsets are 1-based; zero is not a valid offset
    raw.checked_sub(1)
        .ok_or_else(|| Error::invalid("cff", "zero offset in INDEX"))
}

/// Writes an index, picking the smallest offset size that fits.
pub fn write_index(objects: &[impl AsRef<[u8]>], writer: &mut TableWriter) {
    let count = objects.len();
    writer.extend(&(count as u16).to_be_bytes());
    if count == 0 {
        return;
    }
    let mut end = 1u32;
    for object in objects {
        end += object.as_ref().len() as u32;
    }
    let off_size = (4 - end.leading_zeros() / 8).max(1) as u8;
    writer.extend(&[off_size]);
    let mut offset = 1u32;
    for i in 0..=count {
        let bytes = offset.to_be_bytes();
        writer.extend(&bytes[4 - off_size as usize..]);
        if i < count {
            offset += objects[i].as_ref().len() as u32;
        }
    }
    for object in objects {
        writer.extend(object.as_ref());
    }
}

/// Returns the serialized size of an index over the given objects.
pub fn index_size(objects: &[impl AsRef<[u8]>]) -> usize {
    let mut writer = TableWriter::new();
    write_index(objects, &mut writer);
    writer.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_objects(count: usize) -> Vec<Vec<u8>> {
        // `count` objects holding `(i + 1) * 10` bytes of the value `i`
        (0..count)
            .map(|i| vec![i as u8; (i + 1) * 10])
            .collect()
    }

    fn assert_round_trip(count: usize, expected_off_size: u8) {
        let objects = make_objects(count);
        let mut writer = TableWriter::new();
        write_index(&objects, &mut writer);
        let data = writer.into_data();
        let index = Index::read_from(&data).unwrap();
        assert_eq!(index.count(), count);
        for (i, object) in objects.iter().enumerate() {
            assert_eq!(index.get(i).unwrap(), object.as_slice());
        }
        if count > 0 {
            assert_eq!(data[2], expected_off_size);
        }
    }

    #[test]
    fn empty_index_is_two_bytes() {
        let mut writer = TableWriter::new();
        write_index(&Vec::<Vec<u8>>::new(), &mut writer);
        assert_eq!(writer.as_bytes(), &[0, 0]);
        let index = Index::read_from(writer.as_bytes()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn off_size_1() {
        assert_round_trip(4, 1);
    }

    #[test]
    fn off_size_2() {
        assert_round_trip(64, 2);
    }

    #[test]
    fn off_size_3() {
        assert_round_trip(128, 3);
    }

    #[test]
    fn zero_offset_is_invalid() {
        // count 1, offSize 1, offsets [0, 1]
        let data = [0u8, 1, 1, 0, 1];
        let index = Index::read_from(&data).unwrap();
        assert!(matches!(index.get(0), Err(Error::InvalidFont { .. })));
    }

    #[test]
    fn truncated_index() {
        let objects = make_objects(3);
        let mut writer = TableWriter::new();
        write_index(&objects, &mut writer);
        let data = writer.into_data();
        assert!(Index::read_from(&data[..data.len() - 1]).is_err());
    }
}
