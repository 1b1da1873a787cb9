//! Raw byte access with bounds checking.

use crate::Error;

/// A slice of font data with checked, offset-based access.
#[derive(Copy, Clone, Debug)]
pub struct FontData<'a> {
    data: &'a [u8],
}

impl<'a> FontData<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the data starting at the given offset, or `None` when the
    /// offset is past the end.
    pub fn split_off(&self, offset: usize) -> Option<FontData<'a>> {
        self.data.get(offset..).map(FontData::new)
    }

    /// Returns a cursor over the data tagged with the owning subsystem so
    /// that truncation errors name their source.
    pub fn cursor(&self, table: &'static str) -> Cursor<'a> {
        Cursor {
            data: self.data,
            pos: 0,
            table,
        }
    }
}

/// Sequential big-endian reader over a [`FontData`] slice.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    table: &'static str,
}

impl<'a> Cursor<'a> {
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining_bytes(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn advance_by(&mut self, n: usize) -> Result<(), Error> {
        self.take(n).map(|_| ())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| Error::invalid(self.table, "unexpected end of data"))?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads an unsigned big-endian integer of 1 to 4 bytes.
    pub fn read_offset(&mut self, size: u8) -> Result<u32, Error> {
        let bytes = self.take(size as usize)?;
        Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
    }

    pub fn read_array(&mut self, len: usize) -> Result<&'a [u8], Error> {
        self.take(len)
    }
}
