//! Tables of null-terminated names
//!
//! Archives usually keep their names in one contiguous block and refer to them by offset. A
//! [`StringTable`] reads from such a block without ever crossing its end, and a [`NameTable`]
//! assembles one in memory when the records referring to it have to be written first.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::cursor::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};

/// A bounded block of null-terminated UTF-8 names inside a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringTable {
    offset: u64,
    length: u64,
}

impl StringTable {
    /// Describe a table starting at the absolute `offset` spanning `length` bytes
    pub fn new(offset: u64, length: u64) -> Self {
        StringTable { offset, length }
    }

    /// Absolute offset of the first name
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the table in bytes
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the table holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Absolute offset one past the last byte of the table
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Read the name at the reader's current position, leaving it after the terminator
    pub fn read_next<R: Read + Seek>(&self, reader: &mut BinaryReader<R>) -> Result<String> {
        let limit = self.end();
        let mut position = reader.position()?;
        if position >= limit {
            return Err(Error::NameOutOfBounds { position, limit });
        }

        let mut raw = Vec::new();
        loop {
            if position >= limit {
                return Err(Error::NameOutOfBounds { position, limit });
            }

            let byte = reader.read_u8()?;
            position += 1;
            if byte == b'\0' {
                break;
            }
            raw.push(byte);
        }

        Ok(String::from_utf8(raw)?)
    }

    /// Read the name `relative` bytes into the table, keeping the reader where it was
    pub fn read_at<R: Read + Seek>(
        &self,
        reader: &mut BinaryReader<R>,
        relative: u64,
    ) -> Result<String> {
        let restore = reader.position()?;
        reader.seek(SeekFrom::Start(self.offset + relative))?;
        let name = self.read_next(reader);
        reader.seek(SeekFrom::Start(restore))?;
        name
    }
}

impl<W: Write + Seek> BinaryWriter<W> {
    /// Append `name` and its terminator to a name block, returning the bytes written
    pub fn write_name(&mut self, name: &str) -> Result<usize> {
        self.write_string_null_terminated(name)
    }
}

/// An in-memory name block handing out the offset of every name pushed to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    data: Vec<u8>,
}

impl NameTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` and return its offset relative to the start of the table
    pub fn push(&mut self, name: &str) -> u64 {
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(b'\0');
        offset
    }

    /// Size of the table in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing was pushed yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The encoded table
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, SeekFrom};

    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use crate::cursor::{BinaryReader, BinaryWriter};
    use crate::error::{Error, Result};
    use crate::strings::{NameTable, StringTable};

    #[rustfmt::skip]
    const TABLE: [u8; 12] = [
        0xFF, 0xFF,
        b'a', b'b', 0x00,
        b'c', 0x00,
        b'd', b'e', b'f', 0x00,
        0xFF,
    ];

    #[test]
    fn read_names_in_sequence() -> Result<()> {
        let table = StringTable::new(2, 9);
        let mut reader = BinaryReader::new(Cursor::new(TABLE), Endian::Big);
        reader.seek(SeekFrom::Start(table.offset()))?;

        assert_eq!(table.read_next(&mut reader)?, "ab");
        assert_eq!(table.read_next(&mut reader)?, "c");
        assert_eq!(table.read_next(&mut reader)?, "def");
        assert_eq!(reader.position()?, table.end());

        Ok(())
    }

    #[test]
    fn read_relative_name_restores_position() -> Result<()> {
        let table = StringTable::new(2, 9);
        let mut reader = BinaryReader::new(Cursor::new(TABLE), Endian::Big);
        reader.seek(SeekFrom::Start(11))?;

        assert_eq!(table.read_at(&mut reader, 3)?, "c");
        assert_eq!(table.read_at(&mut reader, 0)?, "ab");
        assert_eq!(reader.position()?, 11);

        Ok(())
    }

    #[test]
    fn name_crossing_the_end_is_rejected() {
        let table = StringTable::new(2, 7);
        let mut reader = BinaryReader::new(Cursor::new(TABLE), Endian::Big);

        assert!(matches!(
            table.read_at(&mut reader, 5),
            Err(Error::NameOutOfBounds {
                position: 9,
                limit: 9
            })
        ));
    }

    #[test]
    fn offset_past_the_end_is_rejected() {
        let table = StringTable::new(2, 9);
        let mut reader = BinaryReader::new(Cursor::new(TABLE), Endian::Big);

        assert!(matches!(
            table.read_at(&mut reader, 9),
            Err(Error::NameOutOfBounds { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() -> Result<()> {
        let table = StringTable::new(0, 11);
        let mut reader = BinaryReader::new(Cursor::new(TABLE), Endian::Big);
        reader.seek(SeekFrom::Start(7))?;

        assert!(matches!(
            table.read_at(&mut reader, 0),
            Err(Error::UTF8Error(_))
        ));
        assert_eq!(reader.position()?, 7);

        Ok(())
    }

    #[test]
    fn write_name_reports_terminated_length() -> Result<()> {
        let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Little);

        assert_eq!(writer.write_name("abc")?, 4);
        assert_eq!(writer.write_name("")?, 1);
        assert_eq!(writer.finish()?.into_inner(), b"abc\0\0".to_vec());

        Ok(())
    }

    #[test]
    fn name_table_offsets() {
        let mut names = NameTable::new();

        assert_eq!(names.push(""), 0);
        assert_eq!(names.push("dir"), 1);
        assert_eq!(names.push("file.bin"), 5);
        assert_eq!(names.len(), 14);
        assert_eq!(names.as_bytes(), b"\0dir\0file.bin\0");
    }
}
