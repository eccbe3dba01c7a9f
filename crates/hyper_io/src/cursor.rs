//! Endian-aware sequential readers and writers
//!

use binrw::{BinRead, BinWrite, Endian};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{instrument, trace};

use crate::error::{Error, Result};
use crate::patch::PendingPatch;

macro_rules! read_primitive {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Read a `", stringify!($ty), "` using the active byte order")]
        pub fn $name(&mut self) -> Result<$ty> {
            Ok(match self.endian {
                Endian::Big => self.inner.$name::<BigEndian>()?,
                Endian::Little => self.inner.$name::<LittleEndian>()?,
            })
        }
    };
}

macro_rules! write_primitive {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Write a `", stringify!($ty), "` using the active byte order")]
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            match self.endian {
                Endian::Big => self.inner.$name::<BigEndian>(value)?,
                Endian::Little => self.inner.$name::<LittleEndian>(value)?,
            }
            Ok(())
        }
    };
}

/// Sequential reader over a seekable byte stream
///
/// Positions are absolute byte offsets into the underlying stream. The byte order may be changed at
/// any point, which some formats do after recognising a platform specific signature.
///
/// ```
/// # fn doit() -> hyper_io::error::Result<()> {
/// use hyper_io::{BinaryReader, Endian};
///
/// let mut reader = BinaryReader::new(std::io::Cursor::new([0x12, 0x34, 0x56, 0x78]), Endian::Big);
/// assert_eq!(reader.read_u32()?, 0x12345678);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug)]
pub struct BinaryReader<R> {
    inner: R,
    endian: Endian,
}

impl<R> BinaryReader<R> {
    /// Wrap a stream, reading multi-byte values with the given byte order
    pub fn new(inner: R, endian: Endian) -> Self {
        BinaryReader { inner, endian }
    }

    /// The byte order currently used for multi-byte values
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch the byte order for all following reads
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap and return the inner stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> BinaryReader<R> {
    read_primitive!(read_u16, u16);
    read_primitive!(read_u24, u32);
    read_primitive!(read_u32, u32);
    read_primitive!(read_u64, u64);
    read_primitive!(read_i32, i32);
    read_primitive!(read_i64, i64);
    read_primitive!(read_f32, f32);

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    /// Read exactly `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .by_ref()
            .take(count as u64)
            .read_to_end(&mut buffer)?;

        if buffer.len() != count {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        Ok(buffer)
    }

    /// Read `count` bytes starting at `offset`, leaving the position untouched
    pub fn read_bytes_at(&mut self, offset: u64, count: usize) -> Result<Vec<u8>> {
        let restore = self.position()?;
        self.seek(SeekFrom::Start(offset))?;
        let data = self.read_bytes(count);
        self.seek(SeekFrom::Start(restore))?;
        data
    }

    /// Read bytes up to (and consuming) a null terminator
    pub fn read_string_until_null(&mut self) -> Result<String> {
        let mut raw = Vec::new();
        loop {
            let byte = self.inner.read_u8()?;
            if byte == b'\0' {
                break;
            }
            raw.push(byte);
        }
        Ok(String::from_utf8(raw)?)
    }

    /// Read a UTF-8 string prefixed with its byte length as a `u32`
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        let raw = self.read_bytes(length)?;
        Ok(String::from_utf8(raw)?)
    }

    /// Read a structure described with [`binrw`], honouring the active byte order
    pub fn read_value<T>(&mut self) -> Result<T>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        Ok(T::read_options(
            &mut self.inner,
            self.endian,
            Default::default(),
        )?)
    }

    /// Current absolute position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to a new position, returning the new absolute offset
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Total length of the stream
    pub fn stream_len(&mut self) -> Result<u64> {
        let restore = self.position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(restore))?;
        Ok(end)
    }

    /// Read a `u32` and require it to be one of `expected`
    ///
    /// Returns the matching signature, or [`Error::FormatMismatch`] when nothing matched.
    #[instrument(skip(self), err, level = "trace")]
    pub fn expect_signature(&mut self, expected: &[u32]) -> Result<u32> {
        let received = self.read_u32()?;
        if expected.contains(&received) {
            return Ok(received);
        }

        Err(Error::FormatMismatch {
            expected: expected.to_vec(),
            received,
        })
    }

    /// Read a `u32` and test it against `expected` without failing on a mismatch
    ///
    /// Running out of data counts as a mismatch, so probing past the end of short files is safe.
    pub fn probe_signature(&mut self, expected: &[u32]) -> Result<Option<u32>> {
        match self.read_u32() {
            Ok(received) if expected.contains(&received) => Ok(Some(received)),
            Ok(received) => {
                trace!("signature mismatch, received {:#010X}", received);
                Ok(None)
            }
            Err(Error::IOError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read `signature` and adopt the byte order it was written in
    ///
    /// The active byte order is kept if the value matches as-is and flipped if it matches once
    /// byte-swapped.
    pub fn detect_endian(&mut self, signature: u32) -> Result<()> {
        let received = self.read_u32()?;
        if received == signature {
            return Ok(());
        }

        if received == signature.swap_bytes() {
            self.endian = flip(self.endian);
            trace!("switched byte order to {:?}", self.endian);
            return Ok(());
        }

        Err(Error::FormatMismatch {
            expected: vec![signature],
            received,
        })
    }
}

/// Sequential writer over a seekable byte stream
///
/// Besides mirroring [`BinaryReader`], the writer owns a table of deferred fields, see
/// [`crate::patch`]. Use [`BinaryWriter::finish`] to verify every deferred field was resolved.
#[derive(Debug)]
pub struct BinaryWriter<W> {
    inner: W,
    endian: Endian,
    pub(crate) patches: IndexMap<String, PendingPatch>,
}

impl<W> BinaryWriter<W> {
    /// Wrap a stream, writing multi-byte values with the given byte order
    pub fn new(inner: W, endian: Endian) -> Self {
        BinaryWriter {
            inner,
            endian,
            patches: IndexMap::new(),
        }
    }

    /// The byte order currently used for multi-byte values
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch the byte order for all following writes
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + Seek> BinaryWriter<W> {
    write_primitive!(write_u16, u16);
    write_primitive!(write_u32, u32);
    write_primitive!(write_u64, u64);
    write_primitive!(write_i32, i32);
    write_primitive!(write_i64, i64);
    write_primitive!(write_f32, f32);

    /// Write a single byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.inner.write_u8(value)?)
    }

    /// Write the low three bytes of `value` using the active byte order
    pub fn write_u24(&mut self, value: u32) -> Result<()> {
        if value > 0x00FF_FFFF {
            return Err(Error::ValueTooLarge {
                value: value as u64,
                bits: 24,
            });
        }

        match self.endian {
            Endian::Big => self.inner.write_u24::<BigEndian>(value)?,
            Endian::Little => self.inner.write_u24::<LittleEndian>(value)?,
        }
        Ok(())
    }

    /// Write a raw byte slice
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.inner.write_all(data)?)
    }

    /// Write `count` zero bytes
    pub fn write_null_bytes(&mut self, count: u64) -> Result<()> {
        io::copy(&mut io::repeat(0).take(count), &mut self.inner)?;
        Ok(())
    }

    /// Write `count` copies of `byte`
    pub fn write_fill(&mut self, byte: u8, count: u64) -> Result<()> {
        io::copy(&mut io::repeat(byte).take(count), &mut self.inner)?;
        Ok(())
    }

    /// Pad with zero bytes until the position is a multiple of `alignment`
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }

        let position = self.position()?;
        let remainder = position % alignment;
        if remainder != 0 {
            self.write_null_bytes(alignment - remainder)?;
        }
        Ok(())
    }

    /// Write a string followed by a null terminator, returning the number of bytes written
    pub fn write_string_null_terminated(&mut self, value: &str) -> Result<usize> {
        self.inner.write_all(value.as_bytes())?;
        self.inner.write_u8(0)?;
        Ok(value.len() + 1)
    }

    /// Write a UTF-8 string prefixed with its byte length as a `u32`
    pub fn write_prefixed_string(&mut self, value: &str) -> Result<()> {
        let length = u32::try_from(value.len()).map_err(|_| Error::ValueTooLarge {
            value: value.len() as u64,
            bits: 32,
        })?;
        self.write_u32(length)?;
        self.write_bytes(value.as_bytes())
    }

    /// Write a structure described with [`binrw`], honouring the active byte order
    pub fn write_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        value.write_options(&mut self.inner, self.endian, Default::default())?;
        Ok(())
    }

    /// Current absolute position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to a new position, returning the new absolute offset
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Flush the stream and hand it back
    ///
    /// Fails with [`Error::UnresolvedPatches`] if any deferred field was reserved but never written.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        if !self.patches.is_empty() {
            return Err(Error::UnresolvedPatches(
                self.patches.keys().cloned().collect(),
            ));
        }

        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn flip(endian: Endian) -> Endian {
    match endian {
        Endian::Big => Endian::Little,
        Endian::Little => Endian::Big,
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, SeekFrom};

    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use crate::cursor::{BinaryReader, BinaryWriter};
    use crate::error::{Error, Result};

    #[test]
    fn read_primitives_big_endian() -> Result<()> {
        #[rustfmt::skip]
        let mut reader = BinaryReader::new(Cursor::new(vec![
            0x01,
            0x02, 0x03,
            0x04, 0x05, 0x06,
            0x3F, 0x80, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFE,
        ]), Endian::Big);

        assert_eq!(reader.read_u8()?, 0x01);
        assert_eq!(reader.read_u16()?, 0x0203);
        assert_eq!(reader.read_u24()?, 0x040506);
        assert_eq!(reader.read_f32()?, 1.0);
        assert_eq!(reader.read_i32()?, -2);
        assert_eq!(reader.position()?, 14);

        Ok(())
    }

    #[test]
    fn read_u24_little_endian() -> Result<()> {
        let mut reader = BinaryReader::new(Cursor::new(vec![0x04, 0x05, 0x06]), Endian::Little);
        assert_eq!(reader.read_u24()?, 0x060504);
        Ok(())
    }

    #[test]
    fn endian_can_change_mid_stream() -> Result<()> {
        #[rustfmt::skip]
        let mut reader = BinaryReader::new(Cursor::new(vec![
            0x00, 0x00, 0x00, 0x01,
            0x01, 0x00, 0x00, 0x00,
        ]), Endian::Big);

        assert_eq!(reader.read_u32()?, 1);
        reader.set_endian(Endian::Little);
        assert_eq!(reader.read_u32()?, 1);

        Ok(())
    }

    #[test]
    fn read_strings() -> Result<()> {
        #[rustfmt::skip]
        let mut reader = BinaryReader::new(Cursor::new(vec![
            b'a', b'b', 0x00,
            0x00, 0x00, 0x00, 0x02, b'x', b'y',
        ]), Endian::Big);

        assert_eq!(reader.read_string_until_null()?, "ab");
        assert_eq!(reader.read_prefixed_string()?, "xy");

        Ok(())
    }

    #[test]
    fn read_bytes_past_end_fails() {
        let mut reader = BinaryReader::new(Cursor::new(vec![0x00, 0x01]), Endian::Big);
        assert!(matches!(reader.read_bytes(3), Err(Error::IOError(_))));
    }

    #[test]
    fn read_bytes_at_restores_position() -> Result<()> {
        let mut reader = BinaryReader::new(Cursor::new(vec![0, 1, 2, 3, 4, 5]), Endian::Big);
        reader.seek(SeekFrom::Start(1))?;

        assert_eq!(reader.read_bytes_at(4, 2)?, vec![4, 5]);
        assert_eq!(reader.position()?, 1);

        Ok(())
    }

    #[test]
    fn strict_signature_mismatch() {
        let mut reader = BinaryReader::new(Cursor::new(b"ABCD".to_vec()), Endian::Big);
        let result = reader.expect_signature(&[0x41424344 + 1]);

        assert!(matches!(
            result,
            Err(Error::FormatMismatch {
                received: 0x41424344,
                ..
            })
        ));
    }

    #[test]
    fn probe_signature_handles_mismatch_and_eof() -> Result<()> {
        let mut reader = BinaryReader::new(Cursor::new(b"ABCDEF".to_vec()), Endian::Big);

        assert_eq!(reader.probe_signature(&[0x41424344])?, Some(0x41424344));
        assert_eq!(reader.probe_signature(&[0x41424344])?, None);

        Ok(())
    }

    #[test]
    fn detect_endian_flips_on_swapped_signature() -> Result<()> {
        let mut reader = BinaryReader::new(
            Cursor::new(vec![0x2D, 0x38, 0xAA, 0x55, 0x20, 0x00, 0x00, 0x00]),
            Endian::Big,
        );

        reader.detect_endian(0x55AA382D)?;
        assert_eq!(reader.endian(), Endian::Little);
        assert_eq!(reader.read_u32()?, 0x20);

        Ok(())
    }

    #[test]
    fn write_primitives() -> Result<()> {
        let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Big);
        writer.write_u8(0x01)?;
        writer.write_u24(0x020304)?;
        writer.set_endian(Endian::Little);
        writer.write_u24(0x020304)?;
        writer.write_i64(-1)?;

        #[rustfmt::skip]
        let expected = vec![
            0x01, 0x02, 0x03, 0x04,
            0x04, 0x03, 0x02,
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        ];

        assert_eq!(writer.finish()?.into_inner(), expected);

        Ok(())
    }

    #[test]
    fn write_u24_rejects_wide_values() {
        let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Big);
        assert!(matches!(
            writer.write_u24(0x0100_0000),
            Err(Error::ValueTooLarge { bits: 24, .. })
        ));
    }

    #[test]
    fn align_pads_with_zeros() -> Result<()> {
        let mut writer = BinaryWriter::new(Cursor::new(Vec::new()), Endian::Big);
        writer.write_bytes(&[0xAA; 3])?;
        writer.align(8)?;
        writer.align(8)?;

        assert_eq!(
            writer.finish()?.into_inner(),
            vec![0xAA, 0xAA, 0xAA, 0, 0, 0, 0, 0]
        );

        Ok(())
    }
}
