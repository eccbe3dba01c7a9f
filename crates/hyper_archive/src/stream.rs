//! Crytek stream archives
//!
//! # Archive Format Documentation
//!
//! Stream archives (`.wiiu.stream`) are big endian. There is no file table, entries follow the
//! signature back to back until the end of the file.
//!
//! | Field             | Size     | Description                                        |
//! |-------------------|----------|----------------------------------------------------|
//! | Signature         | 4 bytes  | `strm`                                             |
//! | Entries           | variable | See below                                          |
//!
//! ## Entries
//!
//! | Field             | Size     | Description                                        |
//! |-------------------|----------|----------------------------------------------------|
//! | Compressed Size   | 4 bytes  | Stored size, `0` if the payload is not compressed  |
//! | Uncompressed Size | 4 bytes  |                                                    |
//! | Hash              | 4 bytes  | Unknown, kept as read                              |
//! | Flags             | 4 bytes  | Unknown, kept as read                              |
//! | Name              | variable | Null-terminated relative path                      |
//! | Payload           | variable | [`Lzss`] compressed if the compressed size is set  |
//!

use binrw::Endian;
use hyper_io::{BinaryReader, BinaryWriter, Compressor, Lzss};
use std::io::{Read, Seek, Write};
use tracing::{debug, instrument, trace};

use crate::error::{narrow, Result};

/// `strm`
pub const SIGNATURE: u32 = 0x7374_726D;

/// A single archive entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEntry {
    /// Relative path
    pub name: String,
    pub hash: u32,
    pub flags: u32,
    pub uncompressed_size: u32,
    /// Stored size of compressed payloads, `0` otherwise
    pub compressed_size: u32,
    /// Payload as stored
    pub data: Vec<u8>,
}

impl StreamEntry {
    /// Build an entry from uncompressed data, compressing it with `codec` if given
    pub fn new(name: impl Into<String>, data: Vec<u8>, codec: Option<&dyn Compressor>) -> Result<Self> {
        let uncompressed_size = narrow("file size", data.len() as u64)?;

        let (data, compressed_size) = match codec {
            Some(codec) => {
                let compressed = codec.compress(&data)?;
                let compressed_size = narrow("compressed size", compressed.len() as u64)?;
                (compressed, compressed_size)
            }
            None => (data, 0),
        };

        Ok(StreamEntry {
            name: name.into(),
            hash: 0,
            flags: 0,
            uncompressed_size,
            compressed_size,
            data,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed_size > 0
    }

    /// The uncompressed payload
    pub fn contents(&self, codec: &dyn Compressor) -> Result<Vec<u8>> {
        if self.is_compressed() {
            Ok(codec.decompress(&self.data, self.uncompressed_size as usize)?)
        } else {
            Ok(self.data.clone())
        }
    }
}

/// A stream archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamArchive {
    pub entries: Vec<StreamEntry>,
}

impl StreamArchive {
    /// Codec used for compressed payloads
    pub fn codec() -> Lzss {
        Lzss
    }

    /// Read an archive with all payloads as stored
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Big);
        reader.expect_signature(&[SIGNATURE])?;

        let end = reader.stream_len()?;
        let mut entries = Vec::new();
        while reader.position()? < end {
            entries.push(read_entry(&mut reader)?);
        }

        debug!("read {} entries", entries.len());

        Ok(StreamArchive { entries })
    }

    /// Write the archive and return the stream
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, Endian::Big);
        writer.write_u32(SIGNATURE)?;

        for entry in &self.entries {
            writer.write_u32(entry.compressed_size)?;
            writer.write_u32(entry.uncompressed_size)?;
            writer.write_u32(entry.hash)?;
            writer.write_u32(entry.flags)?;
            writer.write_string_null_terminated(&entry.name)?;
            writer.write_bytes(&entry.data)?;
        }

        Ok(writer.finish()?)
    }

    /// Names of every entry in archive order
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }
}

fn read_entry<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<StreamEntry> {
    let compressed_size = reader.read_u32()?;
    let uncompressed_size = reader.read_u32()?;
    let hash = reader.read_u32()?;
    let flags = reader.read_u32()?;
    let name = reader.read_string_until_null()?;

    let stored = if compressed_size > 0 {
        compressed_size
    } else {
        uncompressed_size
    };
    let data = reader.read_bytes(stored as usize)?;

    trace!("{}: {} bytes stored, {} uncompressed", name, stored, uncompressed_size);

    Ok(StreamEntry {
        name,
        hash,
        flags,
        uncompressed_size,
        compressed_size,
        data,
    })
}
