//! Barracuda APF archives
//!
//! # Archive Format Documentation
//!
//! APF archives are a flat list of named entries. Console archives are big endian, PC archives
//! store their signature big endian and everything after it little endian.
//!
//! | Field             | Size      | Description                                              |
//! |-------------------|-----------|----------------------------------------------------------|
//! | Signature         | 4 bytes   | `AKPF` on console, `FPUV` on PC                          |
//! | Version           | 4 bytes   | `5` on console, `3` on PC                                |
//! | File Table Offset | 4 bytes   | Absolute offset of the entry table                       |
//! | File Count        | 4 bytes   |                                                          |
//! | Reserved          | variable  | 2 words on console, 13 on PC, meaning unknown            |
//! | Payloads          | variable  |                                                          |
//! | Entries           | variable  | See below                                                |
//!
//! ## Entries
//!
//! | Field           | Size     | Description                                                 |
//! |-----------------|----------|-------------------------------------------------------------|
//! | Name            | variable | Null-terminated on PC, `u32` length prefix on console       |
//! | Offset          | 4 bytes  | Absolute payload offset                                     |
//! | Size            | 4 bytes  | Uncompressed size                                           |
//! | Compressed Size | 4 bytes  | Stored size of compressed payloads                          |
//! | Type            | 4 bytes  | Asset type                                                  |
//! | CRC32           | 4 bytes  | Checksum of the uncompressed data, `0` for type `0`         |
//! | Compressed      | 4 bytes  | `1` if the payload is compressed                            |
//!
//! PC payloads are compressed with zlib, console payloads with the Xbox 360 XMemCompress codec.
//!

use binrw::Endian;
use bon::Builder;
use hyper_io::{BinaryReader, BinaryWriter, Compressor, Unsupported, Zlib};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, instrument, trace};

use crate::error::{narrow, Error, Result};

/// CRC-32 as used for entry checksums
pub const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Upper bound for allocations sized by counts read from a file
const MAX_PREALLOCATION: usize = 4096;

const FILE_TABLE_FIELD: &str = "fileTableOffset";

const PC_RESERVED: [u32; 13] = [
    206_594,
    943_264_441,
    1_819_047_238,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    0,
    51,
    3_817_756_730,
];
const CONSOLE_RESERVED: [u32; 2] = [0, 55];

/// Platform an archive was built for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Console,
    Pc,
}

impl Platform {
    /// Signature as read in big endian
    pub fn signature(&self) -> u32 {
        match self {
            Platform::Console => 0x414B_5046,
            Platform::Pc => 0x4650_5556,
        }
    }

    pub fn version(&self) -> u32 {
        match self {
            Platform::Console => 5,
            Platform::Pc => 3,
        }
    }

    /// Byte order of everything after the signature
    pub fn endian(&self) -> Endian {
        match self {
            Platform::Console => Endian::Big,
            Platform::Pc => Endian::Little,
        }
    }

    fn reserved(&self) -> &'static [u32] {
        match self {
            Platform::Console => &CONSOLE_RESERVED,
            Platform::Pc => &PC_RESERVED,
        }
    }

    /// Codec for compressed payloads
    ///
    /// XMemCompress is only reachable through a native library, so console archives get an
    /// [`Unsupported`] codec. Pass a real one to the methods taking a [`Compressor`] instead.
    pub fn default_codec(&self) -> Box<dyn Compressor> {
        match self {
            Platform::Console => Box::new(Unsupported::new("xmem")),
            Platform::Pc => Box::new(Zlib::default()),
        }
    }
}

/// A single archive entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApfEntry {
    /// Name without extensions
    pub name: String,
    pub file_type: u32,
    /// Checksum of the uncompressed data
    pub crc32: u32,
    /// Uncompressed size
    pub size: u32,
    pub compressed_size: u32,
    pub is_compressed: bool,
    /// Payload as stored
    pub data: Vec<u8>,
}

impl ApfEntry {
    /// Build an entry from uncompressed data, compressing it with `codec` if given
    pub fn new(
        name: impl Into<String>,
        file_type: u32,
        data: Vec<u8>,
        codec: Option<&dyn Compressor>,
    ) -> Result<Self> {
        let size = narrow("file size", data.len() as u64)?;
        let crc32 = if file_type == 0 {
            0
        } else {
            CRC32.checksum(&data)
        };

        let (data, compressed_size) = match codec {
            Some(codec) => {
                let compressed = codec.compress(&data)?;
                let compressed_size = narrow("compressed size", compressed.len() as u64)?;
                (compressed, compressed_size)
            }
            None => (data, 0),
        };

        Ok(ApfEntry {
            name: name.into(),
            file_type,
            crc32,
            size,
            compressed_size,
            is_compressed: compressed_size > 0,
            data,
        })
    }

    /// Name used when extracting, `{name}.{type}.bin`
    pub fn file_name(&self) -> String {
        format!("{}.{}.bin", self.name, self.file_type)
    }

    /// The uncompressed payload
    pub fn contents(&self, codec: &dyn Compressor) -> Result<Vec<u8>> {
        if self.is_compressed {
            Ok(codec.decompress(&self.data, self.size as usize)?)
        } else {
            Ok(self.data.clone())
        }
    }
}

/// Options for importing entries from a directory
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct ApfImportOptions {
    #[builder(default)]
    pub platform: Platform,

    /// Store payloads compressed with the platform codec
    #[builder(default)]
    pub compress: bool,
}

/// An APF archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApfArchive {
    pub platform: Platform,
    pub entries: Vec<ApfEntry>,
}

impl ApfArchive {
    /// Read an archive with all payloads as stored
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Big);

        let signature = reader.expect_signature(&[
            Platform::Console.signature(),
            Platform::Pc.signature(),
        ])?;
        let platform = if signature == Platform::Pc.signature() {
            Platform::Pc
        } else {
            Platform::Console
        };
        reader.set_endian(platform.endian());

        let version = reader.read_u32()?;
        if version != platform.version() {
            return Err(Error::UnsupportedVersion(version));
        }

        let file_table_offset = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        for _ in platform.reserved() {
            let word = reader.read_u32()?;
            trace!("reserved {:#010X}", word);
        }

        reader.seek(SeekFrom::Start(file_table_offset as u64))?;
        let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATION));
        for _ in 0..count {
            entries.push(read_entry(&mut reader, platform)?);
        }

        debug!("read {} entries from {:?} archive", entries.len(), platform);

        Ok(ApfArchive { platform, entries })
    }

    /// Write the archive and return the stream
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, Endian::Big);
        writer.write_u32(self.platform.signature())?;
        writer.set_endian(self.platform.endian());

        writer.write_u32(self.platform.version())?;
        writer.reserve_for::<u32>(FILE_TABLE_FIELD)?;
        writer.write_u32(narrow("file count", self.entries.len() as u64)?)?;
        for word in self.platform.reserved() {
            writer.write_u32(*word)?;
        }

        let mut offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            offsets.push(narrow::<u32>("data offset", writer.position()?)?);
            writer.write_bytes(&entry.data)?;
        }

        let file_table_offset = narrow::<u32>("file table offset", writer.position()?)?;
        writer.patch(FILE_TABLE_FIELD, file_table_offset)?;

        for (entry, offset) in self.entries.iter().zip(offsets) {
            write_entry(&mut writer, self.platform, entry, offset)?;
        }

        Ok(writer.finish()?)
    }
}

fn read_entry<R: Read + Seek>(reader: &mut BinaryReader<R>, platform: Platform) -> Result<ApfEntry> {
    let name = match platform {
        Platform::Pc => reader.read_string_until_null()?,
        Platform::Console => reader.read_prefixed_string()?,
    };

    let offset = reader.read_u32()?;
    let size = reader.read_u32()?;
    let compressed_size = reader.read_u32()?;
    let file_type = reader.read_u32()?;
    let crc32 = reader.read_u32()?;
    let is_compressed = reader.read_u32()? == 1;

    let stored = if is_compressed { compressed_size } else { size };
    let data = reader.read_bytes_at(offset as u64, stored as usize)?;

    trace!("{} at {:#X}, {} bytes", name, offset, stored);

    Ok(ApfEntry {
        name,
        file_type,
        crc32,
        size,
        compressed_size,
        is_compressed,
        data,
    })
}

fn write_entry<W: Write + Seek>(
    writer: &mut BinaryWriter<W>,
    platform: Platform,
    entry: &ApfEntry,
    offset: u32,
) -> Result<()> {
    match platform {
        Platform::Pc => {
            writer.write_string_null_terminated(&entry.name)?;
        }
        Platform::Console => writer.write_prefixed_string(&entry.name)?,
    }

    writer.write_u32(offset)?;
    writer.write_u32(entry.size)?;
    writer.write_u32(entry.compressed_size)?;
    writer.write_u32(entry.file_type)?;
    writer.write_u32(if entry.file_type == 0 { 0 } else { entry.crc32 })?;
    writer.write_u32(u32::from(entry.is_compressed))?;

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::apf::{ApfArchive, ApfEntry, Platform, CRC32};
    use crate::error::{Error, Result};

    #[rustfmt::skip]
    const CONSOLE_ARCHIVE: [u8; 59] = [
        0x41, 0x4B, 0x50, 0x46,
        0x00, 0x00, 0x00, 0x05,
        0x00, 0x00, 0x00, 0x1C,
        0x00, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x37,
        // payload
        b'h', b'i', b'!', b'\n',
        // entry
        0x00, 0x00, 0x00, 0x03, b'm', b'a', b'p',
        0x00, 0x00, 0x00, 0x18,
        0x00, 0x00, 0x00, 0x04,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn read_console_archive() -> Result<()> {
        let archive = ApfArchive::read(Cursor::new(CONSOLE_ARCHIVE))?;

        assert_eq!(archive.platform, Platform::Console);
        assert_eq!(
            archive.entries,
            vec![ApfEntry {
                name: "map".to_owned(),
                size: 4,
                data: b"hi!\n".to_vec(),
                ..Default::default()
            }]
        );

        Ok(())
    }

    #[test]
    fn write_console_archive() -> Result<()> {
        let archive = ApfArchive {
            platform: Platform::Console,
            entries: vec![ApfEntry::new("map", 0, b"hi!\n".to_vec(), None)?],
        };

        let bytes = archive.write(Cursor::new(Vec::new()))?.into_inner();
        assert_eq!(bytes, CONSOLE_ARCHIVE.to_vec());

        Ok(())
    }

    #[test]
    fn pc_header_switches_byte_order() -> Result<()> {
        let archive = ApfArchive {
            platform: Platform::Pc,
            entries: vec![ApfEntry::new("a/b", 7, vec![0xAB; 3], None)?],
        };

        let bytes = archive.write(Cursor::new(Vec::new()))?.into_inner();
        assert_eq!(&bytes[..8], b"FPUV\x03\x00\x00\x00");
        assert_eq!(&bytes[8..12], &[0x47, 0x00, 0x00, 0x00]);
        assert_eq!(ApfArchive::read(Cursor::new(bytes))?, archive);

        Ok(())
    }

    #[test]
    fn checksum_is_only_kept_for_typed_entries() -> Result<()> {
        assert_eq!(CRC32.checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(ApfEntry::new("x", 0, b"123456789".to_vec(), None)?.crc32, 0);
        assert_eq!(
            ApfEntry::new("x", 2, b"123456789".to_vec(), None)?.crc32,
            0xCBF4_3926
        );

        Ok(())
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes = CONSOLE_ARCHIVE.to_vec();
        bytes[7] = 0x04;

        assert!(matches!(
            ApfArchive::read(Cursor::new(bytes)),
            Err(Error::UnsupportedVersion(4))
        ));
    }
}
