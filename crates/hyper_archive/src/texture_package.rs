//! Tommunism engine texture packages
//!
//! # Archive Format Documentation
//!
//! Texture packages (`.tp`) are little endian. Each texture is an image file (PNG in every known
//! package) and a block of 9 attribute bytes whose meaning is unknown.
//!
//! | Field         | Size          | Description                                    |
//! |---------------|---------------|------------------------------------------------|
//! | Texture Count | 4 bytes       |                                                |
//! | Texture Info  | 17 bytes each | `(data start, data size, attributes)`          |
//! | Payloads      | variable      | Image data at the recorded offsets             |
//!
//! When extracted, texture `i` becomes `{i}.png` and its attributes are kept next to it in
//! `{i}.json` as a hex string.
//!

use binrw::{BinRead, BinWrite, Endian};
use hyper_io::{BinaryReader, BinaryWriter};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::io::{Read, Seek, Write};
use tracing::{debug, instrument, trace};

use crate::error::{narrow, Error, Result};

/// Number of attribute bytes per texture
pub const ATTRIBUTE_COUNT: usize = 9;

/// Upper bound for allocations sized by counts read from a file
const MAX_PREALLOCATION: usize = 4096;

/// Texture record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct TextureInfo {
    /// Absolute offset of the payload
    pub data_start: i32,
    pub data_size: i32,
    pub attributes: [u8; ATTRIBUTE_COUNT],
}

/// A single texture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Texture {
    pub attributes: [u8; ATTRIBUTE_COUNT],
    /// Image file contents
    pub data: Vec<u8>,
}

impl Texture {
    pub fn new(data: Vec<u8>, attributes: [u8; ATTRIBUTE_COUNT]) -> Self {
        Texture { attributes, data }
    }
}

/// Sidecar written next to every extracted texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureAttributes {
    #[serde(rename = "Attributes", with = "hex_attributes")]
    pub attributes: [u8; ATTRIBUTE_COUNT],
}

impl From<&Texture> for TextureAttributes {
    fn from(texture: &Texture) -> Self {
        TextureAttributes {
            attributes: texture.attributes,
        }
    }
}

/// Attribute bytes as space separated hex, `"01 02 FF ..."`
mod hex_attributes {
    use super::*;

    pub fn serialize<S: Serializer>(
        attributes: &[u8; ATTRIBUTE_COUNT],
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        let hex = attributes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        serializer.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<[u8; ATTRIBUTE_COUNT], D::Error> {
        let hex = String::deserialize(deserializer)?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();

        if !hex.is_ascii() || hex.len() != ATTRIBUTE_COUNT * 2 {
            return Err(<D::Error as de::Error>::invalid_length(
                hex.len() / 2,
                &"9 hex encoded bytes",
            ));
        }

        let mut attributes = [0; ATTRIBUTE_COUNT];
        for (slot, index) in attributes.iter_mut().zip((0..hex.len()).step_by(2)) {
            *slot = u8::from_str_radix(&hex[index..index + 2], 16)
                .map_err(<D::Error as de::Error>::custom)?;
        }

        Ok(attributes)
    }
}

/// A texture package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TexturePackage {
    pub textures: Vec<Texture>,
}

impl TexturePackage {
    /// Read a package with all image data
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Little);

        let count = reader.read_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| Error::invalid_node(0, format!("texture count is negative ({count})")))?;

        let mut textures = Vec::with_capacity(count.min(MAX_PREALLOCATION));
        for index in 0..count {
            let info = reader.read_value::<TextureInfo>()?;
            trace!("texture {}: {:?}", index, info);

            let start = u64::try_from(info.data_start).map_err(|_| {
                Error::invalid_node(index, format!("negative data start ({})", info.data_start))
            })?;
            let size = usize::try_from(info.data_size).map_err(|_| {
                Error::invalid_node(index, format!("negative data size ({})", info.data_size))
            })?;

            let data = reader.read_bytes_at(start, size)?;
            textures.push(Texture::new(data, info.attributes));
        }

        debug!("read {} textures", textures.len());

        Ok(TexturePackage { textures })
    }

    /// Write the package and return the stream
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, Endian::Little);

        writer.write_i32(narrow("texture count", self.textures.len() as u64)?)?;
        for (index, texture) in self.textures.iter().enumerate() {
            writer.reserve_for::<i32>(data_field(index))?;
            writer.write_i32(narrow("texture size", texture.data.len() as u64)?)?;
            writer.write_bytes(&texture.attributes)?;
        }

        for (index, texture) in self.textures.iter().enumerate() {
            let offset = writer.position()?;
            writer.patch(&data_field(index), narrow::<i32>("data start", offset)?)?;
            writer.write_bytes(&texture.data)?;
        }

        Ok(writer.finish()?)
    }
}

fn data_field(index: usize) -> String {
    format!("texture{index}.dataStart")
}
