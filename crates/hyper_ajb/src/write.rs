//! Types for writing binary documents
//!

use hyper_io::BinaryWriter;
use std::io::{Seek, Write};
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    read::{AjbDocument, MAX_DEPTH},
    types::{HeaderInfo, HeaderVariant, Platform, ValueType, VERSION},
    value::BinaryValue,
};

const IDENTIFIER_FIELD: &str = "identifier";
const SIZE_FIELD: &str = "fileSize";

impl AjbDocument {
    /// Write the document with its own byte order and return the stream
    ///
    /// ```
    /// # fn doit() -> hyper_ajb::error::Result<()> {
    /// use hyper_ajb::{AjbDocument, BinaryValue};
    ///
    /// let document = AjbDocument::new(BinaryValue::Array(vec![]));
    /// let bytes = document.write(std::io::Cursor::new(Vec::new()))?.into_inner();
    /// assert_eq!(&bytes[..4], b"AKJB");
    /// # Ok(())
    /// # }
    /// # doit().unwrap();
    /// ```
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, self.endian);
        self.write_to(&mut writer)?;
        Ok(writer.finish()?)
    }

    /// Write the document at the writer's position
    ///
    /// The document is written with its own byte order, the writer's byte order is restored
    /// afterwards.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut BinaryWriter<W>) -> Result<()> {
        let outer_endian = writer.endian();
        writer.set_endian(self.endian);
        let written = write_document(writer, self.platform, &self.header, &self.root);
        writer.set_endian(outer_endian);
        written
    }
}

/// Write a document for `root` using the writer's byte order
pub(crate) fn write_document<W: Write + Seek>(
    writer: &mut BinaryWriter<W>,
    platform: Platform,
    header: &HeaderInfo,
    root: &BinaryValue,
) -> Result<()> {
    let start = writer.position()?;

    // scoped to the document so fields reserved by an outer container stay pending
    let identifier_field = format!("{IDENTIFIER_FIELD}@{start:#X}");
    let size_field = format!("{SIZE_FIELD}@{start:#X}");

    match header.variant {
        HeaderVariant::Default => {}
        HeaderVariant::SizeAware => {
            writer.reserve_for::<u32>(&size_field)?;
        }
        HeaderVariant::Identified => {
            writer.reserve_for::<u32>(&identifier_field)?;
            writer.reserve_for::<u32>(&size_field)?;
        }
    }

    writer.write_u32(platform.signature())?;
    writer.write_u32(VERSION)?;

    match root {
        BinaryValue::Null => writer.write_value(&ValueType::Null)?,
        BinaryValue::Array(_) | BinaryValue::Object(_) => {
            writer.write_value(&root.value_type())?;
            write_value(writer, root, 0)?;
        }
        other => return Err(Error::UnsupportedRootType(other.value_type())),
    }

    let end = writer.position()?;
    let size = end - (start + header.variant.prefix_len());
    match header.variant {
        HeaderVariant::Default => {}
        HeaderVariant::SizeAware => {
            writer.patch(&size_field, checked_u32(size)?)?;
        }
        HeaderVariant::Identified => {
            writer.patch(&identifier_field, header.identifier)?;
            writer.patch(&size_field, checked_u32(size)?)?;
        }
    }

    debug!(
        "wrote {:?} document ({:?}, {} bytes)",
        platform,
        header.variant,
        end - start
    );

    Ok(())
}

fn write_value<W: Write + Seek>(
    writer: &mut BinaryWriter<W>,
    value: &BinaryValue,
    depth: usize,
) -> Result<()> {
    match value {
        BinaryValue::Null => {}
        BinaryValue::Int32(v) => writer.write_i32(*v)?,
        BinaryValue::Int64(v) => writer.write_i64(*v)?,
        BinaryValue::Single(v) => writer.write_f32(*v)?,
        BinaryValue::Boolean(v) => writer.write_u8(u8::from(*v))?,
        BinaryValue::String(v) => writer.write_prefixed_string(v)?,
        BinaryValue::Array(items) => {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }

            writer.write_u32(checked_u32(items.len() as u64)?)?;
            for item in items {
                writer.write_value(&item.value_type())?;
                write_value(writer, item, depth + 1)?;
            }
        }
        BinaryValue::Object(entries) => {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }

            writer.write_u32(checked_u32(entries.len() as u64)?)?;
            for (key, entry) in entries {
                writer.write_prefixed_string(key)?;
                writer.write_value(&entry.value_type())?;
                write_value(writer, entry, depth + 1)?;
            }
        }
    }

    Ok(())
}

fn checked_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::from(hyper_io::error::Error::ValueTooLarge {
            value,
            bits: u32::BITS,
        })
    })
}
