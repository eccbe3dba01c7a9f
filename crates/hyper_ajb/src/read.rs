//! Types for reading binary documents
//!

use binrw::Endian;
use hyper_io::BinaryReader;
use indexmap::IndexMap;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, instrument, trace};

use crate::{
    error::{Error, Result},
    types::{HeaderInfo, HeaderVariant, Platform, ValueType, VERSION},
    value::BinaryValue,
};

/// Deepest container nesting accepted while decoding
pub const MAX_DEPTH: usize = 512;

/// Upper bound for allocations sized by counts read from a file
pub(crate) const MAX_PREALLOCATION: usize = 4096;

/// A typed binary JSON document
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn dump(reader: impl Read + Seek) -> hyper_ajb::error::Result<()> {
///     let document = hyper_ajb::AjbDocument::read(reader)?;
///     println!("{}", serde_json::to_string_pretty(&document.root)?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AjbDocument {
    /// Platform the document was built for, decides the signature
    pub platform: Platform,
    /// Byte order of the document
    pub endian: Endian,
    /// Fields stored in front of the signature
    pub header: HeaderInfo,
    /// Root value, either [`BinaryValue::Null`], an array or an object
    pub root: BinaryValue,
}

impl Default for AjbDocument {
    fn default() -> Self {
        AjbDocument {
            platform: Platform::default(),
            endian: Endian::Big,
            header: HeaderInfo::default(),
            root: BinaryValue::Null,
        }
    }
}

impl AjbDocument {
    /// Wrap `root` into a big endian console document without header fields
    pub fn new(root: BinaryValue) -> Self {
        AjbDocument {
            root,
            ..Default::default()
        }
    }

    /// Read a standalone document, detecting its header and byte order
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Big);
        Self::read_from(&mut reader, true)
    }

    /// Read a document starting at the reader's position
    ///
    /// Embedded documents carry no header fields, pass `detect_header = false` to start right at
    /// the signature. The reader's byte order is restored afterwards, even if the document itself
    /// was stored the other way around.
    pub fn read_from<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        detect_header: bool,
    ) -> Result<Self> {
        let outer_endian = reader.endian();
        let document = Self::read_document(reader, detect_header);
        reader.set_endian(outer_endian);
        document
    }

    fn read_document<R: Read + Seek>(
        reader: &mut BinaryReader<R>,
        detect_header: bool,
    ) -> Result<Self> {
        let start = reader.position()?;

        let mut header = HeaderInfo::default();
        if detect_header {
            header.variant = detect_header_variant(reader, start)?;
            reader.seek(SeekFrom::Start(start))?;

            match header.variant {
                HeaderVariant::Default => {}
                HeaderVariant::SizeAware => {
                    reader.seek(SeekFrom::Current(4))?;
                }
                HeaderVariant::Identified => {
                    header.identifier = reader.read_u32()?;
                    reader.seek(SeekFrom::Current(4))?;
                }
            }
        }

        let platform = read_signature(reader)?;

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let root_type = ValueType::try_from(reader.read_u32()?)?;
        let root = match root_type {
            ValueType::Null => BinaryValue::Null,
            ValueType::Array | ValueType::Object => read_value(reader, root_type, 0)?,
            other => return Err(Error::UnsupportedRootType(other)),
        };

        debug!(
            "read {:?} document ({:?}, {:?}, {:?} root)",
            platform,
            reader.endian(),
            header.variant,
            root_type
        );

        Ok(AjbDocument {
            platform,
            endian: reader.endian(),
            header,
            root,
        })
    }
}

/// Find the header layout by looking for a signature at each possible offset
///
/// A signature found byte-swapped switches the reader to the other byte order.
fn detect_header_variant<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    start: u64,
) -> Result<HeaderVariant> {
    for platform in Platform::ALL {
        let signature = platform.signature();
        for (variant, offset) in HeaderVariant::PROBES {
            reader.seek(SeekFrom::Start(start + offset))?;
            if reader
                .probe_signature(&[signature, signature.swap_bytes()])?
                .is_some()
            {
                reader.seek(SeekFrom::Start(start + offset))?;
                reader.detect_endian(signature)?;
                trace!("found {:#010X} at +{}", signature, offset);
                return Ok(variant);
            }
        }
    }

    Err(Error::UnrecognizedHeader)
}

/// Read the signature, adopting the byte order it was written in
fn read_signature<R: Read + Seek>(reader: &mut BinaryReader<R>) -> Result<Platform> {
    let position = reader.position()?;
    let received = reader.read_u32()?;

    let Some(platform) = Platform::from_signature(received) else {
        return Err(hyper_io::error::Error::FormatMismatch {
            expected: Platform::ALL.iter().map(|p| p.signature()).collect(),
            received,
        }
        .into());
    };

    reader.seek(SeekFrom::Start(position))?;
    reader.detect_endian(platform.signature())?;
    Ok(platform)
}

fn read_value<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    value_type: ValueType,
    depth: usize,
) -> Result<BinaryValue> {
    Ok(match value_type {
        ValueType::Null => BinaryValue::Null,
        ValueType::Int32 => BinaryValue::Int32(reader.read_i32()?),
        ValueType::Int64 => BinaryValue::Int64(reader.read_i64()?),
        ValueType::Single => BinaryValue::Single(reader.read_f32()?),
        ValueType::Boolean => BinaryValue::Boolean(reader.read_u8()? == 1),
        ValueType::String => BinaryValue::String(reader.read_prefixed_string()?),
        ValueType::Array => {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }

            let count = reader.read_u32()? as usize;
            let mut items = Vec::with_capacity(count.min(MAX_PREALLOCATION));
            for _ in 0..count {
                let item_type = ValueType::try_from(reader.read_u32()?)?;
                items.push(read_value(reader, item_type, depth + 1)?);
            }
            BinaryValue::Array(items)
        }
        ValueType::Object => {
            if depth >= MAX_DEPTH {
                return Err(Error::NestingTooDeep(MAX_DEPTH));
            }

            let count = reader.read_u32()? as usize;
            let mut entries = IndexMap::with_capacity(count.min(MAX_PREALLOCATION));
            for _ in 0..count {
                let key = reader.read_prefixed_string()?;
                if entries.contains_key(&key) {
                    return Err(Error::DuplicateKey(key));
                }
                let entry_type = ValueType::try_from(reader.read_u32()?)?;
                let value = read_value(reader, entry_type, depth + 1)?;
                entries.insert(key, value);
            }
            BinaryValue::Object(entries)
        }
    })
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use hyper_io::BinaryReader;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tracing_test::traced_test;

    use crate::{
        error::{Error, Result},
        read::{AjbDocument, MAX_DEPTH},
        types::{HeaderVariant, Platform},
        value::BinaryValue,
    };

    #[traced_test]
    #[test]
    fn read_empty_document() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x00,
        ];

        let document = AjbDocument::read(Cursor::new(input))?;
        assert_eq!(document.root, BinaryValue::Null);
        assert_eq!(document.header.variant, HeaderVariant::Default);

        Ok(())
    }

    #[test]
    fn read_identified_pc_header() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x2A,
            0x00, 0x00, 0x00, 0x18,
            0x56, 0x55, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x05,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x07,
        ];

        let document = AjbDocument::read(Cursor::new(input))?;
        assert_eq!(document.platform, Platform::Pc);
        assert_eq!(document.header.variant, HeaderVariant::Identified);
        assert_eq!(document.header.identifier, 42);
        assert_eq!(document.root, BinaryValue::Array(vec![BinaryValue::Int32(7)]));

        Ok(())
    }

    #[test]
    fn read_byte_swapped_document() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x10, 0x00, 0x00, 0x00,
            0x42, 0x4A, 0x4B, 0x41,
            0x01, 0x00, 0x00, 0x00,
            0x05, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let document = AjbDocument::read(Cursor::new(input))?;
        assert_eq!(document.endian, Endian::Little);
        assert_eq!(document.header.variant, HeaderVariant::SizeAware);
        assert_eq!(document.root, BinaryValue::Array(vec![]));

        Ok(())
    }

    #[test]
    fn reader_byte_order_is_restored() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x42, 0x4A, 0x4B, 0x41,
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x09,
        ];

        let mut reader = BinaryReader::new(Cursor::new(input), Endian::Big);
        let document = AjbDocument::read_from(&mut reader, false)?;

        assert_eq!(document.endian, Endian::Little);
        assert_eq!(reader.endian(), Endian::Big);
        assert_eq!(reader.read_u32()?, 9);

        Ok(())
    }

    #[test]
    fn unknown_header_is_rejected() {
        let input = [0u8; 16];
        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::UnrecognizedHeader)
        ));
    }

    #[test]
    fn short_input_is_unrecognized() {
        let input = [0x41, 0x4B];
        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::UnrecognizedHeader)
        ));
    }

    #[test]
    fn wrong_signature_without_header_detection() {
        let input = [0x55, 0xAA, 0x38, 0x2D, 0x00, 0x00, 0x00, 0x01];
        let mut reader = BinaryReader::new(Cursor::new(input), Endian::Big);

        assert!(matches!(
            AjbDocument::read_from(&mut reader, false),
            Err(Error::CursorError(
                hyper_io::error::Error::FormatMismatch {
                    received: 0x55AA382D,
                    ..
                }
            ))
        ));
    }

    #[test]
    fn unsupported_version() {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn scalar_root_is_rejected() {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01,
        ];

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::UnsupportedRootType(_))
        ));
    }

    #[test]
    fn unknown_value_tag() {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x05,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x09,
        ];

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::UnsupportedValueType(9))
        ));
    }

    #[test]
    fn nesting_is_limited() {
        let mut input = vec![0x41, 0x4B, 0x4A, 0x42, 0, 0, 0, 1, 0, 0, 0, 5];
        for _ in 0..=MAX_DEPTH {
            input.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 5]);
        }

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::NestingTooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn huge_count_does_not_preallocate() {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x05,
            0xFF, 0xFF, 0xFF, 0xFF,
        ];

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::CursorError(hyper_io::error::Error::IOError(_)))
        ));
    }

    #[test]
    fn repeated_key_is_rejected() {
        #[rustfmt::skip]
        let input = [
            0x41, 0x4B, 0x4A, 0x42,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x06,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x01, b'a',
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x01, b'a',
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02,
        ];

        assert!(matches!(
            AjbDocument::read(Cursor::new(input)),
            Err(Error::DuplicateKey(key)) if key == "a"
        ));
    }
}
