//! U8 archives
//!
//! # Archive Format Documentation
//!
//! U8 archives are big endian unless the signature is found byte-swapped.
//!
//! | Offset (bytes) | Field             | Description                                          |
//! |----------------|-------------------|------------------------------------------------------|
//! | 0x0000         | Signature         | 4 bytes: `0x55AA382D`                                |
//! | 0x0004         | Node Table Offset | 4 bytes: Always `0x20` when written by this crate    |
//! | 0x0008         | Header Size       | 4 bytes: Size of the node and string tables          |
//! | 0x000C         | Data Offset       | 4 bytes: Start of the first payload                  |
//! | 0x0010         | Reserved          | 16 bytes: See below                                  |
//!
//! ## Nodes
//!
//! The node table is a flattened tree, see [`crate::tree`]. The root node's `data_size` is the
//! number of nodes in the table.
//!
//! | Field             | Size    | Description                                              |
//! |-------------------|---------|----------------------------------------------------------|
//! | Type              | 1 byte  | `0` for files, `1` for directories                       |
//! | Name Offset       | 3 bytes | Relative to the string table, which follows the nodes    |
//! | Data Offset       | 4 bytes | Absolute payload offset, or the parent index             |
//! | Data Size         | 4 bytes | Payload size, or the index past the last descendant      |
//! | Uncompressed Size | 4 bytes | Sonic '06 only                                           |
//!
//! In little endian archives the name offset comes before the type.
//!
//! ## Sonic '06
//!
//! Archives built for Sonic '06 add the uncompressed size to each node, and usually store every
//! payload as a zlib stream. Nothing in the header says so. The official packing tool was supposed to
//! fill the reserved bytes with `0xCC`, the one used for Sonic '06 left stale memory there
//! instead, which is used to recognise these archives:
//!
//! - compressed archives start their reserved block with `0xE4F91200`
//! - uncompressed archives end it with `0x00006301`
//!

use binrw::{BinRead, BinWrite, Endian};
use bon::Builder;
use hyper_io::{BinaryReader, BinaryWriter, Compressor, StringTable, Zlib};
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, instrument, trace};

use crate::{
    error::{narrow, Error, Result},
    tree::{flatten, reconstruct, ArchiveDirectory, FlatNode, NodeKind},
};

/// Signature of every U8 archive
pub const SIGNATURE: u32 = 0x55AA_382D;

const COMPRESSED_MARKER: u32 = 0xE4F9_1200;
const UNCOMPRESSED_MARKER: u32 = 0x0000_6301;
const RESERVED_FILL: u32 = 0xCCCC_CCCC;

const NODE_TABLE_OFFSET: u32 = 0x20;
const DATA_ALIGNMENT: u64 = 0x20;

/// Upper bound for allocations sized by counts read from a file
const MAX_PREALLOCATION: usize = 4096;

/// Header fields following the signature
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct U8Header {
    pub node_table_offset: u32,
    /// Size of the node and string tables
    pub header_size: u32,
    pub data_offset: u32,
    pub reserved: [u32; 4],
}

/// Layout decisions made while reading the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatContext {
    /// Nodes carry an uncompressed size
    pub sonic_next: bool,
    /// Payloads are zlib streams, only meaningful together with `sonic_next`
    pub compressed: bool,
}

impl FormatContext {
    /// Plain U8 archive with 12 byte nodes
    pub const PLAIN: FormatContext = FormatContext {
        sonic_next: false,
        compressed: false,
    };

    /// Sonic '06 archive with zlib payloads
    pub const SONIC_NEXT: FormatContext = FormatContext {
        sonic_next: true,
        compressed: true,
    };

    /// Sonic '06 archive with raw payloads
    pub const SONIC_NEXT_UNCOMPRESSED: FormatContext = FormatContext {
        sonic_next: true,
        compressed: false,
    };

    /// Recognise the variant from the reserved header words
    pub fn detect(reserved: &[u32; 4]) -> Self {
        let compressed = reserved[0] == COMPRESSED_MARKER;
        FormatContext {
            sonic_next: compressed || reserved[3] == UNCOMPRESSED_MARKER,
            compressed,
        }
    }

    /// Whether payloads are stored as zlib streams
    pub fn is_compressed(&self) -> bool {
        self.sonic_next && self.compressed
    }

    /// Reserved words written for this variant
    pub fn reserved(&self) -> [u32; 4] {
        match (self.sonic_next, self.compressed) {
            (true, true) => [COMPRESSED_MARKER, 0, 0, 0],
            (true, false) => [RESERVED_FILL, RESERVED_FILL, RESERVED_FILL, UNCOMPRESSED_MARKER],
            (false, _) => [RESERVED_FILL; 4],
        }
    }

    /// Size of one node record
    pub fn node_size(&self) -> u64 {
        if self.sonic_next {
            16
        } else {
            12
        }
    }
}

/// Options for how a U8 archive should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct U8WriterOptions {
    /// zlib level (0-9) used for Sonic '06 payloads that are not compressed yet
    #[builder(default = 6)]
    pub compression_level: u32,
}

impl Default for U8WriterOptions {
    fn default() -> Self {
        U8WriterOptions::builder().build()
    }
}

/// A U8 archive and its directory tree
///
/// ```no_run
/// use std::fs::File;
///
/// fn list(path: &str) -> hyper_archive::error::Result<()> {
///     let archive = hyper_archive::U8Archive::read(File::open(path)?)?;
///     for (name, file) in archive.root.files() {
///         println!("{name} ({} bytes)", file.data.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct U8Archive {
    pub endian: Endian,
    pub context: FormatContext,
    pub root: ArchiveDirectory,
}

impl Default for U8Archive {
    fn default() -> Self {
        U8Archive {
            endian: Endian::Big,
            context: FormatContext::default(),
            root: ArchiveDirectory::root(),
        }
    }
}

impl U8Archive {
    /// Wrap a tree into a big endian archive
    pub fn new(root: ArchiveDirectory, context: FormatContext) -> Self {
        U8Archive {
            context,
            root,
            ..Default::default()
        }
    }

    /// Read an archive, loading every payload as stored
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Big);
        reader.detect_endian(SIGNATURE)?;

        let header: U8Header = reader.read_value()?;
        let context = FormatContext::detect(&header.reserved);
        debug!("{:?} archive, {:?}", reader.endian(), context);

        reader.seek(SeekFrom::Start(header.node_table_offset as u64))?;
        let root = read_node(&mut reader, context, 0)?;
        if root.kind != NodeKind::Directory {
            return Err(Error::invalid_node(0, "the root node is not a directory"));
        }

        let count = root.data_size as usize;
        let mut nodes = Vec::with_capacity(count.min(MAX_PREALLOCATION));
        nodes.push(root);
        for index in 1..count {
            nodes.push(read_node(&mut reader, context, index)?);
        }

        let strings_offset = reader.position()?;
        let strings_end = header.node_table_offset as u64 + header.header_size as u64;
        let strings = StringTable::new(strings_offset, strings_end.saturating_sub(strings_offset));

        let mut names = Vec::with_capacity(nodes.len());
        for node in &nodes {
            names.push(strings.read_at(&mut reader, node.name_offset as u64)?);
        }

        let root = reconstruct(&nodes, &names, |_, node| {
            Ok(reader.read_bytes_at(node.data_offset as u64, node.data_size as usize)?)
        })?;

        Ok(U8Archive {
            endian: reader.endian(),
            context,
            root,
        })
    }

    /// Write the archive and return the stream
    ///
    /// Compressed Sonic '06 archives get every payload that is not compressed yet compressed with
    /// zlib. Other archives get compressed payloads expanded.
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W, options: U8WriterOptions) -> Result<W> {
        let codec = Zlib::with_level(options.compression_level);
        let flat = flatten(&self.root)?;
        let mut nodes = flat.nodes.clone();

        let mut payloads = Vec::with_capacity(flat.files.len());
        for &(index, file) in &flat.files {
            let compress = self.context.is_compressed();
            let payload: Cow<'_, [u8]> = match (compress, file.uncompressed_size) {
                (true, Some(_)) | (false, None) => Cow::Borrowed(file.data.as_slice()),
                (true, None) => {
                    nodes[index].uncompressed_size =
                        Some(narrow("file size", file.data.len() as u64)?);
                    Cow::Owned(codec.compress(&file.data)?)
                }
                (false, Some(_)) => {
                    nodes[index].uncompressed_size = None;
                    file.contents(&codec)?
                }
            };

            nodes[index].data_size = narrow("file size", payload.len() as u64)?;
            payloads.push((index, payload));
        }

        let tables_size = nodes.len() as u64 * self.context.node_size() + flat.names.len() as u64;
        let header_end = NODE_TABLE_OFFSET as u64 + tables_size;
        let header = U8Header {
            node_table_offset: NODE_TABLE_OFFSET,
            header_size: narrow("header size", tables_size)?,
            data_offset: narrow("data offset", header_end.next_multiple_of(DATA_ALIGNMENT))?,
            reserved: self.context.reserved(),
        };

        let mut writer = BinaryWriter::new(writer, self.endian);
        writer.write_u32(SIGNATURE)?;
        writer.write_value(&header)?;

        for (index, node) in nodes.iter().enumerate() {
            write_node(&mut writer, self.context, index, node)?;
        }
        writer.write_bytes(flat.names.as_bytes())?;

        for (index, payload) in &payloads {
            writer.align(DATA_ALIGNMENT)?;
            let offset = writer.position()?;
            writer.patch(&data_field(*index), narrow::<u32>("data offset", offset)?)?;
            writer.write_bytes(payload)?;
        }

        debug!("wrote {} nodes, {} files", nodes.len(), payloads.len());

        Ok(writer.finish()?)
    }

    /// Paths of every file in the archive
    pub fn list(&self) -> Vec<String> {
        self.root
            .files()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }
}

fn data_field(index: usize) -> String {
    format!("node{index}.dataOffset")
}

fn read_node<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    context: FormatContext,
    index: usize,
) -> Result<FlatNode> {
    let (kind, name_offset) = match reader.endian() {
        Endian::Big => {
            let kind = reader.read_u8()?;
            (kind, reader.read_u24()?)
        }
        Endian::Little => {
            let name_offset = reader.read_u24()?;
            (reader.read_u8()?, name_offset)
        }
    };

    let kind = NodeKind::try_from(kind)
        .map_err(|kind| Error::invalid_node(index, format!("unknown node type {kind}")))?;

    let node = FlatNode {
        kind,
        name_offset,
        data_offset: reader.read_u32()?,
        data_size: reader.read_u32()?,
        uncompressed_size: match (context.sonic_next, context.compressed) {
            (true, true) => Some(reader.read_u32()?),
            (true, false) => {
                reader.read_u32()?;
                None
            }
            (false, _) => None,
        },
    };

    trace!("node {}: {:?}", index, node);
    Ok(node)
}

fn write_node<W: Write + Seek>(
    writer: &mut BinaryWriter<W>,
    context: FormatContext,
    index: usize,
    node: &FlatNode,
) -> Result<()> {
    match writer.endian() {
        Endian::Big => {
            writer.write_u8(node.kind as u8)?;
            writer.write_u24(node.name_offset)?;
        }
        Endian::Little => {
            writer.write_u24(node.name_offset)?;
            writer.write_u8(node.kind as u8)?;
        }
    }

    match node.kind {
        NodeKind::File => {
            writer.reserve_for::<u32>(data_field(index))?;
        }
        NodeKind::Directory => writer.write_u32(node.data_offset)?,
    }
    writer.write_u32(node.data_size)?;

    if context.sonic_next {
        let uncompressed_size = match node.kind {
            NodeKind::File => node.uncompressed_size.unwrap_or(node.data_size),
            NodeKind::Directory => 0,
        };
        writer.write_u32(uncompressed_size)?;
    }

    Ok(())
}
