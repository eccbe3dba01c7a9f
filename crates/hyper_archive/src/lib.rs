//! This library handles reading from and creating the archive formats of the hyper toolset.
//!
//! | Format                | Module              | Layout                                            |
//! |-----------------------|---------------------|---------------------------------------------------|
//! | U8 (`.arc`)           | [`u8_archive`]      | Flattened tree of nodes, optional Sonic '06 sizes |
//! | Tommunism DAT         | [`dat`]             | Directory and file tables with full paths         |
//! | Tommunism `.tp`       | [`texture_package`] | Images with 9 attribute bytes each                |
//! | Barracuda APF         | [`apf`]             | Flat list of typed entries                        |
//! | Crytek stream         | [`stream`]          | Back to back entries, optional LZSS payloads      |
//!
//! U8 and DAT archives are read into an [`ArchiveDirectory`] tree, see [`tree`] for how U8 node
//! tables map to it. Every archive type can be extracted to and built from a plain directory
//! with the functions in [`fs`].
//!
//! Payloads are kept as stored. Compressed payloads are only expanded on export, through a
//! [`hyper_io::Compressor`].
//!

pub mod apf;
pub mod dat;
pub mod error;
pub mod fs;
pub mod stream;
pub mod texture_package;
pub mod tree;
pub mod u8_archive;

pub use apf::{ApfArchive, ApfEntry, ApfImportOptions};
pub use dat::DatArchive;
pub use fs::ExportReport;
pub use stream::{StreamArchive, StreamEntry};
pub use texture_package::{Texture, TextureAttributes, TexturePackage};
pub use tree::{ArchiveDirectory, ArchiveFile, ArchiveNode, FlatNode, NodeKind};
pub use u8_archive::{FormatContext, U8Archive, U8WriterOptions};
