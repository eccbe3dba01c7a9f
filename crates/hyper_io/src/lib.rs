//! Binary plumbing shared by the hyper codecs.
//!
//! Game archives from the formats handled by this workspace are built out of a small set of
//! recurring pieces, which this crate provides:
//!
//! - [`BinaryReader`] and [`BinaryWriter`], sequential cursors whose byte order may change while a
//!   file is being processed, for formats that signal their platform through a signature.
//! - Deferred fields ([`patch`]), named placeholders reserved by a [`BinaryWriter`] and
//!   backfilled once an offset or size is known.
//! - String tables ([`strings`]), blocks of null-terminated names addressed by offset.
//! - Block compression ([`compression`]) behind the [`Compressor`] trait.
//!
//! ## Byte order
//!
//! Both cursors carry a [`binrw::Endian`]. Primitive reads and writes use it directly, structures
//! described with [`binrw`] are read with it through [`BinaryReader::read_value`], and
//! [`BinaryReader::detect_endian`] flips it when a signature is found byte-swapped.
//!
//! | Call                        | Big endian        | Little endian     |
//! |-----------------------------|-------------------|-------------------|
//! | `write_u24(0x010203)`       | `01 02 03`        | `03 02 01`        |
//! | `write_u32(0x55AA382D)`     | `55 AA 38 2D`     | `2D 38 AA 55`     |
//!

pub mod compression;
pub mod cursor;
pub mod error;
pub mod patch;
pub mod strings;

pub use binrw::Endian;
pub use compression::{Compressor, Lzss, Unsupported, Zlib};
pub use cursor::{BinaryReader, BinaryWriter};
pub use patch::{PatchValue, PendingPatch};
pub use strings::{NameTable, StringTable};
