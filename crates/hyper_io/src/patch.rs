//! Deferred fields for values that are only known after later data has been written.
//!
//! Many formats store offsets or sizes ahead of the data they describe. Rather than computing the
//! whole layout up front, a writer reserves a named placeholder, keeps emitting data, and backfills
//! the placeholder once the value is known:
//!
//! ```
//! # fn doit() -> hyper_io::error::Result<()> {
//! use hyper_io::{BinaryWriter, Endian};
//!
//! let mut writer = BinaryWriter::new(std::io::Cursor::new(Vec::new()), Endian::Little);
//! writer.reserve_for::<u32>("size")?;
//! writer.write_bytes(b"payload")?;
//! let size = writer.position()? as u32 - 4;
//! writer.patch("size", size)?;
//!
//! assert_eq!(&writer.finish()?.into_inner()[..4], &[7, 0, 0, 0]);
//! # Ok(())
//! # }
//! # doit().unwrap();
//! ```
//!
//! Backfilling a name that is not registered does nothing. A name is released once it has been
//! patched and may then be reserved again.

use std::io::{Seek, SeekFrom, Write};
use tracing::trace;

use crate::cursor::BinaryWriter;
use crate::error::{Error, Result};

/// A reserved placeholder waiting for its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPatch {
    /// Absolute offset of the placeholder
    pub offset: u64,
    /// Width of the placeholder in bytes
    pub width: usize,
}

/// A value that can be written into a deferred field
pub trait PatchValue: Copy + std::fmt::Debug {
    /// Number of bytes written by [`PatchValue::write_to`]
    const WIDTH: usize;

    /// Write the value at the writer's current position
    fn write_to<W: Write + Seek>(self, writer: &mut BinaryWriter<W>) -> Result<()>;
}

macro_rules! patch_value {
    ($ty:ty, $write:ident) => {
        impl PatchValue for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn write_to<W: Write + Seek>(self, writer: &mut BinaryWriter<W>) -> Result<()> {
                writer.$write(self)
            }
        }
    };
}

patch_value!(u8, write_u8);
patch_value!(u16, write_u16);
patch_value!(u32, write_u32);
patch_value!(i32, write_i32);
patch_value!(u64, write_u64);
patch_value!(i64, write_i64);

impl<W: Write + Seek> BinaryWriter<W> {
    /// Reserve `width` zeroed bytes at the current position under `name`
    ///
    /// Returns the offset of the placeholder.
    pub fn reserve(&mut self, name: impl Into<String>, width: usize) -> Result<u64> {
        let offset = self.position()?;
        self.reserve_at(name, offset, width)?;
        Ok(offset)
    }

    /// Reserve a placeholder sized for `T` at the current position
    pub fn reserve_for<T: PatchValue>(&mut self, name: impl Into<String>) -> Result<u64> {
        self.reserve(name, T::WIDTH)
    }

    /// Reserve `width` zeroed bytes at `offset` under `name`
    ///
    /// The writer is left directly after the placeholder. Reserving a name that is still pending
    /// moves it to the new offset.
    pub fn reserve_at(&mut self, name: impl Into<String>, offset: u64, width: usize) -> Result<()> {
        let name = name.into();
        self.seek(SeekFrom::Start(offset))?;
        self.write_null_bytes(width as u64)?;

        trace!("reserved {} at {:#X} ({} bytes)", name, offset, width);
        self.patches.insert(name, PendingPatch { offset, width });
        Ok(())
    }

    /// Backfill the placeholder registered as `name` and release it
    ///
    /// The position is restored afterwards. Returns `false` without writing anything if no such
    /// placeholder is pending.
    pub fn patch<T: PatchValue>(&mut self, name: &str, value: T) -> Result<bool> {
        let Some(pending) = self.patches.get(name).copied() else {
            trace!("ignoring patch for unregistered field {}", name);
            return Ok(false);
        };

        if pending.width != T::WIDTH {
            return Err(Error::PatchWidthMismatch {
                name: name.to_owned(),
                reserved: pending.width,
                actual: T::WIDTH,
            });
        }

        let restore = self.position()?;
        self.seek(SeekFrom::Start(pending.offset))?;
        value.write_to(self)?;
        self.seek(SeekFrom::Start(restore))?;
        self.patches.shift_remove(name);

        trace!("patched {} at {:#X} with {:?}", name, pending.offset, value);
        Ok(true)
    }

    /// Move to the placeholder registered as `name` and release it
    ///
    /// Returns `false` and stays in place if no such placeholder is pending.
    pub fn seek_to_patch(&mut self, name: &str) -> Result<bool> {
        let Some(pending) = self.patches.shift_remove(name) else {
            return Ok(false);
        };

        self.seek(SeekFrom::Start(pending.offset))?;
        Ok(true)
    }

    /// Whether `name` is reserved and waiting for a value
    pub fn is_pending(&self, name: &str) -> bool {
        self.patches.contains_key(name)
    }

    /// Placeholders that have not been backfilled yet, in registration order
    pub fn pending(&self) -> impl Iterator<Item = (&str, &PendingPatch)> {
        self.patches.iter().map(|(name, patch)| (name.as_str(), patch))
    }
}
