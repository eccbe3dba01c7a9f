//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// None of the expected signatures were found
    #[error("signature mismatch (expected one of {expected:08X?}, received {received:#010X})")]
    FormatMismatch {
        /// The signatures that would have been accepted
        expected: Vec<u32>,
        /// The value actually read from the stream
        received: u32,
    },

    /// A name was read from outside of its string table
    #[error("name at {position:#X} is outside the bounds of the string table (ends at {limit:#X})")]
    NameOutOfBounds {
        /// Stream position that crossed the limit
        position: u64,
        /// Absolute end of the string table
        limit: u64,
    },

    /// The writer was finished while deferred fields were still waiting for a value
    #[error("unresolved deferred fields: {0:?}")]
    #[diagnostic(help("every reserved field must be backfilled before the writer is finished"))]
    UnresolvedPatches(Vec<String>),

    /// A deferred field was backfilled with a value of a different width than it was reserved with
    #[error("deferred field {name} was reserved with {reserved} bytes but patched with {actual}")]
    PatchWidthMismatch {
        /// Name of the field
        name: String,
        /// Width given at registration
        reserved: usize,
        /// Width of the value used to backfill
        actual: usize,
    },

    /// A value does not fit into the on-disk field it is written to
    #[error("value {value:#X} does not fit in a {bits}-bit field")]
    ValueTooLarge {
        /// The offending value
        value: u64,
        /// Width of the target field
        bits: u32,
    },

    /// The requested compression codec cannot be used on this system
    #[error("{0} compression is not available")]
    CompressionUnavailable(&'static str),

    /// A compressed block ended early or refers to data that was never produced
    #[error("{codec} stream is corrupt at byte {position}: {reason}")]
    CorruptStream {
        /// Name of the codec
        codec: &'static str,
        /// Offset into the compressed block
        position: usize,
        /// What is wrong with it
        reason: &'static str,
    },

    /// Decompressed data did not match the size recorded in the archive
    #[error("decompressed {actual} bytes but expected {expected}")]
    DecompressedSizeMismatch {
        /// Size recorded in the archive
        expected: usize,
        /// Size produced by the codec
        actual: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
