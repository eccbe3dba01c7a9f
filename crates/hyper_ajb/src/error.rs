//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

use crate::types::ValueType;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`hyper_io::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    CursorError(#[from] hyper_io::error::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// No known signature was found at any of the header offsets
    #[error("could not identify the document header")]
    #[diagnostic(help("documents start with AKJB or VUJB, optionally preceded by a size or an identifier and a size"))]
    UnrecognizedHeader,

    /// The document declares a version other than 1
    #[error("unsupported document version {0}")]
    UnsupportedVersion(u32),

    /// The root of a document must be an array, an object or null
    #[error("{0} is not supported as a document root")]
    UnsupportedRootType(ValueType),

    /// A value tag outside of the known range
    #[error("unknown value tag {0}")]
    UnsupportedValueType(u32),

    /// An object names the same key twice
    #[error("object key {0:?} appears more than once")]
    DuplicateKey(String),

    /// Containers are nested deeper than the decoder allows
    #[error("values are nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
