//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

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

    /// Transparent wrapper for [`walkdir::Error`]
    #[error(transparent)]
    WalkError(#[from] walkdir::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// The node table does not describe a valid tree
    #[error("node {index} is invalid: {reason}")]
    #[diagnostic(help("the first node must be a directory spanning every other node"))]
    InvalidTreeStructure {
        /// Position of the offending node in the table
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The archive declares a version other than the one used by its signature
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u32),

    /// A stored name would escape the destination directory
    #[error("refusing to use unsafe path {0:?}")]
    UnsafePath(String),

    /// A directory and a file would share the same path
    #[error("{0:?} is used by both a file and a directory")]
    PathConflict(String),

    /// The path given for an import is not a directory
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// A value does not fit into the on-disk field it is written to
    #[error("{field} of {value} does not fit in the archive")]
    FieldOverflow {
        /// Name of the field
        field: &'static str,
        /// The offending value
        value: u64,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_node(index: usize, reason: impl Into<String>) -> Self {
        Error::InvalidTreeStructure {
            index,
            reason: reason.into(),
        }
    }
}

/// Convert a length or offset to the width of an on-disk field
pub(crate) fn narrow<T: TryFrom<u64>>(field: &'static str, value: u64) -> Result<T> {
    T::try_from(value).map_err(|_| Error::FieldOverflow { field, value })
}
