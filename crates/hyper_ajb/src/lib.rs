//! This library handles reading from and creating typed binary JSON documents (**AJB**) used by
//! titles built on the Barracuda engine.
//!
//! # Document Format Documentation
//!
//! An AJB document stores a JSON tree with the width of every number preserved. Documents are
//! big endian on disk unless their signature is found byte-swapped.
//!
//! ## File Structure
//!
//! | Offset (bytes) | Field          | Description                                                  |
//! |----------------|----------------|--------------------------------------------------------------|
//! | optional       | Identifier     | 4 bytes: Only present in identified documents                |
//! | optional       | Size           | 4 bytes: Number of bytes following this field                |
//! | 0x0000         | Signature      | 4 bytes: `AKJB` (0x414B4A42) on console, `VUJB` on PC       |
//! | 0x0004         | Version        | 4 bytes: Fixed value 1                                       |
//! | 0x0008         | Root Type      | 4 bytes: Tag of the root value                               |
//! | 0x000C         | Root Value     | variable: Count and entries, absent for a null root          |
//!
//! ### Header
//!
//! Nothing in the file says whether the identifier and size fields are present. Readers look for
//! a known signature at offsets 0, 4 and 8 and pick the layout accordingly, see [`HeaderVariant`].
//!
//! ### Values
//!
//! Every value is preceded by its tag:
//!
//! | Tag | Type      | Payload                                                            |
//! |-----|-----------|--------------------------------------------------------------------|
//! | 0   | `Null`    | none                                                               |
//! | 1   | `Int32`   | 4 bytes                                                            |
//! | 2   | `Single`  | 4 bytes, IEEE 754                                                  |
//! | 3   | `Boolean` | 1 byte, `1` is true                                                |
//! | 4   | `String`  | 4 byte length then UTF-8                                           |
//! | 5   | `Array`   | 4 byte count then `(tag, value)` per element                       |
//! | 6   | `Object`  | 4 byte count then `(length-prefixed key, tag, value)` per entry    |
//! | 7   | `Int64`   | 8 bytes                                                            |
//!
//! The root of a document is always an array, an object, or null for an empty document.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.ajb`
//! - **Endianness**: Big-endian, little-endian when the signature is byte-swapped
//!

pub mod error;
pub mod event;
pub mod fs;
pub mod read;
pub mod types;
pub mod value;
pub mod write;

pub use event::{TimedEvent, TimedEvents};
pub use read::AjbDocument;
pub use types::{HeaderInfo, HeaderVariant, Platform, ValueType};
pub use value::BinaryValue;
