//! Tags, platforms and header layouts of binary documents

use binrw::BinWrite;
use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Document version understood by this crate
pub const VERSION: u32 = 1;

/// Tag stored in front of every value
#[derive(BinWrite, Display, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[bw(repr = u32)]
pub enum ValueType {
    Null = 0,
    Int32 = 1,
    Single = 2,
    Boolean = 3,
    String = 4,
    Array = 5,
    Object = 6,
    Int64 = 7,
}

impl TryFrom<u32> for ValueType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ValueType::Null,
            1 => ValueType::Int32,
            2 => ValueType::Single,
            3 => ValueType::Boolean,
            4 => ValueType::String,
            5 => ValueType::Array,
            6 => ValueType::Object,
            7 => ValueType::Int64,
            _ => return Err(Error::UnsupportedValueType(value)),
        })
    }
}

/// The platform a document was built for, identified by its signature
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    /// `AKJB`
    #[default]
    Console,
    /// `VUJB`
    Pc,
}

impl Platform {
    /// Every platform, in the order they are tried
    pub const ALL: [Platform; 2] = [Platform::Console, Platform::Pc];

    /// Signature written at the start of a document body
    pub const fn signature(self) -> u32 {
        match self {
            Platform::Console => 0x414B4A42,
            Platform::Pc => 0x56554A42,
        }
    }

    /// Find the platform using `signature`, in either byte order
    pub fn from_signature(signature: u32) -> Option<Platform> {
        Self::ALL
            .into_iter()
            .find(|p| p.signature() == signature || p.signature().swap_bytes() == signature)
    }
}

/// Optional fields stored in front of the signature
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum HeaderVariant {
    /// The signature is the first field
    #[default]
    Default,

    /// A `u32` holding the number of bytes following it precedes the signature
    #[serde(rename = "Size")]
    SizeAware,

    /// A `u32` identifier and the size field precede the signature
    #[serde(rename = "Identifier")]
    Identified,
}

impl HeaderVariant {
    /// Probe order together with the offset of the signature
    pub(crate) const PROBES: [(HeaderVariant, u64); 3] = [
        (HeaderVariant::Default, 0),
        (HeaderVariant::SizeAware, 4),
        (HeaderVariant::Identified, 8),
    ];

    /// Number of bytes stored before the signature
    pub fn prefix_len(self) -> u64 {
        match self {
            HeaderVariant::Default => 0,
            HeaderVariant::SizeAware => 4,
            HeaderVariant::Identified => 8,
        }
    }
}

/// Header of a document, stored next to exported JSON as a `.meta` file
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeaderInfo {
    #[serde(rename = "Type")]
    pub variant: HeaderVariant,

    #[serde(rename = "Identifier", default)]
    pub identifier: u32,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::Error;
    use crate::types::{HeaderInfo, HeaderVariant, Platform, ValueType};

    #[test]
    fn value_tags() {
        assert_eq!(ValueType::try_from(7).unwrap(), ValueType::Int64);
        assert!(matches!(
            ValueType::try_from(8),
            Err(Error::UnsupportedValueType(8))
        ));
    }

    #[test]
    fn platform_from_either_byte_order() {
        assert_eq!(Platform::from_signature(0x414B4A42), Some(Platform::Console));
        assert_eq!(Platform::from_signature(0x424A5556), Some(Platform::Pc));
        assert_eq!(Platform::from_signature(0x55AA382D), None);
    }

    #[test]
    fn header_info_json() -> serde_json::Result<()> {
        let header = HeaderInfo {
            variant: HeaderVariant::Identified,
            identifier: 42,
        };

        let json = serde_json::to_string(&header)?;
        assert_eq!(json, r#"{"Type":"Identifier","Identifier":42}"#);
        assert_eq!(serde_json::from_str::<HeaderInfo>(&json)?, header);
        assert_eq!(
            serde_json::from_str::<HeaderInfo>(r#"{"Type":"Size"}"#)?.variant,
            HeaderVariant::SizeAware
        );

        Ok(())
    }
}
