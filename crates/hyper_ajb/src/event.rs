//! Timed event lists
//!
//! An event list is a big endian container of named events, each carrying two user values and an
//! embedded document. The embedded documents start directly at their signature.
//!
//! | Field       | Size     | Description                                   |
//! |-------------|----------|-----------------------------------------------|
//! | Count       | 4 bytes  | Number of events                              |
//! | User data 1 | 4 bytes  | `f32`, usually a time stamp                   |
//! | Name        | variable | Null-terminated UTF-8                         |
//! | User data 2 | 4 bytes  | `u32`                                         |
//! | Document    | variable | Typed document without header fields          |
//!

use binrw::Endian;
use hyper_io::{BinaryReader, BinaryWriter};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use tracing::{debug, instrument};

use crate::{
    error::Result,
    read::{AjbDocument, MAX_PREALLOCATION},
    types::{HeaderInfo, Platform},
    value::BinaryValue,
    write::write_document,
};

/// A single entry of an event list
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TimedEvent {
    pub name: String,
    pub user_data1: f32,
    pub user_data2: u32,
    pub root: BinaryValue,
}

/// A list of timed events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimedEvents {
    /// Platform used for the signatures of the embedded documents
    pub platform: Platform,
    pub events: Vec<TimedEvent>,
}

impl TimedEvents {
    /// Read an event list
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Big);

        let count = reader.read_u32()? as usize;
        let mut events = Vec::with_capacity(count.min(MAX_PREALLOCATION));
        let mut platform = None;

        for _ in 0..count {
            let user_data1 = reader.read_f32()?;
            let name = reader.read_string_until_null()?;
            let user_data2 = reader.read_u32()?;
            let document = AjbDocument::read_from(&mut reader, false)?;

            platform.get_or_insert(document.platform);
            events.push(TimedEvent {
                name,
                user_data1,
                user_data2,
                root: document.root,
            });
        }

        debug!("read {} events", events.len());

        Ok(TimedEvents {
            platform: platform.unwrap_or_default(),
            events,
        })
    }

    /// Write the event list and return the stream
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, Endian::Big);

        writer.write_u32(self.events.len() as u32)?;
        for event in &self.events {
            writer.write_f32(event.user_data1)?;
            writer.write_string_null_terminated(&event.name)?;
            writer.write_u32(event.user_data2)?;
            write_document(
                &mut writer,
                self.platform,
                &HeaderInfo::default(),
                &event.root,
            )?;
        }

        Ok(writer.finish()?)
    }
}
