//! Conversion between binary documents and plain JSON files
//!
//! A document exports to indented JSON. Documents with header fields additionally get a `.meta`
//! file next to the JSON so that re-importing reproduces the same header:
//!
//! ```json
//! {
//!   "Type": "Identifier",
//!   "Identifier": 42
//! }
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    event::{TimedEvent, TimedEvents},
    read::AjbDocument,
    types::{HeaderInfo, HeaderVariant, Platform},
    value::BinaryValue,
};

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

impl AjbDocument {
    /// Export the root as JSON to `path`, and the header to a `.meta` file next to it if needed
    #[instrument(skip(self), err)]
    pub fn export(&self, path: &Path) -> Result<()> {
        write_json(path, &self.root)?;

        if self.header.variant != HeaderVariant::Default {
            let meta = path.with_extension("meta");
            debug!("writing header to {}", meta.display());
            write_json(&meta, &self.header)?;
        }

        Ok(())
    }

    /// Import a document from a JSON file and its optional `.meta` file
    ///
    /// The result is a big endian document for `platform`.
    #[instrument(err)]
    pub fn import(path: &Path, platform: Platform) -> Result<Self> {
        let root: BinaryValue = read_json(path)?;
        match root {
            BinaryValue::Null | BinaryValue::Array(_) | BinaryValue::Object(_) => {}
            other => return Err(Error::UnsupportedRootType(other.value_type())),
        }

        let meta = path.with_extension("meta");
        let header = if meta.is_file() {
            debug!("reading header from {}", meta.display());
            read_json::<HeaderInfo>(&meta)?
        } else {
            HeaderInfo::default()
        };

        Ok(AjbDocument {
            platform,
            header,
            root,
            ..Default::default()
        })
    }
}

impl TimedEvents {
    /// Export the events as a JSON array
    #[instrument(skip(self), err)]
    pub fn export(&self, path: &Path) -> Result<()> {
        write_json(path, &self.events)
    }

    /// Import events from a JSON array
    #[instrument(err)]
    pub fn import(path: &Path, platform: Platform) -> Result<Self> {
        let events: Vec<TimedEvent> = read_json(path)?;
        Ok(TimedEvents { platform, events })
    }
}
