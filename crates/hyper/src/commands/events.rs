use clap::Args;
use hyper_ajb::{Platform, TimedEvents};
use miette::{Context, Result};
use tracing::info;

use super::{create, ConvertArgs};

#[derive(clap::Subcommand)]
pub enum EventCommands {
    /// Convert a timed event file to JSON
    Decode(DecodeArgs),
    /// Convert a JSON array to a timed event file
    Encode(EncodeArgs),
}

impl EventCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            EventCommands::Decode(decode) => decode.handle(),
            EventCommands::Encode(encode) => encode.handle(),
        }
    }
}

#[derive(Args)]
pub struct DecodeArgs {
    #[command(flatten)]
    paths: ConvertArgs,
}

impl DecodeArgs {
    pub fn handle(&self) -> Result<()> {
        let events = TimedEvents::read(self.paths.open()?)
            .context(format!("decoding {}", self.paths.file.display()))?;

        let output = self.paths.output("json");
        self.paths.ensure_target(&output)?;
        info!("writing {}", output.display());

        Ok(events.export(&output)?)
    }
}

#[derive(Args)]
pub struct EncodeArgs {
    #[command(flatten)]
    paths: ConvertArgs,

    /// Write a PC event file instead of a console one
    #[arg(long, default_value_t = false)]
    pc: bool,
}

impl EncodeArgs {
    pub fn handle(&self) -> Result<()> {
        let platform = if self.pc { Platform::Pc } else { Platform::Console };
        let events = TimedEvents::import(&self.paths.file, platform)
            .context(format!("importing {}", self.paths.file.display()))?;

        let output = self.paths.output("bin");
        info!("writing {}", output.display());
        events.write(create(&output, self.paths.overwrite)?)?;

        Ok(())
    }
}
