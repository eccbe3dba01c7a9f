use clap::Args;
use hyper_ajb::{AjbDocument, Platform};
use miette::{Context, Result};
use tracing::info;

use super::{create, ConvertArgs};

#[derive(clap::Subcommand)]
pub enum AjbCommands {
    /// Convert an AJB document to JSON
    Decode(DecodeArgs),
    /// Convert a JSON file to an AJB document
    Encode(EncodeArgs),
}

impl AjbCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            AjbCommands::Decode(decode) => decode.handle(),
            AjbCommands::Encode(encode) => encode.handle(),
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
        let document = AjbDocument::read(self.paths.open()?)
            .context(format!("decoding {}", self.paths.file.display()))?;

        let output = self.paths.output("json");
        self.paths.ensure_target(&output)?;
        info!("writing {}", output.display());

        Ok(document.export(&output)?)
    }
}

#[derive(Args)]
pub struct EncodeArgs {
    #[command(flatten)]
    paths: ConvertArgs,

    /// Write a PC document instead of a console one
    #[arg(long, default_value_t = false)]
    pc: bool,
}

impl EncodeArgs {
    pub fn handle(&self) -> Result<()> {
        let platform = if self.pc { Platform::Pc } else { Platform::Console };
        let document = AjbDocument::import(&self.paths.file, platform)
            .context(format!("importing {}", self.paths.file.display()))?;

        let output = self.paths.output("ajb");
        info!("writing {}", output.display());
        document.write(create(&output, self.paths.overwrite)?)?;

        Ok(())
    }
}
