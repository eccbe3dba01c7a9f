use clap::Args;
use hyper_archive::DatArchive;
use miette::{miette, Context, Result};
use std::path::PathBuf;
use tracing::info;

use super::{check_report, create, open};

#[derive(clap::Subcommand)]
pub enum DatCommands {
    /// Extract a DAT archive into a directory
    Extract(ExtractArgs),
    /// Pack a directory into a DAT archive
    Pack(PackArgs),
}

impl DatCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            DatCommands::Extract(extract) => extract.handle(),
            DatCommands::Pack(pack) => pack.handle(),
        }
    }
}

#[derive(Args)]
pub struct ExtractArgs {
    /// An input DAT archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = DatArchive::read(open(&self.file)?)
            .context(format!("reading {}", self.file.display()))?;
        check_report(&archive.export(&self.directory)?)
    }
}

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target DAT archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let archive = DatArchive::import(&self.directory)
            .context(format!("importing {}", self.directory.display()))?;

        if archive.root.children.is_empty() {
            return Err(miette!("directory is empty"));
        }

        archive
            .write(create(&self.file, self.overwrite)?)
            .context("finalizing dat archive")?;

        Ok(())
    }
}
