use clap::Args;
use hyper_archive::{apf::Platform, ApfArchive, ApfImportOptions};
use hyper_io::Compressor;
use miette::{miette, Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{check_report, create, open};

#[derive(clap::Subcommand)]
pub enum ApfCommands {
    /// Extract an APF archive into a directory
    Extract(ExtractArgs),
    /// Pack a directory into an APF archive
    Pack(PackArgs),
}

impl ApfCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            ApfCommands::Extract(extract) => extract.handle(),
            ApfCommands::Pack(pack) => pack.handle(),
        }
    }
}

#[derive(Args)]
pub struct ExtractArgs {
    /// An input APF archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = ApfArchive::read(open(&self.file)?)
            .context(format!("reading {}", self.file.display()))?;

        let codec = archive.platform.default_codec();
        if archive.entries.iter().any(|entry| entry.is_compressed) {
            warn!("expanding entries with {}", codec.name());
        }

        check_report(&archive.export(&self.directory, codec.as_ref())?)
    }
}

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target APF archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Write a PC archive instead of a console one
    #[arg(long, default_value_t = false)]
    pc: bool,

    /// Compress every entry with the platform codec
    #[arg(long, default_value_t = false)]
    compress: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let options = ApfImportOptions::builder()
            .platform(if self.pc { Platform::Pc } else { Platform::Console })
            .compress(self.compress)
            .build();
        let codec = options.platform.default_codec();

        let archive = ApfArchive::import(&self.directory, options, codec.as_ref())
            .context(format!("importing {}", self.directory.display()))?;

        if archive.entries.is_empty() {
            return Err(miette!("directory is empty"));
        }

        archive
            .write(create(&self.file, self.overwrite)?)
            .context("finalizing apf archive")?;

        Ok(())
    }
}
