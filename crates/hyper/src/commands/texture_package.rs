use clap::Args;
use hyper_archive::TexturePackage;
use miette::{miette, Context, Result};
use std::path::PathBuf;
use tracing::info;

use super::{check_report, create, open};

#[derive(clap::Subcommand)]
pub enum TexturePackageCommands {
    /// Extract a texture package into images and attribute files
    Extract(ExtractArgs),
    /// Pack the images of a directory into a texture package
    Pack(PackArgs),
}

impl TexturePackageCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            TexturePackageCommands::Extract(extract) => extract.handle(),
            TexturePackageCommands::Pack(pack) => pack.handle(),
        }
    }
}

#[derive(Args)]
pub struct ExtractArgs {
    /// An input texture package
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let package = TexturePackage::read(open(&self.file)?)
            .context(format!("reading {}", self.file.display()))?;
        check_report(&package.export(&self.directory)?)
    }
}

#[derive(Args)]
pub struct PackArgs {
    /// A directory of `.png` files with optional `.json` attributes
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target texture package
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let package = TexturePackage::import(&self.directory)
            .context(format!("importing {}", self.directory.display()))?;

        if package.textures.is_empty() {
            return Err(miette!("directory has no images"));
        }

        package
            .write(create(&self.file, self.overwrite)?)
            .context("finalizing texture package")?;

        Ok(())
    }
}
