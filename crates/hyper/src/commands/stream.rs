use clap::Args;
use hyper_archive::StreamArchive;
use hyper_io::Compressor;
use miette::{miette, Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{check_report, create, open};

#[derive(clap::Subcommand)]
pub enum StreamCommands {
    /// Extract a stream archive into a directory
    Extract(ExtractArgs),
    /// Pack a directory into a stream archive
    Pack(PackArgs),
    /// List the contents of a stream archive
    List(ListArgs),
}

impl StreamCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            StreamCommands::Extract(extract) => extract.handle(),
            StreamCommands::Pack(pack) => pack.handle(),
            StreamCommands::List(list) => list.handle(),
        }
    }
}

fn read_archive(path: &Path) -> Result<StreamArchive> {
    StreamArchive::read(open(path)?).context(format!("reading {}", path.display()))
}

#[derive(Args)]
pub struct ExtractArgs {
    /// An input stream archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = read_archive(&self.file)?;
        check_report(&archive.export(&self.directory)?)
    }
}

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target stream archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Compress every entry with LZSS
    #[arg(long, default_value_t = false)]
    compress: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let codec = StreamArchive::codec();
        let codec = self.compress.then_some(&codec as &dyn Compressor);
        let archive = StreamArchive::import(&self.directory, codec)
            .context(format!("importing {}", self.directory.display()))?;

        if archive.entries.is_empty() {
            return Err(miette!("directory is empty"));
        }

        archive
            .write(create(&self.file, self.overwrite)?)
            .context("finalizing stream archive")?;

        Ok(())
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// An input stream archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = read_archive(&self.file)?;

        for entry in &archive.entries {
            let size = if entry.is_compressed() {
                format!(
                    "{} bytes, {} stored",
                    entry.uncompressed_size, entry.compressed_size
                )
            } else {
                format!("{} bytes", entry.uncompressed_size)
            };
            println!("{} {}", entry.name, size.dimmed());
        }

        Ok(())
    }
}
