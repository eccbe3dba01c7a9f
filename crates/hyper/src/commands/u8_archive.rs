use clap::Args;
use hyper_archive::{ArchiveDirectory, ArchiveNode, FormatContext, U8Archive, U8WriterOptions};
use itertools::Itertools;
use miette::{miette, Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{check_report, create, open};

#[derive(clap::Subcommand)]
pub enum U8Commands {
    /// Extract a U8 archive into a directory
    Extract(ExtractArgs),
    /// Pack a directory into a U8 archive
    Pack(PackArgs),
    /// List the contents of a U8 archive
    List(ListArgs),
}

impl U8Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            U8Commands::Extract(extract) => extract.handle(),
            U8Commands::Pack(pack) => pack.handle(),
            U8Commands::List(list) => list.handle(),
        }
    }
}

fn read_archive(path: &Path) -> Result<U8Archive> {
    U8Archive::read(open(path)?).context(format!("reading {}", path.display()))
}

#[derive(Args)]
pub struct ExtractArgs {
    /// An input U8 archive
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

    /// A target U8 archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Write the Sonic '06 variant with compressed payloads
    #[arg(long, default_value_t = false)]
    sonic_next: bool,

    /// Store Sonic '06 payloads raw instead of as zlib streams
    #[arg(long, default_value_t = false, requires = "sonic_next")]
    uncompressed: bool,

    /// zlib level for compressed Sonic '06 payloads
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let context = FormatContext {
            sonic_next: self.sonic_next,
            compressed: !self.uncompressed,
        };
        let archive = U8Archive::import(&self.directory, context)
            .context(format!("importing {}", self.directory.display()))?;

        if archive.root.children.is_empty() {
            return Err(miette!("directory is empty"));
        }

        let options = U8WriterOptions::builder()
            .compression_level(self.level)
            .build();

        archive
            .write(create(&self.file, self.overwrite)?, options)
            .context("finalizing u8 archive")?;

        Ok(())
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// An input U8 archive
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Print full paths instead of a tree
    #[arg(long, default_value_t = false)]
    flat: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = read_archive(&self.file)?;

        if self.flat {
            for path in archive.list() {
                println!("{}", path);
            }
        } else {
            print_directory(&archive.root, &mut Vec::new());
        }

        Ok(())
    }
}

fn print_directory<'a>(directory: &'a ArchiveDirectory, parents: &mut Vec<&'a str>) {
    for child in &directory.children {
        let indent = "  ".repeat(parents.len());
        match child {
            ArchiveNode::Directory(sub) => {
                parents.push(&sub.name);
                println!("{}{}/", indent, parents.iter().join("/").blue());
                print_directory(sub, parents);
                parents.pop();
            }
            ArchiveNode::File(file) => {
                let size = match file.uncompressed_size {
                    Some(size) => format!("{} bytes, {} stored", size, file.data.len()),
                    None => format!("{} bytes", file.data.len()),
                };
                println!("{}{} {}", indent, file.name, size.dimmed());
            }
        }
    }
}
