use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

pub mod ajb;
pub mod apf;
pub mod dat;
pub mod events;
pub mod stream;
pub mod texture_package;
pub mod u8_archive;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Convert AJB documents
    Ajb {
        #[command(subcommand)]
        command: ajb::AjbCommands,
    },
    /// Convert timed event files
    Events {
        #[command(subcommand)]
        command: events::EventCommands,
    },
    /// Handle U8 archives
    U8 {
        #[command(subcommand)]
        command: u8_archive::U8Commands,
    },
    /// Handle Tommunism DAT archives
    Dat {
        #[command(subcommand)]
        command: dat::DatCommands,
    },
    /// Handle Tommunism texture packages
    Tp {
        #[command(subcommand)]
        command: texture_package::TexturePackageCommands,
    },
    /// Handle Barracuda APF archives
    Apf {
        #[command(subcommand)]
        command: apf::ApfCommands,
    },
    /// Handle Crytek stream archives
    Strm {
        #[command(subcommand)]
        command: stream::StreamCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Ajb { command } => command.handle(),
            Commands::Events { command } => command.handle(),
            Commands::U8 { command } => command.handle(),
            Commands::Dat { command } => command.handle(),
            Commands::Tp { command } => command.handle(),
            Commands::Apf { command } => command.handle(),
            Commands::Strm { command } => command.handle(),
        }
    }
}

/// Input and output files shared by every conversion
#[derive(clap::Args)]
pub struct ConvertArgs {
    /// An input file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target file, next to the input by default
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ConvertArgs {
    /// The target path, defaulting to the input with `extension`
    pub fn output(&self, extension: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.file.with_extension(extension))
    }

    pub fn open(&self) -> Result<BufReader<File>> {
        open(&self.file)
    }

    pub fn ensure_target(&self, target: &Path) -> Result<()> {
        ensure_target(target, self.overwrite)
    }
}

pub fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

pub fn create(path: &Path, overwrite: bool) -> Result<File> {
    if !overwrite {
        File::create_new(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    } else {
        File::create(path)
            .into_diagnostic()
            .context(format!("creating {}", path.display()))
    }
}

/// Fail if `path` exists and may not be replaced
pub fn ensure_target(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(miette!("{} already exists", path.display()));
    }
    Ok(())
}

/// Turn a partial export into an error after every entry was attempted
pub fn check_report(report: &hyper_archive::ExportReport) -> Result<()> {
    if report.is_complete() {
        tracing::info!("extracted {} files", report.written.len());
        return Ok(());
    }

    Err(miette!(
        "{} of {} entries could not be extracted",
        report.failures.len(),
        report.failures.len() + report.written.len()
    ))
}
