//! Moving archive contents to and from plain directories
//!
//! Importing and reading are all-or-nothing. Exporting is not: a file that cannot be written is
//! logged and recorded in the returned [`ExportReport`], and the remaining files are still
//! written.

use hyper_io::{Compressor, Zlib};
use std::ffi::OsStr;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, error, info, instrument};
use walkdir::WalkDir;

use crate::{
    apf::{ApfArchive, ApfEntry, ApfImportOptions},
    dat::DatArchive,
    error::{Error, Result},
    stream::{StreamArchive, StreamEntry},
    texture_package::{Texture, TextureAttributes, TexturePackage},
    tree::{split_parent, ArchiveDirectory, ArchiveFile},
    u8_archive::{FormatContext, U8Archive},
};

/// Outcome of an export
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Every file that was written
    pub written: Vec<PathBuf>,
    /// Entries that could not be written, by archive name
    pub failures: Vec<(String, Error)>,
}

impl ExportReport {
    /// Whether every entry was exported
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, name: &str, result: Result<PathBuf>) {
        match result {
            Ok(path) => self.written.push(path),
            Err(e) => {
                error!("exporting {} failed: {}", name, e);
                self.failures.push((name.to_owned(), e));
            }
        }
    }

    /// Write one entry below `root`, recording instead of returning a failure
    fn export_file<F, D>(&mut self, root: &Path, name: &str, contents: F)
    where
        F: FnOnce() -> Result<D>,
        D: AsRef<[u8]>,
    {
        info!("exporting {}", name);

        let result = safe_join(root, name).and_then(|path| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents()?)?;
            Ok(path)
        });

        self.record(name, result);
    }

    fn export_directory(&mut self, root: &Path, name: &str) {
        let result = safe_join(root, name).and_then(|path| {
            fs::create_dir_all(&path)?;
            Ok(path)
        });

        if let Err(e) = result {
            self.record(name, Err(e));
        }
    }
}

/// Resolve the `/` or `\` separated archive path `name` below `root`
///
/// Names that are absolute or climb out of `root` are rejected.
pub fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    if name.starts_with(['/', '\\']) {
        return Err(Error::UnsafePath(name.to_owned()));
    }

    let mut path = root.to_path_buf();
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." => continue,
            ".." => return Err(Error::UnsafePath(name.to_owned())),
            _ => {}
        }

        let normal = Path::new(component)
            .components()
            .all(|part| matches!(part, Component::Normal(_)));
        if !normal {
            return Err(Error::UnsafePath(name.to_owned()));
        }

        path.push(component);
    }

    Ok(path)
}

/// `/` separated path of `path` relative to `root`
fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::UnsafePath(path.display().to_string()))?;

    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Directories and files below `root`, sorted by name, as relative `/` separated paths
fn walk(root: &Path) -> Result<(Vec<String>, Vec<(String, PathBuf)>)> {
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = relative_name(root, entry.path())?;

        if entry.file_type().is_dir() {
            directories.push(name);
        } else if entry.file_type().is_file() {
            files.push((name, entry.into_path()));
        }
    }

    Ok((directories, files))
}

/// Build a tree from everything below `root`
#[instrument(err)]
pub fn import_tree(root: &Path) -> Result<ArchiveDirectory> {
    let (directories, files) = walk(root)?;
    let mut tree = ArchiveDirectory::root();

    for name in directories {
        debug!("importing directory {}", name);
        tree.ensure_directory(&name)?;
    }

    for (name, path) in files {
        info!("importing {}", name);
        let (parent, file_name) = split_parent(&name);
        tree.insert_file(parent, ArchiveFile::new(file_name, fs::read(&path)?))?;
    }

    Ok(tree)
}

/// Write every directory and file of `tree` below `destination`
///
/// Compressed payloads are expanded with `codec`.
#[instrument(skip(tree, codec), err)]
pub fn export_tree(
    tree: &ArchiveDirectory,
    destination: &Path,
    codec: &dyn Compressor,
) -> Result<ExportReport> {
    fs::create_dir_all(destination)?;
    let mut report = ExportReport::default();

    for (name, _) in tree.directories() {
        report.export_directory(destination, &name);
    }

    for (name, file) in tree.files() {
        report.export_file(destination, &name, || file.contents(codec));
    }

    Ok(report)
}

impl U8Archive {
    /// Build a big endian archive from the contents of `path`
    pub fn import(path: &Path, context: FormatContext) -> Result<Self> {
        Ok(U8Archive::new(import_tree(path)?, context))
    }

    /// Extract the archive to `path`
    pub fn export(&self, path: &Path) -> Result<ExportReport> {
        export_tree(&self.root, path, &Zlib::default())
    }
}

impl DatArchive {
    /// Build an archive from the contents of `path`
    pub fn import(path: &Path) -> Result<Self> {
        Ok(DatArchive::new(import_tree(path)?))
    }

    /// Extract the archive to `path`
    pub fn export(&self, path: &Path) -> Result<ExportReport> {
        export_tree(&self.root, path, &Zlib::default())
    }
}

/// Split `name.3.bin` into `name` and the asset type `3`
///
/// The type is the second to last extension, and `0` if there is none or it is not a number.
fn split_type(file_name: &str) -> (&str, u32) {
    let mut parts = file_name.split('.');
    let stem = parts.next().unwrap_or_default();
    let extensions = parts.collect::<Vec<_>>();

    let file_type = match extensions.len() {
        0 | 1 => 0,
        n => extensions[n - 2].parse().unwrap_or(0),
    };

    (stem, file_type)
}

impl ApfArchive {
    /// Build an archive from the contents of `path`
    ///
    /// Entry names are relative paths without extensions. With [`ApfImportOptions::compress`]
    /// set, payloads are compressed with `codec`.
    #[instrument(skip(codec), err)]
    pub fn import(path: &Path, options: ApfImportOptions, codec: &dyn Compressor) -> Result<Self> {
        let (_, files) = walk(path)?;
        let codec = options.compress.then_some(codec);

        let mut entries = Vec::with_capacity(files.len());
        for (name, file) in files {
            info!("importing {}", name);

            let (parent, file_name) = split_parent(&name);
            let (stem, file_type) = split_type(file_name);
            let name = if parent.is_empty() {
                stem.to_owned()
            } else {
                format!("{parent}/{stem}")
            };

            entries.push(ApfEntry::new(name, file_type, fs::read(&file)?, codec)?);
        }

        Ok(ApfArchive {
            platform: options.platform,
            entries,
        })
    }

    /// Extract every entry to `path` as `{name}.{type}.bin`
    ///
    /// Compressed entries are expanded with `codec`.
    #[instrument(skip(self, codec), err)]
    pub fn export(&self, path: &Path, codec: &dyn Compressor) -> Result<ExportReport> {
        fs::create_dir_all(path)?;
        let mut report = ExportReport::default();

        for entry in &self.entries {
            report.export_file(path, &entry.file_name(), || entry.contents(codec));
        }

        Ok(report)
    }
}

impl StreamArchive {
    /// Build an archive from every file below `path`, compressing payloads with `codec` if given
    #[instrument(skip(codec), err)]
    pub fn import(path: &Path, codec: Option<&dyn Compressor>) -> Result<Self> {
        let (_, files) = walk(path)?;

        let mut entries = Vec::with_capacity(files.len());
        for (name, file) in files {
            info!("importing {}", name);
            entries.push(StreamEntry::new(name, fs::read(&file)?, codec)?);
        }

        Ok(StreamArchive { entries })
    }

    /// Extract every entry to `path`, expanding compressed payloads
    #[instrument(skip(self), err)]
    pub fn export(&self, path: &Path) -> Result<ExportReport> {
        fs::create_dir_all(path)?;
        let codec = StreamArchive::codec();
        let mut report = ExportReport::default();

        for entry in &self.entries {
            report.export_file(path, &entry.name, || entry.contents(&codec));
        }

        Ok(report)
    }
}

/// Index of `path` if its stem is a number, for ordering extracted textures
fn texture_index(path: &Path) -> u64 {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(|stem| stem.parse().ok())
        .unwrap_or(u64::MAX)
}

impl TexturePackage {
    /// Build a package from the `.png` files directly inside `path`
    ///
    /// Images are ordered by their numeric name, then by name. Attributes come from a `.json`
    /// file with the same stem, and are all zero if there is none.
    #[instrument(err)]
    pub fn import(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry?;
            let is_png = entry
                .path()
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("png"));

            if entry.file_type().is_file() && is_png {
                images.push(entry.into_path());
            }
        }
        images.sort_by(|a, b| (texture_index(a), a).cmp(&(texture_index(b), b)));

        let mut textures = Vec::with_capacity(images.len());
        for image in images {
            info!("importing {}", image.display());

            let sidecar = image.with_extension("json");
            let attributes = if sidecar.is_file() {
                serde_json::from_slice::<TextureAttributes>(&fs::read(&sidecar)?)?.attributes
            } else {
                debug!("no attributes for {}", image.display());
                Default::default()
            };

            textures.push(Texture::new(fs::read(&image)?, attributes));
        }

        Ok(TexturePackage { textures })
    }

    /// Extract texture `i` to `{i}.png` with its attributes in `{i}.json`
    #[instrument(skip(self), err)]
    pub fn export(&self, path: &Path) -> Result<ExportReport> {
        fs::create_dir_all(path)?;
        let mut report = ExportReport::default();

        for (index, texture) in self.textures.iter().enumerate() {
            report.export_file(path, &format!("{index}.png"), || {
                Ok(texture.data.as_slice())
            });
            report.export_file(path, &format!("{index}.json"), || -> Result<Vec<u8>> {
                Ok(serde_json::to_vec_pretty(&TextureAttributes::from(texture))?)
            });
        }

        Ok(report)
    }
}
