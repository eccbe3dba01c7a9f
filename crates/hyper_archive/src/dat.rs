//! Tommunism engine DAT archives
//!
//! # Archive Format Documentation
//!
//! DAT archives are little endian and keep full paths instead of a tree.
//!
//! | Field                  | Size            | Description                                   |
//! |------------------------|-----------------|-----------------------------------------------|
//! | Directory Count        | 4 bytes         | Number of directory names                     |
//! | Directory Info         | 8 bytes each    | `(index, file count)`, see below              |
//! | File Count             | 4 bytes         | Number of files                               |
//! | File Info              | 12 bytes each   | `(data start, data size, parent index)`       |
//! | Directory Names Length | 4 bytes         | Size of the directory name block              |
//! | File Names Length      | 4 bytes         | Size of the file name block                   |
//! | Directory Names        | variable        | Null-terminated relative paths                |
//! | File Names             | variable        | Null-terminated relative paths                |
//! | Payloads               | variable        | Raw file data at the recorded offsets         |
//!
//! The game does not appear to use the directory info. The stock packing tool writes an
//! empty entry for the root followed by one entry for every directory but the last, with the
//! file count off by one. Both quirks are reproduced here.
//!

use binrw::{BinRead, BinWrite, Endian};
use hyper_io::{BinaryReader, BinaryWriter, StringTable};
use std::io::{Read, Seek, Write};
use tracing::{debug, instrument, trace};

use crate::{
    error::{narrow, Error, Result},
    tree::{split_parent, ArchiveDirectory, ArchiveFile, ArchiveNode},
};

/// Upper bound for allocations sized by counts read from a file
const MAX_PREALLOCATION: usize = 4096;

const DIRECTORY_NAMES_FIELD: &str = "dirStringTableLength";
const FILE_NAMES_FIELD: &str = "fileStringTableLength";

/// Directory record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct DirectoryInfo {
    pub index: i32,
    pub file_count: i32,
}

/// File record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileInfo {
    /// Absolute offset of the payload
    pub data_start: i32,
    pub data_size: i32,
    /// Index of the containing directory, `0` for the root
    pub parent_index: i32,
}

/// A DAT archive
///
/// Reading normalises the tree so that every directory lists its subdirectories before its
/// files, which is also the order files are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatArchive {
    pub root: ArchiveDirectory,
}

impl Default for DatArchive {
    fn default() -> Self {
        DatArchive {
            root: ArchiveDirectory::root(),
        }
    }
}

impl DatArchive {
    pub fn new(root: ArchiveDirectory) -> Self {
        DatArchive { root }
    }

    /// Read an archive with all payloads
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut reader = BinaryReader::new(reader, Endian::Little);

        let directory_count = read_count(&mut reader, "directory count")?;
        let mut directories = Vec::with_capacity(directory_count.min(MAX_PREALLOCATION));
        for _ in 0..directory_count {
            directories.push(reader.read_value::<DirectoryInfo>()?);
        }

        let file_count = read_count(&mut reader, "file count")?;
        let mut files = Vec::with_capacity(file_count.min(MAX_PREALLOCATION));
        for _ in 0..file_count {
            files.push(reader.read_value::<FileInfo>()?);
        }

        let directory_names_len = read_count(&mut reader, "directory name length")? as u64;
        let file_names_len = read_count(&mut reader, "file name length")? as u64;

        let offset = reader.position()?;
        let directory_names = StringTable::new(offset, directory_names_len);
        let all_names = StringTable::new(offset, directory_names_len + file_names_len);

        let mut root = ArchiveDirectory::root();
        for info in &directories {
            let name = directory_names.read_next(&mut reader)?;
            trace!("directory {}: {:?}", name, info);
            root.ensure_directory(&name)?;
        }

        let mut names = Vec::with_capacity(files.len());
        for _ in &files {
            names.push(all_names.read_next(&mut reader)?);
        }

        for (index, (name, info)) in names.into_iter().zip(&files).enumerate() {
            let size = usize::try_from(info.data_size)
                .map_err(|_| Error::invalid_node(index, format!("{name} has a negative size")))?;
            let data = reader.read_bytes_at(info.data_start as u64, size)?;

            let (parent, file_name) = split_parent(&name);
            root.insert_file(parent, ArchiveFile::new(file_name, data))?;
        }

        debug!("read {} directories, {} files", directory_count, file_count);

        Ok(DatArchive { root })
    }

    /// Write the archive and return the stream
    #[instrument(skip_all, err)]
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut writer = BinaryWriter::new(writer, Endian::Little);
        let layout = Layout::of(&self.root)?;

        writer.write_i32(narrow("directory count", layout.directories.len() as u64)?)?;
        if let Some((_, leading)) = layout.directories.split_last() {
            writer.write_value(&DirectoryInfo::default())?;
            for directory in leading {
                writer.write_value(&DirectoryInfo {
                    index: directory.index,
                    file_count: (directory.file_count - 1).max(0),
                })?;
            }
        }

        writer.write_i32(narrow("file count", layout.files.len() as u64)?)?;
        for (index, file) in layout.files.iter().enumerate() {
            writer.reserve_for::<i32>(data_field(index))?;
            writer.write_i32(narrow("file size", file.file.data.len() as u64)?)?;
            writer.write_i32(file.parent_index)?;
        }

        writer.reserve_for::<i32>(DIRECTORY_NAMES_FIELD)?;
        writer.reserve_for::<i32>(FILE_NAMES_FIELD)?;

        let mut directory_names_len = 0;
        for directory in &layout.directories {
            directory_names_len += writer.write_name(&directory.path)?;
        }

        let mut file_names_len = 0;
        for file in &layout.files {
            file_names_len += writer.write_name(&file.path)?;
        }

        writer.patch(
            DIRECTORY_NAMES_FIELD,
            narrow::<i32>("directory name length", directory_names_len as u64)?,
        )?;
        writer.patch(
            FILE_NAMES_FIELD,
            narrow::<i32>("file name length", file_names_len as u64)?,
        )?;

        for (index, file) in layout.files.iter().enumerate() {
            let offset = writer.position()?;
            writer.patch(&data_field(index), narrow::<i32>("data start", offset)?)?;
            writer.write_bytes(&file.file.data)?;
        }

        Ok(writer.finish()?)
    }
}

fn data_field(index: usize) -> String {
    format!("file{index}.dataStart")
}

fn read_count<R: Read + Seek>(reader: &mut BinaryReader<R>, field: &str) -> Result<usize> {
    let value = reader.read_i32()?;
    usize::try_from(value)
        .map_err(|_| Error::invalid_node(0, format!("{field} is negative ({value})")))
}

struct DirectoryEntry {
    path: String,
    index: i32,
    file_count: i32,
}

struct FileEntry<'a> {
    path: String,
    parent_index: i32,
    file: &'a ArchiveFile,
}

/// Directories numbered from 1 in pre-order, and files grouped by directory
struct Layout<'a> {
    directories: Vec<DirectoryEntry>,
    files: Vec<FileEntry<'a>>,
}

impl<'a> Layout<'a> {
    fn of(root: &'a ArchiveDirectory) -> Result<Self> {
        let mut layout = Layout {
            directories: Vec::new(),
            files: Vec::new(),
        };

        layout.push_files("", root, 0)?;
        for (index, (path, directory)) in root.directories().into_iter().enumerate() {
            let index = narrow::<i32>("directory index", index as u64 + 1)?;
            let file_count = layout.push_files(&path, directory, index)?;
            layout.directories.push(DirectoryEntry {
                path,
                index,
                file_count,
            });
        }

        Ok(layout)
    }

    fn push_files(
        &mut self,
        prefix: &str,
        directory: &'a ArchiveDirectory,
        parent_index: i32,
    ) -> Result<i32> {
        let mut count = 0;
        for child in &directory.children {
            if let ArchiveNode::File(file) = child {
                let path = if prefix.is_empty() {
                    file.name.clone()
                } else {
                    format!("{prefix}/{}", file.name)
                };

                self.files.push(FileEntry {
                    path,
                    parent_index,
                    file,
                });
                count += 1;
            }
        }

        narrow("file count", count)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::dat::DatArchive;
    use crate::error::{Error, Result};
    use crate::tree::{ArchiveDirectory, ArchiveFile};

    // As written by the stock packing tool, which leaves every parent index at zero
    #[rustfmt::skip]
    const NESTED: [u8; 60] = [
        0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x00, 0x00,
        0x38, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x3A, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x00, 0x00,
        0x06, 0x00, 0x00, 0x00,
        b'd', 0x00,
        b'b', 0x00,
        b'd', b'/', b'a', 0x00,
        0x03, 0x04,
        0x01, 0x02,
    ];

    fn nested_tree() -> Result<ArchiveDirectory> {
        let mut root = ArchiveDirectory::root();
        root.insert_file("d", ArchiveFile::new("a", vec![0x01, 0x02]))?;
        root.insert_file("", ArchiveFile::new("b", vec![0x03, 0x04]))?;
        Ok(root)
    }

    #[test]
    fn write_places_payloads_after_names() -> Result<()> {
        let bytes = DatArchive::new(nested_tree()?)
            .write(Cursor::new(Vec::new()))?
            .into_inner();

        let mut expected = NESTED.to_vec();
        expected[36] = 0x01;
        assert_eq!(bytes, expected);

        Ok(())
    }

    #[test]
    fn read_packed_archive() -> Result<()> {
        let archive = DatArchive::read(Cursor::new(NESTED))?;
        assert_eq!(archive.root, nested_tree()?);
        Ok(())
    }

    #[test]
    fn names_must_stay_inside_their_table() {
        let mut bytes = NESTED.to_vec();
        bytes[40] = 0x01;

        assert!(matches!(
            DatArchive::read(Cursor::new(bytes)),
            Err(Error::CursorError(
                hyper_io::error::Error::NameOutOfBounds { .. }
            ))
        ));
    }

    #[test]
    fn empty_archive() -> Result<()> {
        let bytes = DatArchive::default()
            .write(Cursor::new(Vec::new()))?
            .into_inner();

        assert_eq!(bytes, vec![0x00; 16]);
        assert_eq!(DatArchive::read(Cursor::new(bytes))?, DatArchive::default());

        Ok(())
    }
}
