//! Directory trees and their flattened node tables
//!
//! Archives such as U8 do not store child pointers. Nodes are laid out in pre-order and every
//! directory records the index one past its last descendant, so a directory at index `i` owns the
//! nodes `i + 1 .. data_size`. [`reconstruct`] rebuilds the hierarchy from such a table and
//! [`flatten`] produces one.
//!
//! ```text
//! 0  Directory ""       data_size = 4
//! 1  File      "a.bin"
//! 2  Directory "sub"    data_size = 4
//! 3  File      "b.bin"
//! ```
//!
//! A node with an empty name anywhere but at the root does not describe an entry. It is a filler
//! slot whose `data_size` tells how many slots to skip, itself included.

use hyper_io::{Compressor, NameTable};
use std::borrow::Cow;
use tracing::{trace, warn};

use crate::error::{narrow, Error, Result};

/// Name used for a root directory that has none in the archive
pub const ROOT_NAME: &str = ".";

/// Whether a node holds data or other nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File = 0,
    Directory = 1,
}

impl TryFrom<u8> for NodeKind {
    type Error = u8;

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(NodeKind::File),
            1 => Ok(NodeKind::Directory),
            other => Err(other),
        }
    }
}

/// A single record of a flattened tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode {
    pub kind: NodeKind,
    /// Offset of the name, relative to the start of the string table
    pub name_offset: u32,
    /// Absolute payload offset for files, index of the parent for directories
    pub data_offset: u32,
    /// Payload length for files, index past the last descendant for directories
    pub data_size: u32,
    /// Expanded payload length, only stored by archives with compressed entries
    pub uncompressed_size: Option<u32>,
}

/// A file inside an archive tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    /// Payload as stored in the archive
    pub data: Vec<u8>,
    /// Set when `data` is compressed and expands to this many bytes
    pub uncompressed_size: Option<u32>,
}

impl ArchiveFile {
    /// An uncompressed file
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        ArchiveFile {
            name: name.into(),
            data,
            uncompressed_size: None,
        }
    }

    /// Whether the payload has to be expanded before use
    pub fn is_compressed(&self) -> bool {
        self.uncompressed_size.is_some()
    }

    /// The payload, expanded with `codec` if it is stored compressed
    pub fn contents(&self, codec: &dyn Compressor) -> Result<Cow<'_, [u8]>> {
        match self.uncompressed_size {
            Some(size) => Ok(Cow::Owned(codec.decompress(&self.data, size as usize)?)),
            None => Ok(Cow::Borrowed(&self.data)),
        }
    }
}

/// A directory inside an archive tree, owning its children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveDirectory {
    pub name: String,
    pub children: Vec<ArchiveNode>,
}

/// Either kind of tree entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveNode {
    Directory(ArchiveDirectory),
    File(ArchiveFile),
}

impl ArchiveNode {
    pub fn name(&self) -> &str {
        match self {
            ArchiveNode::Directory(directory) => &directory.name,
            ArchiveNode::File(file) => &file.name,
        }
    }
}

impl From<ArchiveFile> for ArchiveNode {
    fn from(file: ArchiveFile) -> Self {
        ArchiveNode::File(file)
    }
}

impl From<ArchiveDirectory> for ArchiveNode {
    fn from(directory: ArchiveDirectory) -> Self {
        ArchiveNode::Directory(directory)
    }
}

impl ArchiveDirectory {
    /// An empty directory
    pub fn new(name: impl Into<String>) -> Self {
        ArchiveDirectory {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// An empty root directory
    pub fn root() -> Self {
        Self::new(ROOT_NAME)
    }

    /// Find or create the directory at the `/` separated `path` below this one
    pub fn ensure_directory(&mut self, path: &str) -> Result<&mut ArchiveDirectory> {
        let mut current = self;
        for component in components(path) {
            let index = match current
                .children
                .iter()
                .position(|child| child.name() == component)
            {
                Some(index) => index,
                None => {
                    current
                        .children
                        .push(ArchiveDirectory::new(component).into());
                    current.children.len() - 1
                }
            };

            current = match &mut current.children[index] {
                ArchiveNode::Directory(directory) => directory,
                ArchiveNode::File(_) => return Err(Error::PathConflict(path.to_owned())),
            };
        }

        Ok(current)
    }

    /// Add `file` under the `/` separated directory `parent`, replacing a file of the same name
    pub fn insert_file(&mut self, parent: &str, file: ArchiveFile) -> Result<()> {
        let directory = self.ensure_directory(parent)?;
        match directory
            .children
            .iter_mut()
            .find(|child| child.name() == file.name)
        {
            Some(ArchiveNode::File(existing)) => *existing = file,
            Some(ArchiveNode::Directory(_)) => {
                return Err(Error::PathConflict(join(parent, &file.name)))
            }
            None => directory.children.push(file.into()),
        }
        Ok(())
    }

    /// Every file below this directory with its `/` separated path, in pre-order
    pub fn files(&self) -> Vec<(String, &ArchiveFile)> {
        let mut files = Vec::new();
        self.collect("", &mut files, &mut Vec::new());
        files
    }

    /// Every directory below this one with its `/` separated path, in pre-order
    pub fn directories(&self) -> Vec<(String, &ArchiveDirectory)> {
        let mut directories = Vec::new();
        self.collect("", &mut Vec::new(), &mut directories);
        directories
    }

    fn collect<'a>(
        &'a self,
        prefix: &str,
        files: &mut Vec<(String, &'a ArchiveFile)>,
        directories: &mut Vec<(String, &'a ArchiveDirectory)>,
    ) {
        for child in &self.children {
            match child {
                ArchiveNode::File(file) => files.push((join(prefix, &file.name), file)),
                ArchiveNode::Directory(directory) => {
                    let path = join(prefix, &directory.name);
                    directories.push((path.clone(), directory));
                    directory.collect(&path, files, directories);
                }
            }
        }
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|component| !component.is_empty() && *component != ".")
}

/// Split a `/` separated path into its directory and file name
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Rebuild the tree described by `nodes`
///
/// `names[i]` is the resolved name of `nodes[i]`. `load` is called once per file node, with its
/// index, to fetch the payload.
pub fn reconstruct<F>(nodes: &[FlatNode], names: &[String], mut load: F) -> Result<ArchiveDirectory>
where
    F: FnMut(usize, &FlatNode) -> Result<Vec<u8>>,
{
    if names.len() != nodes.len() {
        return Err(Error::invalid_node(
            names.len().min(nodes.len()),
            format!("{} names for {} nodes", names.len(), nodes.len()),
        ));
    }

    let root = nodes
        .first()
        .ok_or_else(|| Error::invalid_node(0, "the node table is empty"))?;
    if root.kind != NodeKind::Directory {
        return Err(Error::invalid_node(0, "the root node is not a directory"));
    }

    let (next, mut directory) = read_directory(nodes, names, 0, &mut load)?;
    if next != nodes.len() {
        warn!("{} nodes are not part of the tree", nodes.len() - next);
    }

    if directory.name.is_empty() {
        directory.name = ROOT_NAME.to_owned();
    }

    Ok(directory)
}

/// Read the directory at `index` and its descendants, returning the index that follows them
fn read_directory<F>(
    nodes: &[FlatNode],
    names: &[String],
    index: usize,
    load: &mut F,
) -> Result<(usize, ArchiveDirectory)>
where
    F: FnMut(usize, &FlatNode) -> Result<Vec<u8>>,
{
    let end = nodes[index].data_size as usize;
    if end <= index || end > nodes.len() {
        return Err(Error::invalid_node(
            index,
            format!("directory ends at node {end} of {}", nodes.len()),
        ));
    }

    let mut directory = ArchiveDirectory::new(names[index].clone());
    let mut next = index + 1;
    while next < end {
        let (after, child) = read_node(nodes, names, next, load)?;
        if after > end {
            return Err(Error::invalid_node(
                next,
                format!("node spans past the end of its directory at {end}"),
            ));
        }

        directory.children.extend(child);
        next = after;
    }

    Ok((next, directory))
}

/// Read the non-root node at `index`, returning the index that follows it
fn read_node<F>(
    nodes: &[FlatNode],
    names: &[String],
    index: usize,
    load: &mut F,
) -> Result<(usize, Option<ArchiveNode>)>
where
    F: FnMut(usize, &FlatNode) -> Result<Vec<u8>>,
{
    let node = &nodes[index];
    let name = &names[index];

    if name.is_empty() {
        let span = node.data_size as usize;
        if span == 0 {
            return Err(Error::invalid_node(index, "unnamed node does not advance"));
        }

        trace!("skipping {} slots at unnamed node {}", span, index);
        return Ok((index + span, None));
    }

    match node.kind {
        NodeKind::File => {
            let data = load(index, node)?;
            let file = ArchiveFile {
                name: name.clone(),
                data,
                uncompressed_size: node.uncompressed_size,
            };
            Ok((index + 1, Some(file.into())))
        }
        NodeKind::Directory => {
            let (next, directory) = read_directory(nodes, names, index, load)?;
            Ok((next, Some(directory.into())))
        }
    }
}

/// A tree laid out as a node table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTree<'a> {
    pub nodes: Vec<FlatNode>,
    /// Names of all nodes, in node order
    pub names: NameTable,
    /// The file behind every file node, by node index
    pub files: Vec<(usize, &'a ArchiveFile)>,
}

/// Lay `root` out in pre-order
///
/// The root is written with an empty name if it is called [`ROOT_NAME`]. Any other entry needs a
/// name, as unnamed nodes are read back as filler. File nodes get a zero data offset, assigning
/// payload offsets is up to the archive writer.
pub fn flatten(root: &ArchiveDirectory) -> Result<FlatTree<'_>> {
    let mut tree = FlatTree {
        nodes: Vec::new(),
        names: NameTable::new(),
        files: Vec::new(),
    };

    let name = if root.name == ROOT_NAME {
        ""
    } else {
        root.name.as_str()
    };
    tree.push_directory(root, name, 0)?;

    Ok(tree)
}

impl<'a> FlatTree<'a> {
    fn push_name(&mut self, name: &str) -> Result<u32> {
        narrow("name offset", self.names.push(name))
    }

    fn push_directory(
        &mut self,
        directory: &'a ArchiveDirectory,
        name: &str,
        parent: usize,
    ) -> Result<()> {
        let index = self.nodes.len();
        let name_offset = self.push_name(name)?;
        self.nodes.push(FlatNode {
            kind: NodeKind::Directory,
            name_offset,
            data_offset: narrow("parent index", parent as u64)?,
            data_size: 0,
            uncompressed_size: None,
        });

        for child in &directory.children {
            if child.name().is_empty() {
                return Err(Error::invalid_node(self.nodes.len(), "entry has no name"));
            }

            match child {
                ArchiveNode::Directory(child) => self.push_directory(child, &child.name, index)?,
                ArchiveNode::File(file) => self.push_file(file)?,
            }
        }

        self.nodes[index].data_size = narrow("node count", self.nodes.len() as u64)?;
        Ok(())
    }

    fn push_file(&mut self, file: &'a ArchiveFile) -> Result<()> {
        let name_offset = self.push_name(&file.name)?;
        self.files.push((self.nodes.len(), file));
        self.nodes.push(FlatNode {
            kind: NodeKind::File,
            name_offset,
            data_offset: 0,
            data_size: narrow("file size", file.data.len() as u64)?,
            uncompressed_size: file.uncompressed_size,
        });
        Ok(())
    }
}
