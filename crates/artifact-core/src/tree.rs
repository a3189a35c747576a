//! Path tree builder.
//!
//! Turns a flat list of `(path, item)` pairs into a folder/file hierarchy for display. Paths are
//! split on `/`; every segment but the last becomes a folder, and folders with the same path are
//! merged. Empty segments (leading, trailing or doubled slashes) are ignored.
//!
//! Folders are keyed by name (and therefore iterate alphabetically); files keep insertion order.
//! Any other presentation order is up to the caller.

use std::collections::BTreeMap;

/// A leaf in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode<R> {
    /// Last path segment.
    pub name: String,
    /// Full (normalized) path.
    pub path: String,
    /// Caller-provided reference.
    pub item: R,
}

/// A folder node. The tree root is a folder with an empty name and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode<R> {
    name: String,
    path: String,
    folders: BTreeMap<String, FolderNode<R>>,
    files: Vec<FileNode<R>>,
}

/// A built tree (its root folder).
pub type PathTree<R> = FolderNode<R>;

impl<R> FolderNode<R> {
    fn new(name: String, path: String) -> Self {
        Self {
            name,
            path,
            folders: BTreeMap::new(),
            files: Vec::new(),
        }
    }

    /// Create an empty root.
    pub fn root() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Folder name (empty for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full folder path (empty for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child folders, by name.
    pub fn folders(&self) -> impl Iterator<Item = &FolderNode<R>> {
        self.folders.values()
    }

    /// Child files, in insertion order.
    pub fn files(&self) -> &[FileNode<R>] {
        &self.files
    }

    /// Whether this folder has no children at all.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Number of files in this folder and all descendants.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.values().map(FolderNode::file_count).sum::<usize>()
    }

    /// Look up a descendant folder by path (`"a/b"`). An empty path returns `self`.
    pub fn folder(&self, path: &str) -> Option<&FolderNode<R>> {
        let mut node = self;
        for segment in segments(path) {
            node = node.folders.get(segment)?;
        }
        Some(node)
    }

    /// Sort files in this folder and every descendant with `compare`.
    pub fn sort_files_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&FileNode<R>, &FileNode<R>) -> std::cmp::Ordering,
    {
        self.sort_files_inner(&mut compare);
    }

    fn sort_files_inner<F>(&mut self, compare: &mut F)
    where
        F: FnMut(&FileNode<R>, &FileNode<R>) -> std::cmp::Ordering,
    {
        self.files.sort_by(|a, b| compare(a, b));
        for folder in self.folders.values_mut() {
            folder.sort_files_inner(compare);
        }
    }

    /// Insert one `(path, item)` pair, creating intermediate folders as needed.
    pub fn insert(&mut self, path: &str, item: R) {
        let parts: Vec<&str> = segments(path).collect();
        let Some((file_name, folder_parts)) = parts.split_last() else {
            // Nothing but separators (or empty): keep it visible at the root.
            self.files.push(FileNode {
                name: path.to_string(),
                path: path.to_string(),
                item,
            });
            return;
        };

        let mut node = self;
        for segment in folder_parts {
            let child_path = join(&node.path, segment);
            node = node
                .folders
                .entry((*segment).to_string())
                .or_insert_with(|| FolderNode::new((*segment).to_string(), child_path));
        }

        let file_path = join(&node.path, file_name);
        node.files.push(FileNode {
            name: (*file_name).to_string(),
            path: file_path,
            item,
        });
    }
}

impl<R> Default for FolderNode<R> {
    fn default() -> Self {
        Self::root()
    }
}

/// Build a tree from `(path, item)` pairs.
pub fn build_tree<P, R, I>(items: I) -> PathTree<R>
where
    P: AsRef<str>,
    I: IntoIterator<Item = (P, R)>,
{
    let mut root = FolderNode::root();
    for (path, item) in items {
        root.insert(path.as_ref(), item);
    }
    root
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}
