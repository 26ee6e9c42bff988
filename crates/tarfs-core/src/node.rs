//! Tree node types for tarfs

use std::collections::HashMap;
use std::fmt;

use crate::archive::ContentRef;

/// Cosmetic permission tag attached to a file by `chmod`, stored exactly as
/// given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeTag(String);

impl ModeTag {
    pub fn new(mode: impl Into<String>) -> Self {
        Self(mode.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File node: archive-backed content plus an optional mode tag
#[derive(Clone, Debug)]
pub struct FileEntry {
    content: ContentRef,
    mode: Option<ModeTag>,
}

impl FileEntry {
    pub fn new(content: ContentRef) -> Self {
        Self {
            content,
            mode: None,
        }
    }

    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    pub fn mode(&self) -> Option<&ModeTag> {
        self.mode.as_ref()
    }

    pub fn set_mode(&mut self, mode: ModeTag) {
        self.mode = Some(mode);
    }
}

/// Directory node; owns its children outright
#[derive(Clone, Debug, Default)]
pub struct Directory {
    children: HashMap<String, Node>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    /// Insert or replace a child, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) -> Option<Node> {
        self.children.insert(name.into(), node)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Child directory `name`, created if missing. A file occupying the name
    /// is replaced by an empty directory.
    pub(crate) fn subdir_mut(&mut self, name: &str) -> &mut Directory {
        let node = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| Node::Directory(Directory::new()));
        if let Node::File(_) = node {
            *node = Node::Directory(Directory::new());
        }
        match node {
            Node::Directory(dir) => dir,
            Node::File(_) => unreachable!("file child was replaced by a directory"),
        }
    }
}

/// Filesystem node
///
/// Cloning a node deep-clones directory structure while file clones keep
/// sharing their [`ContentRef`].
#[derive(Clone, Debug)]
pub enum Node {
    Directory(Directory),
    File(FileEntry),
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{EntryKind, MemoryArchive};

    fn file_node(data: &str) -> Node {
        let entry = MemoryArchive::new().file("f", data).entries().remove(0);
        match entry.kind {
            EntryKind::File(content) => Node::File(FileEntry::new(content)),
            EntryKind::Directory => panic!("expected a file entry"),
        }
    }

    #[test]
    fn test_mode_tag_is_stored_verbatim() {
        assert_eq!(ModeTag::new("0644").to_string(), "0644");
        assert_eq!(ModeTag::new("u+x").as_str(), "u+x");
    }

    #[test]
    fn test_subdir_replaces_file() {
        let mut dir = Directory::new();
        dir.insert("x", file_node("data"));
        dir.subdir_mut("x").insert("inner", file_node("more"));

        let x = dir.get("x").unwrap();
        assert!(x.is_dir());
        assert_eq!(x.as_dir().unwrap().children().count(), 1);
    }

    #[test]
    fn test_clone_is_deep_for_directories() {
        let mut source = Directory::new();
        source.subdir_mut("sub").insert("f", file_node("data"));

        let mut copy = source.clone();
        if let Some(Node::Directory(sub)) = copy.get_mut("sub") {
            if let Some(Node::File(file)) = sub.get_mut("f") {
                file.set_mode(ModeTag::new("600"));
            }
            sub.insert("extra", Node::Directory(Directory::new()));
        }

        let original_sub = source.get("sub").unwrap().as_dir().unwrap();
        assert_eq!(original_sub.children().count(), 1);
        let original_file = original_sub.get("f").unwrap().as_file().unwrap();
        assert!(original_file.mode().is_none());

        let copied_file = copy.get("sub").unwrap().as_dir().unwrap().get("f").unwrap().as_file().unwrap();
        assert!(copied_file.content().same_content(original_file.content()));
    }
}
