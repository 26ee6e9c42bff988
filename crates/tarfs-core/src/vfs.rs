//! Virtual filesystem implementation for tarfs core

use std::path::Path;

use tracing::{debug, warn};

use crate::archive::{ArchiveEntry, EntryKind, TarArchive};
use crate::config::{VfsConfig, DEFAULT_HOME};
use crate::error::{FsError, FsResult};
use crate::node::{Directory, FileEntry, ModeTag, Node};
use crate::path;

/// Result of listing a directory
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// Child directory names, each with a trailing `/`
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

impl Listing {
    /// Directories first, then files.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directories
            .iter()
            .chain(self.files.iter())
            .map(String::as_str)
    }
}

/// In-memory tree built from archive members, plus the current directory
pub struct VirtualFileSystem {
    config: VfsConfig,
    root: Node,
    cwd: Vec<String>,
}

impl VirtualFileSystem {
    /// Open a tar archive and build the tree from its members.
    pub fn open(archive_path: impl AsRef<Path>, config: VfsConfig) -> FsResult<Self> {
        let archive = TarArchive::open(archive_path)?;
        let entries = archive.entries()?;
        Ok(Self::build(entries, config))
    }

    /// Build the tree from archive entries. Later entries replace earlier ones
    /// with the same path; missing parent directories are synthesized.
    pub fn build(entries: impl IntoIterator<Item = ArchiveEntry>, mut config: VfsConfig) -> Self {
        let home = config.home.trim_matches('/').to_string();
        if home.is_empty() || home.contains('/') {
            warn!("Invalid home directory name {:?}, using {:?}", config.home, DEFAULT_HOME);
            config.home = DEFAULT_HOME.to_string();
        } else {
            config.home = home;
        }

        let mut root = Directory::new();
        let mut count = 0usize;
        {
            let mount = if config.mount_under_home {
                root.subdir_mut(&config.home)
            } else {
                &mut root
            };
            for entry in entries {
                Self::insert_entry(mount, entry);
                count += 1;
            }
        }
        if !matches!(root.get(&config.home), Some(Node::Directory(_))) {
            debug!("Archive has no {} directory, creating it", config.home);
            root.subdir_mut(&config.home);
        }
        debug!("Built tree from {} archive entries", count);

        Self {
            cwd: vec![config.home.clone()],
            root: Node::Directory(root),
            config,
        }
    }

    fn insert_entry(mount: &mut Directory, entry: ArchiveEntry) {
        let segments: Vec<&str> = path::segments(&entry.path).collect();
        let Some((name, parents)) = segments.split_last() else {
            return;
        };

        let mut current = mount;
        for parent in parents {
            current = current.subdir_mut(parent);
        }

        let node = match entry.kind {
            EntryKind::Directory => Node::Directory(Directory::new()),
            EntryKind::File(content) => Node::File(FileEntry::new(content)),
        };
        if current.insert(*name, node).is_some() {
            debug!("Archive member {} replaces an earlier member", entry.path);
        }
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Name of the home directory (the single top segment of the cwd).
    pub fn home(&self) -> &str {
        &self.config.home
    }

    /// Absolute path of the current working directory, e.g. `/bs/a`.
    pub fn current_dir(&self) -> String {
        path::to_absolute(self.cwd.as_slice())
    }

    /// Literal lookup from the tree root.
    ///
    /// Every non-empty segment is a child name: `.` and `..` are not
    /// interpreted, so they only match children literally called that.
    pub fn resolve(&self, path: &str) -> Option<&Node> {
        path::segments(path).try_fold(&self.root, |node, segment| match node {
            Node::Directory(dir) => dir.get(segment),
            Node::File(_) => None,
        })
    }

    fn resolve_mut(&mut self, path: &str) -> Option<&mut Node> {
        path::segments(path).try_fold(&mut self.root, |node, segment| match node {
            Node::Directory(dir) => dir.get_mut(segment),
            Node::File(_) => None,
        })
    }

    /// Navigational resolution, used only for changing directory.
    ///
    /// `.` and `..` move relative to the cwd (or to home for absolute paths)
    /// and `..` stops at home. The result must be an existing directory.
    pub fn resolve_cwd(&self, path: &str) -> FsResult<Vec<String>> {
        let segments = path::navigate(&self.cwd, &self.config.home, path);
        match self.resolve(&path::to_absolute(segments.as_slice())) {
            Some(Node::Directory(_)) => Ok(segments),
            _ => Err(FsError::NoSuchPath(path.to_string())),
        }
    }

    /// Operation path: absolute paths are kept, relative ones join the cwd.
    fn absolute(&self, path: &str) -> String {
        if path::is_absolute(path) {
            path.to_string()
        } else {
            format!("{}/{}", self.current_dir(), path)
        }
    }

    /// List the children of a directory. An empty path or `.` lists the cwd;
    /// anything that is not a directory lists as empty.
    pub fn list(&self, path: &str) -> Listing {
        let target = if path.is_empty() || path == "." {
            self.current_dir()
        } else {
            self.absolute(path)
        };

        let Some(Node::Directory(dir)) = self.resolve(&target) else {
            debug!("Listing {} that is not a directory", target);
            return Listing::default();
        };

        let mut listing = Listing::default();
        for (name, node) in dir.children() {
            match node {
                Node::Directory(_) => listing.directories.push(format!("{}/", name)),
                Node::File(_) => listing.files.push(name.to_string()),
            }
        }
        listing.directories.sort();
        listing.files.sort();
        listing
    }

    /// Change the current directory. `/` alone returns to home.
    pub fn change_dir(&mut self, path: &str) -> FsResult<()> {
        self.cwd = if path == "/" {
            let home = vec![self.config.home.clone()];
            match self.resolve(&path::to_absolute(home.as_slice())) {
                Some(Node::Directory(_)) => home,
                _ => return Err(FsError::NoSuchPath(path.to_string())),
            }
        } else {
            self.resolve_cwd(path)?
        };
        debug!("Current directory is now {}", self.current_dir());
        Ok(())
    }

    fn file_bytes(&self, path: &str) -> FsResult<&[u8]> {
        match self.resolve(&self.absolute(path)) {
            Some(Node::File(file)) => file.content().bytes().map_err(|err| match err {
                FsError::ContentUnavailable(_) => FsError::ContentUnavailable(path.to_string()),
                other => other,
            }),
            _ => Err(FsError::NoSuchPath(path.to_string())),
        }
    }

    /// Read a file as UTF-8 text.
    pub fn read(&self, path: &str) -> FsResult<String> {
        let bytes = self.file_bytes(path)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| FsError::BinaryContent(path.to_string()))
    }

    /// Read a file and return its lines in reverse order joined by `\n`.
    ///
    /// Lines end at `\n`, `\r\n`, a lone `\r` or another Unicode line
    /// boundary. A trailing terminator does not produce an empty first line,
    /// and the result never ends with `\n`.
    pub fn reverse_read(&self, path: &str) -> FsResult<String> {
        let text = self.read(path)?;
        let mut lines = split_lines(&text);
        lines.reverse();
        Ok(lines.join("\n"))
    }

    /// Copy a file or directory.
    ///
    /// Files are inserted sharing the source content; directories are
    /// deep-cloned. The destination's parent must already be a directory and
    /// whatever sits at the destination is replaced, except the current
    /// directory or any of its ancestors.
    pub fn copy(&mut self, source: &str, destination: &str) -> FsResult<()> {
        let node = self
            .resolve(&self.absolute(source))
            .cloned()
            .ok_or_else(|| FsError::NoSuchPath(source.to_string()))?;

        let dest_path = self.absolute(destination);
        let segments: Vec<&str> = path::segments(&dest_path).collect();
        let Some((name, parents)) = segments.split_last() else {
            return Err(FsError::NoSuchPath(destination.to_string()));
        };

        if self.is_cwd_or_ancestor(&segments) {
            debug!("Refusing to replace {} which contains the current directory", dest_path);
            return Err(FsError::NoSuchPath(destination.to_string()));
        }

        let parent_path = path::to_absolute(parents);
        let Some(Node::Directory(parent)) = self.resolve_mut(&parent_path) else {
            return Err(FsError::NoSuchPath(destination.to_string()));
        };
        debug!("Copying {} to {}/{}", source, parent_path, name);
        parent.insert(*name, node);
        Ok(())
    }

    fn is_cwd_or_ancestor(&self, segments: &[&str]) -> bool {
        segments.len() <= self.cwd.len()
            && self.cwd.iter().zip(segments).all(|(cwd, segment)| cwd == segment)
    }

    /// Tag a file with a cosmetic mode. Directories are rejected.
    pub fn set_mode(&mut self, mode: &str, path: &str) -> FsResult<()> {
        let target = self.absolute(path);
        match self.resolve_mut(&target) {
            Some(Node::File(file)) => {
                file.set_mode(ModeTag::new(mode));
                debug!("Mode of {} set to {}", target, mode);
                Ok(())
            }
            Some(Node::Directory(_)) => Err(FsError::NotAFile(path.to_string())),
            None => Err(FsError::NoSuchPath(path.to_string())),
        }
    }

    /// Current mode tag of a file, if one was set.
    pub fn mode(&self, path: &str) -> FsResult<Option<&ModeTag>> {
        match self.resolve(&self.absolute(path)) {
            Some(Node::File(file)) => Ok(file.mode()),
            Some(Node::Directory(_)) => Err(FsError::NotAFile(path.to_string())),
            None => Err(FsError::NoSuchPath(path.to_string())),
        }
    }
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split text into lines without their terminators. `\r\n` counts as one
/// terminator; a final terminator does not start an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if !is_line_boundary(c) {
            continue;
        }
        lines.push(&text[start..index]);
        start = index + c.len_utf8();
        if c == '\r' {
            if let Some(&(next, '\n')) = chars.peek() {
                chars.next();
                start = next + 1;
            }
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}
