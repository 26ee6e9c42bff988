//! Archive backends for tarfs core
//!
//! A backend enumerates the members of an archive once and afterwards serves
//! the bytes of individual members on demand. Every file node in the virtual
//! tree holds a [`ContentRef`], which carries a shared handle to its backend
//! and caches the bytes after the first successful read.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{FsError, FsResult};
use crate::path;

/// Where the bytes of one member live inside its backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentLocation {
    /// Normalized member path, used in error messages
    pub member: String,
    pub offset: u64,
    pub len: u64,
}

/// Backend trait for lazy, read-only member access
pub trait ArchiveBackend: Send + Sync {
    fn read(&self, location: &ContentLocation) -> FsResult<Vec<u8>>;
}

struct Content {
    backend: Arc<dyn ArchiveBackend>,
    location: ContentLocation,
    bytes: OnceLock<Vec<u8>>,
}

/// Shared, lazily loaded reference to the bytes of one archive member.
///
/// Cloning a `ContentRef` aliases the same content: clones share the cache,
/// so bytes fetched through one clone are visible through all of them.
#[derive(Clone)]
pub struct ContentRef(Arc<Content>);

impl ContentRef {
    pub fn new(backend: Arc<dyn ArchiveBackend>, location: ContentLocation) -> Self {
        Self(Arc::new(Content {
            backend,
            location,
            bytes: OnceLock::new(),
        }))
    }

    /// Fetch the member's bytes, reading the archive only on first access.
    pub fn bytes(&self) -> FsResult<&[u8]> {
        if let Some(bytes) = self.0.bytes.get() {
            return Ok(bytes);
        }
        let bytes = self.0.backend.read(&self.0.location)?;
        Ok(self.0.bytes.get_or_init(|| bytes))
    }

    pub fn is_loaded(&self) -> bool {
        self.0.bytes.get().is_some()
    }

    /// True when both references point at the same underlying content.
    pub fn same_content(&self, other: &ContentRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRef")
            .field("location", &self.0.location)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Kind of an archive member
#[derive(Clone, Debug)]
pub enum EntryKind {
    Directory,
    File(ContentRef),
}

/// One member of an archive, as consumed by the tree builder
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    /// Slash-separated path relative to the archive root
    pub path: String,
    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }
}

/// Tar archive opened from disk.
///
/// The file handle stays open for as long as any [`ContentRef`] created by
/// [`TarArchive::entries`] is alive.
pub struct TarArchive {
    path: PathBuf,
    file: Mutex<File>,
}

impl TarArchive {
    pub fn open(path: impl AsRef<Path>) -> FsResult<Arc<Self>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| FsError::archive_open(path, err))?;
        info!("Opened archive {}", path.display());
        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        }))
    }

    /// Enumerate every directory and regular-file member, in archive order.
    ///
    /// Other member types (links, devices, FIFOs) are skipped.
    pub fn entries(self: &Arc<Self>) -> FsResult<Vec<ArchiveEntry>> {
        let backend: Arc<dyn ArchiveBackend> = self.clone();
        let open_error = |err: std::io::Error| FsError::archive_open(&self.path, err);

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(0)).map_err(open_error)?;
        let mut archive = tar::Archive::new(BufReader::new(&mut *file));

        let mut entries = Vec::new();
        for member in archive.entries().map_err(open_error)? {
            let member = member.map_err(open_error)?;
            let raw_path = member.path().map_err(open_error)?.to_string_lossy().into_owned();
            let Some(path) = path::normalize(&raw_path) else {
                debug!("Skipping archive member with empty path: {:?}", raw_path);
                continue;
            };

            let entry_type = member.header().entry_type();
            // Old-style archives mark directories only by the trailing slash.
            let kind = if entry_type.is_dir() || (entry_type.is_file() && raw_path.ends_with('/')) {
                EntryKind::Directory
            } else if entry_type.is_file() {
                let location = ContentLocation {
                    member: path.clone(),
                    offset: member.raw_file_position(),
                    len: member.size(),
                };
                EntryKind::File(ContentRef::new(backend.clone(), location))
            } else {
                debug!("Skipping unsupported archive member {} ({:?})", path, entry_type);
                continue;
            };
            entries.push(ArchiveEntry { path, kind });
        }

        info!("Enumerated {} members from {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

impl ArchiveBackend for TarArchive {
    fn read(&self, location: &ContentLocation) -> FsResult<Vec<u8>> {
        let unavailable = |err: std::io::Error| {
            warn!("Failed to extract {} from {}: {}", location.member, self.path.display(), err);
            FsError::ContentUnavailable(location.member.clone())
        };
        let len = usize::try_from(location.len)
            .map_err(|_| FsError::ContentUnavailable(location.member.clone()))?;

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(location.offset)).map_err(unavailable)?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).map_err(unavailable)?;
        debug!("Read {} bytes for {}", len, location.member);
        Ok(buf)
    }
}

enum MemoryMember {
    Directory,
    File(Vec<u8>),
    Unreadable,
}

/// Archive held entirely in memory, assembled member by member.
#[derive(Default)]
pub struct MemoryArchive {
    members: Vec<(String, MemoryMember)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.members.push((path.to_string(), MemoryMember::Directory));
        self
    }

    pub fn file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.members
            .push((path.to_string(), MemoryMember::File(data.into())));
        self
    }

    /// A regular-file member whose bytes cannot be extracted.
    pub fn broken_file(mut self, path: &str) -> Self {
        self.members.push((path.to_string(), MemoryMember::Unreadable));
        self
    }

    pub fn entries(self) -> Vec<ArchiveEntry> {
        let mut blobs = Vec::new();
        let mut pending = Vec::new();
        for (raw_path, member) in self.members {
            let Some(path) = path::normalize(&raw_path) else {
                continue;
            };
            let blob = match member {
                MemoryMember::Directory => {
                    pending.push((path, None));
                    continue;
                }
                MemoryMember::File(data) => Some(data),
                MemoryMember::Unreadable => None,
            };
            pending.push((path, Some(blobs.len())));
            blobs.push(blob);
        }

        let backend: Arc<dyn ArchiveBackend> = Arc::new(MemoryBackend { blobs });
        pending
            .into_iter()
            .map(|(path, blob)| {
                let kind = match blob {
                    None => EntryKind::Directory,
                    Some(index) => EntryKind::File(ContentRef::new(
                        backend.clone(),
                        ContentLocation {
                            member: path.clone(),
                            offset: index as u64,
                            len: 0,
                        },
                    )),
                };
                ArchiveEntry { path, kind }
            })
            .collect()
    }
}

struct MemoryBackend {
    blobs: Vec<Option<Vec<u8>>>,
}

impl ArchiveBackend for MemoryBackend {
    fn read(&self, location: &ContentLocation) -> FsResult<Vec<u8>> {
        usize::try_from(location.offset)
            .ok()
            .and_then(|index| self.blobs.get(index))
            .and_then(|blob| blob.clone())
            .ok_or_else(|| FsError::ContentUnavailable(location.member.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tar(build: impl FnOnce(&mut tar::Builder<&mut File>)) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        {
            let mut builder = tar::Builder::new(temp_file.as_file_mut());
            build(&mut builder);
            builder.finish().unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    fn append_file(builder: &mut tar::Builder<&mut File>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }

    fn append_dir(builder: &mut tar::Builder<&mut File>, path: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Directory);
        header.set_cksum();
        builder.append_data(&mut header, path, std::io::empty()).unwrap();
    }

    #[test]
    fn test_tar_entries_and_lazy_content() {
        let archive_file = write_tar(|builder| {
            append_dir(builder, "docs/");
            append_file(builder, "docs/readme.txt", b"hello archive");
            append_file(builder, "./top.txt", b"top");
        });

        let archive = TarArchive::open(archive_file.path()).unwrap();
        let entries = archive.entries().unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["docs", "docs/readme.txt", "top.txt"]);
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());

        let EntryKind::File(content) = &entries[1].kind else {
            panic!("expected a file entry");
        };
        assert!(!content.is_loaded());
        assert_eq!(content.bytes().unwrap(), b"hello archive");
        assert!(content.is_loaded());
    }

    #[test]
    fn test_tar_skips_symlinks() {
        let archive_file = write_tar(|builder| {
            append_file(builder, "target.txt", b"data");
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_entry_type(tar::EntryType::Symlink);
            builder
                .append_link(&mut header, "link.txt", "target.txt")
                .unwrap();
        });

        let archive = TarArchive::open(archive_file.path()).unwrap();
        let entries = archive.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "target.txt");
    }

    #[test]
    fn test_tar_old_style_directory_member() {
        let archive_file = write_tar(|builder| {
            let mut header = tar::Header::new_old();
            header.as_old_mut().name[..4].copy_from_slice(b"old/");
            header.set_size(0);
            header.set_mode(0o755);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
            append_file(builder, "old/inside.txt", b"in");
        });

        let archive = TarArchive::open(archive_file.path()).unwrap();
        let entries = archive.entries().unwrap();
        assert_eq!(entries[0].path, "old");
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let result = TarArchive::open(dir.path().join("missing.tar"));
        assert!(matches!(result, Err(FsError::ArchiveOpen { .. })));
    }

    #[test]
    fn test_corrupt_archive() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[b'A'; 1024]).unwrap();
        temp_file.flush().unwrap();

        let archive = TarArchive::open(temp_file.path()).unwrap();
        let result = archive.entries();
        assert!(matches!(result, Err(FsError::ArchiveOpen { .. })));
    }

    #[test]
    fn test_truncated_member_is_unavailable() {
        let archive_file = write_tar(|builder| {
            append_file(builder, "data.txt", b"0123456789");
        });
        let archive = TarArchive::open(archive_file.path()).unwrap();
        let location = ContentLocation {
            member: "data.txt".to_string(),
            offset: 10_000,
            len: 10,
        };
        let result = archive.read(&location);
        assert!(matches!(result, Err(FsError::ContentUnavailable(ref m)) if m == "data.txt"));
    }

    #[test]
    fn test_memory_archive() {
        let entries = MemoryArchive::new()
            .dir("a")
            .file("a/b.txt", "bee")
            .broken_file("a/gone.bin")
            .entries();
        assert_eq!(entries.len(), 3);

        let EntryKind::File(ok) = &entries[1].kind else {
            panic!("expected a file entry");
        };
        assert_eq!(ok.bytes().unwrap(), b"bee");

        let EntryKind::File(broken) = &entries[2].kind else {
            panic!("expected a file entry");
        };
        assert!(matches!(broken.bytes(), Err(FsError::ContentUnavailable(_))));
        assert!(!broken.is_loaded());
    }

    #[test]
    fn test_clones_share_content() {
        let entries = MemoryArchive::new().file("x.txt", "x").entries();
        let EntryKind::File(content) = &entries[0].kind else {
            panic!("expected a file entry");
        };
        let alias = content.clone();
        assert!(alias.same_content(content));
        alias.bytes().unwrap();
        assert!(content.is_loaded());
    }
}
