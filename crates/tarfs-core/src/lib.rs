//! tarfs core: in-memory virtual filesystem built from a tar archive
//!
//! The archive is read once to build the directory tree; file bytes are pulled
//! from the archive lazily when a file is first read. Changes (copies and mode
//! tags) live only in memory and are never written back.

pub mod archive;
pub mod config;
pub mod error;
pub mod node;
pub mod path;
pub mod vfs;

// Re-export key types for convenience
pub use archive::{ArchiveBackend, ArchiveEntry, ContentLocation, ContentRef, EntryKind, MemoryArchive, TarArchive};
pub use config::VfsConfig;
pub use error::{FsError, FsResult};
pub use node::{Directory, FileEntry, ModeTag, Node};
pub use vfs::{Listing, VirtualFileSystem};
