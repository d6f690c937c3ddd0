//! Shared record types read from the store.

use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a row in `paths`.
pub type PathId = i64;

/// Identifier of a row in `files`.
pub type FileId = i64;

/// The implicit root directory. No row carries this id.
pub const ROOT_PATH_ID: PathId = 0;

/// Current wall-clock time as whole seconds since the epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Entry type decoded from the stored mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl EntryKind {
    /// Decode the type from a stored mode. A stored mode encodes exactly
    /// one type; anything else is treated as a regular file.
    pub fn from_mode(mode: u32) -> EntryKind {
        match mode & libc::S_IFMT {
            libc::S_IFDIR => EntryKind::Directory,
            libc::S_IFLNK => EntryKind::Symlink,
            _ => EntryKind::Regular,
        }
    }

    /// The `S_IFMT` bits for this kind.
    pub fn type_bits(self) -> u32 {
        match self {
            EntryKind::Regular => libc::S_IFREG,
            EntryKind::Directory => libc::S_IFDIR,
            EntryKind::Symlink => libc::S_IFLNK,
        }
    }
}

/// Identity and content reference for one name: the common currency of
/// multi-step operations.
#[derive(Debug, Clone, Copy)]
pub struct PathInfo {
    /// Path row id.
    pub id: PathId,
    /// Stored mode (type bits plus permissions).
    pub mode: u32,
    /// Associated file row id, 0 for directories.
    pub file_id: FileId,
    /// Current content length in bytes.
    pub size: u64,
}

impl PathInfo {
    /// The implicit root: all-zero fields.
    pub fn root() -> PathInfo {
        PathInfo {
            id: ROOT_PATH_ID,
            mode: 0,
            file_id: 0,
            size: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFDIR
    }

    pub fn is_regular(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFLNK
    }
}

/// Stat record for one name, shaped like `struct stat`.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    /// Path row id (0 for the implicit root).
    pub id: PathId,
    pub uid: u32,
    pub gid: u32,
    /// Type bits plus permissions.
    pub mode: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    /// Content length in bytes; 0 for directories.
    pub size: u64,
    /// Hard-link count; 1 for directories.
    pub nlink: u32,
}

impl FileStat {
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_mode(self.mode)
    }
}

/// One `readdir` row: entry name plus its stat.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Basename of the entry.
    pub name: String,
    pub stat: FileStat,
}
