//! FUSE adapter: translates kernel upcalls into store operations.
//!
//! The kernel addresses entries by inode number while the store keys
//! them by absolute path. Inode numbers are derived from path row ids
//! (`ino = id + 1`, so the implicit root id 0 becomes `FUSE_ROOT_ID`)
//! and resolved back to paths through the path index. Open files carry
//! their file row id as the kernel file handle; open directories carry
//! their path row id.
//!
//! Results map to negated POSIX errno values on the wire; the reply
//! layer performs the negation, so this module hands it positive codes.

use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use sqlfs_core::{path, unix_now, EntryKind, FileStat, FsError, PathId, SqlFs};

/// Kernel cache lifetime for attributes and entries.
const TTL: Duration = Duration::from_secs(1);

/// FUSE filesystem backed by a [`SqlFs`] store.
pub struct SqlFuse {
    fs: SqlFs,
}

fn ino_to_id(ino: u64) -> PathId {
    ino as i64 - 1
}

fn id_to_ino(id: PathId) -> u64 {
    (id + 1) as u64
}

fn file_type(kind: EntryKind) -> FileType {
    match kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::Symlink => FileType::Symlink,
        EntryKind::Regular => FileType::RegularFile,
    }
}

fn ts(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn to_file_attr(stat: &FileStat) -> FileAttr {
    let size: u64 = stat.size;
    FileAttr {
        ino: id_to_ino(stat.id),
        size,
        blocks: (size + 511) / 512,
        atime: ts(stat.atime),
        mtime: ts(stat.mtime),
        ctime: ts(stat.ctime),
        crtime: UNIX_EPOCH,
        kind: file_type(stat.kind()),
        perm: (stat.mode & 0o7777) as u16,
        nlink: stat.nlink,
        uid: stat.uid,
        gid: stat.gid,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

fn time_or_now(t: TimeOrNow) -> i64 {
    match t {
        TimeOrNow::SpecificTime(st) => st
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
        TimeOrNow::Now => unix_now(),
    }
}

/// Log a failed upcall and produce its errno. Store-level failures are
/// errors; expected outcomes such as a missing path stay at debug.
fn errno_for(op: &str, path: &str, err: &FsError) -> i32 {
    if err.is_store_failure() {
        tracing::error!(op, path, error = %err, "operation failed");
    } else {
        tracing::debug!(op, path, error = %err, "operation rejected");
    }
    err.errno()
}

impl SqlFuse {
    pub fn new(fs: SqlFs) -> SqlFuse {
        SqlFuse { fs }
    }

    /// Path of the entry the kernel refers to by `ino`.
    fn path_of(&self, ino: u64) -> Result<String, i32> {
        match self.fs.path_by_id(ino_to_id(ino)) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(libc::ENOENT),
            Err(err) => Err(errno_for("resolve", "", &err)),
        }
    }

    /// Join a parent inode and an entry name into an absolute path.
    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, i32> {
        let name: &str = name.to_str().ok_or(libc::ENOENT)?;
        let dir: String = self.path_of(parent)?;
        if dir == "/" {
            Ok(format!("/{name}"))
        } else {
            Ok(format!("{dir}/{name}"))
        }
    }

    /// Stat `path` and answer with a directory entry.
    fn reply_entry_for(&self, path: &str, reply: ReplyEntry) {
        match self.fs.getattr(path) {
            Ok(stat) => reply.entry(&TTL, &to_file_attr(&stat), 0),
            Err(err) => reply.error(errno_for("getattr", path, &err)),
        }
    }
}

impl Filesystem for SqlFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        self.reply_entry_for(&path, reply);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.getattr(&path) {
            Ok(stat) => reply.attr(&TTL, &to_file_attr(&stat)),
            Err(err) => reply.error(errno_for("getattr", &path, &err)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%path, ?mode, ?uid, ?gid, ?size, "setattr");

        let result = (|| -> Result<(), FsError> {
            if let Some(mode) = mode {
                self.fs.chmod(&path, mode)?;
            }
            if uid.is_some() || gid.is_some() {
                let stat: FileStat = self.fs.getattr(&path)?;
                self.fs
                    .chown(&path, uid.unwrap_or(stat.uid), gid.unwrap_or(stat.gid))?;
            }
            if let Some(size) = size {
                self.fs.truncate(&path, size)?;
            }
            if atime.is_some() || mtime.is_some() {
                let stat: FileStat = self.fs.getattr(&path)?;
                let atime: i64 = atime.map(time_or_now).unwrap_or(stat.atime);
                let mtime: i64 = mtime.map(time_or_now).unwrap_or(stat.mtime);
                self.fs.utimens(&path, atime, mtime)?;
            }
            Ok(())
        })();

        match result.and_then(|()| self.fs.getattr(&path)) {
            Ok(stat) => reply.attr(&TTL, &to_file_attr(&stat)),
            Err(err) => reply.error(errno_for("setattr", &path, &err)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.read_link(&path) {
            Ok(mut target) => {
                // Stored with a trailing NUL; the kernel wants it bare.
                if target.last() == Some(&0) {
                    target.pop();
                }
                reply.data(&target);
            }
            Err(err) => reply.error(errno_for("readlink", &path, &err)),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%path, mode, "mknod");
        match self
            .fs
            .mknod(&path, mode & !umask, rdev, req.uid(), req.gid())
        {
            Ok(()) => self.reply_entry_for(&path, reply),
            Err(err) => reply.error(errno_for("mknod", &path, &err)),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%path, mode, "mkdir");
        match self.fs.mkdir(&path, mode & !umask, req.uid(), req.gid()) {
            Ok(()) => self.reply_entry_for(&path, reply),
            Err(err) => reply.error(errno_for("mkdir", &path, &err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%path, "unlink");
        match self.fs.unlink(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_for("unlink", &path, &err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%path, "rmdir");
        match self.fs.rmdir(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_for("rmdir", &path, &err)),
        }
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &std::path::Path,
        reply: ReplyEntry,
    ) {
        let path: String = match self.child_path(parent, link_name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let target: &str = match target.to_str() {
            Some(target) => target,
            None => return reply.error(libc::EINVAL),
        };
        tracing::debug!(%path, target, "symlink");
        match self.fs.symlink(target, &path, req.uid(), req.gid()) {
            Ok(()) => self.reply_entry_for(&path, reply),
            Err(err) => reply.error(errno_for("symlink", &path, &err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let old_path: String = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let new_path: String = match self.child_path(newparent, newname) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%old_path, %new_path, "rename");
        match self.fs.rename(&old_path, &new_path, flags) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_for("rename", &old_path, &err)),
        }
    }

    fn link(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let old_path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        let new_path: String = match self.child_path(newparent, newname) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        tracing::debug!(%old_path, %new_path, "link");
        match self.fs.link(&old_path, &new_path, req.uid(), req.gid()) {
            Ok(()) => self.reply_entry_for(&new_path, reply),
            Err(err) => reply.error(errno_for("link", &new_path, &err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.open(&path) {
            Ok(file_id) => reply.opened(file_id as u64, 0),
            Err(err) => reply.error(errno_for("open", &path, &err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        match self.fs.read(fh as i64, offset.max(0) as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno_for("read", "", &err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        // Writes resolve by path: the in-place/grow decision needs the
        // current size from the path index.
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.write(&path, offset.max(0) as u64, data) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(errno_for("write", &path, &err)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path: String = match self.path_of(ino) {
            Ok(path) => path,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.opendir(&path) {
            Ok(dir_id) => reply.opened(dir_id as u64, 0),
            Err(err) => reply.error(errno_for("opendir", &path, &err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if offset < 1 && reply.add(ino, 1, FileType::Directory, ".") {
            return reply.ok();
        }
        if offset < 2 {
            let parent_ino: u64 = match self.path_of(ino) {
                Ok(path) if path == "/" => FUSE_ROOT_ID,
                Ok(path) => match self.fs.opendir(path::parent_of(&path)) {
                    Ok(parent_id) => id_to_ino(parent_id),
                    Err(err) => return reply.error(errno_for("readdir", &path, &err)),
                },
                Err(errno) => return reply.error(errno),
            };
            if reply.add(parent_ino, 2, FileType::Directory, "..") {
                return reply.ok();
            }
        }

        let skip: i64 = (offset - 2).max(0);
        match self.fs.read_dir(fh as i64, skip) {
            Ok(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    let next: i64 = skip + i as i64 + 3;
                    if reply.add(
                        id_to_ino(entry.stat.id),
                        next,
                        file_type(entry.stat.kind()),
                        &entry.name,
                    ) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(err) => reply.error(errno_for("readdir", "", &err)),
        }
    }

    fn destroy(&mut self) {
        tracing::info!("unmounting");
        self.fs.destroy();
    }
}

/// Mount the filesystem in the foreground; returns when unmounted.
pub fn mount(
    fuse: SqlFuse,
    mountpoint: &std::path::Path,
    extra_options: &[MountOption],
) -> std::io::Result<()> {
    fuser::mount2(fuse, mountpoint, &mount_options(extra_options))
}

/// Mount in the background, handing back the session handle.
pub fn spawn_mount(
    fuse: SqlFuse,
    mountpoint: &std::path::Path,
    extra_options: &[MountOption],
) -> std::io::Result<fuser::BackgroundSession> {
    fuser::spawn_mount2(fuse, mountpoint, &mount_options(extra_options))
}

fn mount_options(extra: &[MountOption]) -> Vec<MountOption> {
    let mut options: Vec<MountOption> = vec![MountOption::FSName("sqlfs".to_string())];
    options.extend_from_slice(extra);
    options
}
