//! Backing-store schema and prepared-statement text.
//!
//! The DDL defines on-disk compatibility and must not drift: `paths`
//! holds one row per name in the namespace, `files` one row per content
//! object. The root "/" is implicit (id 0) and never stored.

/// Schema applied at every open. Idempotent.
pub const CREATE_TABLES: &str = "\
create table if not exists files(id integer primary key autoincrement, nlink integer default 1 not null, content blob, dev integer, size integer default 0);
create table if not exists paths(id integer primary key autoincrement, path text not null, parent_id integer, uid integer not null, gid integer not null, mode integer not null, atime integer not null, mtime integer not null, ctime integer not null, file_id integer);
create unique index if not exists path_idx on paths(path);
create index if not exists file_id_idx on paths(file_id);
";

/// Full stat row for one name, file columns defaulted for directories.
pub const SELECT_STAT_BY_PATH: &str = "\
select p.id, p.uid, p.gid, p.mode, p.atime, p.mtime, p.ctime, \
 ifnull(f.size, 0) size, ifnull(f.nlink, 1) nlink \
 from paths p left join files f on p.file_id = f.id where p.path = ?1";

pub const SELECT_PATH_ID_BY_PATH: &str = "select id from paths where path = ?1";

pub const SELECT_PATH_BY_ID: &str = "select path from paths where id = ?1";

/// Identity plus content reference: id, mode, file_id, current size.
pub const SELECT_PATH_INFO_BY_PATH: &str = "\
select p.id, p.mode, p.file_id, ifnull(f.size, 0) size \
 from paths p left join files f on p.file_id = f.id where p.path = ?1";

/// Directory listing: membership is `parent_id`, never path-prefix
/// matching. `limit -1` keeps the offset clause valid.
pub const SELECT_ENTRIES_BY_PARENT_ID: &str = "\
select p.id, p.path, p.uid, p.gid, p.mode, p.atime, p.mtime, p.ctime, \
 ifnull(f.size, 0) size, ifnull(f.nlink, 1) nlink \
 from paths p left join files f on p.file_id = f.id \
 where p.parent_id = ?1 limit -1 offset ?2";

pub const COUNT_CHILDREN_BY_PARENT_ID: &str =
    "select count(id) from paths where parent_id = ?1";

pub const INSERT_PATH: &str = "\
insert into paths(path, parent_id, uid, gid, mode, atime, mtime, ctime, file_id) \
 values(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

pub const INSERT_FILE: &str = "insert into files(content, dev, size) values(?1, ?2, ?3)";

pub const DELETE_PATH_BY_ID: &str = "delete from paths where id = ?1";

pub const DELETE_FILE_BY_ID: &str = "delete from files where id = ?1";

pub const INCREMENT_NLINK_BY_ID: &str = "update files set nlink = nlink + 1 where id = ?1";

pub const DECREMENT_NLINK_BY_ID: &str = "update files set nlink = nlink - 1 where id = ?1";

pub const SELECT_NLINK_BY_ID: &str = "select nlink from files where id = ?1";

pub const SELECT_CONTENT_BY_FILE_ID: &str = "select content from files where id = ?1";

pub const SELECT_CONTENT_IS_NULL: &str = "select content is null from files where id = ?1";

/// Rename one row: the path string and the enclosing directory move
/// together.
pub const UPDATE_PATH_NAME_BY_ID: &str =
    "update paths set path = ?1, parent_id = ?2 where id = ?3";

/// Prefix-substitute descendant paths after a directory rename. ?1 is
/// the old directory path, ?2 the new one; only rows strictly below the
/// old directory match.
pub const UPDATE_DESCENDANT_PATHS: &str = "\
update paths set path = ?2 || substr(path, length(?1) + 1) \
 where substr(path, 1, length(?1) + 1) = ?1 || '/'";

pub const UPDATE_MODE_BY_ID: &str = "update paths set mode = ?1 where id = ?2";

pub const UPDATE_OWNER_BY_ID: &str = "update paths set uid = ?1, gid = ?2 where id = ?3";

pub const UPDATE_TIMES_BY_ID: &str =
    "update paths set atime = ?1, mtime = ?2 where id = ?3";

/// Shrink-only truncate: the predicate only fires when ?1 is below the
/// current size, and the content is cut to match so `size` always equals
/// the stored blob length.
pub const SHRINK_FILE_BY_ID: &str = "\
update files set content = substr(content, 1, ?1), size = ?1 \
 where id = ?2 and ?1 < size";

/// Grow-path write: content and size move in a single statement.
pub const UPDATE_CONTENT_BY_ID: &str =
    "update files set content = ?1, size = ?2 where id = ?3";
