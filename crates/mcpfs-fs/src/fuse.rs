//! FUSE adapter — translates kernel callbacks into resolver calls.
//!
//! fuser speaks inodes, the resolver speaks paths, so the adapter keeps a
//! bidirectional inode table (root is 1). Kernel callbacks arrive on the
//! session's threads; async resolver work is bridged with `Handle::block_on`.

use crate::error::FsError;
use crate::path::Node;
use crate::resolver::{Attr, EntryKind, Resolver};
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    ReplyWrite, Request, TimeOrNow,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const TTL: Duration = Duration::ZERO;

struct InodeTable {
    by_ino: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        Self {
            by_ino: HashMap::from([(1, "/".to_string())]),
            by_path: HashMap::from([("/".to_string(), 1)]),
            next: 2,
        }
    }

    fn path(&self, ino: u64) -> Option<String> {
        self.by_ino.get(&ino).cloned()
    }

    fn assign(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.by_path.get(path) {
            return *ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_ino.insert(ino, path.to_string());
        self.by_path.insert(path.to_string(), ino);
        ino
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}

fn errno(err: &FsError) -> i32 {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::PermissionDenied => libc::EACCES,
        FsError::InvalidArgument => libc::EINVAL,
        FsError::IsDirectory => libc::EISDIR,
        FsError::Io(_) => libc::EIO,
    }
}

/// The mounted filesystem.
pub struct McpFuse {
    resolver: Arc<Resolver>,
    handle: tokio::runtime::Handle,
    inodes: InodeTable,
}

impl McpFuse {
    pub fn new(resolver: Arc<Resolver>, handle: tokio::runtime::Handle) -> Self {
        Self {
            resolver,
            handle,
            inodes: InodeTable::new(),
        }
    }

    fn file_attr(&self, ino: u64, attr: &Attr, req: &Request<'_>) -> FileAttr {
        let kind = match attr.kind {
            EntryKind::Dir => FileType::Directory,
            EntryKind::File => FileType::RegularFile,
        };
        FileAttr {
            ino,
            size: attr.size,
            blocks: 0,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            crtime: UNIX_EPOCH,
            kind,
            perm: attr.perm,
            nlink: if attr.kind == EntryKind::Dir { 2 } else { 1 },
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

impl Filesystem for McpFuse {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.inodes.path(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);

        match self.handle.block_on(self.resolver.getattr(&path)) {
            Ok(attr) => {
                let ino = self.inodes.assign(&path);
                reply.entry(&TTL, &self.file_attr(ino, &attr, req), 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.handle.block_on(self.resolver.getattr(&path)) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr, req)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let entries = match self.handle.block_on(self.resolver.readdir(&path)) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(errno(&e));
                return;
            }
        };

        let parent_ino = self.inodes.assign(parent_of(&path));
        let mut listing: Vec<(u64, FileType, String)> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for (name, kind) in entries {
            let child_ino = self.inodes.assign(&join(&path, &name));
            let file_type = match kind {
                EntryKind::Dir => FileType::Directory,
                EntryKind::File => FileType::RegularFile,
            };
            listing.push((child_ino, file_type, name));
        }

        for (i, (entry_ino, file_type, name)) in
            listing.into_iter().enumerate().skip(offset as usize)
        {
            if reply.add(entry_ino, (i + 1) as i64, file_type, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let write = flags & libc::O_ACCMODE != libc::O_RDONLY;
        match self.resolver.check_open(&path, write) {
            Ok(()) => reply.opened(0, fuser::consts::FOPEN_DIRECT_IO),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.handle.block_on(self.resolver.read(&path)) {
            Ok(data) => {
                let start = (offset.max(0) as usize).min(data.len());
                let end = (start + size as usize).min(data.len());
                reply.data(&data[start..end]);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.handle.block_on(self.resolver.write(&path, data)) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(errno(&e)),
        }
    }

    // Truncate on `.call` is a no-op success so shells can `> .call`;
    // size changes anywhere else are refused.
    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        if size.is_some() && !matches!(self.resolver.parse(&path), Some(Node::CallFile { .. })) {
            reply.error(libc::EACCES);
            return;
        }

        match self.handle.block_on(self.resolver.getattr(&path)) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr, req)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn destroy(&mut self) {
        self.handle.block_on(self.resolver.clear_results());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_table_assigns_stable_ids() {
        let mut table = InodeTable::new();
        assert_eq!(table.path(1).as_deref(), Some("/"));

        let a = table.assign("/@github");
        let b = table.assign("/@github/mcp");
        assert_ne!(a, b);
        assert_eq!(table.assign("/@github"), a);
        assert_eq!(table.path(a).as_deref(), Some("/@github"));
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("/", ".config"), "/.config");
        assert_eq!(join("/@github", "mcp"), "/@github/mcp");
    }

    #[test]
    fn parent_walks_up() {
        assert_eq!(parent_of("/@github/mcp"), "/@github");
        assert_eq!(parent_of("/@github"), "/");
        assert_eq!(parent_of("/"), "/");
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(errno(&FsError::NotFound), libc::ENOENT);
        assert_eq!(errno(&FsError::PermissionDenied), libc::EACCES);
        assert_eq!(errno(&FsError::InvalidArgument), libc::EINVAL);
        assert_eq!(errno(&FsError::IsDirectory), libc::EISDIR);
        assert_eq!(errno(&FsError::Io("x".to_string())), libc::EIO);
    }
}
