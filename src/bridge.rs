//! FUSE bridge: adapts the path-based [`Ops`] surface to `fuser`'s
//! inode-keyed `Filesystem` trait.
//!
//! `fuser` dispatches by inode number, not path, so this layer keeps a small
//! cache mapping each inode the kernel has seen (via `lookup`) back to its
//! parent and name, and walks that chain to rebuild the absolute path `Ops`
//! expects on every call — the same "resolve the whole path every time, no
//! node cache shortcuts" posture the original driver took, just paid for
//! here instead of by the kernel's own path-based dispatch.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyDirectory, ReplyData,
    ReplyEmpty, ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::ENOENT;
use log::trace;

use crate::fs::{Attr, Ops, TimeArg};

/// How long the kernel may cache attributes and entries before re-asking.
/// Short, since the image can change out from under a concurrent writer at
/// the block-device level in ways this single-threaded FS wouldn't see.
const TTL: Duration = Duration::from_secs(1);

const FUSE_ROOT_INO: u64 = 1;

fn index_to_ino(index: u32) -> u64 {
    index as u64 + 1
}

fn now() -> (i64, u32) {
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (d.as_secs() as i64, d.subsec_nanos())
}

fn to_file_attr(ino: u64, attr: &Attr) -> FileAttr {
    let kind = if attr.mode & libc::S_IFMT as u32 == libc::S_IFDIR as u32 {
        FileType::Directory
    } else {
        FileType::RegularFile
    };
    let mtime = UNIX_EPOCH + Duration::new(attr.mtime_sec.max(0) as u64, attr.mtime_nsec);
    FileAttr {
        ino,
        size: attr.size,
        blocks: attr.blocks_512,
        atime: mtime,
        mtime,
        ctime: mtime,
        crtime: mtime,
        kind,
        perm: (attr.mode & 0o7777) as u16,
        nlink: attr.links,
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: crate::layout::BLOCK_SIZE as u32,
        flags: 0,
    }
}

/// `fuser::Filesystem` adapter wrapping a mounted [`Ops`].
pub struct BlockFuse {
    ops: Ops,
    /// child ino -> (parent ino, name), seeded only by `lookup`.
    parents: HashMap<u64, (u64, String)>,
}

impl BlockFuse {
    pub fn new(ops: Ops) -> Self {
        BlockFuse {
            ops,
            parents: HashMap::new(),
        }
    }

    /// Rebuilds the absolute path for `ino` by walking `parents` back to the
    /// root. Returns `"/"` for the root itself.
    fn path_of(&self, ino: u64) -> Option<String> {
        if ino == FUSE_ROOT_INO {
            return Some("/".to_string());
        }
        let mut components = Vec::new();
        let mut current = ino;
        loop {
            if current == FUSE_ROOT_INO {
                break;
            }
            let (parent, name) = self.parents.get(&current)?;
            components.push(name.clone());
            current = *parent;
        }
        components.reverse();
        Some(format!("/{}", components.join("/")))
    }

    fn remember(&mut self, parent: u64, name: &str, child_ino: u64) {
        self.parents.insert(child_ino, (parent, name.to_string()));
    }
}

impl Filesystem for BlockFuse {
    fn destroy(&mut self) {
        trace!("destroy");
        self.ops.destroy();
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        trace!("lookup parent={parent} name={name}");
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        match self.ops.getattr(&child_path) {
            Ok(attr) => {
                let ino = index_to_ino(self.ops.ctx.resolve_final(&child_path).unwrap());
                self.remember(parent, name, ino);
                reply.entry(&TTL, &to_file_attr(ino, &attr), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        trace!("getattr ino={ino}");
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        match self.ops.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(ino, &attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
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
        trace!("setattr ino={ino} size={size:?}");
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };

        if let Some(new_size) = size {
            if let Err(e) = self.ops.truncate(&path, new_size) {
                reply.error(e.errno());
                return;
            }
        }
        if let Some(spec) = mtime.or(atime) {
            let arg = match spec {
                TimeOrNow::Now => TimeArg::Now,
                TimeOrNow::SpecificTime(t) => {
                    let d = t.duration_since(UNIX_EPOCH).unwrap_or_default();
                    TimeArg::Set(d.as_secs() as i64, d.subsec_nanos())
                }
            };
            if let Err(e) = self.ops.utimens(&path, arg, now()) {
                reply.error(e.errno());
                return;
            }
        }

        match self.ops.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(ino, &attr)),
            Err(e) => reply.error(e.errno()),
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
        trace!("readdir ino={ino} offset={offset}");
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        let mut index: i64 = 0;
        let result = self.ops.readdir(&path, |name| {
            index += 1;
            if index <= offset {
                return true;
            }
            // The kernel doesn't need a real inode number or file type to
            // continue paging; it will look each entry up by name. `add`
            // returns true when its buffer is full, the opposite sense of
            // our visitor's "keep going" convention.
            !reply.add(1, index, FileType::RegularFile, name)
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        trace!("mkdir parent={parent} name={name} mode={mode:o}");
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        if let Err(e) = self.ops.mkdir(&child_path, mode, now()) {
            reply.error(e.errno());
            return;
        }
        match self.ops.getattr(&child_path) {
            Ok(attr) => {
                let ino = index_to_ino(self.ops.ctx.resolve_final(&child_path).unwrap());
                self.remember(parent, name, ino);
                reply.entry(&TTL, &to_file_attr(ino, &attr), 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        trace!("rmdir parent={parent} name={name}");
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        match self.ops.rmdir(&join(&parent_path, name)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        trace!("create parent={parent} name={name} mode={mode:o}");
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        let child_path = join(&parent_path, name);
        if let Err(e) = self.ops.create(&child_path, mode, now()) {
            reply.error(e.errno());
            return;
        }
        match self.ops.getattr(&child_path) {
            Ok(attr) => {
                let ino = index_to_ino(self.ops.ctx.resolve_final(&child_path).unwrap());
                self.remember(parent, name, ino);
                reply.created(&TTL, &to_file_attr(ino, &attr), 0, 0, 0);
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(name) = name.to_str() else {
            reply.error(ENOENT);
            return;
        };
        trace!("unlink parent={parent} name={name}");
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(ENOENT);
            return;
        };
        match self.ops.unlink(&join(&parent_path, name)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
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
        trace!("read ino={ino} offset={offset} size={size}");
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        let mut buf = vec![0u8; size as usize];
        match self.ops.read(&path, &mut buf, offset as u64) {
            Ok(n) => reply.data(&buf[..n]),
            Err(e) => reply.error(e.errno()),
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
        trace!("write ino={ino} offset={offset} len={}", data.len());
        let Some(path) = self.path_of(ino) else {
            reply.error(ENOENT);
            return;
        };
        match self.ops.write(&path, data, offset as u64) {
            Ok(n) => reply.written(n as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        trace!("statfs ino={ino}");
        let s = self.ops.statfs();
        reply.statfs(
            s.blocks,
            s.bfree,
            s.bavail,
            s.files,
            s.ffree,
            s.bsize,
            s.namemax,
            0,
        );
    }
}

fn join(parent_path: &str, name: &str) -> String {
    if parent_path == "/" {
        format!("/{name}")
    } else {
        format!("{parent_path}/{name}")
    }
}
