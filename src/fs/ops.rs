//! Operation surface: the twelve calls a bridge driver dispatches against a
//! mounted image, built entirely out of the engines in the sibling modules.

use crate::error::{FsError, FsResult};
use crate::fs::context::FsContext;
use crate::fs::inode::Inode;
use crate::fs::path::split_last_component;
use crate::layout::{BLOCK_SIZE, NAME_MAX};

/// A stat-shaped view of an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr {
    pub mode: u32,
    pub links: u32,
    pub size: u64,
    pub mtime_sec: i64,
    pub mtime_nsec: u32,
    pub blocks_512: u64,
}

/// A statvfs-shaped view of the superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statfs {
    pub bsize: u32,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub namemax: u32,
}

/// Either use the caller-supplied timestamp, or resolve to "now" — mirrors
/// the `UTIME_NOW` sentinel `utimensat` accepts for each of a file's two
/// settable timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeArg {
    Now,
    Set(i64, u32),
}

/// The twelve operations, dispatched against a single mounted image.
pub struct Ops {
    pub ctx: FsContext,
}

impl Ops {
    pub fn new(ctx: FsContext) -> Self {
        Ops { ctx }
    }

    pub fn statfs(&self) -> Statfs {
        let sb = &self.ctx.sb;
        Statfs {
            bsize: BLOCK_SIZE as u32,
            blocks: sb.blocks_count as u64,
            bfree: sb.free_data_blocks_count as u64,
            bavail: sb.free_data_blocks_count as u64,
            files: sb.inodes_count as u64,
            ffree: sb.free_inodes_count as u64,
            namemax: NAME_MAX as u32,
        }
    }

    pub fn getattr(&self, path: &str) -> FsResult<Attr> {
        let ino = self.ctx.resolve_final(path)?;
        let inode = self.ctx.read_inode(ino);
        Ok(attr_of(&inode))
    }

    /// Always yields `.` and `..` first, then every entry in storage order.
    /// Stops and propagates `OUT_OF_MEMORY` the moment `visitor` rejects an
    /// entry, signalling a full readdir buffer upstream.
    pub fn readdir(&self, path: &str, mut visitor: impl FnMut(&str) -> bool) -> FsResult<()> {
        let ino = self.ctx.resolve_final(path)?;
        let inode = self.ctx.read_inode(ino);
        if !inode.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if !visitor(".") || !visitor("..") {
            return Err(FsError::OutOfMemory);
        }
        self.ctx.iterate_names(&inode, &mut visitor)
    }

    pub fn mkdir(&mut self, path: &str, mode: u32, now: (i64, u32)) -> FsResult<()> {
        let parent_ino = self.ctx.resolve_parent(path)?;
        let name = split_last_component(path)?;
        let mut parent = self.ctx.read_inode(parent_ino);
        if !parent.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let dir_mode = (mode & 0o7777) | libc::S_IFDIR as u32;
        let dir = self.ctx.allocate_inode(dir_mode, 2, now.0, now.1)?;
        self.ctx.append_dentry(&mut parent, dir.index, &name)?;

        parent.links += 1;
        self.ctx.write_inode(&parent);
        self.ctx.sb.used_dirs_count += 1;
        self.ctx.flush_sb();
        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        let ino = self.ctx.resolve_final(path)?;
        let target = self.ctx.read_inode(ino);
        if !target.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if target.size != 0 {
            return Err(FsError::NotEmpty);
        }
        self.ctx.free_inode(target.index);

        let parent_ino = self.ctx.resolve_parent(path)?;
        let name = split_last_component(path)?;
        let mut parent = self.ctx.read_inode(parent_ino);
        self.ctx.remove_dentry_releasing_tail(&mut parent, &name);
        parent.links -= 1;
        self.ctx.write_inode(&parent);
        self.ctx.sb.used_dirs_count -= 1;
        self.ctx.flush_sb();
        Ok(())
    }

    pub fn create(&mut self, path: &str, mode: u32, now: (i64, u32)) -> FsResult<()> {
        let parent_ino = self.ctx.resolve_parent(path)?;
        let name = split_last_component(path)?;
        let mut parent = self.ctx.read_inode(parent_ino);
        if !parent.is_dir() {
            return Err(FsError::NotADirectory);
        }

        let file_mode = (mode & 0o7777) | libc::S_IFREG as u32;
        let file = self.ctx.allocate_inode(file_mode, 1, now.0, now.1)?;
        self.ctx.append_dentry(&mut parent, file.index, &name)?;
        Ok(())
    }

    pub fn unlink(&mut self, path: &str) -> FsResult<()> {
        let ino = self.ctx.resolve_final(path)?;
        let mut target = self.ctx.read_inode(ino);
        if target.size > 0 {
            self.ctx
                .shrink_file(&mut target, target.size)
                .expect("shrinking a non-empty file to zero never fails");
        }
        self.ctx.free_inode(target.index);

        let parent_ino = self.ctx.resolve_parent(path)?;
        let name = split_last_component(path)?;
        let mut parent = self.ctx.read_inode(parent_ino);
        self.ctx.remove_dentry_releasing_tail(&mut parent, &name);
        Ok(())
    }

    pub fn utimens(&mut self, path: &str, spec: TimeArg, now: (i64, u32)) -> FsResult<()> {
        let ino = self.ctx.resolve_final(path)?;
        let mut inode = self.ctx.read_inode(ino);
        let (sec, nsec) = match spec {
            TimeArg::Now => now,
            TimeArg::Set(sec, nsec) => (sec, nsec),
        };
        inode.mtime_sec = sec;
        inode.mtime_nsec = nsec;
        self.ctx.write_inode(&inode);
        Ok(())
    }

    pub fn truncate(&mut self, path: &str, new_size: u64) -> FsResult<()> {
        let ino = self.ctx.resolve_final(path)?;
        let mut inode = self.ctx.read_inode(ino);
        if new_size > inode.size {
            self.ctx.extend_file(&mut inode, new_size - inode.size)?;
        } else if new_size < inode.size {
            self.ctx.shrink_file(&mut inode, inode.size - new_size)?;
        }
        Ok(())
    }

    pub fn read(&self, path: &str, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let ino = self.ctx.resolve_final(path)?;
        let inode = self.ctx.read_inode(ino);
        Ok(self.ctx.read_file(&inode, buf, offset))
    }

    pub fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> FsResult<usize> {
        let ino = self.ctx.resolve_final(path)?;
        let mut inode = self.ctx.read_inode(ino);
        self.ctx.write_file(&mut inode, buf, offset)
    }

    /// Flushes the image. Idempotent; safe to call once per unmount.
    pub fn destroy(&mut self) {
        let _ = self.ctx.image.flush();
    }
}

fn attr_of(inode: &Inode) -> Attr {
    Attr {
        mode: inode.mode,
        links: inode.links,
        size: inode.size,
        mtime_sec: inode.mtime_sec,
        mtime_nsec: inode.mtime_nsec,
        blocks_512: (inode.used_blocks_count as u64 * BLOCK_SIZE as u64) / 512,
    }
}

impl FsContext {
    /// Removes `name` from `parent`, releasing the trailing data block too
    /// if doing so emptied it. No-op if `name` isn't present.
    fn remove_dentry_releasing_tail(&mut self, parent: &mut Inode, name: &str) {
        let before = parent.size;
        self.remove_dentry(parent, name);
        if parent.size < before && parent.size % BLOCK_SIZE as u64 == 0 {
            let last = self
                .last_data_block(parent)
                .expect("a directory that just lost an entry still owns a block");
            self.free_data_block(parent, last);
            self.shrink_tail(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::test_support::mounted_context;

    fn ops() -> Ops {
        Ops::new(mounted_context(256, 64))
    }

    #[test]
    fn create_then_getattr_matches_scenario() {
        let mut ops = ops();
        ops.create("/f", 0o644, (0, 0)).unwrap();
        let attr = ops.getattr("/f").unwrap();
        assert_eq!(attr.mode & libc::S_IFMT, libc::S_IFREG as u32);
        assert_eq!(attr.size, 0);
        assert_eq!(attr.links, 1);
    }

    #[test]
    fn mkdir_and_rmdir_restore_counters() {
        let mut ops = ops();
        let free_inodes_before = ops.ctx.sb.free_inodes_count;
        let free_blocks_before = ops.ctx.sb.free_data_blocks_count;

        ops.mkdir("/a", 0o755, (0, 0)).unwrap();
        ops.rmdir("/a").unwrap();

        assert_eq!(ops.ctx.sb.free_inodes_count, free_inodes_before);
        assert_eq!(ops.ctx.sb.free_data_blocks_count, free_blocks_before);
    }

    #[test]
    fn make_and_list_scenario() {
        let mut ops = ops();
        ops.mkdir("/a", 0o755, (0, 0)).unwrap();
        ops.mkdir("/b", 0o755, (0, 0)).unwrap();
        ops.mkdir("/a/c", 0o755, (0, 0)).unwrap();

        let mut root_entries = Vec::new();
        ops.readdir("/", |name| {
            root_entries.push(name.to_string());
            true
        })
        .unwrap();
        assert_eq!(root_entries, vec![".", "..", "a", "b"]);

        let mut a_entries = Vec::new();
        ops.readdir("/a", |name| {
            a_entries.push(name.to_string());
            true
        })
        .unwrap();
        assert_eq!(a_entries, vec![".", "..", "c"]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut ops = ops();
        ops.create("/f", 0o644, (0, 0)).unwrap();
        let n = ops.write("/f", b"hello", 0).unwrap();
        assert_eq!(n, 5);

        let mut out = [0u8; 5];
        assert_eq!(ops.read("/f", &mut out, 0).unwrap(), 5);
        assert_eq!(&out, b"hello");
        assert_eq!(ops.getattr("/f").unwrap().size, 5);
    }

    #[test]
    fn write_into_a_hole_zero_fills() {
        let mut ops = ops();
        ops.create("/g", 0o644, (0, 0)).unwrap();
        ops.write("/g", b"Z", 4096).unwrap();
        assert_eq!(ops.getattr("/g").unwrap().size, 4097);

        let mut out = [0xFFu8; 1];
        assert_eq!(ops.read("/g", &mut out, 0).unwrap(), 1);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn shrink_releases_blocks_back_to_the_pool() {
        let mut ops = ops();
        ops.create("/h", 0o644, (0, 0)).unwrap();
        ops.truncate("/h", 3 * BLOCK_SIZE as u64).unwrap();
        let free_after_grow = ops.ctx.sb.free_data_blocks_count;

        ops.truncate("/h", 0).unwrap();
        assert_eq!(ops.ctx.sb.free_data_blocks_count, free_after_grow + 4);

        // idempotent on repeat
        ops.truncate("/h", 0).unwrap();
        assert_eq!(ops.ctx.sb.free_data_blocks_count, free_after_grow + 4);
    }

    #[test]
    fn rmdir_non_empty_is_rejected_and_leaves_child_untouched() {
        let mut ops = ops();
        ops.mkdir("/a", 0o755, (0, 0)).unwrap();
        ops.mkdir("/a/c", 0o755, (0, 0)).unwrap();

        assert_eq!(ops.rmdir("/a"), Err(FsError::NotEmpty));
        assert!(ops.getattr("/a/c").unwrap().mode & libc::S_IFMT == libc::S_IFDIR as u32);
    }

    #[test]
    fn utimens_now_and_explicit() {
        let mut ops = ops();
        ops.create("/f", 0o644, (0, 0)).unwrap();

        ops.utimens("/f", TimeArg::Set(123, 456), (999, 0)).unwrap();
        assert_eq!(ops.getattr("/f").unwrap().mtime_sec, 123);

        ops.utimens("/f", TimeArg::Now, (999, 1)).unwrap();
        let attr = ops.getattr("/f").unwrap();
        assert_eq!(attr.mtime_sec, 999);
        assert_eq!(attr.mtime_nsec, 1);
    }

    #[test]
    fn format_and_mount_scenario_reports_expected_counts() {
        let ops = Ops::new(mounted_context(256, 64));
        let stat = ops.statfs();
        assert_eq!(stat.blocks, 256);
        assert_eq!(stat.files, 64);
        assert_eq!(stat.ffree, 63);
    }
}
