//! Extent-pointer block management: lazily allocate the single block an
//! inode uses to hold its extent array, append extents to it, and shrink or
//! release it as the file empties.

use crate::error::FsResult;
use crate::fs::context::FsContext;
use crate::fs::inode::Inode;
use crate::layout::EXTENT_SIZE;

/// A contiguous range of data blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub start: u32,
    pub count: u32,
}

impl Extent {
    fn decode(buf: &[u8]) -> Self {
        Extent {
            start: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            count: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
        }
    }

    fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.start.to_le_bytes());
        buf[4..8].copy_from_slice(&self.count.to_le_bytes());
    }
}

impl FsContext {
    fn extent_at(&self, exts_blk: u32, i: u32) -> Extent {
        let buf = self.block(exts_blk);
        Extent::decode(&buf[i as usize * EXTENT_SIZE..])
    }

    fn set_extent_at(&mut self, exts_blk: u32, i: u32, ext: Extent) {
        let buf = self.block_mut(exts_blk);
        ext.write_to(&mut buf[i as usize * EXTENT_SIZE..][..EXTENT_SIZE]);
    }

    /// All extents currently owned by `inode`, in order.
    pub fn extents(&self, inode: &Inode) -> Vec<Extent> {
        match inode.extents_blk {
            None => Vec::new(),
            Some(blk) => (0..inode.extents_count)
                .map(|i| self.extent_at(blk, i))
                .collect(),
        }
    }

    /// Allocates the extent-pointer block for `inode` if it doesn't have one
    /// yet. No-op if it already does.
    pub fn ensure_extent_block(&mut self, inode: &mut Inode) -> FsResult<()> {
        if inode.extents_blk.is_some() {
            return Ok(());
        }
        let index = self.data_bitmap_mut().allocate_one()?;
        let bn = self.data_blk(index as u32);
        self.zero_block(bn);
        inode.extents_blk = Some(bn);
        inode.used_blocks_count += 1;
        self.sb.free_data_blocks_count -= 1;
        self.flush_sb();
        self.write_inode(inode);
        Ok(())
    }

    /// Appends a new extent at the next free slot. Caller must guarantee
    /// `extents_count + 1 <= EXTS_MAX`.
    pub fn append_extent(&mut self, inode: &mut Inode, start: u32, count: u32) {
        let blk = inode.extents_blk.expect("extent block must exist");
        self.set_extent_at(blk, inode.extents_count, Extent { start, count });
        inode.extents_count += 1;
        self.write_inode(inode);
    }

    /// Decrements the trailing extent's block count by one; drops the
    /// extent entirely if it reaches zero, and releases the extent-pointer
    /// block if the inode has no extents left.
    pub fn shrink_tail(&mut self, inode: &mut Inode) {
        let blk = inode.extents_blk.expect("extent block must exist");
        let last_idx = inode.extents_count - 1;
        let mut last = self.extent_at(blk, last_idx);
        last.count -= 1;
        if last.count == 0 {
            inode.extents_count -= 1;
        } else {
            self.set_extent_at(blk, last_idx, last);
        }
        if inode.extents_count == 0 {
            self.free_data_block(inode, blk);
            inode.extents_blk = None;
        }
        self.write_inode(inode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::test_support::mounted_context;

    #[test]
    fn append_and_shrink_round_trip() {
        let mut ctx = mounted_context(64, 16);
        let mut ino = ctx.read_inode(0);
        ctx.ensure_extent_block(&mut ino).unwrap();
        let blk = ino.extents_blk.unwrap();

        ctx.append_extent(&mut ino, 20, 3);
        assert_eq!(ctx.extents(&ino), vec![Extent { start: 20, count: 3 }]);

        ctx.shrink_tail(&mut ino);
        assert_eq!(ctx.extents(&ino), vec![Extent { start: 20, count: 2 }]);
        ctx.shrink_tail(&mut ino);
        ctx.shrink_tail(&mut ino);
        assert!(ctx.extents(&ino).is_empty());
        assert_eq!(ino.extents_blk, None);
        assert!(!ctx.data_bitmap_mut().get(blk - ctx.sb.first_data_blk));
    }
}
