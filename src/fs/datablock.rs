//! Data-block engine: allocates and frees contiguous runs of data blocks on
//! behalf of an inode, and translates (inode, byte-offset) pairs into a
//! position inside the image.
//!
//! All block numbers this module hands back or accepts are absolute image
//! block numbers (i.e. already offset past the metadata regions), matching
//! what [`FsContext::block`] and [`FsContext::block_mut`] expect.

use crate::error::FsResult;
use crate::fs::context::FsContext;
use crate::fs::inode::Inode;
use crate::layout::BLOCK_SIZE;

impl FsContext {
    /// Allocates and zeroes `n` contiguous blocks starting at data-relative
    /// index `start`, charging them to `inode`.
    pub fn initialize_range(&mut self, inode: &mut Inode, start: u32, n: u32) {
        self.data_bitmap_mut().set_range(start as usize, n as usize);
        inode.used_blocks_count += n;
        self.sb.free_data_blocks_count -= n;
        self.flush_sb();
        for i in 0..n {
            let bn = self.data_blk(start + i);
            self.zero_block(bn);
        }
        self.write_inode(inode);
    }

    /// Releases one absolute block number previously charged to `inode`.
    pub fn free_data_block(&mut self, inode: &mut Inode, bn: u32) {
        let rel = bn - self.sb.first_data_blk;
        self.data_bitmap_mut().clear_at(rel as usize);
        inode.used_blocks_count -= 1;
        self.sb.free_data_blocks_count += 1;
        self.flush_sb();
    }

    /// The data-relative index of the first free-search hint for `inode`:
    /// the last block of its trailing extent, or (by convention) its
    /// extent-pointer block if it has no extents yet.
    pub fn last_data_block(&self, inode: &Inode) -> Option<u32> {
        if inode.extents_count == 0 {
            inode.extents_blk
        } else {
            let exts = self.extents(inode);
            let last = exts.last().unwrap();
            Some(last.start + last.count - 1)
        }
    }

    /// Translates a byte offset within `inode`'s body into an absolute byte
    /// offset into the image. Preserves one-past-the-end semantics when
    /// `byte_offset` lands exactly on a block boundary equal to the file
    /// size: the returned offset is the first byte past the block that
    /// ends there, which — because data blocks are laid out contiguously in
    /// the image — is a valid address even though it belongs to whichever
    /// block physically follows.
    pub fn offset_to_ptr(&self, inode: &Inode, byte_offset: u64) -> Option<usize> {
        if inode.extents_count == 0 {
            return None;
        }
        let blocks_to_skip = if byte_offset == 0 {
            0
        } else {
            ((byte_offset - 1) / BLOCK_SIZE as u64) as u32
        };
        let exts = self.extents(inode);
        let mut skipped = 0u32;
        for ext in exts {
            if blocks_to_skip < skipped + ext.count {
                let bn = ext.start + (blocks_to_skip - skipped);
                let in_block = if byte_offset != 0 && byte_offset % BLOCK_SIZE as u64 == 0 {
                    BLOCK_SIZE
                } else {
                    (byte_offset % BLOCK_SIZE as u64) as usize
                };
                return Some(self.block_offset(self.data_blk(bn)) + in_block);
            }
            skipped += ext.count;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::test_support::mounted_context;

    #[test]
    fn initialize_range_charges_inode_and_superblock() {
        let mut ctx = mounted_context(64, 16);
        let mut ino = ctx.read_inode(0);
        let free_before = ctx.sb.free_data_blocks_count;
        ctx.initialize_range(&mut ino, 0, 3);
        assert_eq!(ino.used_blocks_count, 3);
        assert_eq!(ctx.sb.free_data_blocks_count, free_before - 3);
        assert!(ctx.data_bitmap_mut().get(0));
        assert!(ctx.data_bitmap_mut().get(2));
    }

    #[test]
    fn offset_to_ptr_is_one_past_end_at_boundary() {
        let mut ctx = mounted_context(64, 16);
        let mut ino = ctx.read_inode(0);
        ctx.ensure_extent_block(&mut ino).unwrap();
        ctx.initialize_range(&mut ino, 0, 2);
        ctx.append_extent(&mut ino, ctx.data_blk(0), 2);
        ino = ctx.read_inode(0);

        let off0 = ctx.offset_to_ptr(&ino, 0).unwrap();
        assert_eq!(off0, ctx.block_offset(ctx.data_blk(0)));
        let off_boundary = ctx.offset_to_ptr(&ino, BLOCK_SIZE as u64).unwrap();
        assert_eq!(off_boundary, ctx.block_offset(ctx.data_blk(0)) + BLOCK_SIZE);
    }
}
