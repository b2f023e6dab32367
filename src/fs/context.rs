//! Image context: a derived view over the mapped image exposing the
//! superblock, inode bitmap, data bitmap, inode table, and data region. No
//! allocation happens here; this is purely a set of typed accessors over a
//! bounded byte slice.

use crate::error::{FsError, FsResult};
use crate::fs::bitmap::BitmapMut;
use crate::fs::inode::{Inode, INODE_SIZE};
use crate::fs::superblock::{Superblock, SUPERBLOCK_SIZE};
use crate::image::Image;
use crate::layout::BLOCK_SIZE;

pub struct FsContext {
    pub image: Image,
    pub sb: Superblock,
}

impl FsContext {
    /// Mounts the context over an already-formatted image.
    pub fn mount(image: Image) -> FsResult<Self> {
        let sb = Superblock::decode(&image[..SUPERBLOCK_SIZE]);
        if !sb.is_valid() {
            return Err(FsError::InvalidImage);
        }
        Ok(FsContext { image, sb })
    }

    /// Writes the cached superblock back to block 0. Called after any
    /// operation that changes a superblock counter.
    pub fn flush_sb(&mut self) {
        let buf = self.block_mut(0);
        self.sb.write_to(&mut buf[..SUPERBLOCK_SIZE]);
    }

    pub fn block_offset(&self, bn: u32) -> usize {
        bn as usize * BLOCK_SIZE
    }

    pub fn block(&self, bn: u32) -> &[u8] {
        let off = self.block_offset(bn);
        &self.image[off..off + BLOCK_SIZE]
    }

    pub fn block_mut(&mut self, bn: u32) -> &mut [u8] {
        let off = self.block_offset(bn);
        self.image.as_mut()[off..off + BLOCK_SIZE].as_mut()
    }

    pub fn zero_block(&mut self, bn: u32) {
        self.block_mut(bn).fill(0);
    }

    pub fn inode_bitmap_mut(&mut self) -> BitmapMut<'_> {
        let start = self.block_offset(self.sb.inode_bitmap_blk);
        let blocks = div_ceil(self.sb.inodes_count as usize, BLOCK_SIZE * 8);
        let cap = self.sb.inodes_count as usize;
        BitmapMut::new(
            &mut self.image.as_mut()[start..start + blocks * BLOCK_SIZE],
            cap,
        )
    }

    pub fn data_bitmap_mut(&mut self) -> BitmapMut<'_> {
        let start = self.block_offset(self.sb.data_bitmap_blk);
        let blocks = div_ceil(self.sb.data_blocks_count as usize, BLOCK_SIZE * 8);
        let cap = self.sb.data_blocks_count as usize;
        BitmapMut::new(
            &mut self.image.as_mut()[start..start + blocks * BLOCK_SIZE],
            cap,
        )
    }

    fn inode_offset(&self, ino: u32) -> usize {
        self.block_offset(self.sb.inode_table_blk) + ino as usize * INODE_SIZE
    }

    pub fn read_inode(&self, ino: u32) -> Inode {
        let off = self.inode_offset(ino);
        Inode::decode(&self.image[off..off + INODE_SIZE])
    }

    pub fn write_inode(&mut self, inode: &Inode) {
        let off = self.inode_offset(inode.index);
        inode.write_to(&mut self.image.as_mut()[off..off + INODE_SIZE]);
    }

    /// Converts a data-block index (relative to the start of the data
    /// region) to its absolute block number in the image.
    pub fn data_blk(&self, data_index: u32) -> u32 {
        self.sb.first_data_blk + data_index
    }

    /// Allocates a fresh inode bit, initializes the record at that index,
    /// and charges the superblock's free-inode counter.
    pub fn allocate_inode(
        &mut self,
        mode: u32,
        links: u32,
        mtime_sec: i64,
        mtime_nsec: u32,
    ) -> FsResult<Inode> {
        let index = self.inode_bitmap_mut().allocate_one()? as u32;
        let inode = Inode::new(mode, links, index, mtime_sec, mtime_nsec);
        self.write_inode(&inode);
        self.sb.free_inodes_count -= 1;
        self.flush_sb();
        Ok(inode)
    }

    /// Releases an inode's bit and credits the free-inode counter. Callers
    /// must have already released all of the inode's data blocks.
    pub fn free_inode(&mut self, index: u32) {
        self.inode_bitmap_mut().clear_at(index as usize);
        self.sb.free_inodes_count += 1;
        self.flush_sb();
    }
}

fn div_ceil(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

#[cfg(test)]
mod tests {
    use super::test_support::mounted_context;

    #[test]
    fn allocate_and_free_inode_round_trip() {
        let mut ctx = mounted_context(64, 16);
        let free_before = ctx.sb.free_inodes_count;

        let inode = ctx.allocate_inode(libc::S_IFREG as u32 | 0o644, 1, 1_000, 0).unwrap();
        assert_eq!(inode.index, 1);
        assert_eq!(ctx.sb.free_inodes_count, free_before - 1);
        assert!(ctx.inode_bitmap_mut().get(1));

        ctx.free_inode(1);
        assert_eq!(ctx.sb.free_inodes_count, free_before);
        assert!(!ctx.inode_bitmap_mut().get(1));
    }
}
