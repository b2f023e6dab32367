//! Formatter: lays out a fresh superblock, bitmaps, and inode table across a
//! freshly sized image and allocates the root directory.

use crate::error::{FsError, FsResult};
use crate::fs::bitmap::BitmapMut;
use crate::fs::inode::{Inode, INODE_SIZE};
use crate::fs::superblock::{Superblock, SUPERBLOCK_SIZE};
use crate::layout::{BLOCK_SIZE, MAGIC, ROOT_INO};

fn div_ceil(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

/// Lays out and writes a complete file system image into `buf`, which must
/// already be sized to the image's final block count. `inodes` is the
/// requested inode count; `zero` additionally zeroes the data region (the
/// bitmaps and inode table are always zeroed regardless).
///
/// Rejects the request if there isn't enough room left for both a data
/// bitmap and at least one data block once the superblock, inode bitmap, and
/// inode table have claimed their share.
pub fn format_image(buf: &mut [u8], inodes: u32, zero: bool) -> FsResult<()> {
    let total_blocks = buf.len() / BLOCK_SIZE;
    if total_blocks == 0 {
        return Err(FsError::NoSpace);
    }

    let inode_bitmap_blocks = div_ceil(inodes as usize, BLOCK_SIZE * 8).max(1);
    let inode_table_blocks = div_ceil(inodes as usize * INODE_SIZE, BLOCK_SIZE).max(1);
    let fixed = 1 + inode_bitmap_blocks + inode_table_blocks;

    if total_blocks <= fixed + 1 {
        return Err(FsError::NoSpace);
    }
    let remaining = total_blocks - fixed;

    // Find the smallest data bitmap size that can address every block left
    // over once it has claimed its own share of `remaining`.
    let mut data_bitmap_blocks = 1usize;
    loop {
        let data_blocks_count = remaining - data_bitmap_blocks;
        if data_blocks_count <= data_bitmap_blocks * BLOCK_SIZE * 8 {
            break;
        }
        data_bitmap_blocks += 1;
    }
    let data_blocks_count = remaining - data_bitmap_blocks;
    if data_blocks_count == 0 {
        return Err(FsError::NoSpace);
    }

    let inode_bitmap_blk = 1u32;
    let data_bitmap_blk = inode_bitmap_blk + inode_bitmap_blocks as u32;
    let inode_table_blk = data_bitmap_blk + data_bitmap_blocks as u32;
    let first_data_blk = inode_table_blk + inode_table_blocks as u32;

    let sb = Superblock {
        magic: MAGIC,
        size: buf.len() as u64,
        inodes_count: inodes,
        blocks_count: total_blocks as u32,
        data_blocks_count: data_blocks_count as u32,
        free_inodes_count: inodes - 1,
        free_data_blocks_count: data_blocks_count as u32,
        inode_bitmap_blk,
        data_bitmap_blk,
        inode_table_blk,
        first_data_blk,
        inode_size: INODE_SIZE as u64,
        used_dirs_count: 1,
    };
    sb.write_to(&mut buf[..SUPERBLOCK_SIZE]);

    if zero {
        let data_start = first_data_blk as usize * BLOCK_SIZE;
        buf[data_start..].fill(0);
    }

    {
        let start = inode_bitmap_blk as usize * BLOCK_SIZE;
        let end = start + inode_bitmap_blocks * BLOCK_SIZE;
        buf[start..end].fill(0);
        let mut inode_bitmap = BitmapMut::new(&mut buf[start..end], inodes as usize);
        inode_bitmap.set_at(ROOT_INO as usize);
    }

    {
        let start = data_bitmap_blk as usize * BLOCK_SIZE;
        let end = start + data_bitmap_blocks * BLOCK_SIZE;
        buf[start..end].fill(0);
    }

    {
        let start = inode_table_blk as usize * BLOCK_SIZE;
        let end = start + inode_table_blocks * BLOCK_SIZE;
        buf[start..end].fill(0);
    }

    let root = Inode::new(libc::S_IFDIR as u32 | 0o777, 2, ROOT_INO, 0, 0);
    let root_off = inode_table_blk as usize * BLOCK_SIZE + ROOT_INO as usize * INODE_SIZE;
    root.write_to(&mut buf[root_off..root_off + INODE_SIZE]);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::FsContext;
    use crate::image::Image;

    #[test]
    fn formats_a_valid_image_with_an_empty_root_dir() {
        let mut buf = vec![0xAAu8; 64 * BLOCK_SIZE];
        format_image(&mut buf, 16, false).unwrap();

        let ctx = FsContext::mount(Image::from_vec(buf)).unwrap();
        assert!(ctx.sb.is_valid());
        assert_eq!(ctx.sb.inodes_count, 16);
        assert_eq!(ctx.sb.free_inodes_count, 15);
        assert_eq!(ctx.sb.used_dirs_count, 1);
        assert!(ctx.sb.data_blocks_count > 0);

        let root = ctx.read_inode(ROOT_INO);
        assert!(root.is_dir());
        assert_eq!(root.links, 2);
        assert_eq!(root.size, 0);
    }

    #[test]
    fn rejects_images_too_small_to_hold_metadata_and_one_data_block() {
        let mut buf = vec![0u8; 2 * BLOCK_SIZE];
        assert_eq!(format_image(&mut buf, 16, false), Err(FsError::NoSpace));
    }

    #[test]
    fn zero_flag_clears_the_data_region() {
        let mut buf = vec![0xFFu8; 64 * BLOCK_SIZE];
        format_image(&mut buf, 16, true).unwrap();
        let ctx = FsContext::mount(Image::from_vec(buf)).unwrap();
        let data_start = ctx.block_offset(ctx.sb.first_data_blk);
        assert!(ctx.image[data_start..].iter().all(|&b| b == 0));
    }
}
