//! Superblock record: block 0 of the image, partially filled.

use crate::layout::MAGIC;

/// In-memory copy of the on-disk superblock. Decoded once at mount time and
/// re-encoded after every mutating operation via [`Superblock::write_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u64,
    pub size: u64,
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub data_blocks_count: u32,
    pub free_inodes_count: u32,
    pub free_data_blocks_count: u32,
    pub inode_bitmap_blk: u32,
    pub data_bitmap_blk: u32,
    pub inode_table_blk: u32,
    pub first_data_blk: u32,
    pub inode_size: u64,
    pub used_dirs_count: u32,
}

/// Encoded size of the superblock, in bytes.
pub const SUPERBLOCK_SIZE: usize = 60;

impl Superblock {
    pub fn decode(buf: &[u8]) -> Self {
        let mut off = 0;
        macro_rules! take8 {
            () => {{
                let v = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
                off += 8;
                v
            }};
        }
        macro_rules! take4 {
            () => {{
                let v = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
                off += 4;
                v
            }};
        }
        let magic = take8!();
        let size = take8!();
        let inodes_count = take4!();
        let blocks_count = take4!();
        let data_blocks_count = take4!();
        let free_inodes_count = take4!();
        let free_data_blocks_count = take4!();
        let inode_bitmap_blk = take4!();
        let data_bitmap_blk = take4!();
        let inode_table_blk = take4!();
        let first_data_blk = take4!();
        let inode_size = take8!();
        let used_dirs_count = take4!();
        Superblock {
            magic,
            size,
            inodes_count,
            blocks_count,
            data_blocks_count,
            free_inodes_count,
            free_data_blocks_count,
            inode_bitmap_blk,
            data_bitmap_blk,
            inode_table_blk,
            first_data_blk,
            inode_size,
            used_dirs_count,
        }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        let mut off = 0;
        macro_rules! put8 {
            ($v:expr) => {{
                buf[off..off + 8].copy_from_slice(&($v).to_le_bytes());
                off += 8;
            }};
        }
        macro_rules! put4 {
            ($v:expr) => {{
                buf[off..off + 4].copy_from_slice(&($v).to_le_bytes());
                off += 4;
            }};
        }
        put8!(self.magic);
        put8!(self.size);
        put4!(self.inodes_count);
        put4!(self.blocks_count);
        put4!(self.data_blocks_count);
        put4!(self.free_inodes_count);
        put4!(self.free_data_blocks_count);
        put4!(self.inode_bitmap_blk);
        put4!(self.data_bitmap_blk);
        put4!(self.inode_table_blk);
        put4!(self.first_data_blk);
        put8!(self.inode_size);
        put4!(self.used_dirs_count);
    }

    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let sb = Superblock {
            magic: MAGIC,
            size: 1 << 20,
            inodes_count: 64,
            blocks_count: 256,
            data_blocks_count: 200,
            free_inodes_count: 63,
            free_data_blocks_count: 199,
            inode_bitmap_blk: 1,
            data_bitmap_blk: 2,
            inode_table_blk: 3,
            first_data_blk: 10,
            inode_size: 64,
            used_dirs_count: 1,
        };
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        sb.write_to(&mut buf);
        let decoded = Superblock::decode(&buf);
        assert_eq!(sb, decoded);
        assert!(decoded.is_valid());
    }
}
