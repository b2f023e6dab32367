//! Inode record: one fixed-size entry in the inode table per file or
//! directory.

/// Encoded size of one inode, in bytes. Must evenly divide the block size.
pub const INODE_SIZE: usize = 64;

const _: () = assert!(crate::layout::BLOCK_SIZE % INODE_SIZE == 0);

/// In-memory decoded inode. `extents_blk` replaces the on-disk `-1` sentinel
/// with `Option<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub mode: u32,
    pub links: u32,
    pub size: u64,
    pub mtime_sec: i64,
    pub mtime_nsec: u32,
    pub index: u32,
    pub used_blocks_count: u32,
    pub extents_blk: Option<u32>,
    pub extents_count: u32,
}

impl Inode {
    pub fn new(mode: u32, links: u32, index: u32, mtime_sec: i64, mtime_nsec: u32) -> Self {
        Inode {
            mode,
            links,
            size: 0,
            mtime_sec,
            mtime_nsec,
            index,
            used_blocks_count: 0,
            extents_blk: None,
            extents_count: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        (self.mode as libc::mode_t) & libc::S_IFMT == libc::S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        (self.mode as libc::mode_t) & libc::S_IFMT == libc::S_IFREG
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mode = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let links = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let mtime_sec = i64::from_le_bytes(buf[16..24].try_into().unwrap());
        let mtime_nsec = u32::from_le_bytes(buf[24..28].try_into().unwrap());
        let index = u32::from_le_bytes(buf[28..32].try_into().unwrap());
        let used_blocks_count = u32::from_le_bytes(buf[32..36].try_into().unwrap());
        let extents_blk_raw = i32::from_le_bytes(buf[36..40].try_into().unwrap());
        let extents_count = u32::from_le_bytes(buf[40..44].try_into().unwrap());
        Inode {
            mode,
            links,
            size,
            mtime_sec,
            mtime_nsec,
            index,
            used_blocks_count,
            extents_blk: if extents_blk_raw < 0 {
                None
            } else {
                Some(extents_blk_raw as u32)
            },
            extents_count,
        }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.mode.to_le_bytes());
        buf[4..8].copy_from_slice(&self.links.to_le_bytes());
        buf[8..16].copy_from_slice(&self.size.to_le_bytes());
        buf[16..24].copy_from_slice(&self.mtime_sec.to_le_bytes());
        buf[24..28].copy_from_slice(&self.mtime_nsec.to_le_bytes());
        buf[28..32].copy_from_slice(&self.index.to_le_bytes());
        buf[32..36].copy_from_slice(&self.used_blocks_count.to_le_bytes());
        let extents_blk_raw: i32 = self.extents_blk.map(|b| b as i32).unwrap_or(-1);
        buf[36..40].copy_from_slice(&extents_blk_raw.to_le_bytes());
        buf[40..44].copy_from_slice(&self.extents_count.to_le_bytes());
        buf[44..INODE_SIZE].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes_including_sentinel() {
        let mut ino = Inode::new(libc::S_IFREG as u32 | 0o644, 1, 5, 1_700_000_000, 42);
        ino.used_blocks_count = 3;
        ino.extents_count = 1;
        ino.extents_blk = Some(7);

        let mut buf = [0xAAu8; INODE_SIZE];
        ino.write_to(&mut buf);
        let decoded = Inode::decode(&buf);
        assert_eq!(ino, decoded);
        assert!(decoded.is_file());
        assert!(!decoded.is_dir());

        let empty = Inode::new(libc::S_IFDIR as u32 | 0o777, 2, 0, 0, 0);
        let mut buf2 = [0u8; INODE_SIZE];
        empty.write_to(&mut buf2);
        let decoded2 = Inode::decode(&buf2);
        assert_eq!(decoded2.extents_blk, None);
        assert!(decoded2.is_dir());
    }
}
