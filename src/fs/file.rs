//! File engine: grows and shrinks a file's logical size over zero-filled
//! storage, and serves positional reads and writes against it.

use crate::error::{FsError, FsResult};
use crate::fs::context::FsContext;
use crate::fs::inode::Inode;
use crate::layout::{BLOCK_SIZE, EXTS_MAX};

impl FsContext {
    /// Grows `inode`'s logical size by `additional` bytes, allocating and
    /// zeroing whatever new blocks are needed. Never writes caller data;
    /// callers that need to place bytes do so afterward into the
    /// zero-initialized range this reserved.
    pub fn extend_file(&mut self, inode: &mut Inode, mut additional: u64) -> FsResult<()> {
        if additional == 0 {
            return Ok(());
        }
        self.ensure_extent_block(inode)?;

        while additional > 0 {
            let add = if inode.size % BLOCK_SIZE as u64 == 0 {
                let need = div_ceil(additional, BLOCK_SIZE as u64) as u32;
                let hint = self
                    .last_data_block(inode)
                    .map(|b| b - self.sb.first_data_blk + 1)
                    .unwrap_or(0);
                let free = self.sb.free_data_blocks_count as usize;

                let (idx, alloc_count) =
                    match self.data_bitmap_mut().find_contiguous_from(hint as usize, need as usize, free) {
                        Ok(idx) => (idx as u32, need),
                        Err(FsError::NotFound) => {
                            let idx = self.data_bitmap_mut().find_contiguous_from(hint as usize, 1, free)?;
                            (idx as u32, 1)
                        }
                        Err(e) => return Err(e),
                    };

                if inode.extents_count as usize + 1 > EXTS_MAX {
                    return Err(FsError::NoSpace);
                }

                self.initialize_range(inode, idx, alloc_count);
                let bn = self.data_blk(idx);
                self.append_extent(inode, bn, alloc_count);
                (alloc_count as u64 * BLOCK_SIZE as u64).min(additional)
            } else {
                let leftover = BLOCK_SIZE as u64 - (inode.size % BLOCK_SIZE as u64);
                leftover.min(additional)
            };

            inode.size += add;
            additional -= add;
        }

        self.write_inode(inode);
        Ok(())
    }

    /// Shrinks `inode`'s logical size by `unwanted` bytes, releasing
    /// trailing blocks (and the extent-pointer block, if it empties) as
    /// they're vacated.
    pub fn shrink_file(&mut self, inode: &mut Inode, mut unwanted: u64) -> FsResult<()> {
        if inode.extents_blk.is_none() || inode.extents_count == 0 || inode.size == 0 {
            return Err(FsError::NoSpace);
        }

        while unwanted > 0 {
            let tail = match inode.size % BLOCK_SIZE as u64 {
                0 => BLOCK_SIZE as u64,
                n => n,
            };
            let drop = tail.min(unwanted);
            inode.size -= drop;
            unwanted -= drop;

            if inode.size % BLOCK_SIZE as u64 == 0 {
                let last = self.last_data_block(inode).expect("non-empty file has a last block");
                self.free_data_block(inode, last);
                self.shrink_tail(inode);
            }
        }

        self.write_inode(inode);
        Ok(())
    }

    /// Positional read. Returns the number of bytes actually copied into
    /// `buf`; the bridge guarantees `[offset, offset + buf.len())` falls
    /// inside a single block.
    pub fn read_file(&self, inode: &Inode, buf: &mut [u8], offset: u64) -> usize {
        if offset > inode.size || inode.size == 0 || inode.extents_count == 0 {
            return 0;
        }
        let eof_ptr = self.offset_to_ptr(inode, inode.size).expect("non-empty file has an eof pointer");
        let off_ptr = self.offset_to_ptr(inode, offset).expect("offset within size has a pointer");
        let readable = eof_ptr - off_ptr;
        let n = readable.min(buf.len());
        buf[..n].copy_from_slice(&self.image[off_ptr..off_ptr + n]);
        n
    }

    /// Positional write. Extends the file to cover any hole before
    /// `offset` and to make room for `buf`, then copies `buf` in. The
    /// bridge guarantees `[offset, offset + buf.len())` falls inside a
    /// single block.
    pub fn write_file(&mut self, inode: &mut Inode, buf: &[u8], offset: u64) -> FsResult<usize> {
        if offset > inode.size {
            self.extend_file(inode, offset - inode.size)?;
        }
        let eof_ptr = self.offset_to_ptr(inode, inode.size).expect("extended file has an eof pointer");
        self.extend_file(inode, buf.len() as u64)?;
        self.image.as_mut()[eof_ptr..eof_ptr + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }
}

fn div_ceil(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}
