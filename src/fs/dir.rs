//! Directory engine: a directory's body is a dense packed array of
//! [`Dentry`] records. Slot `size / DENTRY_SIZE` is always the next free
//! slot; removal keeps the array dense by swapping the removed entry with
//! the last one instead of leaving a hole.

use crate::error::{FsError, FsResult};
use crate::fs::context::FsContext;
use crate::fs::dentry::Dentry;
use crate::fs::inode::Inode;
use crate::layout::{DENTRIES_PER_BLOCK, DENTRY_SIZE, EXTS_MAX};

impl FsContext {
    /// Absolute block number of the `block_index`-th data block owned by
    /// `inode`, counting across all of its extents in order.
    fn block_for_index(&self, inode: &Inode, block_index: u32) -> u32 {
        let mut skipped = 0u32;
        for ext in self.extents(inode) {
            if block_index < skipped + ext.count {
                return ext.start + (block_index - skipped);
            }
            skipped += ext.count;
        }
        unreachable!("block_index out of range for inode's extents")
    }

    fn dentry_slot_location(&self, parent: &Inode, slot: u32) -> (u32, u32) {
        let blk = slot / DENTRIES_PER_BLOCK as u32;
        let within = slot % DENTRIES_PER_BLOCK as u32;
        (self.block_for_index(parent, blk), within)
    }

    fn read_dentry(&self, parent: &Inode, slot: u32) -> Dentry {
        let (bn, within) = self.dentry_slot_location(parent, slot);
        let buf = self.block(bn);
        Dentry::decode(&buf[within as usize * DENTRY_SIZE..])
    }

    fn write_dentry(&mut self, parent: &Inode, slot: u32, dentry: &Dentry) {
        let (bn, within) = self.dentry_slot_location(parent, slot);
        let buf = self.block_mut(bn);
        dentry.write_to(&mut buf[within as usize * DENTRY_SIZE..][..DENTRY_SIZE]);
    }

    /// Appends a new dentry to `parent`, allocating a new data block first
    /// if the current one is full.
    pub fn append_dentry(&mut self, parent: &mut Inode, ino: u32, name: &str) -> FsResult<()> {
        let slot = (parent.size / DENTRY_SIZE as u64) as u32;
        if slot % DENTRIES_PER_BLOCK as u32 == 0 {
            self.ensure_extent_block(parent)?;
            if parent.extents_count as usize >= EXTS_MAX {
                return Err(FsError::NoSpace);
            }
            let hint = self
                .last_data_block(parent)
                .map(|b| b - self.sb.first_data_blk + 1)
                .unwrap_or(0);
            let free = self.sb.free_data_blocks_count as usize;
            let idx = self.data_bitmap_mut().find_contiguous_from(hint as usize, 1, free)? as u32;
            self.initialize_range(parent, idx, 1);
            let bn = self.data_blk(idx);
            self.append_extent(parent, bn, 1);
        }
        self.write_dentry(parent, slot, &Dentry {
            ino,
            name: name.to_string(),
        });
        parent.size += DENTRY_SIZE as u64;
        self.write_inode(parent);
        Ok(())
    }

    /// Invokes `visitor` with each entry's name, in storage order. Stops
    /// and returns `OUT_OF_MEMORY` the first time `visitor` returns `false`.
    pub fn iterate_names(
        &self,
        parent: &Inode,
        mut visitor: impl FnMut(&str) -> bool,
    ) -> FsResult<()> {
        let total = (parent.size / DENTRY_SIZE as u64) as u32;
        for slot in 0..total {
            let dentry = self.read_dentry(parent, slot);
            if !visitor(&dentry.name) {
                return Err(FsError::OutOfMemory);
            }
        }
        Ok(())
    }

    /// Finds `name` in `parent`'s body. `parent` must be a directory.
    pub fn lookup_dentry(&self, parent: &Inode, name: &str) -> FsResult<u32> {
        if !parent.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let total = (parent.size / DENTRY_SIZE as u64) as u32;
        for slot in 0..total {
            let dentry = self.read_dentry(parent, slot);
            if dentry.name == name {
                return Ok(dentry.ino);
            }
        }
        Err(FsError::NotFound)
    }

    /// Removes the dentry named `name` by overwriting it with the last
    /// dentry in the directory, then shrinking `size`. Leaves the
    /// directory untouched if `name` isn't present. The caller is
    /// responsible for releasing the trailing block if this empties it
    /// (compare `parent.size % BLOCK_SIZE` before and after).
    pub fn remove_dentry(&mut self, parent: &mut Inode, name: &str) {
        let total = (parent.size / DENTRY_SIZE as u64) as u32;
        let mut found = None;
        for slot in 0..total {
            if self.read_dentry(parent, slot).name == name {
                found = Some(slot);
                break;
            }
        }
        let Some(slot) = found else { return };
        let last_slot = total - 1;
        if slot != last_slot {
            let last = self.read_dentry(parent, last_slot);
            self.write_dentry(parent, slot, &last);
        }
        parent.size -= DENTRY_SIZE as u64;
        self.write_inode(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::test_support::mounted_context;

    #[test]
    fn append_lookup_and_swap_remove() {
        let mut ctx = mounted_context(64, 16);
        let mut root = ctx.read_inode(0);
        ctx.append_dentry(&mut root, 1, "a").unwrap();
        ctx.append_dentry(&mut root, 2, "b").unwrap();
        ctx.append_dentry(&mut root, 3, "c").unwrap();

        assert_eq!(ctx.lookup_dentry(&root, "b").unwrap(), 2);
        assert_eq!(ctx.lookup_dentry(&root, "zzz"), Err(FsError::NotFound));

        ctx.remove_dentry(&mut root, "a");
        assert_eq!(root.size / DENTRY_SIZE as u64, 2);
        // "c" should have been swapped into "a"'s old slot.
        assert_eq!(ctx.lookup_dentry(&root, "c").unwrap(), 3);
        assert_eq!(ctx.lookup_dentry(&root, "b").unwrap(), 2);
    }

    #[test]
    fn remove_missing_name_is_a_no_op() {
        let mut ctx = mounted_context(64, 16);
        let mut root = ctx.read_inode(0);
        ctx.append_dentry(&mut root, 1, "a").unwrap();
        let size_before = root.size;
        ctx.remove_dentry(&mut root, "nope");
        assert_eq!(root.size, size_before);
    }

    #[test]
    fn filling_sixteen_slots_allocates_a_new_block_on_next_append() {
        let mut ctx = mounted_context(64, 16);
        let mut root = ctx.read_inode(0);
        for i in 0..DENTRIES_PER_BLOCK {
            ctx.append_dentry(&mut root, i as u32 + 1, &format!("f{i}")).unwrap();
        }
        assert_eq!(ctx.extents(&root).iter().map(|e| e.count).sum::<u32>(), 1);
        ctx.append_dentry(&mut root, 99, "overflow").unwrap();
        assert_eq!(ctx.extents(&root).iter().map(|e| e.count).sum::<u32>(), 2);
    }

    #[test]
    fn iterate_names_stops_when_visitor_rejects() {
        let mut ctx = mounted_context(64, 16);
        let mut root = ctx.read_inode(0);
        ctx.append_dentry(&mut root, 1, "a").unwrap();
        ctx.append_dentry(&mut root, 2, "b").unwrap();
        let mut seen = 0;
        let res = ctx.iterate_names(&root, |_name| {
            seen += 1;
            seen < 1
        });
        assert_eq!(res, Err(FsError::OutOfMemory));
        assert_eq!(seen, 1);
    }
}
