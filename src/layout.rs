//! On-disk layout constants shared by every module that encodes or decodes
//! a record. These mirror the fixed geometry of the image format and must
//! never change without breaking compatibility with existing images.

/// Unit of space allocation. Every file, directory, and metadata region
/// occupies an integral number of blocks of this size.
pub const BLOCK_SIZE: usize = 4096;

/// Magic value identifying a formatted image.
pub const MAGIC: u64 = 0xC5C3_69A1_C5C3_69A1;

/// Maximum length of a path component, including the NUL terminator.
pub const NAME_MAX: usize = 252;

/// Maximum length of an absolute path, including the NUL terminator.
pub const PATH_MAX: usize = 4096;

/// Size in bytes of one on-disk directory entry.
pub const DENTRY_SIZE: usize = 256;

/// Maximum directory entries packed into a single data block.
pub const DENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DENTRY_SIZE;

/// Maximum number of extents a single inode may own.
pub const EXTS_MAX: usize = 512;

/// Size in bytes of one on-disk extent record (start + count, both u32).
pub const EXTENT_SIZE: usize = 8;

/// Extents that fit in one extent-pointer block.
pub const EXTENTS_PER_BLOCK: usize = BLOCK_SIZE / EXTENT_SIZE;

/// Inode number of the file system root. Always allocated.
pub const ROOT_INO: u32 = 0;

const _: () = assert!(EXTS_MAX <= EXTENTS_PER_BLOCK);
