//! Core file system engine: on-disk records, the mounted-image context, and
//! the operations built on top of it. Everything here is pure logic over a
//! byte slice; nothing in this module touches the network, a FUSE mount, or
//! the file system of the host running it.

pub mod bitmap;
pub mod context;
pub mod datablock;
pub mod dentry;
pub mod dir;
pub mod extent;
pub mod file;
pub mod format;
pub mod inode;
pub mod ops;
pub mod path;
pub mod superblock;

pub use context::FsContext;
pub use ops::{Attr, Ops, Statfs, TimeArg};
