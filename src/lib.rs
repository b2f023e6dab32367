//! A POSIX-style, single-image, FUSE-backed file system.
//!
//! [`fs`] holds the pure on-disk logic (records, allocators, the engines
//! built on top of them, and the twelve-operation surface). [`bridge`] wires
//! that surface into [`fuser`]'s callback trait. [`image`] and [`error`] are
//! the ambient collaborators both depend on.

pub mod bridge;
pub mod error;
pub mod fs;
pub mod image;
pub mod layout;

pub use error::{FsError, FsResult};
pub use fs::{Attr, FsContext, Ops, Statfs, TimeArg};
pub use image::Image;
