//! Image memory-mapping helper.
//!
//! This is an external collaborator, not core logic: it hands the core a
//! contiguous mutable byte region and nothing more. Production binaries back
//! it with a memory-mapped file; tests back it with a plain `Vec<u8>` so the
//! core can be exercised without touching the file system.

use std::fs::File;
use std::io;
use std::ops::{Deref, DerefMut};

use memmap2::MmapMut;

/// A contiguous mutable byte region representing the image.
pub enum Image {
    Mapped(MmapMut),
    Owned(Vec<u8>),
}

impl Image {
    /// Memory-maps an already-sized image file for read/write access.
    pub fn open_mapped(file: &File) -> io::Result<Self> {
        let mmap = unsafe { MmapMut::map_mut(file)? };
        Ok(Image::Mapped(mmap))
    }

    /// Wraps an in-memory buffer, e.g. for unit and integration tests.
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Image::Owned(buf)
    }

    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flushes pending writes back to the backing file, if any.
    pub fn flush(&self) -> io::Result<()> {
        match self {
            Image::Mapped(m) => m.flush(),
            Image::Owned(_) => Ok(()),
        }
    }
}

impl AsRef<[u8]> for Image {
    fn as_ref(&self) -> &[u8] {
        match self {
            Image::Mapped(m) => m,
            Image::Owned(v) => v,
        }
    }
}

impl AsMut<[u8]> for Image {
    fn as_mut(&mut self) -> &mut [u8] {
        match self {
            Image::Mapped(m) => m,
            Image::Owned(v) => v,
        }
    }
}

impl Deref for Image {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

impl DerefMut for Image {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut()
    }
}
