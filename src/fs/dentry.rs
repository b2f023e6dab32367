//! Fixed-size directory entry record.

use crate::layout::{DENTRY_SIZE, NAME_MAX};

/// One packed directory entry: an inode number and a NUL-terminated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dentry {
    pub ino: u32,
    pub name: String,
}

const _: () = assert!(DENTRY_SIZE == 4 + NAME_MAX);

impl Dentry {
    pub fn decode(buf: &[u8]) -> Self {
        let ino = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let name_bytes = &buf[4..4 + NAME_MAX];
        let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(NAME_MAX);
        let name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();
        Dentry { ino, name }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.ino.to_le_bytes());
        let name_buf = &mut buf[4..4 + NAME_MAX];
        name_buf.fill(0);
        let bytes = self.name.as_bytes();
        let n = bytes.len().min(NAME_MAX - 1);
        name_buf[..n].copy_from_slice(&bytes[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let d = Dentry {
            ino: 7,
            name: "hello.txt".to_string(),
        };
        let mut buf = [0xFFu8; DENTRY_SIZE];
        d.write_to(&mut buf);
        assert_eq!(Dentry::decode(&buf), d);
    }

    #[test]
    fn truncates_overlong_names_to_name_max() {
        let long = "a".repeat(NAME_MAX + 10);
        let d = Dentry { ino: 1, name: long };
        let mut buf = [0u8; DENTRY_SIZE];
        d.write_to(&mut buf);
        let decoded = Dentry::decode(&buf);
        assert_eq!(decoded.name.len(), NAME_MAX - 1);
    }
}
