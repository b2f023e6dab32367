use thiserror::Error;

/// Error kinds returned by the core to its callers, translated to host
/// errno values only at the bridge boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("path exceeds the maximum length")]
    NameTooLong,
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("no space left on device")]
    NoSpace,
    #[error("out of memory")]
    OutOfMemory,
    #[error("image does not contain a valid superblock")]
    InvalidImage,
}

impl FsError {
    /// Maps this error kind to the errno the FUSE bridge should report.
    pub fn errno(self) -> i32 {
        match self {
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::NotFound => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::NoSpace => libc::ENOSPC,
            FsError::OutOfMemory => libc::ENOMEM,
            FsError::InvalidImage => libc::EINVAL,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
