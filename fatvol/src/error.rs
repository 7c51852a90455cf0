use std::io;

use volume_api_types::VolumeStatus;

pub type Result<T> = core::result::Result<T, FsError>;

/// Every way a volume operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The backing image could not be opened, read or written.
    #[error("image I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cluster {0} cannot be addressed here")]
    InvalidCluster(u16),

    #[error("\"{0}\" does not exist")]
    NotFound(String),

    #[error("the name \"{0}\" is already in use")]
    NameInUse(String),

    #[error("parent directory is full")]
    DirectoryFull,

    #[error("directory \"{0}\" is not empty")]
    DirectoryNotEmpty(String),

    #[error("the disk is full")]
    DiskFull,

    /// The allocation table disagrees with itself; never repaired silently.
    #[error("corrupt cluster chain at cluster {cluster}")]
    CorruptChain { cluster: u16 },

    /// Two chains claim the same cluster.
    #[error("cluster {cluster} belongs to more than one chain")]
    CrossLinked { cluster: u16 },

    #[error("invalid name \"{0}\"")]
    InvalidName(String),

    #[error("\"{0}\" is a directory")]
    NotAFile(String),

    #[error("\"{0}\" is not a directory")]
    NotADirectory(String),

    #[error("image is not a formatted volume")]
    NotFormatted,
}

impl FsError {
    pub fn status(&self) -> VolumeStatus {
        match self {
            FsError::Io(_)                => VolumeStatus::IoError,
            FsError::InvalidCluster(_)    => VolumeStatus::InvalidCluster,
            FsError::NotFound(_)          => VolumeStatus::NotFound,
            FsError::NameInUse(_)         => VolumeStatus::NameInUse,
            FsError::DirectoryFull        => VolumeStatus::DirectoryFull,
            FsError::DirectoryNotEmpty(_) => VolumeStatus::DirectoryNotEmpty,
            FsError::DiskFull             => VolumeStatus::DiskFull,
            FsError::CorruptChain { .. }
            | FsError::CrossLinked { .. } => VolumeStatus::CorruptChain,
            FsError::InvalidName(_)       => VolumeStatus::InvalidName,
            FsError::NotAFile(_)          => VolumeStatus::NotAFile,
            FsError::NotADirectory(_)     => VolumeStatus::NotADirectory,
            FsError::NotFormatted         => VolumeStatus::NotFormatted,
        }
    }
}
