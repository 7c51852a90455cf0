//! Single-volume FAT-style file system stored in one flat image file.
//!
//! The image holds a boot marker, a 16-bit allocation table, a resident root
//! directory and 4086 data clusters. Directories are one-cluster arrays of
//! 32-byte records; files are cluster chains holding null-terminated text.

pub mod check;
pub mod config;
pub mod dir;
pub mod disk;
pub mod error;
pub mod file;
pub mod layout;
pub mod logger;
pub mod request;
pub mod store;
pub mod table;
pub mod volume;

pub use config::VolumeConfig;
pub use dir::{DirEntry, EntryKind, Listing};
pub use disk::{Disk, ImageFile, MemDisk};
pub use error::{FsError, Result};
pub use request::{Request, Response, execute};
pub use volume::Volume;
