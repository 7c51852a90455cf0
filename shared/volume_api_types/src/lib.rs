#![no_std]

#[cfg(test)]
extern crate std;

/// Maximum name length of a directory record, excluding the terminator.
pub const MAX_NAME_LEN: usize = 17;

/// Operation tag understood by the volume request dispatcher.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeOp {
    Format        = 0,
    Reload        = 1,
    MakeDirectory = 2,
    CreateFile    = 3,
    Remove        = 4,
    List          = 5,
    OverwriteFile = 6,
    ReadFile      = 7,
    AppendFile    = 8,
    Stat          = 9,
    Check         = 10,
}

impl VolumeOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0  => VolumeOp::Format,
            1  => VolumeOp::Reload,
            2  => VolumeOp::MakeDirectory,
            3  => VolumeOp::CreateFile,
            4  => VolumeOp::Remove,
            5  => VolumeOp::List,
            6  => VolumeOp::OverwriteFile,
            7  => VolumeOp::ReadFile,
            8  => VolumeOp::AppendFile,
            9  => VolumeOp::Stat,
            10 => VolumeOp::Check,
            _  => return None,
        })
    }

    /// Whether the operation can change the backing file.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            VolumeOp::Format
                | VolumeOp::MakeDirectory
                | VolumeOp::CreateFile
                | VolumeOp::Remove
                | VolumeOp::OverwriteFile
                | VolumeOp::AppendFile
        )
    }
}

/// Result codes returned to the command layer.
#[repr(u64)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeStatus {
    Ok                = 0,
    IoError           = 1,
    InvalidCluster    = 2,
    NotFound          = 3,
    NameInUse         = 4,
    DirectoryFull     = 5,
    DirectoryNotEmpty = 6,
    DiskFull          = 7,
    CorruptChain      = 8,
    InvalidName       = 9,
    NotAFile          = 10,
    NotADirectory     = 11,
    NotFormatted      = 12,
}

impl VolumeStatus {
    pub fn from_u64(v: u64) -> Self {
        match v {
            0  => VolumeStatus::Ok,
            2  => VolumeStatus::InvalidCluster,
            3  => VolumeStatus::NotFound,
            4  => VolumeStatus::NameInUse,
            5  => VolumeStatus::DirectoryFull,
            6  => VolumeStatus::DirectoryNotEmpty,
            7  => VolumeStatus::DiskFull,
            8  => VolumeStatus::CorruptChain,
            9  => VolumeStatus::InvalidName,
            10 => VolumeStatus::NotAFile,
            11 => VolumeStatus::NotADirectory,
            12 => VolumeStatus::NotFormatted,
            _  => VolumeStatus::IoError,
        }
    }

    /// `true` for failures after which the volume is still structurally sound.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, VolumeStatus::IoError | VolumeStatus::CorruptChain | VolumeStatus::NotFormatted)
    }
}

/// One line of a directory listing, as handed to the command layer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub name:     [u8; MAX_NAME_LEN + 1],
    pub name_len: u8,
    pub is_dir:   u8,     // 1 = directory, 0 = file
    pub _pad:     [u8; 4],
    pub size:     u32,
}

impl ListEntry {
    pub const EMPTY: Self = Self {
        name: [0; MAX_NAME_LEN + 1], name_len: 0, is_dir: 0, _pad: [0; 4], size: 0,
    };

    pub fn name(&self) -> &[u8] {
        &self.name[..(self.name_len as usize).min(MAX_NAME_LEN)]
    }

    pub fn is_dir(&self) -> bool { self.is_dir != 0 }
}
