use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const BLOCK_SIZE: u32 = 1024;
/// Unit used by `st_blocks`, independent of `BLOCK_SIZE`
pub const BLOCK_UNIT: u64 = 512;

pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;

/// Read + execute for the owner, so directories can be traversed
pub const DIRECTORY_PERMISSIONS: u16 = 0o500;
/// Read-only for the owner; the view never grants write access
pub const FILE_PERMISSIONS: u16 = 0o400;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    RegularFile,
    Directory,
}

/// Filesystem-facing metadata of one remote resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Props {
    pub kind: FileKind,
    pub permissions: u16,
    pub size: u64,
    pub nlink: u32,
    pub ctime: SystemTime,
    pub mtime: SystemTime,
    pub atime: SystemTime,
    pub blksize: u32,
    pub blocks: u64,
}

impl Props {
    pub fn new(kind: FileKind, size: u64) -> Self {
        let permissions = match kind {
            FileKind::Directory => DIRECTORY_PERMISSIONS,
            FileKind::RegularFile => FILE_PERMISSIONS,
        };

        Self {
            kind,
            permissions,
            size,
            nlink: 1,
            ctime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            atime: UNIX_EPOCH,
            blksize: BLOCK_SIZE,
            blocks: size.div_ceil(BLOCK_UNIT),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// `st_mode` style value: file type bits plus permission bits
    pub fn mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileKind::Directory => S_IFDIR,
            FileKind::RegularFile => S_IFREG,
        };
        type_bits | u32::from(self.permissions)
    }

    pub fn mtime_secs(&self) -> u64 {
        self.mtime
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}
