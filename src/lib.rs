pub mod bitmap;
pub mod cli;
pub mod dir;
pub mod disk;
pub mod error;
pub mod file;
mod fs;
pub mod fsck;
pub mod image;
pub mod inode;
pub mod mount;
pub mod populate;
pub mod superblock;

pub use crate::dir::{DirEntries, DirEntry};
pub use crate::disk::{
    DirEntryDisk, InodeDisk, InodeKind, SuperblockDisk, ACNN_MAGIC, BLOCK_SIZE, DIR_ENTRY_SIZE,
    MAX_FILE_SIZE, MAX_INODES, MAX_NAME_LEN, RESERVED_BLOCKS, ROOT_INODE,
};
pub use crate::error::{FsError, Result};
pub use crate::fs::AcnnFilesystem;
pub use crate::image::Image;
pub use crate::mount::AcnnMount;
pub use crate::populate::{populate_from_dir, PopulateSummary};
