/*Estructuras del fsck: la vista simplificada de un inodo que consumen los
chequeos y el FsckReport donde se acumulan los errores. */

use crate::disk::{InodeDisk, InodeKind};

#[derive(Debug, Clone)]
pub struct Inode {
    pub index: u32,
    /// Bit del bitmap de inodos.
    pub allocated: bool,
    pub record: InodeDisk,
}

impl Inode {
    pub fn kind(&self) -> InodeKind {
        self.record.kind()
    }

    pub fn is_dir(&self) -> bool {
        self.record.is_dir()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirent {
    pub inode: u32,
    pub name: String,
}

#[derive(Debug)]
pub struct FsckReport {
    pub blocks_ok: bool,
    pub inodes_ok: bool,
    pub errors: Vec<String>,
}

impl FsckReport {
    pub fn new() -> Self {
        Self {
            blocks_ok: true,
            inodes_ok: true,
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn block_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.blocks_ok = false;
    }

    pub(crate) fn inode_error(&mut self, msg: String) {
        self.errors.push(msg);
        self.inodes_ok = false;
    }
}

impl Default for FsckReport {
    fn default() -> Self {
        Self::new()
    }
}
