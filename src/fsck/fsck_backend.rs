/*Interfaz del backend del fsck: cómo leer superblock, inodos, directorios y
bitmaps. La implementación real es AcnnFilesystem; los tests también la usan
sobre imágenes corrompidas a propósito. */

use super::fsck_types::*;
use crate::bitmap;
use crate::disk::SuperblockDisk;
use crate::fs::AcnnFilesystem;

pub trait FsckBackend {
    fn load_superblock(&self) -> SuperblockDisk;
    fn load_all_inodes(&self) -> Vec<Inode>;
    fn read_dir(&self, ino: u32) -> Vec<Dirent>;
    /// Un bool por bloque en [0, total_blocks): true = usado.
    fn load_block_bitmap(&self) -> Vec<bool>;
    /// Un bool por inodo en [0, total_inodes): true = usado.
    fn load_inode_bitmap(&self) -> Vec<bool>;
}

impl FsckBackend for AcnnFilesystem {
    fn load_superblock(&self) -> SuperblockDisk {
        *self.superblock()
    }

    fn load_all_inodes(&self) -> Vec<Inode> {
        let total = self.superblock().total_inodes;
        (0..total)
            .filter_map(|index| {
                let record = self.inode(index).ok()?;
                let allocated = bitmap::is_inode_used(self.image(), index).unwrap_or(false);
                Some(Inode {
                    index,
                    allocated,
                    record,
                })
            })
            .collect()
    }

    fn read_dir(&self, ino: u32) -> Vec<Dirent> {
        match self.list_entries(ino) {
            Ok(entries) => entries
                .map(|e| Dirent {
                    inode: e.ino,
                    name: e.name,
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn load_block_bitmap(&self) -> Vec<bool> {
        (0..self.superblock().total_blocks)
            .map(|b| bitmap::is_block_used(self.image(), b).unwrap_or(false))
            .collect()
    }

    fn load_inode_bitmap(&self) -> Vec<bool> {
        (0..self.superblock().total_inodes)
            .map(|i| bitmap::is_inode_used(self.image(), i).unwrap_or(false))
            .collect()
    }
}
