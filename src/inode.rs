// src/inode.rs
//
// Tabla de inodos: registros de INODE_SIZE bytes a partir del bloque 4,
// direccionados por índice.

use std::ops::Range;

use log::error;

use crate::disk::{InodeDisk, SuperblockDisk, BLOCK_SIZE, INODE_SIZE, INODE_TABLE_BLOCK};
use crate::error::{FsError, Result};
use crate::image::Image;

fn record_range(sb: &SuperblockDisk, index: u32) -> Result<Range<usize>> {
    if index >= sb.total_inodes {
        error!("Índice de inodo fuera de rango: {} (total_inodes = {})", index, sb.total_inodes);
        return Err(FsError::InvalidInodeIndex(index));
    }
    let start = INODE_TABLE_BLOCK as usize * BLOCK_SIZE + index as usize * INODE_SIZE;
    Ok(start..start + INODE_SIZE)
}

/// Decodifica el registro del inodo `index`.
pub fn inode_at(image: &Image, sb: &SuperblockDisk, index: u32) -> Result<InodeDisk> {
    let range = record_range(sb, index)?;
    Ok(InodeDisk::decode(&image.as_bytes()[range]))
}

pub fn write_inode(image: &mut Image, sb: &SuperblockDisk, index: u32, inode: &InodeDisk) -> Result<()> {
    let range = record_range(sb, index)?;
    let start = range.start;
    // la tabla siempre cae dentro de la región reservada
    let block = (start / BLOCK_SIZE) as u32;
    let offset = start % BLOCK_SIZE;
    inode.encode_into(&mut image.block_mut(block)?[offset..offset + INODE_SIZE]);
    Ok(())
}

/// Deja el registro entero en cero.
pub fn clear_inode(image: &mut Image, sb: &SuperblockDisk, index: u32) -> Result<()> {
    write_inode(image, sb, index, &InodeDisk::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{MAX_INODES, MODE_FILE};

    #[test]
    fn records_are_addressed_by_index() {
        let mut image = Image::new(1024 * 4096).unwrap();
        let sb = SuperblockDisk::new(1024);

        let mut inode = InodeDisk {
            mode: MODE_FILE,
            size: 5,
            ..InodeDisk::default()
        };
        inode.direct_blocks[0] = 42;
        write_inode(&mut image, &sb, 33, &inode).unwrap();

        assert_eq!(inode_at(&image, &sb, 33).unwrap(), inode);
        assert_eq!(inode_at(&image, &sb, 32).unwrap(), InodeDisk::default());
        // inodo 33 = segundo registro del bloque 5
        let raw = &image.as_bytes()[5 * 4096 + 128..5 * 4096 + 132];
        assert_eq!(raw, &MODE_FILE.to_le_bytes());
    }

    #[test]
    fn last_inode_fits_in_table() {
        let mut image = Image::new(1024 * 4096).unwrap();
        let sb = SuperblockDisk::new(1024);
        assert_eq!(sb.total_inodes, MAX_INODES);
        let last = MAX_INODES - 1;
        write_inode(&mut image, &sb, last, &InodeDisk::directory(11)).unwrap();
        assert!(inode_at(&image, &sb, last).unwrap().is_dir());
        // no invade el primer bloque de datos
        assert!(image.block(10).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn out_of_range_index() {
        let mut image = Image::new(64 * 4096).unwrap();
        let sb = SuperblockDisk::new(64);
        assert_eq!(inode_at(&image, &sb, 16), Err(FsError::InvalidInodeIndex(16)));
        assert_eq!(clear_inode(&mut image, &sb, 99), Err(FsError::InvalidInodeIndex(99)));
    }
}
