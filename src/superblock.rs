// src/superblock.rs
use crate::disk::{
    SuperblockDisk, ACNN_MAGIC, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, INODE_BITMAP_BLOCK, INODE_SIZE,
    MAX_INODES, SUPERBLOCK_BLOCK,
};
use crate::error::{FsError, Result};
use crate::image::Image;

/// Sobrescribe la copia en disco del superblock con los contadores en memoria.
pub fn sync(image: &mut Image, sb: &SuperblockDisk) -> Result<()> {
    let block = image.block_mut(SUPERBLOCK_BLOCK)?;
    sb.encode_into(&mut block[..SuperblockDisk::RECORD_SIZE]);
    Ok(())
}

/// Lee el superblock del bloque 1 y valida que la imagen parezca ACNN.
pub fn load(image: &Image) -> Result<SuperblockDisk> {
    let block = image.block(SUPERBLOCK_BLOCK)?;
    let sb = SuperblockDisk::decode(block);

    // 1. Magic y constantes del formato
    if sb.magic != ACNN_MAGIC {
        return Err(FsError::InvalidImage(format!(
            "el magic no coincide (esperado = {:#X}, leído = {:#X})",
            ACNN_MAGIC, sb.magic
        )));
    }
    if sb.block_size as usize != BLOCK_SIZE || sb.inode_size as usize != INODE_SIZE {
        return Err(FsError::InvalidImage(format!(
            "block_size = {}, inode_size = {} no soportados",
            sb.block_size, sb.inode_size
        )));
    }
    if sb.block_bitmap != BLOCK_BITMAP_BLOCK || sb.inode_bitmap != INODE_BITMAP_BLOCK {
        return Err(FsError::InvalidImage("bitmaps fuera de su posición fija".into()));
    }

    // 2. Geometría coherente con el buffer
    if sb.total_blocks != image.total_blocks() {
        return Err(FsError::InvalidImage(format!(
            "total_blocks = {}, pero la imagen tiene {} bloques",
            sb.total_blocks,
            image.total_blocks()
        )));
    }
    if sb.total_inodes == 0 || sb.total_inodes > MAX_INODES || sb.root_inode >= sb.total_inodes {
        return Err(FsError::InvalidImage(format!(
            "total_inodes = {}, root_inode = {} fuera de rango",
            sb.total_inodes, sb.root_inode
        )));
    }

    Ok(sb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_then_load() {
        let mut image = Image::new(1024 * 4096).unwrap();
        let sb = SuperblockDisk::new(1024);
        sync(&mut image, &sb).unwrap();
        assert_eq!(load(&image).unwrap(), sb);
    }

    #[test]
    fn load_rejects_unformatted_image() {
        let image = Image::new(64 * 4096).unwrap();
        assert!(matches!(load(&image), Err(FsError::InvalidImage(_))));
    }

    #[test]
    fn load_rejects_block_count_mismatch() {
        let mut image = Image::new(64 * 4096).unwrap();
        sync(&mut image, &SuperblockDisk::new(128)).unwrap();
        assert!(matches!(load(&image), Err(FsError::InvalidImage(_))));
    }
}
