// src/bitmap.rs
//
// Bitmaps de bloques e inodos: 1 = usado, 0 = libre. Ambos viven dentro del
// buffer (bloques 2 y 3) y se recorren desde el índice 0, así que siempre gana
// el índice libre más bajo.

use bitvec::prelude::*;
use log::{debug, error, warn};

use crate::disk::{SuperblockDisk, BLOCK_BITMAP_BLOCK, INODE_BITMAP_BLOCK, RESERVED_BLOCKS};
use crate::error::{FsError, Result};
use crate::image::Image;
use crate::superblock;

fn bits(image: &Image, block: u32) -> Result<&BitSlice<u8, Lsb0>> {
    Ok(image.block(block)?.view_bits::<Lsb0>())
}

fn bits_mut(image: &mut Image, block: u32) -> Result<&mut BitSlice<u8, Lsb0>> {
    Ok(image.block_mut(block)?.view_bits_mut::<Lsb0>())
}

// -----------------------------------------------------------------------------
// Bloques
// -----------------------------------------------------------------------------

/// Toma el primer bloque libre, lo marca, lo llena de ceros y devuelve su índice.
pub fn allocate_block(image: &mut Image, sb: &mut SuperblockDisk) -> Result<u32> {
    let total = sb.total_blocks as usize;
    let bitmap = bits_mut(image, BLOCK_BITMAP_BLOCK)?;

    let Some(index) = bitmap[..total].first_zero() else {
        error!("No hay bloques libres en el bitmap de bloques");
        return Err(FsError::NoFreeBlocks);
    };
    bitmap.set(index, true);
    sb.free_blocks = sb.free_blocks.saturating_sub(1);

    let index = index as u32;
    image.zero_block(index)?;
    superblock::sync(image, sb)?;

    debug!("Bloque {} asignado ({} libres)", index, sb.free_blocks);
    Ok(index)
}

/// Libera un bloque de datos. El contenido no se borra: se pone en cero al
/// volver a asignarse.
pub fn free_block(image: &mut Image, sb: &mut SuperblockDisk, index: u32) -> Result<()> {
    if index >= sb.total_blocks {
        error!("Índice de bloque fuera de rango: {}", index);
        return Err(FsError::InvalidArgument(format!(
            "bloque {} fuera de rango (total_blocks = {})",
            index, sb.total_blocks
        )));
    }
    if index < RESERVED_BLOCKS {
        error!("Intento de liberar el bloque reservado {}", index);
        return Err(FsError::InvalidArgument(format!("el bloque {index} está reservado")));
    }

    let bitmap = bits_mut(image, BLOCK_BITMAP_BLOCK)?;
    if bitmap.replace(index as usize, false) {
        sb.free_blocks += 1;
    } else {
        warn!("El bloque {} ya estaba libre", index);
    }

    superblock::sync(image, sb)
}

pub fn is_block_used(image: &Image, index: u32) -> Result<bool> {
    Ok(bits(image, BLOCK_BITMAP_BLOCK)?
        .get(index as usize)
        .map(|bit| *bit)
        .unwrap_or(false))
}

pub fn count_free_blocks(image: &Image, sb: &SuperblockDisk) -> Result<u32> {
    Ok(bits(image, BLOCK_BITMAP_BLOCK)?[..sb.total_blocks as usize].count_zeros() as u32)
}

// -----------------------------------------------------------------------------
// Inodos
// -----------------------------------------------------------------------------

/// Marca el primer inodo libre. El registro NO se inicializa.
pub fn allocate_inode(image: &mut Image, sb: &mut SuperblockDisk) -> Result<u32> {
    let total = sb.total_inodes as usize;
    let bitmap = bits_mut(image, INODE_BITMAP_BLOCK)?;

    let Some(index) = bitmap[..total].first_zero() else {
        error!("No hay inodos libres en el bitmap de inodos");
        return Err(FsError::NoFreeInodes);
    };
    bitmap.set(index, true);
    sb.free_inodes = sb.free_inodes.saturating_sub(1);
    superblock::sync(image, sb)?;

    debug!("Inodo {} asignado ({} libres)", index, sb.free_inodes);
    Ok(index as u32)
}

/// Marca un inodo concreto como usado. Devuelve `true` si el bit cambió.
pub fn mark_inode_used(image: &mut Image, sb: &mut SuperblockDisk, index: u32) -> Result<bool> {
    check_inode_index(sb, index)?;
    let flipped = !bits_mut(image, INODE_BITMAP_BLOCK)?.replace(index as usize, true);
    if flipped {
        sb.free_inodes = sb.free_inodes.saturating_sub(1);
    }
    superblock::sync(image, sb)?;
    Ok(flipped)
}

pub fn free_inode(image: &mut Image, sb: &mut SuperblockDisk, index: u32) -> Result<()> {
    check_inode_index(sb, index)?;
    if index == sb.root_inode {
        error!("Intento de liberar el inodo raíz");
        return Err(FsError::InvalidArgument("el inodo raíz no se puede liberar".into()));
    }

    if bits_mut(image, INODE_BITMAP_BLOCK)?.replace(index as usize, false) {
        sb.free_inodes += 1;
    } else {
        warn!("El inodo {} ya estaba libre", index);
    }

    superblock::sync(image, sb)
}

pub fn is_inode_used(image: &Image, index: u32) -> Result<bool> {
    Ok(bits(image, INODE_BITMAP_BLOCK)?
        .get(index as usize)
        .map(|bit| *bit)
        .unwrap_or(false))
}

pub fn count_free_inodes(image: &Image, sb: &SuperblockDisk) -> Result<u32> {
    Ok(bits(image, INODE_BITMAP_BLOCK)?[..sb.total_inodes as usize].count_zeros() as u32)
}

fn check_inode_index(sb: &SuperblockDisk, index: u32) -> Result<()> {
    if index >= sb.total_inodes {
        error!("Índice de inodo fuera de rango: {}", index);
        return Err(FsError::InvalidInodeIndex(index));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Región reservada
// -----------------------------------------------------------------------------

/// Marca boot, superblock, bitmaps y tabla de inodos como usados para siempre,
/// junto con el inodo raíz. Los contadores se recalculan desde los bitmaps.
/// Se llama una sola vez, antes de cualquier otra asignación.
pub fn reserve_fixed_regions(image: &mut Image, sb: &mut SuperblockDisk) -> Result<()> {
    bits_mut(image, BLOCK_BITMAP_BLOCK)?[..RESERVED_BLOCKS as usize].fill(true);
    bits_mut(image, INODE_BITMAP_BLOCK)?.set(sb.root_inode as usize, true);

    sb.free_blocks = count_free_blocks(image, sb)?;
    sb.free_inodes = count_free_inodes(image, sb)?;
    superblock::sync(image, sb)?;

    debug!(
        "Región reservada marcada: {} bloques libres, {} inodos libres",
        sb.free_blocks, sb.free_inodes
    );
    Ok(())
}
