// src/file.rs
//
// Contenido de archivos sobre los bloques directos de un inodo. Los datos se
// parten en trozos de BLOCK_SIZE, uno por bloque, en orden de slot.

use log::{error, info, warn};

use crate::bitmap;
use crate::dir;
use crate::disk::{
    InodeDisk, InodeKind, SuperblockDisk, BLOCK_SIZE, DIRECT_BLOCKS, MAX_FILE_SIZE, MODE_FILE,
};
use crate::error::{FsError, Result};
use crate::image::Image;
use crate::inode::{clear_inode, inode_at, write_inode};
use crate::superblock;

fn check_index(sb: &SuperblockDisk, index: u32) -> Result<()> {
    if index >= sb.total_inodes {
        error!("Índice de inodo fuera de rango: {}", index);
        return Err(FsError::InvalidInodeIndex(index));
    }
    Ok(())
}

fn check_size(index: u32, data: &[u8]) -> Result<()> {
    if data.len() > MAX_FILE_SIZE {
        error!(
            "El archivo del inodo {} excede el límite de bloques directos ({} bytes)",
            index,
            data.len()
        );
        return Err(FsError::FileTooLarge(data.len()));
    }
    Ok(())
}

/// Copia `data` en bloques nuevos y devuelve el arreglo de slots. Si se agotan
/// los bloques a mitad de camino se liberan los ya asignados.
fn store_chunks(
    image: &mut Image,
    sb: &mut SuperblockDisk,
    index: u32,
    data: &[u8],
) -> Result<[u32; DIRECT_BLOCKS]> {
    let mut slots = [0u32; DIRECT_BLOCKS];

    for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
        let block = match bitmap::allocate_block(image, sb) {
            Ok(b) => b,
            Err(e) => {
                error!("No hay bloques libres para el inodo {}", index);
                release_blocks(image, sb, &slots)?;
                return Err(e);
            }
        };
        image.block_mut(block)?[..chunk.len()].copy_from_slice(chunk);
        slots[i] = block;
    }

    Ok(slots)
}

fn release_blocks(image: &mut Image, sb: &mut SuperblockDisk, slots: &[u32]) -> Result<()> {
    for &block in slots.iter().filter(|&&b| b != 0) {
        bitmap::free_block(image, sb, block)?;
    }
    Ok(())
}

/// Crea el contenido de un archivo en el inodo `index` y lo marca como usado.
/// El inodo debe estar sin inicializar (modo 0).
pub fn create_file(image: &mut Image, sb: &mut SuperblockDisk, index: u32, data: &[u8]) -> Result<()> {
    // 1. Validaciones, sin efectos
    check_index(sb, index)?;
    check_size(index, data)?;
    if inode_at(image, sb, index)?.kind() != InodeKind::Free {
        error!("El inodo {} ya está en uso", index);
        return Err(FsError::InvalidArgument(format!("el inodo {index} ya está en uso")));
    }

    // 2. Datos
    let direct_blocks = store_chunks(image, sb, index, data)?;

    // 3. Registro, bitmap y superblock
    let inode = InodeDisk {
        mode: MODE_FILE,
        size: data.len() as u32,
        direct_blocks,
        ..InodeDisk::default()
    };
    write_inode(image, sb, index, &inode)?;
    bitmap::mark_inode_used(image, sb, index)?;
    superblock::sync(image, sb)?;

    info!("Archivo creado con inodo {} ({} bytes)", index, data.len());
    Ok(())
}

/// Reemplaza el contenido de un archivo existente. Los bloques nuevos se
/// asignan antes de soltar los viejos, así un fallo deja el archivo intacto.
/// Por eso hace falta espacio libre para el contenido nuevo completo aunque
/// sea más chico que el viejo: en una imagen llena devuelve `NoFreeBlocks`.
pub fn write_file(image: &mut Image, sb: &mut SuperblockDisk, index: u32, data: &[u8]) -> Result<()> {
    check_index(sb, index)?;
    let mut inode = inode_at(image, sb, index)?;
    match inode.kind() {
        InodeKind::File => {}
        InodeKind::Directory => return Err(FsError::IsADirectory(index)),
        InodeKind::Free => {
            error!("El inodo {} no contiene un archivo", index);
            return Err(FsError::InvalidArgument(format!("el inodo {index} está libre")));
        }
    }

    if data.is_empty() {
        warn!("Datos vacíos para el inodo {}: no se escribe nada", index);
        return Ok(());
    }
    check_size(index, data)?;

    let new_blocks = store_chunks(image, sb, index, data)?;
    release_blocks(image, sb, &inode.direct_blocks)?;

    inode.direct_blocks = new_blocks;
    inode.size = data.len() as u32;
    write_inode(image, sb, index, &inode)?;
    superblock::sync(image, sb)?;

    info!("Inodo {} reescrito ({} bytes)", index, data.len());
    Ok(())
}

/// Copia el contenido del archivo en `dest` y escribe un byte 0 justo después.
/// `dest` debe tener al menos `size + 1` bytes. Devuelve los bytes copiados.
pub fn read_file(image: &Image, sb: &SuperblockDisk, index: u32, dest: &mut [u8]) -> Result<usize> {
    check_index(sb, index)?;
    if dest.is_empty() {
        error!("El buffer de destino tiene tamaño cero");
        return Err(FsError::InvalidArgument("buffer de destino vacío".into()));
    }

    let inode = inode_at(image, sb, index)?;
    let size = inode.size as usize;
    if dest.len() < size + 1 {
        error!(
            "Buffer insuficiente para el inodo {}: {} bytes, se necesitan {}",
            index,
            dest.len(),
            size + 1
        );
        return Err(FsError::InvalidArgument(format!(
            "el buffer necesita {} bytes y tiene {}",
            size + 1,
            dest.len()
        )));
    }

    let mut total = 0usize;
    for &block in inode.direct_blocks.iter() {
        if block == 0 || total >= size {
            break;
        }
        let to_read = (size - total).min(BLOCK_SIZE);
        dest[total..total + to_read].copy_from_slice(&image.block(block)?[..to_read]);
        total += to_read;
    }
    dest[total] = 0;

    Ok(total)
}

/// Lee el archivo completo a un `Vec`.
pub fn read_to_vec(image: &Image, sb: &SuperblockDisk, index: u32) -> Result<Vec<u8>> {
    check_index(sb, index)?;
    let size = inode_at(image, sb, index)?.size as usize;
    if size > MAX_FILE_SIZE {
        error!("El inodo {} declara {} bytes, más que el máximo posible", index, size);
        return Err(FsError::InvalidImage(format!("inodo {index} con size = {size}")));
    }
    let mut buf = vec![0u8; size + 1];
    let read = read_file(image, sb, index, &mut buf)?;
    buf.truncate(read);
    Ok(buf)
}

/// Borra el archivo `filename` de `dir`: bloques, registro, bit y entrada.
pub fn delete_file(image: &mut Image, sb: &mut SuperblockDisk, dir: u32, filename: &str) -> Result<()> {
    let index = dir::find_entry(image, sb, dir, filename).map_err(|e| {
        error!("El archivo '{}' no existe en el directorio {}", filename, dir);
        e
    })?;

    let inode = inode_at(image, sb, index)?;
    if inode.is_dir() {
        error!("'{}' es un directorio", filename);
        return Err(FsError::IsADirectory(index));
    }

    release_blocks(image, sb, &inode.direct_blocks)?;
    clear_inode(image, sb, index)?;
    bitmap::free_inode(image, sb, index)?;
    dir::remove_entry_by_inode(image, sb, dir, index)?;
    superblock::sync(image, sb)?;

    info!("Archivo '{}' borrado", filename);
    Ok(())
}
