// src/fs.rs
use log::{error, info};

use crate::bitmap;
use crate::dir::{self, DirEntries};
use crate::disk::{InodeDisk, SuperblockDisk};
use crate::error::Result;
use crate::file;
use crate::image::Image;
use crate::inode::{inode_at, write_inode};
use crate::superblock;

// -----------------------------------------------------------------------------
// Estado del FS: el buffer y los contadores del superblock en memoria
// -----------------------------------------------------------------------------

/// Dueño exclusivo de la imagen mientras se construye. Al terminar se
/// entrega el buffer con `into_bytes` para persistirlo tal cual.
#[derive(Clone)]
pub struct AcnnFilesystem {
    image: Image,
    sb: SuperblockDisk,
}

impl AcnnFilesystem {
    /// Crea un FS vacío de `size_bytes`:
    /// - escribe el superblock en el bloque 1
    /// - marca la región reservada en los bitmaps
    /// - crea el directorio raíz (inodo 0) con su primer bloque de entradas
    pub fn format(size_bytes: u64) -> Result<Self> {
        // 1. Buffer y superblock
        let mut image = Image::new(size_bytes)?;
        let mut sb = SuperblockDisk::new(image.total_blocks());
        superblock::sync(&mut image, &sb)?;

        // 2. Región reservada
        bitmap::reserve_fixed_regions(&mut image, &mut sb)?;

        // 3. Directorio raíz
        let root_block = bitmap::allocate_block(&mut image, &mut sb).map_err(|e| {
            error!("No se pudo asignar el bloque del directorio raíz");
            e
        })?;
        write_inode(&mut image, &sb, sb.root_inode, &InodeDisk::directory(root_block))?;
        superblock::sync(&mut image, &sb)?;

        info!("Superblock:");
        info!("  Magic: {:#X}", sb.magic);
        info!("  Block size: {}", sb.block_size);
        info!("  Total blocks: {}", sb.total_blocks);
        info!("  Free blocks: {}", sb.free_blocks);
        info!("  Total inodes: {}", sb.total_inodes);
        info!("  Free inodes: {}", sb.free_inodes);

        Ok(Self { image, sb })
    }

    /// Adopta una imagen ya formateada (p. ej. leída de un .img).
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let image = Image::from_bytes(bytes)?;
        let sb = superblock::load(&image)?;
        Ok(Self { image, sb })
    }

    pub fn superblock(&self) -> &SuperblockDisk {
        &self.sb
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn root_inode(&self) -> u32 {
        self.sb.root_inode
    }

    pub fn inode(&self, index: u32) -> Result<InodeDisk> {
        inode_at(&self.image, &self.sb, index)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.image.into_bytes()
    }

    // -------------------- Asignación --------------------

    pub fn allocate_block(&mut self) -> Result<u32> {
        bitmap::allocate_block(&mut self.image, &mut self.sb)
    }

    pub fn free_block(&mut self, index: u32) -> Result<()> {
        bitmap::free_block(&mut self.image, &mut self.sb, index)
    }

    pub fn allocate_inode(&mut self) -> Result<u32> {
        bitmap::allocate_inode(&mut self.image, &mut self.sb)
    }

    // -------------------- Directorios --------------------

    pub fn create_directory(&mut self, parent: u32, name: &str) -> Result<u32> {
        dir::create_directory(&mut self.image, &mut self.sb, parent, name)
    }

    pub fn delete_directory(&mut self, dir: u32) -> Result<()> {
        dir::delete_directory(&mut self.image, &mut self.sb, dir)
    }

    pub fn add_entry(&mut self, dir: u32, target: u32, name: &str) -> Result<()> {
        dir::add_entry(&mut self.image, &mut self.sb, dir, target, name)
    }

    pub fn find_entry(&self, dir: u32, name: &str) -> Result<u32> {
        dir::find_entry(&self.image, &self.sb, dir, name)
    }

    pub fn list_entries(&self, dir: u32) -> Result<DirEntries<'_>> {
        dir::list_entries(&self.image, &self.sb, dir)
    }

    pub fn remove_entry_by_inode(&mut self, dir: u32, target: u32) -> Result<()> {
        dir::remove_entry_by_inode(&mut self.image, &mut self.sb, dir, target)
    }

    // -------------------- Archivos --------------------

    pub fn create_file(&mut self, index: u32, data: &[u8]) -> Result<()> {
        file::create_file(&mut self.image, &mut self.sb, index, data)
    }

    pub fn write_file(&mut self, index: u32, data: &[u8]) -> Result<()> {
        file::write_file(&mut self.image, &mut self.sb, index, data)
    }

    pub fn read_file(&self, index: u32, dest: &mut [u8]) -> Result<usize> {
        file::read_file(&self.image, &self.sb, index, dest)
    }

    pub fn read_to_vec(&self, index: u32) -> Result<Vec<u8>> {
        file::read_to_vec(&self.image, &self.sb, index)
    }

    pub fn delete_file(&mut self, dir: u32, filename: &str) -> Result<()> {
        file::delete_file(&mut self.image, &mut self.sb, dir, filename)
    }

    /// Reserva un inodo, escribe `data` y lo enlaza en `dir` como `name`.
    /// Si algo falla, el inodo y sus bloques se devuelven.
    pub fn add_file(&mut self, dir: u32, name: &str, data: &[u8]) -> Result<u32> {
        // Paso 1: validar nombre y directorio antes de reservar nada
        dir::check_name(name)?;
        self.list_entries(dir)?;

        // Paso 2: inodo + contenido
        let index = self.allocate_inode()?;
        if let Err(e) = self.create_file(index, data) {
            bitmap::free_inode(&mut self.image, &mut self.sb, index)?;
            return Err(e);
        }

        // Paso 3: entrada en el directorio
        if let Err(e) = self.add_entry(dir, index, name) {
            error!("No se pudo enlazar '{}'; se libera el inodo {}", name, index);
            let inode = self.inode(index)?;
            for block in inode.populated_blocks() {
                self.free_block(block)?;
            }
            write_inode(&mut self.image, &self.sb, index, &InodeDisk::default())?;
            bitmap::free_inode(&mut self.image, &mut self.sb, index)?;
            return Err(e);
        }

        info!("Archivo '{}' agregado al directorio {} (inodo {})", name, dir, index);
        Ok(index)
    }
}
