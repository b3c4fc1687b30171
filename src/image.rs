// src/image.rs
use byte_unit::Byte;
use log::{debug, warn};

use crate::disk::{BLOCK_SIZE, MAX_TOTAL_BLOCKS, RESERVED_BLOCKS};
use crate::error::{FsError, Result};

/// Buffer plano que hace de "disco". Todas las operaciones reciben el
/// `Image` por referencia; al final se entrega con `into_bytes`.
#[derive(Clone)]
pub struct Image {
    bytes: Vec<u8>,
    total_blocks: u32,
}

impl Image {
    /// Reserva un buffer en cero de `size_bytes`. `total_blocks = size / 4096`.
    pub fn new(size_bytes: u64) -> Result<Self> {
        let total_blocks = Self::check_geometry(size_bytes)?;
        let size = usize::try_from(size_bytes)
            .map_err(|_| FsError::InvalidArgument(format!("tamaño {size_bytes} no representable")))?;

        if size % BLOCK_SIZE != 0 {
            warn!(
                "El tamaño {} no es múltiplo de {}; la cola parcial queda sin usar",
                size, BLOCK_SIZE
            );
        }
        debug!(
            "Imagen de {} ({} bloques)",
            Byte::from_bytes(size_bytes as _).get_appropriate_unit(true),
            total_blocks
        );

        Ok(Self {
            bytes: vec![0u8; size],
            total_blocks,
        })
    }

    /// Adopta un buffer existente (p. ej. leído de un archivo .img).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let total_blocks = Self::check_geometry(bytes.len() as u64)
            .map_err(|e| FsError::InvalidImage(e.to_string()))?;
        Ok(Self { bytes, total_blocks })
    }

    fn check_geometry(size_bytes: u64) -> Result<u32> {
        let blocks = size_bytes / BLOCK_SIZE as u64;
        if blocks < RESERVED_BLOCKS as u64 || blocks > MAX_TOTAL_BLOCKS as u64 {
            return Err(FsError::InvalidArgument(format!(
                "se requieren entre {} y {} bloques de {} bytes (se pidieron {})",
                RESERVED_BLOCKS, MAX_TOTAL_BLOCKS, BLOCK_SIZE, blocks
            )));
        }
        Ok(blocks as u32)
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn block(&self, index: u32) -> Result<&[u8]> {
        let range = self.block_range(index)?;
        Ok(&self.bytes[range])
    }

    pub fn block_mut(&mut self, index: u32) -> Result<&mut [u8]> {
        let range = self.block_range(index)?;
        Ok(&mut self.bytes[range])
    }

    pub fn zero_block(&mut self, index: u32) -> Result<()> {
        self.block_mut(index)?.fill(0);
        Ok(())
    }

    fn block_range(&self, index: u32) -> Result<std::ops::Range<usize>> {
        if index >= self.total_blocks {
            return Err(FsError::InvalidImage(format!(
                "bloque {} fuera de rango (total_blocks = {})",
                index, self.total_blocks
            )));
        }
        let start = index as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
