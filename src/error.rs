// src/error.rs
use libc::{EFBIG, EINVAL, EIO, EISDIR, ENOENT, ENOSPC, ENOTDIR, ENOTEMPTY};
use thiserror::Error;

use crate::disk::MAX_FILE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
    #[error("índice de inodo fuera de rango: {0}")]
    InvalidInodeIndex(u32),
    #[error("no quedan bloques libres")]
    NoFreeBlocks,
    #[error("no quedan inodos libres")]
    NoFreeInodes,
    #[error("archivo demasiado grande: {0} bytes (máximo {MAX_FILE_SIZE})")]
    FileTooLarge(usize),
    #[error("entrada no encontrada: {0}")]
    NotFound(String),
    #[error("el directorio no tiene espacio para más entradas")]
    NoSpace,
    #[error("el inodo {0} no es un directorio")]
    NotADirectory(u32),
    #[error("el inodo {0} es un directorio")]
    IsADirectory(u32),
    #[error("el directorio {0} no está vacío")]
    DirectoryNotEmpty(u32),
    #[error("imagen inválida: {0}")]
    InvalidImage(String),
}

impl FsError {
    pub fn as_errno(&self) -> i32 {
        match self {
            FsError::InvalidArgument(_) | FsError::InvalidInodeIndex(_) => EINVAL,
            FsError::NoFreeBlocks | FsError::NoFreeInodes | FsError::NoSpace => ENOSPC,
            FsError::FileTooLarge(_) => EFBIG,
            FsError::NotFound(_) => ENOENT,
            FsError::NotADirectory(_) => ENOTDIR,
            FsError::IsADirectory(_) => EISDIR,
            FsError::DirectoryNotEmpty(_) => ENOTEMPTY,
            FsError::InvalidImage(_) => EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
