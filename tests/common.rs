//! Helpers compartidos por los escenarios de integración
#![allow(dead_code)]

use acnnfs::fsck::run_fsck;
use acnnfs::{AcnnFilesystem, BLOCK_SIZE};

pub const FOUR_MIB: u64 = 4 * 1024 * 1024;

/// Imagen recién formateada de `blocks` bloques.
pub fn fresh(blocks: u64) -> AcnnFilesystem {
    AcnnFilesystem::format(blocks * BLOCK_SIZE as u64).unwrap()
}

/// Bytes deterministas, distintos en cada bloque.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8 ^ (i / BLOCK_SIZE) as u8).collect()
}

/// fsck como oráculo: la imagen tiene que estar limpia.
pub fn assert_consistent(fs: &AcnnFilesystem) {
    let rep = run_fsck(fs);
    assert!(rep.is_clean(), "fsck encontró errores: {:#?}", rep.errors);
}
