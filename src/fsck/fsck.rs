/*EL ARCHIVO PRINCIPAL DE FSCK. Recorre superblock, bitmaps, inodos y
directorios de una imagen ACNN y junta todas las inconsistencias en un
FsckReport. No repara nada. */
use std::collections::HashMap;

use log::info;

use super::{fsck_backend::FsckBackend, fsck_types::*};
use crate::disk::{
    InodeKind, SuperblockDisk, ACNN_MAGIC, BLOCK_SIZE, DIR_ENTRY_SIZE, INODE_SIZE, MAX_FILE_SIZE,
    MAX_INODES, RESERVED_BLOCKS,
};

fn check_superblock(sb: &SuperblockDisk, inodes: &[Inode], report: &mut FsckReport) {
    // 1. Magic number y constantes
    if sb.magic != ACNN_MAGIC {
        report.errors.push(format!("Superblock: magic inválido ({:#X})", sb.magic));
    }
    if sb.block_size as usize != BLOCK_SIZE || sb.inode_size as usize != INODE_SIZE {
        report.errors.push(format!(
            "Superblock: block_size = {}, inode_size = {} no soportados",
            sb.block_size, sb.inode_size
        ));
    }

    // 2. Número de inodos derivado del número de bloques
    let expected_inodes = (sb.total_blocks / 4).min(MAX_INODES);
    if sb.total_inodes != expected_inodes {
        report.inode_error(format!(
            "Superblock: total_inodes = {}, se esperaban {}",
            sb.total_inodes, expected_inodes
        ));
    }
    if sb.total_inodes as usize != inodes.len() {
        report.inode_error(format!(
            "Superblock: total_inodes = {}, pero hay {} inodos legibles",
            sb.total_inodes,
            inodes.len()
        ));
    }

    // 3. root_inode válido
    if sb.root_inode >= sb.total_inodes {
        report.inode_error(format!("Superblock: root_inode ({}) fuera de rango", sb.root_inode));
    }
}

fn check_counters(sb: &SuperblockDisk, blocks: &[bool], inodes: &[bool], report: &mut FsckReport) {
    let free_blocks = blocks.iter().filter(|&&used| !used).count() as u32;
    if sb.free_blocks != free_blocks {
        report.block_error(format!(
            "Superblock: free_blocks = {}, pero el bitmap tiene {} bloques libres",
            sb.free_blocks, free_blocks
        ));
    }

    let free_inodes = inodes.iter().filter(|&&used| !used).count() as u32;
    if sb.free_inodes != free_inodes {
        report.inode_error(format!(
            "Superblock: free_inodes = {}, pero el bitmap tiene {} inodos libres",
            sb.free_inodes, free_inodes
        ));
    }
}

fn check_reserved(sb: &SuperblockDisk, blocks: &[bool], inode_bitmap: &[bool], report: &mut FsckReport) {
    for (block, &used) in blocks.iter().enumerate().take(RESERVED_BLOCKS as usize) {
        if !used {
            report.block_error(format!("Bitmap marca libre el bloque reservado {}", block));
        }
    }
    if !inode_bitmap.get(sb.root_inode as usize).copied().unwrap_or(false) {
        report.inode_error(format!("Bitmap marca libre el inodo raíz ({})", sb.root_inode));
    }
}

fn check_inodes_basic(sb: &SuperblockDisk, inodes: &[Inode], report: &mut FsckReport) {
    for inode in inodes {
        let idx = inode.index;
        let rec = &inode.record;

        // 1. Inodos libres: el registro debe estar en cero
        if !inode.allocated {
            if inode.kind() != InodeKind::Free || rec.populated_blocks().count() > 0 || rec.size != 0 {
                report.inode_error(format!(
                    "Inodo {}: libre en el bitmap pero su registro no está vacío",
                    idx
                ));
            }
            continue;
        }
        if inode.kind() == InodeKind::Free {
            report.inode_error(format!("Inodo {}: marcado como usado pero sin inicializar", idx));
            continue;
        }

        // 2. Punteros directos
        let mut seen = Vec::new();
        for blk in rec.populated_blocks() {
            if blk >= sb.total_blocks {
                report.inode_error(format!("Inodo {}: bloque directo fuera de rango ({})", idx, blk));
            } else if blk < RESERVED_BLOCKS {
                report.inode_error(format!(
                    "Inodo {}: apunta al bloque reservado {}",
                    idx, blk
                ));
            }
            if seen.contains(&blk) {
                report.inode_error(format!("Inodo {}: bloque duplicado ({})", idx, blk));
            }
            seen.push(blk);
        }

        // 3. Puntero indirecto: reservado, nunca se usa
        if rec.indirect_block != 0 {
            report.inode_error(format!(
                "Inodo {}: indirect_block = {} (no soportado)",
                idx, rec.indirect_block
            ));
        }

        // 4. Archivos: slots contiguos desde el 0 y tamaño coherente
        if inode.kind() == InodeKind::File {
            let populated = seen.len();
            let contiguous = rec.direct_blocks[..populated].iter().all(|&b| b != 0);
            if !contiguous {
                report.inode_error(format!("Inodo {}: bloques directos con huecos", idx));
            }
            let size = rec.size as usize;
            if size > MAX_FILE_SIZE || populated != size.div_ceil(BLOCK_SIZE) {
                report.inode_error(format!(
                    "Inodo {}: size = {} no coincide con {} bloques asignados",
                    idx, size, populated
                ));
            }
        }
    }
}

fn check_blocks_global(sb: &SuperblockDisk, inodes: &[Inode], blocks: &[bool], report: &mut FsckReport) {
    // 1. Quién usa cada bloque
    let mut owner: HashMap<u32, u32> = HashMap::new();
    for inode in inodes.iter().filter(|i| i.allocated) {
        for blk in inode.record.populated_blocks() {
            if let Some(prev) = owner.insert(blk, inode.index) {
                if prev != inode.index {
                    report.block_error(format!(
                        "Bloque {} compartido por los inodos {} y {}",
                        blk, prev, inode.index
                    ));
                }
            }
        }
    }

    // 2. Comparación bitmap <-> realidad (fuera de la región reservada)
    for block in RESERVED_BLOCKS..sb.total_blocks {
        let bitmap_says_used = blocks.get(block as usize).copied().unwrap_or(false);
        let inode_says_used = owner.contains_key(&block);

        if bitmap_says_used && !inode_says_used {
            report.block_error(format!(
                "Bitmap marca usado el bloque {}, pero ningún inodo lo usa",
                block
            ));
        }
        if !bitmap_says_used && inode_says_used {
            report.block_error(format!(
                "Bitmap marca libre el bloque {}, pero el inodo {} lo usa",
                block, owner[&block]
            ));
        }
    }
}

fn check_dirs<B: FsckBackend>(backend: &B, sb: &SuperblockDisk, inodes: &[Inode], report: &mut FsckReport) {
    // Validar que root sea directorio
    match inodes.get(sb.root_inode as usize) {
        Some(root) if root.is_dir() => {}
        Some(_) => report.inode_error("Root inode no es un directorio".into()),
        None => {
            report.inode_error("Root inode fuera de rango".into());
            return;
        }
    }

    // Validar cada directorio
    for dir in inodes.iter().filter(|i| i.allocated && i.is_dir()) {
        let entries = backend.read_dir(dir.index);

        let expected_size = (entries.len() * DIR_ENTRY_SIZE) as u32;
        if dir.record.size != expected_size {
            report.inode_error(format!(
                "Directorio {}: size = {}, pero tiene {} entradas ({} bytes)",
                dir.index,
                dir.record.size,
                entries.len(),
                expected_size
            ));
        }

        for entry in entries {
            // Nombre vacío
            if entry.name.is_empty() {
                report.inode_error(format!("Directorio {}: entrada con nombre vacío", dir.index));
            }

            // Inodo fuera de rango o libre
            match inodes.get(entry.inode as usize) {
                None => report.inode_error(format!(
                    "Directorio {}: '{}' apunta a inodo inexistente ({})",
                    dir.index, entry.name, entry.inode
                )),
                Some(target) if !target.allocated => report.inode_error(format!(
                    "Directorio {}: '{}' apunta al inodo libre {}",
                    dir.index, entry.name, entry.inode
                )),
                Some(_) => {}
            }
        }
    }
}

fn check_orphan_inodes<B: FsckBackend>(backend: &B, sb: &SuperblockDisk, inodes: &[Inode], report: &mut FsckReport) {
    // Mapa: inodos referenciados por algún directorio
    let mut referenced = vec![false; inodes.len()];

    // El root SIEMPRE se considera referenciado
    if let Some(r) = referenced.get_mut(sb.root_inode as usize) {
        *r = true;
    }

    for dir in inodes.iter().filter(|i| i.allocated && i.is_dir()) {
        for entry in backend.read_dir(dir.index) {
            if let Some(r) = referenced.get_mut(entry.inode as usize) {
                *r = true;
            }
        }
    }

    // Finalmente: detectar huérfanos
    for inode in inodes.iter().filter(|i| i.allocated) {
        if !referenced[inode.index as usize] {
            report.inode_error(format!("Inodo {} huérfano", inode.index));
        }
    }
}

pub fn run_fsck<B: FsckBackend>(backend: &B) -> FsckReport {
    let mut report = FsckReport::new();

    let sb = backend.load_superblock();
    let inodes = backend.load_all_inodes();
    let block_bitmap = backend.load_block_bitmap();
    let inode_bitmap = backend.load_inode_bitmap();

    // --- Paso 1: Validación del superblock ---
    check_superblock(&sb, &inodes, &mut report);

    // --- Paso 2: Contadores contra bitmaps ---
    check_counters(&sb, &block_bitmap, &inode_bitmap, &mut report);

    // --- Paso 3: Región reservada ---
    check_reserved(&sb, &block_bitmap, &inode_bitmap, &mut report);

    // --- Paso 4: Validación básica de inodos ---
    check_inodes_basic(&sb, &inodes, &mut report);

    // --- Paso 5: Validación global de bloques ---
    check_blocks_global(&sb, &inodes, &block_bitmap, &mut report);

    // --- Paso 6: Validación de directorios ---
    check_dirs(backend, &sb, &inodes, &mut report);

    // --- Paso 7: Detección de inodos huérfanos ---
    check_orphan_inodes(backend, &sb, &inodes, &mut report);

    info!(
        "fsck ejecutado sobre {} bloques / {} inodos: {} errores",
        sb.total_blocks,
        sb.total_inodes,
        report.errors.len()
    );
    report
}
