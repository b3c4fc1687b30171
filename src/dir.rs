// src/dir.rs
//
// Motor de directorios: tablas de entradas de tamaño fijo guardadas en los
// bloques directos de un inodo de directorio. Un slot con inodo 0 está libre.

use log::{debug, error, info};

use crate::bitmap;
use crate::disk::{
    DirEntryDisk, InodeDisk, SuperblockDisk, DIRECT_BLOCKS, DIR_ENTRY_SIZE, ENTRIES_PER_BLOCK,
};
use crate::error::{FsError, Result};
use crate::image::Image;
use crate::inode::{inode_at, write_inode};
use crate::superblock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u32,
    pub name: String,
}

// --------- Helpers ---------

fn load_dir(image: &Image, sb: &SuperblockDisk, dir: u32) -> Result<InodeDisk> {
    let inode = inode_at(image, sb, dir)?;
    if !inode.is_dir() {
        error!("El inodo {} no es un directorio", dir);
        return Err(FsError::NotADirectory(dir));
    }
    Ok(inode)
}

fn read_slot(image: &Image, block: u32, slot: usize) -> Result<DirEntryDisk> {
    let offset = slot * DIR_ENTRY_SIZE;
    Ok(DirEntryDisk::decode(&image.block(block)?[offset..offset + DIR_ENTRY_SIZE]))
}

fn write_slot(image: &mut Image, block: u32, slot: usize, entry: &DirEntryDisk) -> Result<()> {
    let offset = slot * DIR_ENTRY_SIZE;
    entry.encode_into(&mut image.block_mut(block)?[offset..offset + DIR_ENTRY_SIZE]);
    Ok(())
}

/// Posición (bloque, slot) de la primera entrada ocupada que cumpla `pred`.
fn find_slot<F>(image: &Image, dir_inode: &InodeDisk, mut pred: F) -> Result<Option<(u32, usize)>>
where
    F: FnMut(&DirEntryDisk) -> bool,
{
    for block in dir_inode.populated_blocks() {
        for slot in 0..ENTRIES_PER_BLOCK {
            let entry = read_slot(image, block, slot)?;
            if !entry.is_free() && pred(&entry) {
                return Ok(Some((block, slot)));
            }
        }
    }
    Ok(None)
}

/// Un nombre vacío o con NUL no se podría volver a encontrar.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        error!("Nombre de entrada inválido: {:?}", name);
        return Err(FsError::InvalidArgument(format!("nombre de entrada inválido: {name:?}")));
    }
    Ok(())
}

// --------- Operaciones ---------

/// Crea un directorio vacío y lo enlaza en `parent` con el nombre `name`.
/// Si algún paso falla se deshacen los pasos anteriores.
pub fn create_directory(
    image: &mut Image,
    sb: &mut SuperblockDisk,
    parent: u32,
    name: &str,
) -> Result<u32> {
    // Paso 1: validar nombre y que parent sea dir
    check_name(name)?;
    load_dir(image, sb, parent)?;

    // Paso 2: reservar inodo y bloque de entradas
    let child = bitmap::allocate_inode(image, sb).map_err(|e| {
        error!("No hay inodos libres para el directorio '{}'", name);
        e
    })?;
    info!("Inodo {} asignado para el directorio '{}'", child, name);

    let block = match bitmap::allocate_block(image, sb) {
        Ok(b) => b,
        Err(e) => {
            error!("No hay bloques libres para el directorio '{}'", name);
            bitmap::free_inode(image, sb, child)?;
            return Err(e);
        }
    };

    // Paso 3: inicializar el inodo (el bloque ya viene en cero)
    write_inode(image, sb, child, &InodeDisk::directory(block))?;

    // Paso 4: agregar entrada en el directorio padre
    if let Err(e) = add_entry(image, sb, parent, child, name) {
        error!("No se pudo agregar la entrada de '{}'", name);
        write_inode(image, sb, child, &InodeDisk::default())?;
        bitmap::free_block(image, sb, block)?;
        bitmap::free_inode(image, sb, child)?;
        return Err(e);
    }

    info!("Directorio '{}' creado con inodo {}", name, child);
    Ok(child)
}

/// Escribe la entrada (target, name) en el primer slot libre de `dir`,
/// asignando un bloque nuevo cuando hace falta.
pub fn add_entry(
    image: &mut Image,
    sb: &mut SuperblockDisk,
    dir: u32,
    target: u32,
    name: &str,
) -> Result<()> {
    check_name(name)?;
    if target == 0 {
        return Err(FsError::InvalidArgument(
            "una entrada no puede apuntar al inodo 0".into(),
        ));
    }
    if target >= sb.total_inodes {
        return Err(FsError::InvalidInodeIndex(target));
    }
    let mut dir_inode = load_dir(image, sb, dir)?;
    let entry = DirEntryDisk::new(target, name);

    for i in 0..DIRECT_BLOCKS {
        let mut block = dir_inode.direct_blocks[i];

        if block == 0 {
            block = bitmap::allocate_block(image, sb).map_err(|e| {
                error!("No se pudo asignar un bloque para el directorio {} ('{}')", dir, name);
                e
            })?;
            dir_inode.direct_blocks[i] = block;
            debug!("Bloque {} agregado al directorio {}", block, dir);
        }

        for slot in 0..ENTRIES_PER_BLOCK {
            if read_slot(image, block, slot)?.is_free() {
                write_slot(image, block, slot, &entry)?;
                dir_inode.size += DIR_ENTRY_SIZE as u32;
                write_inode(image, sb, dir, &dir_inode)?;
                info!(
                    "Entrada agregada: {} (inodo {}) en bloque {}, slot {}",
                    entry.name_str(),
                    target,
                    block,
                    slot
                );
                return Ok(());
            }
        }
    }

    error!("No hay espacio para la entrada '{}' en el directorio {}", name, dir);
    Err(FsError::NoSpace)
}

/// Devuelve el inodo de la primera entrada cuyo nombre coincide.
pub fn find_entry(image: &Image, sb: &SuperblockDisk, dir: u32, name: &str) -> Result<u32> {
    let dir_inode = load_dir(image, sb, dir)?;

    match find_slot(image, &dir_inode, |e| e.matches(name))? {
        Some((block, slot)) => {
            let ino = read_slot(image, block, slot)?.inode;
            debug!("Entrada encontrada: '{}' (inodo {})", name, ino);
            Ok(ino)
        }
        None => {
            debug!("Entrada '{}' no encontrada en el directorio {}", name, dir);
            Err(FsError::NotFound(name.to_string()))
        }
    }
}

/// Enumeración perezosa de las entradas ocupadas de un directorio, en orden de
/// bloque y luego de slot. Llamar de nuevo a `list_entries` la reinicia.
pub struct DirEntries<'a> {
    image: &'a Image,
    blocks: [u32; DIRECT_BLOCKS],
    block_idx: usize,
    slot: usize,
}

impl Iterator for DirEntries<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        while self.block_idx < DIRECT_BLOCKS {
            let block = self.blocks[self.block_idx];
            if block == 0 || self.slot >= ENTRIES_PER_BLOCK {
                self.block_idx += 1;
                self.slot = 0;
                continue;
            }
            let slot = self.slot;
            self.slot += 1;
            // bloques fuera de rango (imagen corrupta) se saltan
            let Ok(entry) = read_slot(self.image, block, slot) else {
                self.slot = ENTRIES_PER_BLOCK;
                continue;
            };
            if !entry.is_free() {
                return Some(DirEntry {
                    ino: entry.inode,
                    name: entry.name_str(),
                });
            }
        }
        None
    }
}

pub fn list_entries<'a>(image: &'a Image, sb: &SuperblockDisk, dir: u32) -> Result<DirEntries<'a>> {
    let dir_inode = load_dir(image, sb, dir)?;
    Ok(DirEntries {
        image,
        blocks: dir_inode.direct_blocks,
        block_idx: 0,
        slot: 0,
    })
}

/// Borra la primera entrada de `dir` que apunte a `target`.
pub fn remove_entry_by_inode(
    image: &mut Image,
    sb: &mut SuperblockDisk,
    dir: u32,
    target: u32,
) -> Result<()> {
    let mut dir_inode = load_dir(image, sb, dir)?;

    let Some((block, slot)) = find_slot(image, &dir_inode, |e| e.inode == target)? else {
        error!("No hay entrada para el inodo {} en el directorio {}", target, dir);
        return Err(FsError::NotFound(format!("inodo {target} en el directorio {dir}")));
    };

    write_slot(image, block, slot, &DirEntryDisk::new(0, ""))?;
    dir_inode.size = dir_inode.size.saturating_sub(DIR_ENTRY_SIZE as u32);
    write_inode(image, sb, dir, &dir_inode)?;

    info!("Entrada del inodo {} eliminada del directorio {}", target, dir);
    Ok(())
}

/// Borra un directorio vacío colgado del root. Los directorios anidados no
/// están soportados: la entrada siempre se busca en el root.
pub fn delete_directory(image: &mut Image, sb: &mut SuperblockDisk, dir: u32) -> Result<()> {
    // Paso 1: validaciones, antes de tocar nada
    if dir >= sb.total_inodes {
        error!("Índice de directorio inválido: {}", dir);
        return Err(FsError::InvalidInodeIndex(dir));
    }
    if dir == sb.root_inode {
        error!("El directorio raíz no se puede borrar");
        return Err(FsError::InvalidArgument("el directorio raíz no se puede borrar".into()));
    }
    let dir_inode = load_dir(image, sb, dir)?;
    if dir_inode.size > 0 {
        error!("El directorio {} no está vacío", dir);
        return Err(FsError::DirectoryNotEmpty(dir));
    }
    let root = load_dir(image, sb, sb.root_inode)?;
    if find_slot(image, &root, |e| e.inode == dir)?.is_none() {
        error!("No se encontró la entrada del inodo {} en el root", dir);
        return Err(FsError::NotFound(format!("inodo {dir} en el directorio raíz")));
    }

    // Paso 2: liberar bloques, registro e inodo
    for block in dir_inode.populated_blocks() {
        info!("Liberando bloque {} del directorio {}", block, dir);
        bitmap::free_block(image, sb, block)?;
    }
    write_inode(image, sb, dir, &InodeDisk::default())?;
    bitmap::free_inode(image, sb, dir)?;

    // Paso 3: borrar la entrada del root
    let root_inode = sb.root_inode;
    remove_entry_by_inode(image, sb, root_inode, dir)?;
    superblock::sync(image, sb)?;

    info!("Directorio {} borrado", dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{MAX_NAME_LEN, RESERVED_BLOCKS, ROOT_INODE};

    /// Imagen con región reservada y root en el bloque 10.
    fn fresh(blocks: u32) -> (Image, SuperblockDisk) {
        let mut image = Image::new(blocks as u64 * 4096).unwrap();
        let mut sb = SuperblockDisk::new(blocks);
        bitmap::reserve_fixed_regions(&mut image, &mut sb).unwrap();
        let root_block = bitmap::allocate_block(&mut image, &mut sb).unwrap();
        write_inode(&mut image, &sb, ROOT_INODE, &InodeDisk::directory(root_block)).unwrap();
        (image, sb)
    }

    #[test]
    fn create_and_find() {
        let (mut image, mut sb) = fresh(256);
        let docs = create_directory(&mut image, &mut sb, ROOT_INODE, "docs").unwrap();
        assert_eq!(docs, 1);
        assert_eq!(find_entry(&image, &sb, ROOT_INODE, "docs").unwrap(), docs);
        assert_eq!(find_entry(&image, &sb, ROOT_INODE, "docs").unwrap(), docs);

        let child = inode_at(&image, &sb, docs).unwrap();
        assert!(child.is_dir());
        assert_eq!(child.size, 0);
        assert_eq!(child.direct_blocks[0], RESERVED_BLOCKS + 1);
        assert_eq!(inode_at(&image, &sb, ROOT_INODE).unwrap().size, DIR_ENTRY_SIZE as u32);
    }

    #[test]
    fn empty_and_nul_names_are_rejected() {
        let (mut image, mut sb) = fresh(64);
        let before = sb;
        for bad in ["", "a\0b"] {
            assert!(matches!(
                create_directory(&mut image, &mut sb, ROOT_INODE, bad),
                Err(FsError::InvalidArgument(_))
            ));
            assert!(matches!(
                add_entry(&mut image, &mut sb, ROOT_INODE, 5, bad),
                Err(FsError::InvalidArgument(_))
            ));
        }
        assert_eq!(sb, before);
        assert_eq!(list_entries(&image, &sb, ROOT_INODE).unwrap().count(), 0);
    }

    #[test]
    fn remove_by_inode_drops_only_first_match() {
        let (mut image, mut sb) = fresh(64);
        add_entry(&mut image, &mut sb, ROOT_INODE, 7, "uno").unwrap();
        add_entry(&mut image, &mut sb, ROOT_INODE, 7, "dos").unwrap();
        let size = inode_at(&image, &sb, ROOT_INODE).unwrap().size;

        remove_entry_by_inode(&mut image, &mut sb, ROOT_INODE, 7).unwrap();
        let left: Vec<_> = list_entries(&image, &sb, ROOT_INODE).unwrap().collect();
        assert_eq!(
            left,
            vec![DirEntry {
                ino: 7,
                name: "dos".to_string()
            }]
        );
        assert_eq!(
            inode_at(&image, &sb, ROOT_INODE).unwrap().size,
            size - DIR_ENTRY_SIZE as u32
        );
    }

    #[test]
    fn find_missing_entry() {
        let (image, sb) = fresh(64);
        assert!(matches!(
            find_entry(&image, &sb, ROOT_INODE, "nada"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn list_is_ordered_and_restartable() {
        let (mut image, mut sb) = fresh(256);
        for name in ["a", "b", "c"] {
            create_directory(&mut image, &mut sb, ROOT_INODE, name).unwrap();
        }
        let b = find_entry(&image, &sb, ROOT_INODE, "b").unwrap();
        remove_entry_by_inode(&mut image, &mut sb, ROOT_INODE, b).unwrap();

        let names: Vec<String> = list_entries(&image, &sb, ROOT_INODE)
            .unwrap()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(list_entries(&image, &sb, ROOT_INODE).unwrap().count(), 2);
    }

    #[test]
    fn removed_slot_is_reused_first() {
        let (mut image, mut sb) = fresh(256);
        let a = create_directory(&mut image, &mut sb, ROOT_INODE, "a").unwrap();
        create_directory(&mut image, &mut sb, ROOT_INODE, "b").unwrap();
        remove_entry_by_inode(&mut image, &mut sb, ROOT_INODE, a).unwrap();
        add_entry(&mut image, &mut sb, ROOT_INODE, a, "a2").unwrap();

        let first = list_entries(&image, &sb, ROOT_INODE).unwrap().next().unwrap();
        assert_eq!(first, DirEntry { ino: a, name: "a2".into() });
        assert_eq!(inode_at(&image, &sb, ROOT_INODE).unwrap().size, 2 * DIR_ENTRY_SIZE as u32);
    }

    #[test]
    fn long_names_are_truncated_silently() {
        let (mut image, mut sb) = fresh(64);
        let long = "informe_trimestral_del_departamento_financiero";
        let ino = create_directory(&mut image, &mut sb, ROOT_INODE, long).unwrap();
        let listed = list_entries(&image, &sb, ROOT_INODE).unwrap().next().unwrap();
        assert_eq!(listed.name, &long[..MAX_NAME_LEN]);
        assert_eq!(find_entry(&image, &sb, ROOT_INODE, long).unwrap(), ino);
    }

    #[test]
    fn directory_grows_into_second_block() {
        let (mut image, mut sb) = fresh(64);
        for i in 0..=ENTRIES_PER_BLOCK as u32 {
            add_entry(&mut image, &mut sb, ROOT_INODE, 1 + (i % 15), &format!("e{i}")).unwrap();
        }
        let root = inode_at(&image, &sb, ROOT_INODE).unwrap();
        assert_ne!(root.direct_blocks[1], 0);
        assert_eq!(root.size, (ENTRIES_PER_BLOCK as u32 + 1) * DIR_ENTRY_SIZE as u32);
        assert_eq!(
            list_entries(&image, &sb, ROOT_INODE).unwrap().count(),
            ENTRIES_PER_BLOCK + 1
        );
    }

    #[test]
    fn full_directory_reports_no_space() {
        let (mut image, mut sb) = fresh(64);
        let capacity = DIRECT_BLOCKS * ENTRIES_PER_BLOCK;
        for i in 0..capacity {
            add_entry(&mut image, &mut sb, ROOT_INODE, 1, &format!("f{i}")).unwrap();
        }
        let free_before = sb.free_blocks;
        assert_eq!(add_entry(&mut image, &mut sb, ROOT_INODE, 1, "extra"), Err(FsError::NoSpace));
        assert_eq!(sb.free_blocks, free_before);
    }

    #[test]
    fn add_entry_without_blocks_left() {
        let (mut image, mut sb) = fresh(11);
        for i in 0..ENTRIES_PER_BLOCK {
            add_entry(&mut image, &mut sb, ROOT_INODE, 1, &format!("f{i}")).unwrap();
        }
        assert_eq!(
            add_entry(&mut image, &mut sb, ROOT_INODE, 1, "extra"),
            Err(FsError::NoFreeBlocks)
        );
    }

    #[test]
    fn create_directory_rolls_back_when_blocks_run_out() {
        let (mut image, mut sb) = fresh(11);
        let before = sb;
        assert_eq!(
            create_directory(&mut image, &mut sb, ROOT_INODE, "docs"),
            Err(FsError::NoFreeBlocks)
        );
        assert_eq!(sb, before);
        assert!(!bitmap::is_inode_used(&image, 1).unwrap());
    }

    #[test]
    fn create_directory_requires_directory_parent() {
        let (mut image, mut sb) = fresh(64);
        assert_eq!(
            create_directory(&mut image, &mut sb, 5, "x"),
            Err(FsError::NotADirectory(5))
        );
    }

    #[test]
    fn delete_directory_frees_everything() {
        let (mut image, mut sb) = fresh(256);
        let before = sb;
        let docs = create_directory(&mut image, &mut sb, ROOT_INODE, "docs").unwrap();
        delete_directory(&mut image, &mut sb, docs).unwrap();

        assert!(matches!(find_entry(&image, &sb, ROOT_INODE, "docs"), Err(FsError::NotFound(_))));
        assert_eq!(inode_at(&image, &sb, docs).unwrap(), InodeDisk::default());
        assert!(!bitmap::is_inode_used(&image, docs).unwrap());
        assert_eq!(sb.free_blocks, before.free_blocks);
        assert_eq!(sb.free_inodes, before.free_inodes);
        assert_eq!(inode_at(&image, &sb, ROOT_INODE).unwrap().size, 0);
    }

    #[test]
    fn delete_directory_errors() {
        let (mut image, mut sb) = fresh(256);
        assert_eq!(delete_directory(&mut image, &mut sb, 500), Err(FsError::InvalidInodeIndex(500)));
        assert!(matches!(
            delete_directory(&mut image, &mut sb, ROOT_INODE),
            Err(FsError::InvalidArgument(_))
        ));

        let docs = create_directory(&mut image, &mut sb, ROOT_INODE, "docs").unwrap();
        let inner = create_directory(&mut image, &mut sb, docs, "inner").unwrap();
        assert_eq!(delete_directory(&mut image, &mut sb, docs), Err(FsError::DirectoryNotEmpty(docs)));

        // anidado: no hay entrada en el root, no se toca nada
        let free = sb.free_blocks;
        assert!(matches!(delete_directory(&mut image, &mut sb, inner), Err(FsError::NotFound(_))));
        assert_eq!(sb.free_blocks, free);
        assert!(inode_at(&image, &sb, inner).unwrap().is_dir());
    }
}
