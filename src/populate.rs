// src/populate.rs
//
// Copia un directorio del host dentro de una imagen recién formateada:
// archivos regulares al root, subdirectorios de primer nivel como
// directorios con sus archivos. Lo que esté más abajo se ignora.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::disk::{MAX_FILE_SIZE, MAX_NAME_LEN};
use crate::fs::AcnnFilesystem;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PopulateSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("No se pudo leer el directorio {:?}", dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    entries.sort();
    Ok(entries)
}

fn entry_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.len() > MAX_NAME_LEN {
        warn!("Nombre '{}' recortado a {} bytes", name, MAX_NAME_LEN);
    }
    name
}

fn copy_files(
    fs_img: &mut AcnnFilesystem,
    dir: u32,
    host_dir: &Path,
    depth: usize,
    summary: &mut PopulateSummary,
) -> Result<()> {
    for path in sorted_entries(host_dir)? {
        let name = entry_name(&path);

        if path.is_dir() {
            if depth > 0 {
                warn!("Se omite {:?}: sólo se copia un nivel de subdirectorios", path);
                summary.skipped += 1;
                continue;
            }
            let child = fs_img
                .create_directory(dir, &name)
                .with_context(|| format!("No se pudo crear el directorio '{}'", name))?;
            summary.directories += 1;
            copy_files(fs_img, child, &path, depth + 1, summary)?;
            continue;
        }

        if !path.is_file() {
            warn!("Se omite {:?}: no es un archivo regular", path);
            summary.skipped += 1;
            continue;
        }

        let data = fs::read(&path).with_context(|| format!("No se pudo leer {:?}", path))?;
        if data.len() > MAX_FILE_SIZE {
            warn!(
                "Se omite {:?}: {} bytes excede el máximo de {}",
                path,
                data.len(),
                MAX_FILE_SIZE
            );
            summary.skipped += 1;
            continue;
        }

        fs_img
            .add_file(dir, &name, &data)
            .with_context(|| format!("No se pudo copiar {:?} a la imagen", path))?;
        summary.files += 1;
    }
    Ok(())
}

pub fn populate_from_dir(fs_img: &mut AcnnFilesystem, host_dir: &Path) -> Result<PopulateSummary> {
    let mut summary = PopulateSummary::default();
    let root = fs_img.root_inode();
    copy_files(fs_img, root, host_dir, 0, &mut summary)?;

    info!(
        "Copiados {} archivos y {} directorios desde {:?} ({} omitidos)",
        summary.files, summary.directories, host_dir, summary.skipped
    );
    Ok(summary)
}
