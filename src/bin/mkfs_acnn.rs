// src/bin/mkfs_acnn.rs
use std::fs;

use acnnfs::cli::MkfsArgs;
use acnnfs::{populate_from_dir, AcnnFilesystem};
use anyhow::{Context, Result};
use byte_unit::Byte;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = MkfsArgs::parse();

    // 1. Formatear en memoria
    let mut fs_img = AcnnFilesystem::format(args.size)
        .with_context(|| format!("No se pudo formatear una imagen de {} bytes", args.size))?;

    // 2. (Opcional) copiar contenido del host
    if let Some(dir) = &args.populate {
        populate_from_dir(&mut fs_img, dir)?;
    }

    // 3. Persistir
    let bytes = fs_img.into_bytes();
    fs::write(&args.output, &bytes)
        .with_context(|| format!("No se pudo escribir {:?}", args.output))?;

    info!(
        "Imagen {:?} creada ({})",
        args.output,
        Byte::from_bytes(bytes.len() as _).get_appropriate_unit(true)
    );
    Ok(())
}
