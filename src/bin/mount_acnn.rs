// src/bin/mount_acnn.rs
use std::fs;

use acnnfs::cli::MountArgs;
use acnnfs::{AcnnFilesystem, AcnnMount};
use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = MountArgs::parse();

    // 1. Cargar la imagen completa en memoria
    let bytes = fs::read(&args.image).with_context(|| format!("No se pudo leer {:?}", args.image))?;
    let fs_img = AcnnFilesystem::open(bytes)
        .with_context(|| format!("{:?} no es una imagen ACNN válida", args.image))?;

    // 2. Montar (bloquea hasta que se desmonte)
    AcnnMount::new(fs_img).run(&args.mountpoint)
}
