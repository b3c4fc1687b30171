// src/bin/fsck_acnn.rs
use std::fs;
use std::process::ExitCode;

use acnnfs::cli::FsckArgs;
use acnnfs::fsck::run_fsck;
use acnnfs::AcnnFilesystem;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = FsckArgs::parse();

    let bytes = fs::read(&args.image).with_context(|| format!("No se pudo leer {:?}", args.image))?;
    let fs_img = AcnnFilesystem::open(bytes)
        .with_context(|| format!("{:?} no es una imagen ACNN válida", args.image))?;

    // ——————————————————————————————————————————
    //       EJECUTAR FSCK
    // ——————————————————————————————————————————
    let rep = run_fsck(&fs_img);

    println!("\n{}", " ACNN FILESYSTEM CHECK ".on_blue().bold());
    println!("{}", "──────────────────────────────────────────".blue());

    let sb = fs_img.superblock();
    println!(
        "  {} bloques ({} libres), {} inodos ({} libres)",
        sb.total_blocks, sb.free_blocks, sb.total_inodes, sb.free_inodes
    );

    println!("\n{}", "Bloques".bold().underline());
    if rep.blocks_ok {
        println!("  {} Bloques OK", "✓".green());
    } else {
        println!("  {} Errores en bloques", "✗".red());
    }

    println!("\n{}", "Inodos".bold().underline());
    if rep.inodes_ok {
        println!("  {} Inodos OK", "✓".green());
    } else {
        println!("  {} Errores en inodos", "✗".red());
    }

    println!("\n{}", "Errores detectados".bold().underline());
    if rep.errors.is_empty() {
        println!("  {} No se encontraron errores", "✓".green());
    } else {
        for err in &rep.errors {
            println!("  {} {}", "•".red(), err.red());
        }
    }

    // ——————————————————————————————————————————
    //       RESUMEN FINAL
    // ——————————————————————————————————————————
    println!("\n{}", "Resumen".bold().underline());
    if rep.is_clean() {
        println!("{} Sistema de archivos limpio.\n", "✓ OK".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} {} errores encontrados.\n",
            "✗ FSCK completado con errores:".red().bold(),
            rep.errors.len().to_string().yellow()
        );
        Ok(ExitCode::FAILURE)
    }
}
