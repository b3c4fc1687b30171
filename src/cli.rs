// src/cli.rs
use std::path::PathBuf;

use clap::Parser;

/// Convierte "4194304", "4KB", "4M", "1GB"... a bytes (múltiplos binarios).
pub fn parse_size(arg: &str) -> Result<u64, String> {
    let arg = arg.trim();
    let digits_end = arg.find(|c: char| !c.is_ascii_digit()).unwrap_or(arg.len());
    let (number, suffix) = arg.split_at(digits_end);

    let value: u64 = number
        .parse()
        .map_err(|_| format!("tamaño inválido: '{arg}'"))?;
    let multiplier: u64 = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1 << 10,
        "M" | "MB" => 1 << 20,
        "G" | "GB" => 1 << 30,
        other => return Err(format!("sufijo de tamaño desconocido: '{other}'")),
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("tamaño demasiado grande: '{arg}'"))
}

/// crea una imagen ACNN vacía
#[derive(Parser, Debug, PartialEq)]
#[command(name = "mkfs.acnn", author, version, about = "crea una imagen ACNN")]
pub struct MkfsArgs {
    /// tamaño de la imagen (4194304, 4KB, 4MB, 1GB)
    #[arg(value_parser = parse_size)]
    pub size: u64,
    /// archivo de salida
    #[arg(short, long, default_value = "acnn.img")]
    pub output: PathBuf,
    /// copia el contenido de un directorio del host a la imagen
    #[arg(long, value_name = "DIR")]
    pub populate: Option<PathBuf>,
}

/// revisa la consistencia de una imagen
#[derive(Parser, Debug, PartialEq)]
#[command(name = "fsck.acnn", author, version, about = "revisa una imagen ACNN")]
pub struct FsckArgs {
    /// la imagen a revisar
    pub image: PathBuf,
}

/// monta una imagen con FUSE (sólo lectura)
#[derive(Parser, Debug, PartialEq)]
#[command(name = "mount_acnn", author, version, about = "monta una imagen ACNN")]
pub struct MountArgs {
    /// la imagen a montar
    pub image: PathBuf,
    /// punto de montaje
    pub mountpoint: PathBuf,
}

#[cfg(test)]
mod parse_size_tests {
    use super::*;

    #[test]
    fn plain_and_suffixed_sizes() {
        assert_eq!(parse_size("4194304"), Ok(4_194_304));
        assert_eq!(parse_size("4KB"), Ok(4096));
        assert_eq!(parse_size("4k"), Ok(4096));
        assert_eq!(parse_size("4MB"), Ok(4 * 1024 * 1024));
        assert_eq!(parse_size("4M"), Ok(4 * 1024 * 1024));
        assert_eq!(parse_size("1GB"), Ok(1 << 30));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("4TB").is_err());
        assert!(parse_size("99999999999999999999G").is_err());
    }
}
