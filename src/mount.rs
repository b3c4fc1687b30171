// src/mount.rs
//
// Vista FUSE de sólo lectura sobre una imagen ACNN. El kernel numera los
// inodos desde 1, así que ino = índice + 1 (el root queda en ino 1).

use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry,
    ReplyOpen, ReplyStatfs, Request,
};
use libc::{EINVAL, EISDIR, ENOENT, EROFS};
use log::{debug, info, warn};

use crate::disk::{InodeDisk, InodeKind, BLOCK_SIZE, MAX_NAME_LEN, MODE_TYPE_MASK};
use crate::error::FsError;
use crate::fs::AcnnFilesystem;

pub const ROOT_INO: u64 = 1;

const TTL: Duration = Duration::from_secs(1);

pub fn ino_to_index(ino: u64) -> Option<u32> {
    ino.checked_sub(1).and_then(|i| u32::try_from(i).ok())
}

pub fn index_to_ino(index: u32) -> u64 {
    index as u64 + 1
}

pub fn inode_to_attr(index: u32, inode: &InodeDisk, stamp: SystemTime) -> FileAttr {
    let kind = match inode.kind() {
        InodeKind::Directory => FileType::Directory,
        _ => FileType::RegularFile,
    };
    FileAttr {
        ino: index_to_ino(index),
        size: inode.size as u64,
        blocks: inode.populated_blocks().count() as u64 * (BLOCK_SIZE as u64 / 512),
        atime: stamp,
        mtime: stamp,
        ctime: stamp,
        crtime: stamp,
        kind,
        perm: (inode.mode & !MODE_TYPE_MASK) as u16,
        nlink: if kind == FileType::Directory { 2 } else { 1 },
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: BLOCK_SIZE as u32,
        flags: 0,
    }
}

pub struct AcnnMount {
    fs: AcnnFilesystem,
    stamp: SystemTime,
}

impl AcnnMount {
    pub fn new(fs: AcnnFilesystem) -> Self {
        Self {
            fs,
            stamp: SystemTime::now(),
        }
    }

    fn attr(&self, ino: u64) -> Result<FileAttr, FsError> {
        let index = ino_to_index(ino).ok_or(FsError::InvalidInodeIndex(u32::MAX))?;
        let inode = self.fs.inode(index)?;
        if inode.kind() == InodeKind::Free {
            return Err(FsError::NotFound(format!("inodo {index}")));
        }
        Ok(inode_to_attr(index, &inode, self.stamp))
    }

    /// Resuelve `name` dentro del directorio `parent` (ino de FUSE).
    pub fn lookup_child(&self, parent: u64, name: &str) -> Result<FileAttr, FsError> {
        let dir = ino_to_index(parent).ok_or(FsError::InvalidInodeIndex(u32::MAX))?;
        let child = self.fs.find_entry(dir, name)?;
        self.attr(index_to_ino(child))
    }

    /// Directorio que contiene a `dir`. El root es su propio padre.
    fn parent_of(&self, dir: u32) -> u32 {
        let root = self.fs.root_inode();
        if dir == root {
            return root;
        }
        (0..self.fs.superblock().total_inodes)
            .find(|&candidate| {
                self.fs
                    .list_entries(candidate)
                    .map(|mut entries| entries.any(|e| e.ino == dir))
                    .unwrap_or(false)
            })
            .unwrap_or(root)
    }

    /// Entradas en el orden en que las ve el kernel: ".", ".." y el resto.
    pub fn dir_listing(&self, ino: u64) -> Result<Vec<(u64, FileType, String)>, FsError> {
        let dir = ino_to_index(ino).ok_or(FsError::InvalidInodeIndex(u32::MAX))?;
        let entries = self.fs.list_entries(dir)?;

        let mut out = vec![
            (ino, FileType::Directory, ".".to_string()),
            (index_to_ino(self.parent_of(dir)), FileType::Directory, "..".to_string()),
        ];
        for entry in entries {
            let kind = match self.fs.inode(entry.ino).map(|i| i.kind()) {
                Ok(InodeKind::Directory) => FileType::Directory,
                _ => FileType::RegularFile,
            };
            out.push((index_to_ino(entry.ino), kind, entry.name));
        }
        Ok(out)
    }

    /// Bytes [offset, offset + size) del archivo, recortados al tamaño real.
    pub fn read_range(&self, ino: u64, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        let index = ino_to_index(ino).ok_or(FsError::InvalidInodeIndex(u32::MAX))?;
        if self.fs.inode(index)?.is_dir() {
            return Err(FsError::IsADirectory(index));
        }
        let data = self.fs.read_to_vec(index)?;
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    pub fn run(self, mountpoint: &Path) -> Result<()> {
        let options = vec![
            MountOption::FSName("acnnfs".to_string()),
            MountOption::AutoUnmount,
            MountOption::RO,
        ];
        info!("Montando imagen ACNN (sólo lectura) en {}", mountpoint.display());
        fuser::mount2(self, mountpoint, &options)
            .with_context(|| format!("No se pudo montar en {}", mountpoint.display()))?;
        Ok(())
    }
}

impl Filesystem for AcnnMount {
    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        debug!("getattr: ino = {ino}");
        match self.attr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(_) => reply.error(ENOENT),
        }
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = name.to_string_lossy();
        debug!("lookup: parent = {parent}, name = {name:?}");
        match self.lookup_child(parent, &name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e.as_errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir: ino = {ino}, offset = {offset}");
        let listing = match self.dir_listing(ino) {
            Ok(l) => l,
            Err(e) => {
                reply.error(e.as_errno());
                return;
            }
        };

        for (i, (child, kind, name)) in listing.iter().enumerate().skip(offset.max(0) as usize) {
            // el offset de cada entrada apunta a la siguiente
            if reply.add(*child, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open: ino = {ino}, flags = {flags}");
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(EROFS);
            return;
        }
        match self.attr(ino) {
            Ok(attr) if attr.kind == FileType::Directory => reply.error(EISDIR),
            Ok(_) => reply.opened(ino, 0),
            Err(_) => reply.error(ENOENT),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read: ino = {ino}, offset = {offset}, size = {size}");
        if offset < 0 {
            reply.error(EINVAL);
            return;
        }
        match self.read_range(ino, offset as u64, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!("read falló en ino {ino}: {e}");
                reply.error(e.as_errno());
            }
        }
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let sb = self.fs.superblock();
        reply.statfs(
            sb.total_blocks as u64,
            sb.free_blocks as u64,
            sb.free_blocks as u64,
            sb.total_inodes as u64,
            sb.free_inodes as u64,
            sb.block_size,
            MAX_NAME_LEN as u32,
            sb.block_size,
        );
    }
}
