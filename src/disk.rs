// src/disk.rs
//
// Constantes del formato ACNN y registros en disco. Cada registro se
// (de)serializa campo por campo en offsets fijos, little-endian.

// -----------------------------------------------------------------------------
// Constantes del formato
// -----------------------------------------------------------------------------

pub const ACNN_MAGIC: u32 = 0xA2C0_F0F8;
pub const BLOCK_SIZE: usize = 4096;

pub const BOOT_BLOCK: u32 = 0;
pub const SUPERBLOCK_BLOCK: u32 = 1;
pub const INODE_BITMAP_BLOCK: u32 = 2;
pub const BLOCK_BITMAP_BLOCK: u32 = 3;
pub const INODE_TABLE_BLOCK: u32 = 4;
/// Bloques [0, RESERVED_BLOCKS) quedan marcados como usados para siempre.
pub const RESERVED_BLOCKS: u32 = 10;
pub const INODE_TABLE_BLOCKS: u32 = RESERVED_BLOCKS - INODE_TABLE_BLOCK;

pub const INODE_SIZE: usize = 128;
/// Capacidad de la tabla de inodos (6 bloques de 32 registros). El número de
/// inodos es `total_blocks / 4` con este tope; a partir de 3 MiB queda en 192
/// (una imagen de 4 MiB tiene 192, no 256) y la tabla nunca invade datos.
pub const MAX_INODES: u32 = (INODE_TABLE_BLOCKS as usize * BLOCK_SIZE / INODE_SIZE) as u32;
pub const ROOT_INODE: u32 = 0;

pub const DIRECT_BLOCKS: usize = 10;
pub const MAX_FILE_SIZE: usize = DIRECT_BLOCKS * BLOCK_SIZE;

/// Bytes del campo de nombre, incluyendo el terminador nulo.
pub const NAME_FIELD_LEN: usize = 28;
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;
pub const DIR_ENTRY_SIZE: usize = 4 + NAME_FIELD_LEN;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// Un bitmap ocupa un solo bloque: 1 bit por bloque.
pub const MAX_TOTAL_BLOCKS: u32 = (BLOCK_SIZE * 8) as u32;

pub const MODE_TYPE_MASK: u32 = libc::S_IFMT as u32;
pub const MODE_DIR: u32 = libc::S_IFDIR as u32 | 0o755;
pub const MODE_FILE: u32 = libc::S_IFREG as u32 | 0o644;

// -------------------- Codec de campos --------------------

pub(crate) fn get_u32(buf: &[u8], offset: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(b)
}

pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// -------------------- Estructuras en disco --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuperblockDisk {
    pub magic: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub root_inode: u32,
    pub inode_size: u32,
    pub block_bitmap: u32,
    pub inode_bitmap: u32,
}

impl SuperblockDisk {
    pub const RECORD_SIZE: usize = 40;

    /// Geometría derivada de `total_blocks`. El root cuenta como inodo usado
    /// y la región reservada ya está descontada de los bloques libres.
    pub fn new(total_blocks: u32) -> Self {
        let total_inodes = (total_blocks / 4).min(MAX_INODES);
        Self {
            magic: ACNN_MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks,
            free_blocks: total_blocks.saturating_sub(RESERVED_BLOCKS),
            total_inodes,
            free_inodes: total_inodes.saturating_sub(1),
            root_inode: ROOT_INODE,
            inode_size: INODE_SIZE as u32,
            block_bitmap: BLOCK_BITMAP_BLOCK,
            inode_bitmap: INODE_BITMAP_BLOCK,
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        Self {
            magic: get_u32(buf, 0),
            block_size: get_u32(buf, 4),
            total_blocks: get_u32(buf, 8),
            free_blocks: get_u32(buf, 12),
            total_inodes: get_u32(buf, 16),
            free_inodes: get_u32(buf, 20),
            root_inode: get_u32(buf, 24),
            inode_size: get_u32(buf, 28),
            block_bitmap: get_u32(buf, 32),
            inode_bitmap: get_u32(buf, 36),
        }
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.magic);
        put_u32(buf, 4, self.block_size);
        put_u32(buf, 8, self.total_blocks);
        put_u32(buf, 12, self.free_blocks);
        put_u32(buf, 16, self.total_inodes);
        put_u32(buf, 20, self.free_inodes);
        put_u32(buf, 24, self.root_inode);
        put_u32(buf, 28, self.inode_size);
        put_u32(buf, 32, self.block_bitmap);
        put_u32(buf, 36, self.inode_bitmap);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeKind {
    Free,
    File,
    Directory,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InodeDisk {
    pub mode: u32,
    pub size: u32,
    pub direct_blocks: [u32; DIRECT_BLOCKS],
    /// Reservado: no hay direccionamiento indirecto.
    pub indirect_block: u32,
    pub reserved: [u32; 4],
}

impl InodeDisk {
    pub fn directory(first_block: u32) -> Self {
        let mut inode = Self {
            mode: MODE_DIR,
            ..Self::default()
        };
        inode.direct_blocks[0] = first_block;
        inode
    }

    pub fn kind(&self) -> InodeKind {
        if self.mode == 0 {
            return InodeKind::Free;
        }
        if self.mode & MODE_TYPE_MASK == libc::S_IFDIR as u32 {
            InodeKind::Directory
        } else {
            InodeKind::File
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == InodeKind::Directory
    }

    /// Bloques directos asignados (distintos de 0), en orden de slot.
    pub fn populated_blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct_blocks.iter().copied().filter(|&b| b != 0)
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut direct_blocks = [0u32; DIRECT_BLOCKS];
        for (i, slot) in direct_blocks.iter_mut().enumerate() {
            *slot = get_u32(buf, 8 + i * 4);
        }
        let mut reserved = [0u32; 4];
        for (i, r) in reserved.iter_mut().enumerate() {
            *r = get_u32(buf, 52 + i * 4);
        }
        Self {
            mode: get_u32(buf, 0),
            size: get_u32(buf, 4),
            direct_blocks,
            indirect_block: get_u32(buf, 48),
            reserved,
        }
    }

    /// Escribe el registro completo; el padding hasta INODE_SIZE queda en cero.
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[..INODE_SIZE].fill(0);
        put_u32(buf, 0, self.mode);
        put_u32(buf, 4, self.size);
        for (i, &b) in self.direct_blocks.iter().enumerate() {
            put_u32(buf, 8 + i * 4, b);
        }
        put_u32(buf, 48, self.indirect_block);
        for (i, &r) in self.reserved.iter().enumerate() {
            put_u32(buf, 52 + i * 4, r);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntryDisk {
    pub inode: u32,
    pub name: [u8; NAME_FIELD_LEN],
}

impl DirEntryDisk {
    /// El nombre se trunca en silencio a MAX_NAME_LEN bytes.
    pub fn new(inode: u32, name: &str) -> Self {
        let mut field = [0u8; NAME_FIELD_LEN];
        let stored = truncate_name(name);
        field[..stored.len()].copy_from_slice(stored.as_bytes());
        Self { inode, name: field }
    }

    pub fn is_free(&self) -> bool {
        self.inode == 0
    }

    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Comparación exacta contra el nombre ya truncado.
    pub fn matches(&self, name: &str) -> bool {
        let wanted = truncate_name(name).as_bytes();
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        &self.name[..end] == wanted
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0u8; NAME_FIELD_LEN];
        name.copy_from_slice(&buf[4..DIR_ENTRY_SIZE]);
        Self {
            inode: get_u32(buf, 0),
            name,
        }
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.inode);
        buf[4..DIR_ENTRY_SIZE].copy_from_slice(&self.name);
    }
}

/// Recorta `name` a MAX_NAME_LEN bytes sin partir un carácter UTF-8.
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
