mod common;

use acnnfs::bitmap::{self, allocate_block, count_free_blocks, count_free_inodes};
use acnnfs::image::Image;
use acnnfs::superblock;
use acnnfs::{AcnnFilesystem, FsError, SuperblockDisk, BLOCK_SIZE, MAX_FILE_SIZE, RESERVED_BLOCKS};
use common::{assert_consistent, fresh, pattern, FOUR_MIB};

fn assert_counters_match_bitmaps(fs: &AcnnFilesystem) {
    let sb = fs.superblock();
    assert_eq!(sb.free_blocks, count_free_blocks(fs.image(), sb).unwrap());
    assert_eq!(sb.free_inodes, count_free_inodes(fs.image(), sb).unwrap());
    // el superblock en disco nunca queda atrasado
    assert_eq!(superblock::load(fs.image()).unwrap(), *sb);
}

#[test]
fn counters_follow_bitmaps_across_operations() {
    let mut fs = fresh(512);
    assert_counters_match_bitmaps(&fs);

    let docs = fs.create_directory(0, "docs").unwrap();
    let a = fs.add_file(docs, "a.bin", &pattern(3 * BLOCK_SIZE)).unwrap();
    fs.add_file(0, "b.txt", b"bee").unwrap();
    assert_counters_match_bitmaps(&fs);

    fs.write_file(a, &pattern(7 * BLOCK_SIZE + 1)).unwrap();
    assert_counters_match_bitmaps(&fs);

    fs.delete_file(docs, "a.bin").unwrap();
    fs.delete_directory(docs).unwrap();
    fs.delete_file(0, "b.txt").unwrap();
    assert_counters_match_bitmaps(&fs);
    assert_consistent(&fs);

    // de vuelta al estado inicial
    assert_eq!(fs.superblock().free_inodes, fs.superblock().total_inodes - 1);
}

#[test]
fn allocation_is_deterministic() {
    let mut fs = fresh(64);
    let first: Vec<u32> = (0..5).map(|_| fs.allocate_block().unwrap()).collect();
    assert_eq!(first, vec![11, 12, 13, 14, 15]);

    fs.free_block(13).unwrap();
    fs.free_block(11).unwrap();
    assert_eq!(fs.allocate_block().unwrap(), 11);
    assert_eq!(fs.allocate_block().unwrap(), 13);
    assert_eq!(fs.allocate_block().unwrap(), 16);
}

#[test]
fn file_round_trip() {
    let mut fs = fresh(256);
    for (name, len) in [("vacio", 0), ("corto", 17), ("justo", BLOCK_SIZE), ("largo", 5 * BLOCK_SIZE + 9)] {
        let data = pattern(len);
        let ino = fs.add_file(0, name, &data).unwrap();

        let mut dest = vec![0xFFu8; len + 1];
        assert_eq!(fs.read_file(ino, &mut dest).unwrap(), len);
        assert_eq!(&dest[..len], &data[..]);
        assert_eq!(dest[len], 0);
    }
    assert_consistent(&fs);
}

#[test]
fn lookup_is_idempotent() {
    let mut fs = fresh(128);
    let ino = fs.add_file(0, "notas.txt", b"x").unwrap();
    assert_eq!(fs.find_entry(0, "notas.txt").unwrap(), ino);
    assert_eq!(fs.find_entry(0, "notas.txt").unwrap(), ino);
}

#[test]
fn ten_blocks_fit_eleven_do_not() {
    let mut fs = fresh(128);
    let ino = fs.add_file(0, "max", &pattern(MAX_FILE_SIZE)).unwrap();
    assert_eq!(fs.inode(ino).unwrap().populated_blocks().count(), 10);

    let before = *fs.superblock();
    let idx = fs.allocate_inode().unwrap();
    assert_eq!(
        fs.create_file(idx, &pattern(MAX_FILE_SIZE + 1)),
        Err(FsError::FileTooLarge(MAX_FILE_SIZE + 1))
    );
    assert_eq!(fs.superblock().free_blocks, before.free_blocks);
}

#[test]
fn ten_block_image_has_nothing_to_allocate() {
    let mut image = Image::new(40960).unwrap();
    let mut sb = SuperblockDisk::new(image.total_blocks());
    assert_eq!(sb.total_blocks, 10);
    superblock::sync(&mut image, &sb).unwrap();

    bitmap::reserve_fixed_regions(&mut image, &mut sb).unwrap();
    assert_eq!(sb.free_blocks, 0);
    assert_eq!(allocate_block(&mut image, &mut sb), Err(FsError::NoFreeBlocks));
}

#[test]
fn docs_directory_lifecycle() {
    let mut fs = AcnnFilesystem::format(FOUR_MIB).unwrap();
    let docs = fs.create_directory(0, "docs").unwrap();
    assert_eq!(fs.find_entry(0, "docs").unwrap(), docs);
    assert_consistent(&fs);

    fs.delete_directory(docs).unwrap();
    assert_eq!(fs.find_entry(0, "docs"), Err(FsError::NotFound("docs".into())));
    assert_consistent(&fs);
}

#[test]
fn deleted_file_releases_everything() {
    let mut fs = fresh(128);
    let ino = fs.add_file(0, "tmp.bin", &pattern(2 * BLOCK_SIZE + 1)).unwrap();
    let blocks: Vec<u32> = fs.inode(ino).unwrap().populated_blocks().collect();

    fs.delete_file(0, "tmp.bin").unwrap();
    let record = fs.inode(ino).unwrap();
    assert!(record.direct_blocks.iter().all(|&b| b == 0));
    assert!(!bitmap::is_inode_used(fs.image(), ino).unwrap());

    let reused: Vec<u32> = (0..blocks.len()).map(|_| fs.allocate_block().unwrap()).collect();
    assert_eq!(reused, blocks);
}

#[test]
fn image_survives_a_trip_through_bytes() {
    let mut fs = fresh(256);
    let docs = fs.create_directory(0, "docs").unwrap();
    let ino = fs.add_file(docs, "informe.txt", b"contenido").unwrap();

    let reopened = AcnnFilesystem::open(fs.into_bytes()).unwrap();
    assert_consistent(&reopened);
    assert_eq!(reopened.find_entry(docs, "informe.txt").unwrap(), ino);
    assert_eq!(reopened.read_to_vec(ino).unwrap(), b"contenido");
    assert!(reopened.superblock().free_blocks < reopened.superblock().total_blocks - RESERVED_BLOCKS);
}
