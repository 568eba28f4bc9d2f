#![allow(unused)]

mod common;

use common::{small_config, temp_image_path, RamImage};
use ixfs::*;

fn populated(image: &RamImage, config: Config) -> FileSystem<RamImage> {
    let mut fs = FileSystem::create(image.clone(), config).unwrap();
    fs.create_file("a.txt", &[7u8; 150]).unwrap();
    fs.create_directory("docs").unwrap();
    fs.create_file("b.txt", b"hello world").unwrap();
    fs.create_file("c.txt", &[9u8; 64]).unwrap();
    fs.delete_file("a.txt").unwrap();
    fs.create_file("d.txt", &[1u8; 70]).unwrap();
    fs.truncate_file("d.txt", 10).unwrap();
    fs.write_block(40, b"raw").unwrap();
    fs
}

fn assert_same_state<A: ImageDevice, B: ImageDevice>(a: &FileSystem<A>, b: &FileSystem<B>) {
    assert_eq!(a.block_store(), b.block_store());
    assert_eq!(a.directory(), b.directory());
    assert_eq!(a.allocator(), b.allocator());
}

#[test]
fn test_round_trip() {
    let image = RamImage::new();
    let fs = populated(&image, small_config());
    let remounted = FileSystem::mount(image.clone(), small_config()).unwrap();

    assert_same_state(&fs, &remounted);
    assert_eq!(remounted.read_file("b.txt").unwrap(), b"hello world");
    assert_eq!(remounted.read_file("d.txt").unwrap(), vec![1u8; 10]);
    assert_eq!(&remounted.read_block(40).unwrap()[..3], b"raw");
    remounted.check().unwrap();
}

#[test]
fn test_image_layout() {
    let image = RamImage::new();
    let fs = populated(&image, small_config());
    let bytes = image.bytes();

    let superblock = read_superblock(&bytes).unwrap();
    assert_eq!(superblock.magic, MAGIC);
    assert_eq!(superblock.version, FORMAT_VERSION);
    assert_eq!(superblock.geometry(), *fs.geometry());
    assert!(!superblock.is_masked());

    // Live slots: docs(1 block), b.txt(1), c.txt(1), d.txt(1 after truncation).
    let disk = 64 * 64;
    let table = 8 * DIR_RECORD_SIZE;
    let lists = 4 * (4 + 4);
    assert_eq!(bytes.len(), SUPERBLOCK_SIZE + disk + table + lists);
    assert_eq!(superblock.payload_len as usize, disk + table + lists);

    // The block region is stored verbatim when unmasked.
    assert_eq!(&bytes[SUPERBLOCK_SIZE..SUPERBLOCK_SIZE + disk], fs.block_store().as_bytes());

    // Allocation lists follow the table in slot order.
    let lists_start = SUPERBLOCK_SIZE + disk + table;
    let first_count = u32::from_le_bytes(bytes[lists_start..lists_start + 4].try_into().unwrap());
    let first_block = u32::from_le_bytes(bytes[lists_start + 4..lists_start + 8].try_into().unwrap());
    let first_live = fs.directory().live().next().unwrap().1;
    assert_eq!(first_count as usize, first_live.blocks.len());
    assert_eq!(first_block, first_live.blocks[0]);
}

#[test]
fn test_masked_image() {
    let image = RamImage::new();
    let fs = populated(&image, small_config().masked());
    let bytes = image.bytes();
    assert!(read_superblock(&bytes).unwrap().is_masked());

    let disk = fs.block_store().as_bytes();
    let region = &bytes[SUPERBLOCK_SIZE..SUPERBLOCK_SIZE + disk.len()];
    let expected: Vec<u8> = disk.iter().map(|b| b ^ IMAGE_MASK_KEY).collect();
    assert_eq!(region, expected.as_slice());

    // Masking is applied to the written image only.
    assert_eq!(&fs.read_block(40).unwrap()[..3], b"raw");

    // A masked image loads back unmasked, whatever the mounting config says.
    let remounted = FileSystem::mount(image.clone(), small_config()).unwrap();
    assert_same_state(&fs, &remounted);
    assert_eq!(remounted.read_file("b.txt").unwrap(), b"hello world");
}

#[test]
fn test_explicit_save_state() {
    let image = RamImage::new();
    let fs = populated(&image, small_config());
    fs.save_state(true).unwrap();
    assert!(read_superblock(&image.bytes()).unwrap().is_masked());
    fs.save_state(false).unwrap();
    assert!(!read_superblock(&image.bytes()).unwrap().is_masked());
}

#[test]
fn test_file_image() {
    let path = temp_image_path("test_file_image");
    let device = FileImage::new(&path);

    let mut fs = FileSystem::mount(device.clone(), small_config()).unwrap();
    // Opening a missing image creates an empty file.
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    assert!(fs.list_all().is_empty());

    fs.create_file("notes.txt", b"persisted").unwrap();
    fs.create_directory("docs").unwrap();
    drop(fs);

    let fs = FileSystem::mount(device.clone(), small_config()).unwrap();
    assert_eq!(fs.read_file("notes.txt").unwrap(), b"persisted");
    assert_eq!(fs.list_files_and_directories(), vec!["[FILE] notes.txt", "[DIR] docs"]);
    log!("image stored at {}", fs.device().path().display());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_independent_images() {
    let first = temp_image_path("test_independent_first");
    let second = temp_image_path("test_independent_second");
    let mut a = FileSystem::create(FileImage::new(&first), small_config()).unwrap();
    let mut b = FileSystem::create(FileImage::new(&second), small_config()).unwrap();
    a.create_file("only-a", b"a").unwrap();
    b.create_file("only-b", b"b").unwrap();

    let a = FileSystem::mount(FileImage::new(&first), small_config()).unwrap();
    assert!(a.lookup("only-a", None).is_ok());
    assert!(matches!(a.lookup("only-b", None), Err(Error::NotFound)));

    std::fs::remove_file(&first).unwrap();
    std::fs::remove_file(&second).unwrap();
}

#[test]
fn test_corrupt_digest() {
    let image = RamImage::new();
    populated(&image, small_config());
    let mut bytes = image.bytes();
    bytes[SUPERBLOCK_SIZE + 5] ^= 0xff;
    image.set_bytes(bytes);
    assert!(matches!(
        FileSystem::mount(image, small_config()),
        Err(Error::ChecksumMismatch)
    ));
}

#[test]
fn test_bad_header() {
    let image = RamImage::new();
    populated(&image, small_config());
    let good = image.bytes();

    let mut bytes = good.clone();
    bytes[0] ^= 0xff;
    image.set_bytes(bytes);
    assert!(matches!(
        FileSystem::mount(image.clone(), small_config()),
        Err(Error::InvalidMagic)
    ));

    let mut bytes = good.clone();
    bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
    image.set_bytes(bytes);
    assert!(matches!(
        FileSystem::mount(image.clone(), small_config()),
        Err(Error::UnsupportedVersion(2))
    ));

    image.set_bytes(good[..SUPERBLOCK_SIZE - 1].to_vec());
    assert!(matches!(
        FileSystem::mount(image.clone(), small_config()),
        Err(Error::CorruptImage(_))
    ));

    image.set_bytes(good[..good.len() - 4].to_vec());
    assert!(matches!(
        FileSystem::mount(image.clone(), small_config()),
        Err(Error::CorruptImage(_))
    ));
}

#[test]
fn test_geometry_mismatch() {
    let image = RamImage::new();
    populated(&image, small_config());
    let other = Config::new(Geometry::new(64, 128, 8).unwrap());
    assert!(matches!(
        FileSystem::mount(image, other),
        Err(Error::GeometryMismatch)
    ));
}

/// Two one-block files, "a" on block 0 and "b" on block 1, on a 16-block disk.
fn two_file_image() -> (Geometry, Vec<u8>) {
    let geometry = Geometry::new(64, 16, 4).unwrap();
    let mut fs = FileSystem::create(RamImage::new(), Config::new(geometry)).unwrap();
    fs.create_file("a", &[1; 64]).unwrap();
    fs.create_file("b", &[2; 64]).unwrap();
    let bytes = encode_image(&geometry, fs.block_store(), fs.directory(), false);
    (geometry, bytes)
}

fn table_start(geometry: &Geometry) -> usize {
    SUPERBLOCK_SIZE + geometry.disk_size()
}

fn lists_start(geometry: &Geometry) -> usize {
    table_start(geometry) + geometry.max_files * DIR_RECORD_SIZE
}

/// Recomputes the header digest after the payload was edited.
fn redigest(geometry: &Geometry, bytes: &mut [u8]) {
    let superblock = SuperBlock::new(geometry, false, &bytes[SUPERBLOCK_SIZE..]);
    let mut header = Vec::new();
    write_superblock(&superblock, &mut header);
    bytes[..SUPERBLOCK_SIZE].copy_from_slice(&header);
}

#[test]
fn test_decode_rejects_shared_blocks() {
    let (geometry, mut bytes) = two_file_image();
    // Second list: count at +8, index at +12. Point it at block 0 too.
    let at = lists_start(&geometry) + 12;
    bytes[at..at + 4].copy_from_slice(&0u32.to_le_bytes());
    redigest(&geometry, &mut bytes);

    assert!(matches!(
        decode_image(&bytes, &geometry),
        Err(Error::CorruptImage("block owned by more than one entry"))
    ));
}

#[test]
fn test_decode_rejects_block_out_of_range() {
    let (geometry, mut bytes) = two_file_image();
    let at = lists_start(&geometry) + 12;
    bytes[at..at + 4].copy_from_slice(&16u32.to_le_bytes());
    redigest(&geometry, &mut bytes);

    assert!(matches!(
        decode_image(&bytes, &geometry),
        Err(Error::CorruptImage("allocation list names a block out of range"))
    ));
}

#[test]
fn test_decode_rejects_size_mismatch() {
    let (geometry, mut bytes) = two_file_image();
    // size_in_blocks of slot 0 says 2, its list holds one block.
    let at = table_start(&geometry) + 68;
    bytes[at..at + 4].copy_from_slice(&2u32.to_le_bytes());
    redigest(&geometry, &mut bytes);

    assert!(matches!(
        decode_image(&bytes, &geometry),
        Err(Error::CorruptImage("file block count does not match its size"))
    ));
}

#[test]
fn test_decode_rejects_length_past_blocks() {
    let (geometry, mut bytes) = two_file_image();
    let at = table_start(&geometry) + 72;
    bytes[at..at + 8].copy_from_slice(&65u64.to_le_bytes());
    redigest(&geometry, &mut bytes);

    assert!(matches!(
        decode_image(&bytes, &geometry),
        Err(Error::CorruptImage("file length exceeds its blocks"))
    ));
}

#[test]
fn test_decode_rejects_oversized_list() {
    let (geometry, mut bytes) = two_file_image();
    let at = lists_start(&geometry);
    bytes[at..at + 4].copy_from_slice(&17u32.to_le_bytes());
    redigest(&geometry, &mut bytes);

    assert!(matches!(
        decode_image(&bytes, &geometry),
        Err(Error::CorruptImage("allocation list longer than the disk"))
    ));
}

#[test]
fn test_failed_store_removes_staging_file() {
    let path = temp_image_path("test_failed_store");
    // A directory in the way makes the final rename fail.
    std::fs::create_dir_all(&path).unwrap();
    let device = FileImage::new(&path);

    let result = device.store(b"image");
    assert!(result.is_err());
    log!("Expected error: {}", result.unwrap_err());

    let mut staging = path.clone().into_os_string();
    staging.push(".tmp");
    assert!(!std::path::Path::new(&staging).exists());
    assert!(path.is_dir());

    std::fs::remove_dir(&path).unwrap();
}

#[test]
fn test_empty_image_mounts_blank() {
    let image = RamImage::new();
    let fs = FileSystem::mount(image.clone(), small_config()).unwrap();
    assert_eq!(fs.stats().free_blocks, 64);
    assert!(image.bytes().is_empty());
}
