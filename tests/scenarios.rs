//! Literal end-to-end scenarios (spec §8 "End-to-end scenarios").

mod common;

use common::{format_file, format_mem};
use pnlfs::{FileBlockDevice, FileType, PnlError, Volume};

#[test]
fn s1_basic_create_and_lookup() {
	let dev = format_mem(32, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();

	let ino = vol.create(root, b"a.txt", 0o100644).unwrap();
	assert_eq!(ino, 1);
	assert_eq!(vol.lookup(root, b"a.txt").unwrap(), 1);

	let mut names = Vec::new();
	vol.readdir(root, root, 0, |next, entry| {
		names.push((entry.name.clone(), entry.ino));
		next <= 2
	})
	.unwrap();
	assert_eq!(
		names,
		vec![
			(b".".to_vec(), root),
			(b"..".to_vec(), root),
			(b"a.txt".to_vec(), 1),
		]
	);
}

#[test]
fn s2_unlink_frees() {
	let dev = format_mem(32, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();
	vol.create(root, b"a.txt", 0o100644).unwrap();

	let free_inodes_before = vol.nr_free_inodes();
	let free_blocks_before = vol.nr_free_blocks();

	vol.unlink(root, b"a.txt").unwrap();

	assert_eq!(vol.nr_free_inodes(), free_inodes_before + 1);
	assert_eq!(vol.nr_free_blocks(), free_blocks_before + 1);
	assert!(matches!(
		vol.lookup(root, b"a.txt"),
		Err(PnlError::NotFound)
	));
}

#[test]
fn s3_mkdir_rmdir_emptiness() {
	let dev = format_mem(32, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();

	let d = vol.mkdir(root, b"d", 0o040755).unwrap();
	assert_eq!(d, 1);
	let x = vol.create(d, b"x", 0o100644).unwrap();
	assert_eq!(x, 2);

	assert!(matches!(vol.rmdir(root, b"d"), Err(PnlError::NotEmpty)));
	vol.unlink(d, b"x").unwrap();
	vol.rmdir(root, b"d").unwrap();
}

#[test]
fn s4_rename_across_directories() {
	let dev = format_mem(32, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();
	let a = vol.mkdir(root, b"a", 0o040755).unwrap();
	let b = vol.mkdir(root, b"b", 0o040755).unwrap();
	let f = vol.create(a, b"f", 0o100644).unwrap();

	let free_inodes_before = vol.nr_free_inodes();
	let free_blocks_before = vol.nr_free_blocks();

	vol.rename(a, b"f", b, b"f", 0).unwrap();

	assert!(matches!(vol.lookup(a, b"f"), Err(PnlError::NotFound)));
	assert_eq!(vol.lookup(b, b"f").unwrap(), f);
	assert_eq!(vol.nr_free_inodes(), free_inodes_before);
	assert_eq!(vol.nr_free_blocks(), free_blocks_before);
}

#[test]
fn s5_persistence_across_remount() {
	let dev = format_mem(32, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();
	let ino = vol.create(root, b"a.txt", 0o100644).unwrap();
	let free_inodes_before = vol.nr_free_inodes();
	let free_blocks_before = vol.nr_free_blocks();

	vol.sync().unwrap();
	let dev = vol.unmount().unwrap();

	let mut remounted = Volume::mount(dev).unwrap();
	assert_eq!(remounted.lookup(root, b"a.txt").unwrap(), ino);
	assert_eq!(remounted.nr_free_inodes(), free_inodes_before);
	assert_eq!(remounted.nr_free_blocks(), free_blocks_before);
}

/// S5 again, but against a real file-backed device instead of
/// `MemBlockDevice`, so persistence is exercised across an actual close
/// and reopen of the underlying storage, not just a move of an in-memory
/// `Vec`.
#[test]
fn s5_persistence_across_a_real_file_device() {
	let tmp = tempfile::NamedTempFile::new().unwrap();
	let path = tmp.path();
	format_file(path, 32, 64);

	let dev = FileBlockDevice::open(path).unwrap();
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();
	let ino = vol.create(root, b"a.txt", 0o100644).unwrap();
	let free_inodes_before = vol.nr_free_inodes();
	let free_blocks_before = vol.nr_free_blocks();
	vol.sync().unwrap();
	drop(vol.unmount().unwrap());

	let dev = FileBlockDevice::open(path).unwrap();
	let mut remounted = Volume::mount(dev).unwrap();
	assert_eq!(remounted.lookup(root, b"a.txt").unwrap(), ino);
	assert_eq!(remounted.nr_free_inodes(), free_inodes_before);
	assert_eq!(remounted.nr_free_blocks(), free_blocks_before);
}

#[test]
fn s6_inode_exhaustion_then_recovery() {
	// nr_inodes=4, root occupies one: three successful creates, the fourth
	// fails, freeing one then creating again succeeds.
	let dev = format_mem(4, 64);
	let mut vol = Volume::mount(dev).unwrap();
	let root = vol.root_ino();

	for i in 0..3u32 {
		vol.create(root, format!("f{i}").as_bytes(), 0o100644)
			.unwrap();
	}
	assert_eq!(vol.nr_free_inodes(), 0);
	assert!(matches!(
		vol.create(root, b"overflow", 0o100644),
		Err(PnlError::NoFreeInode)
	));

	vol.unlink(root, b"f0").unwrap();
	let ino = vol.create(root, b"f3", 0o100644).unwrap();
	assert_eq!(vol.lookup(root, b"f3").unwrap(), ino);
	assert_eq!(
		FileType::from_mode(0o100644 | FileType::Regular.to_bits()),
		Some(FileType::Regular)
	);
}
