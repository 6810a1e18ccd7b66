//! Test-only image formatter. Formatting a fresh image is an external
//! collaborator the core deliberately doesn't implement (§1 Non-goals,
//! §4.G `mount` expects an already-formatted device); this lives under
//! `tests/` rather than `src/` so it never becomes part of the public API,
//! mirroring the way the teacher's own `mkfs` tooling stays outside the
//! filesystem crate itself.

use pnlfs::{
	BLOCK_SIZE, BlockDevice, FileBlockDevice, FileType, MemBlockDevice, RawInode, RawSuperblock,
	bitmap::Bitmap,
	codec::{encode_dir_block, encode_inode_into, encode_superblock},
	inode::locate,
	layout::INODES_PER_BLOCK,
};
use std::{fs::File, path::Path};

/// The block-numbering layout of a freshly formatted image (§3 "Block
/// layout on device"), derived from `nr_inodes`/`nr_blocks` the same way
/// `Volume`'s own (private) `ifree_start`/`bfree_start`/`data_start`
/// helpers do. Exposed here, rather than duplicated ad hoc, so both
/// [`format_mem`] and the invariant-checking property test can map a
/// decoded inode's `index_block`/file-block numbers back to bit indices in
/// the raw bitmaps without depending on `Volume`'s private fields.
#[derive(Clone, Copy, Debug)]
pub struct Layout {
	pub nr_istore_blocks: u32,
	pub nr_ifree_blocks: u32,
	pub nr_bfree_blocks: u32,
	pub ifree_start: u32,
	pub bfree_start: u32,
	pub data_start: u32,
	pub total_blocks: u32,
}

impl Layout {
	pub fn compute(nr_inodes: u32, nr_blocks: u32) -> Self {
		let nr_istore_blocks = (nr_inodes as usize).div_ceil(INODES_PER_BLOCK) as u32;
		let nr_ifree_blocks = Bitmap::blocks_needed(nr_inodes as usize);
		let nr_bfree_blocks = Bitmap::blocks_needed(nr_blocks as usize);
		let ifree_start = 1 + nr_istore_blocks;
		let bfree_start = ifree_start + nr_ifree_blocks;
		let data_start = bfree_start + nr_bfree_blocks;
		Self {
			nr_istore_blocks,
			nr_ifree_blocks,
			nr_bfree_blocks,
			ifree_start,
			bfree_start,
			data_start,
			total_blocks: data_start + nr_blocks,
		}
	}
}

/// Formats a fresh in-memory image with `nr_inodes` inodes and `nr_blocks`
/// data blocks, an empty root directory, and returns it ready for
/// `Volume::mount`.
pub fn format_mem(nr_inodes: u32, nr_blocks: u32) -> MemBlockDevice {
	let layout = Layout::compute(nr_inodes, nr_blocks);
	let Layout {
		nr_istore_blocks,
		nr_ifree_blocks,
		nr_bfree_blocks,
		ifree_start,
		bfree_start,
		data_start,
		total_blocks: total,
	} = layout;

	let mut dev = MemBlockDevice::new(total);

	let mut inode_bitmap = Bitmap::new_all_free(nr_inodes as usize);
	let mut block_bitmap = Bitmap::new_all_free(nr_blocks as usize);
	let root_ino = inode_bitmap.alloc().expect("fresh image always has inode 0 free");
	let root_local_block = block_bitmap.alloc().expect("fresh image always has a free block");
	let root_index_block = data_start + root_local_block;

	let sp = RawSuperblock {
		nr_blocks,
		nr_inodes,
		nr_istore_blocks,
		nr_ifree_blocks,
		nr_bfree_blocks,
		nr_free_inodes: inode_bitmap.nr_free(),
		nr_free_blocks: block_bitmap.nr_free(),
	};
	dev.write_block(0, &encode_superblock(&sp)).unwrap();

	for (i, block) in inode_bitmap.encode_to_blocks(nr_ifree_blocks).iter().enumerate() {
		dev.write_block(ifree_start + i as u32, block).unwrap();
	}
	for (i, block) in block_bitmap.encode_to_blocks(nr_bfree_blocks).iter().enumerate() {
		dev.write_block(bfree_start + i as u32, block).unwrap();
	}

	let (istore_block, slot) = locate(root_ino);
	let mut buf = [0u8; BLOCK_SIZE];
	encode_inode_into(
		&mut buf,
		slot,
		&RawInode {
			mode: 0o755 | FileType::Directory.to_bits(),
			index_block: root_index_block,
			filesize: 0,
			nr_entries: 0,
		},
	);
	dev.write_block(istore_block, &buf).unwrap();
	dev.write_block(root_index_block, &encode_dir_block(&[])).unwrap();

	dev
}

/// Formats a fresh image of the same shape as [`format_mem`] onto a plain
/// file at `path`, for tests that need persistence across a real
/// [`FileBlockDevice`] (as opposed to [`MemBlockDevice`], which only lives
/// for the length of the test process anyway). Leaves the file closed and
/// ready for `FileBlockDevice::open`.
pub fn format_file(path: &Path, nr_inodes: u32, nr_blocks: u32) -> u32 {
	let mut mem = format_mem(nr_inodes, nr_blocks);
	let total = mem.len();

	File::create(path)
		.unwrap()
		.set_len(total as u64 * BLOCK_SIZE as u64)
		.unwrap();
	let mut file_dev = FileBlockDevice::open(path).unwrap();
	for n in 0..total {
		let block = mem.read_block(n).unwrap();
		file_dev.write_block(n, &block).unwrap();
	}
	file_dev.flush_all().unwrap();
	total
}
