/*
 * This file is part of pnlfs.
 *
 * pnlfs is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * pnlfs is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * pnlfs. If not, see <https://www.gnu.org/licenses/>.
 */

//! The volume manager (§4.G): mount/sync/unmount, loading and persisting
//! the superblock and both bitmaps. [`Volume`] is the engine; namespace
//! operations (§4.F, `create`/`unlink`/`mkdir`/... ) are implemented as a
//! second `impl` block in `namespace.rs`, the same way the teacher spreads
//! `Ext2Fs`'s methods across `mod.rs`/`bgd.rs`/`inode.rs`.

use crate::{
	bitmap::Bitmap,
	block::BlockDevice,
	codec::{RawSuperblock, decode_superblock, encode_superblock},
	error::{PnlError, PnlResult},
	inode::InodeStore,
	layout::ROOT_INODE,
};

/// A mounted PNLFS volume: the in-memory metadata engine sitting on top of
/// a [`BlockDevice`]. All mutation goes through `&mut self`, which is the
/// concurrency primitive this crate relies on: the "per-volume mutation
/// lock" of §5 is realized by requiring exclusive access to `Volume` for
/// the duration of any operation. A host serving multiple threads wraps a
/// `Volume` in its own `Arc<Mutex<_>>` (readers can equally use an
/// `RwLock`, since lookup/readdir don't mutate) to get the single-writer,
/// serialized-reader scheduling model described in §5; this crate doesn't
/// impose one itself.
#[derive(Debug)]
pub struct Volume<D: BlockDevice> {
	pub(crate) dev: D,
	pub(crate) nr_blocks: u32,
	pub(crate) nr_inodes: u32,
	pub(crate) nr_istore_blocks: u32,
	pub(crate) nr_ifree_blocks: u32,
	pub(crate) nr_bfree_blocks: u32,
	pub(crate) inode_bitmap: Bitmap,
	pub(crate) block_bitmap: Bitmap,
	pub(crate) inodes: InodeStore,
}

impl<D: BlockDevice> Volume<D> {
	/// Block number of the first inode-store block (right after the
	/// superblock, §3 "Block layout on device").
	pub(crate) fn istore_start(&self) -> u32 {
		1
	}

	/// Block number of the first inode free-bitmap block.
	pub(crate) fn ifree_start(&self) -> u32 {
		self.istore_start() + self.nr_istore_blocks
	}

	/// Block number of the first block free-bitmap block.
	pub(crate) fn bfree_start(&self) -> u32 {
		self.ifree_start() + self.nr_ifree_blocks
	}

	/// Block number of the first data block; data block `b` (as addressed
	/// by the block bitmap and file-index/directory `index_block` fields)
	/// lives on the device at `data_start() + b`.
	pub(crate) fn data_start(&self) -> u32 {
		self.bfree_start() + self.nr_bfree_blocks
	}

	/// Inode number of the root directory (§3: inode 0, always allocated).
	pub fn root_ino(&self) -> u32 {
		ROOT_INODE
	}

	/// Number of free inodes, mirroring the superblock counter (§3
	/// invariant: always equal to the inode bitmap's popcount).
	pub fn nr_free_inodes(&self) -> u32 {
		self.inode_bitmap.nr_free()
	}

	/// Number of free data blocks, mirroring the superblock counter.
	pub fn nr_free_blocks(&self) -> u32 {
		self.block_bitmap.nr_free()
	}

	/// Mounts a volume from an already-formatted device (§4.G step 1-4).
	///
	/// Creating a fresh image (the formatter) is an external collaborator
	/// (§1 Non-goals) and is not implemented here.
	pub fn mount(mut dev: D) -> PnlResult<Self> {
		let sp_block = dev.read_block(0)?;
		let sp: RawSuperblock = decode_superblock(&sp_block)?;

		let ifree_start = 1 + sp.nr_istore_blocks;
		let ifree_blocks: Vec<_> = (0..sp.nr_ifree_blocks)
			.map(|i| dev.read_block(ifree_start + i))
			.collect::<PnlResult<_>>()?;
		let inode_bitmap = Bitmap::decode_from_blocks(&ifree_blocks, sp.nr_inodes as usize);

		let bfree_start = ifree_start + sp.nr_ifree_blocks;
		let bfree_blocks: Vec<_> = (0..sp.nr_bfree_blocks)
			.map(|i| dev.read_block(bfree_start + i))
			.collect::<PnlResult<_>>()?;
		let block_bitmap = Bitmap::decode_from_blocks(&bfree_blocks, sp.nr_blocks as usize);

		if inode_bitmap.nr_free() != sp.nr_free_inodes || block_bitmap.nr_free() != sp.nr_free_blocks
		{
			log::warn!("pnlfs: bitmap popcount disagrees with superblock counters");
			return Err(PnlError::BadImage);
		}

		let mut volume = Self {
			dev,
			nr_blocks: sp.nr_blocks,
			nr_inodes: sp.nr_inodes,
			nr_istore_blocks: sp.nr_istore_blocks,
			nr_ifree_blocks: sp.nr_ifree_blocks,
			nr_bfree_blocks: sp.nr_bfree_blocks,
			inode_bitmap,
			block_bitmap,
			inodes: InodeStore::new(),
		};
		// Loading the root inode up front both validates the image and
		// warms the cache for the first namespace operation.
		volume.inodes.load(&mut volume.dev, ROOT_INODE)?;
		Ok(volume)
	}

	/// Writes back the superblock counters, both bitmaps, and every dirty
	/// inode/directory/file-index block, then commits a durability barrier
	/// (§4.G, §5 ordering guarantees). Superblock first, then bitmaps,
	/// then data, matching the spec's write order.
	pub fn sync(&mut self) -> PnlResult<()> {
		let sp = RawSuperblock {
			nr_blocks: self.nr_blocks,
			nr_inodes: self.nr_inodes,
			nr_istore_blocks: self.nr_istore_blocks,
			nr_ifree_blocks: self.nr_ifree_blocks,
			nr_bfree_blocks: self.nr_bfree_blocks,
			nr_free_inodes: self.inode_bitmap.nr_free(),
			nr_free_blocks: self.block_bitmap.nr_free(),
		};
		let sp_block = encode_superblock(&sp);
		self.dev.write_block(0, &sp_block)?;
		self.dev.mark_dirty(0);

		let ifree_start = self.ifree_start();
		for (i, block) in self
			.inode_bitmap
			.encode_to_blocks(self.nr_ifree_blocks)
			.iter()
			.enumerate()
		{
			self.dev.write_block(ifree_start + i as u32, block)?;
			self.dev.mark_dirty(ifree_start + i as u32);
		}

		let bfree_start = self.bfree_start();
		for (i, block) in self
			.block_bitmap
			.encode_to_blocks(self.nr_bfree_blocks)
			.iter()
			.enumerate()
		{
			self.dev.write_block(bfree_start + i as u32, block)?;
			self.dev.mark_dirty(bfree_start + i as u32);
		}

		self.inodes.flush(&mut self.dev)?;
		self.dev.flush_all()?;
		log::debug!(
			"pnlfs: synced volume ({} free inodes, {} free blocks)",
			sp.nr_free_inodes,
			sp.nr_free_blocks
		);
		Ok(())
	}

	/// Syncs, then releases the in-memory bitmap buffers and per-inode
	/// caches (§4.G), handing the underlying device back to the caller.
	/// Calling `unmount` twice on the same volume is a programming error;
	/// since `unmount` consumes `self`, the type system already rules that
	/// out for safe callers, matching the spec's "Double-unmount is a
	/// programming error".
	pub fn unmount(mut self) -> PnlResult<D> {
		self.sync()?;
		self.inodes.clear();
		Ok(self.dev)
	}
}
