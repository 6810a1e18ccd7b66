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

//! The inode store (§4.D): reads and writes persisted inodes by number,
//! keeping an in-memory cache of both decoded inode records and the raw
//! inode-store blocks they live in so repeated mutations of the same
//! block don't re-read the device.

use crate::{
	block::{Block, BlockDevice},
	codec::{RawInode, decode_inode_from, encode_inode_into},
	error::PnlResult,
	layout::INODES_PER_BLOCK,
};
use std::collections::{BTreeSet, HashMap};

/// Computes the `(block, slot)` an inode number maps to (§4.D): block `1 +
/// ino / INODES_PER_BLOCK`, slot `ino % INODES_PER_BLOCK` — block 0 is the
/// superblock, so the inode store starts right after it.
pub fn locate(ino: u32) -> (u32, usize) {
	let ino = ino as usize;
	(
		1 + (ino / INODES_PER_BLOCK) as u32,
		ino % INODES_PER_BLOCK,
	)
}

/// The in-memory inode store.
#[derive(Debug, Default)]
pub struct InodeStore {
	inodes: HashMap<u32, RawInode>,
	blocks: HashMap<u32, Block>,
	dirty_blocks: BTreeSet<u32>,
}

impl InodeStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn fetch_block(&mut self, dev: &mut dyn BlockDevice, block_no: u32) -> PnlResult<Block> {
		if let Some(b) = self.blocks.get(&block_no) {
			return Ok(*b);
		}
		let b = dev.read_block(block_no)?;
		self.blocks.insert(block_no, b);
		Ok(b)
	}

	/// Loads inode `ino`, either from the cache or from the device.
	pub fn load(&mut self, dev: &mut dyn BlockDevice, ino: u32) -> PnlResult<RawInode> {
		if let Some(inode) = self.inodes.get(&ino) {
			return Ok(*inode);
		}
		let (block_no, slot) = locate(ino);
		let block = self.fetch_block(dev, block_no)?;
		let inode = decode_inode_from(&block, slot);
		self.inodes.insert(ino, inode);
		Ok(inode)
	}

	/// Writes `inode` into slot `ino` of its containing block, updates the
	/// cache, and marks the block dirty (§4.D). Does not hit the device
	/// immediately; call [`InodeStore::flush`] (driven by `sync`, §4.G) to
	/// persist.
	pub fn write(&mut self, dev: &mut dyn BlockDevice, ino: u32, inode: RawInode) -> PnlResult<()> {
		let (block_no, slot) = locate(ino);
		let mut block = self.fetch_block(dev, block_no)?;
		encode_inode_into(&mut block, slot, &inode);
		self.blocks.insert(block_no, block);
		self.inodes.insert(ino, inode);
		self.dirty_blocks.insert(block_no);
		dev.mark_dirty(block_no);
		Ok(())
	}

	/// Writes every dirty inode-store block back to the device.
	pub fn flush(&mut self, dev: &mut dyn BlockDevice) -> PnlResult<()> {
		for block_no in std::mem::take(&mut self.dirty_blocks) {
			if let Some(block) = self.blocks.get(&block_no) {
				dev.write_block(block_no, block)?;
				dev.flush(block_no)?;
			}
		}
		Ok(())
	}

	/// Drops every cached inode and block, releasing memory on unmount
	/// (§4.G). Callers must have flushed beforehand if they want the
	/// changes to persist.
	pub fn clear(&mut self) {
		self.inodes.clear();
		self.blocks.clear();
		self.dirty_blocks.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::block::MemBlockDevice;

	#[test]
	fn locate_maps_inode_zero_right_after_superblock() {
		assert_eq!(locate(0), (1, 0));
		assert_eq!(locate(INODES_PER_BLOCK as u32), (2, 0));
		assert_eq!(locate(INODES_PER_BLOCK as u32 + 1), (2, 1));
	}

	#[test]
	fn write_then_load_sees_the_write_before_flush() {
		let mut dev = MemBlockDevice::new(4);
		let mut store = InodeStore::new();
		let inode = RawInode {
			mode: 0o100644,
			index_block: 2,
			filesize: 10,
			nr_entries: 0,
		};
		store.write(&mut dev, 5, inode).unwrap();
		assert_eq!(store.load(&mut dev, 5).unwrap(), inode);
		// Not flushed yet: a fresh store reading straight from the device
		// must not see it.
		let mut fresh = InodeStore::new();
		assert_ne!(fresh.load(&mut dev, 5).unwrap(), inode);
	}

	#[test]
	fn flush_persists_across_stores() {
		let mut dev = MemBlockDevice::new(4);
		let mut store = InodeStore::new();
		let inode = RawInode {
			mode: 0o040755,
			index_block: 3,
			filesize: 0,
			nr_entries: 2,
		};
		store.write(&mut dev, 9, inode).unwrap();
		store.flush(&mut dev).unwrap();
		let mut fresh = InodeStore::new();
		assert_eq!(fresh.load(&mut dev, 9).unwrap(), inode);
	}

	#[test]
	fn writing_one_inode_preserves_its_block_neighbors() {
		let mut dev = MemBlockDevice::new(4);
		let mut store = InodeStore::new();
		let a = RawInode {
			mode: 0o100644,
			index_block: 1,
			filesize: 1,
			nr_entries: 0,
		};
		let b = RawInode {
			mode: 0o100644,
			index_block: 2,
			filesize: 2,
			nr_entries: 0,
		};
		store.write(&mut dev, 0, a).unwrap();
		store.write(&mut dev, 1, b).unwrap();
		store.flush(&mut dev).unwrap();
		let mut fresh = InodeStore::new();
		assert_eq!(fresh.load(&mut dev, 0).unwrap(), a);
		assert_eq!(fresh.load(&mut dev, 1).unwrap(), b);
	}
}
