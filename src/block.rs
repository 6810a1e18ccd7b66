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

//! The block device adapter (§4.A): the capability the core consumes to
//! read and write fixed-size blocks. The host's actual block-I/O layer is
//! an external collaborator (§1); this module only defines the contract
//! and ships two reference implementations used by the test suite and by
//! simple standalone callers: an in-memory device and a plain-file device.

use crate::{error::PnlResult, layout::BLOCK_SIZE};
use std::{
	fs::File,
	io::{Read, Seek, SeekFrom, Write},
	path::Path,
};

/// One block's worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

/// A fixed-size block storage capability.
///
/// Implementors need not buffer internally beyond what's required to
/// satisfy `read_block`/`write_block`; the core does its own buffering
/// (inode cache, dirty tracking) above this trait.
pub trait BlockDevice {
	/// Reads block number `n` into a freshly allocated buffer.
	fn read_block(&mut self, n: u32) -> PnlResult<Block>;

	/// Writes `buf` to block number `n`.
	fn write_block(&mut self, n: u32, buf: &Block) -> PnlResult<()>;

	/// Hints that the buffer for block `n` holds data not yet durable.
	/// The default implementation is a no-op: devices that write through
	/// immediately (like [`MemBlockDevice`]) have nothing to track.
	fn mark_dirty(&mut self, _n: u32) {}

	/// Commits block `n` to stable storage.
	fn flush(&mut self, _n: u32) -> PnlResult<()> {
		Ok(())
	}

	/// Commits every block written so far to stable storage.
	fn flush_all(&mut self) -> PnlResult<()> {
		Ok(())
	}
}

/// An in-memory block device, used by the test suite and as a building
/// block for callers who keep an image in memory.
#[derive(Debug)]
pub struct MemBlockDevice {
	blocks: Vec<Block>,
}

impl MemBlockDevice {
	/// Creates a new zero-filled device with `nr_blocks` blocks.
	pub fn new(nr_blocks: u32) -> Self {
		Self {
			blocks: vec![[0u8; BLOCK_SIZE]; nr_blocks as usize],
		}
	}

	/// Number of blocks in the device.
	pub fn len(&self) -> u32 {
		self.blocks.len() as u32
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}
}

impl BlockDevice for MemBlockDevice {
	fn read_block(&mut self, n: u32) -> PnlResult<Block> {
		self.blocks
			.get(n as usize)
			.copied()
			.ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into())
	}

	fn write_block(&mut self, n: u32, buf: &Block) -> PnlResult<()> {
		let slot = self
			.blocks
			.get_mut(n as usize)
			.ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
		*slot = *buf;
		Ok(())
	}
}

/// A block device backed by a plain file (or block special file) on the
/// host filesystem, for persistence across process lifetimes (§4.G, S5).
#[derive(Debug)]
pub struct FileBlockDevice {
	file: File,
}

impl FileBlockDevice {
	/// Opens an existing image file for reading and writing.
	pub fn open(path: impl AsRef<Path>) -> PnlResult<Self> {
		let file = File::options().read(true).write(true).open(path)?;
		Ok(Self { file })
	}
}

impl BlockDevice for FileBlockDevice {
	fn read_block(&mut self, n: u32) -> PnlResult<Block> {
		let mut buf = [0u8; BLOCK_SIZE];
		self.file
			.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
		self.file.read_exact(&mut buf)?;
		Ok(buf)
	}

	fn write_block(&mut self, n: u32, buf: &Block) -> PnlResult<()> {
		self.file
			.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))?;
		self.file.write_all(buf)?;
		Ok(())
	}

	fn flush(&mut self, _n: u32) -> PnlResult<()> {
		self.file.sync_data().map_err(Into::into)
	}

	fn flush_all(&mut self) -> PnlResult<()> {
		self.file.sync_all().map_err(Into::into)
	}
}
