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

//! The on-disk codec (§4.B): pure functions translating between raw block
//! buffers and typed views of the superblock, inode record, directory
//! block and file-index block. All integers are little-endian (§3).
//!
//! These functions never touch a [`crate::block::BlockDevice`] — they only
//! read and write already-loaded buffers, which keeps them trivially unit
//! testable and lets `encode(decode(buf)) == buf` be checked directly
//! (§8 property 3).

use crate::{
	block::Block,
	error::{PnlError, PnlResult},
	layout::{DIR_ENTRY_SIZE, FILENAME_LEN, INODE_RECORD_SIZE, MAGIC, MAX_DIR_ENTRIES},
};
use byteorder::{ByteOrder, LittleEndian};

/// Decoded view of the superblock (§3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RawSuperblock {
	pub nr_blocks: u32,
	pub nr_inodes: u32,
	pub nr_istore_blocks: u32,
	pub nr_ifree_blocks: u32,
	pub nr_bfree_blocks: u32,
	pub nr_free_inodes: u32,
	pub nr_free_blocks: u32,
}

/// Encodes `sp` into a fresh block-0 buffer.
pub fn encode_superblock(sp: &RawSuperblock) -> Block {
	let mut buf = [0u8; crate::layout::BLOCK_SIZE];
	LittleEndian::write_u32(&mut buf[0..4], MAGIC);
	LittleEndian::write_u32(&mut buf[4..8], sp.nr_blocks);
	LittleEndian::write_u32(&mut buf[8..12], sp.nr_inodes);
	LittleEndian::write_u32(&mut buf[12..16], sp.nr_istore_blocks);
	LittleEndian::write_u32(&mut buf[16..20], sp.nr_ifree_blocks);
	LittleEndian::write_u32(&mut buf[20..24], sp.nr_bfree_blocks);
	LittleEndian::write_u32(&mut buf[24..28], sp.nr_free_inodes);
	LittleEndian::write_u32(&mut buf[28..32], sp.nr_free_blocks);
	buf
}

/// Decodes block 0 into a superblock, rejecting an unrecognized magic
/// number with [`PnlError::BadImage`].
pub fn decode_superblock(buf: &Block) -> PnlResult<RawSuperblock> {
	let magic = LittleEndian::read_u32(&buf[0..4]);
	if magic != MAGIC {
		return Err(PnlError::BadImage);
	}
	Ok(RawSuperblock {
		nr_blocks: LittleEndian::read_u32(&buf[4..8]),
		nr_inodes: LittleEndian::read_u32(&buf[8..12]),
		nr_istore_blocks: LittleEndian::read_u32(&buf[12..16]),
		nr_ifree_blocks: LittleEndian::read_u32(&buf[16..20]),
		nr_bfree_blocks: LittleEndian::read_u32(&buf[20..24]),
		nr_free_inodes: LittleEndian::read_u32(&buf[24..28]),
		nr_free_blocks: LittleEndian::read_u32(&buf[28..32]),
	})
}

/// Decoded view of one inode record (§3, fixed 16 bytes on disk).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct RawInode {
	pub mode: u16,
	pub index_block: u32,
	pub filesize: u32,
	pub nr_entries: u32,
}

/// Encodes `inode` into slot `slot` of an inode-store block buffer.
///
/// Panics if `slot` doesn't fit a block; callers compute `slot` from
/// `ino % INODES_PER_BLOCK` (§4.D), which always fits by construction.
pub fn encode_inode_into(buf: &mut Block, slot: usize, inode: &RawInode) {
	let off = slot * INODE_RECORD_SIZE;
	LittleEndian::write_u16(&mut buf[off..off + 2], inode.mode);
	LittleEndian::write_u32(&mut buf[off + 2..off + 6], inode.index_block);
	LittleEndian::write_u32(&mut buf[off + 6..off + 10], inode.filesize);
	LittleEndian::write_u32(&mut buf[off + 10..off + 14], inode.nr_entries);
	buf[off + 14..off + 16].fill(0);
}

/// Decodes the inode record at slot `slot` of an inode-store block buffer.
pub fn decode_inode_from(buf: &Block, slot: usize) -> RawInode {
	let off = slot * INODE_RECORD_SIZE;
	RawInode {
		mode: LittleEndian::read_u16(&buf[off..off + 2]),
		index_block: LittleEndian::read_u32(&buf[off + 2..off + 6]),
		filesize: LittleEndian::read_u32(&buf[off + 6..off + 10]),
		nr_entries: LittleEndian::read_u32(&buf[off + 10..off + 14]),
	}
}

/// Decoded view of one directory-entry slot (§3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawDirEntry {
	pub inode: u32,
	pub filename: Vec<u8>,
}

impl RawDirEntry {
	/// Builds an entry, truncating/padding is handled by `encode_dir_block`;
	/// here we only validate the logical name length (§7 `NameTooLong`).
	pub fn new(inode: u32, name: &[u8]) -> PnlResult<Self> {
		if name.len() > FILENAME_LEN {
			return Err(PnlError::NameTooLong);
		}
		Ok(Self {
			inode,
			filename: name.to_vec(),
		})
	}

	/// Compares `self`'s stored name against `name` using the same
	/// `strncmp`-style equality `lookup`/`remove` use (§4.E): null
	/// termination marks end-of-name within the fixed-size field.
	pub fn name_matches(&self, name: &[u8]) -> bool {
		self.filename == name
	}
}

/// Encodes a full directory block from the live entries `entries`
/// (`entries.len() <= MAX_DIR_ENTRIES`, enforced by the directory service).
/// Slots beyond `entries.len()` are zeroed; §4.E notes this is not load
/// bearing (the tail past `nr_entries` is defined as garbage) but a fresh
/// encode always produces a deterministic, zeroed tail so
/// `encode(decode(buf))` is stable.
pub fn encode_dir_block(entries: &[RawDirEntry]) -> Block {
	debug_assert!(entries.len() <= MAX_DIR_ENTRIES);
	let mut buf = [0u8; crate::layout::BLOCK_SIZE];
	for (i, ent) in entries.iter().enumerate() {
		let off = i * DIR_ENTRY_SIZE;
		LittleEndian::write_u32(&mut buf[off..off + 4], ent.inode);
		let name_off = off + 4;
		buf[name_off..name_off + ent.filename.len()].copy_from_slice(&ent.filename);
		buf[name_off + ent.filename.len()..name_off + FILENAME_LEN].fill(0);
	}
	buf
}

/// Decodes every slot of a directory block (live and garbage alike); the
/// caller (§4.E) only looks at the first `nr_entries` returned here.
pub fn decode_dir_block(buf: &Block) -> Vec<RawDirEntry> {
	(0..MAX_DIR_ENTRIES)
		.map(|i| {
			let off = i * DIR_ENTRY_SIZE;
			let inode = LittleEndian::read_u32(&buf[off..off + 4]);
			let name_off = off + 4;
			let raw = &buf[name_off..name_off + FILENAME_LEN];
			let len = raw.iter().position(|&b| b == 0).unwrap_or(FILENAME_LEN);
			RawDirEntry {
				inode,
				filename: raw[..len].to_vec(),
			}
		})
		.collect()
}

/// Encodes a file-index block from the live entries (`entries.len() <=
/// MAX_FILE_INDEX_ENTRIES`).
pub fn encode_file_index_block(entries: &[u32]) -> Block {
	let mut buf = [0u8; crate::layout::BLOCK_SIZE];
	for (i, &blk) in entries.iter().enumerate() {
		LittleEndian::write_u32(&mut buf[i * 4..i * 4 + 4], blk);
	}
	buf
}

/// Decodes every slot of a file-index block; the caller only looks at the
/// first `nr_entries` returned here.
pub fn decode_file_index_block(buf: &Block) -> Vec<u32> {
	(0..crate::layout::MAX_FILE_INDEX_ENTRIES)
		.map(|i| LittleEndian::read_u32(&buf[i * 4..i * 4 + 4]))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn superblock_roundtrip() {
		let sp = RawSuperblock {
			nr_blocks: 64,
			nr_inodes: 32,
			nr_istore_blocks: 1,
			nr_ifree_blocks: 1,
			nr_bfree_blocks: 1,
			nr_free_inodes: 31,
			nr_free_blocks: 60,
		};
		let buf = encode_superblock(&sp);
		assert_eq!(decode_superblock(&buf).unwrap(), sp);
	}

	#[test]
	fn bad_magic_rejected() {
		let buf = [0u8; crate::layout::BLOCK_SIZE];
		assert!(matches!(decode_superblock(&buf), Err(PnlError::BadImage)));
	}

	#[test]
	fn inode_roundtrip() {
		let mut buf = [0u8; crate::layout::BLOCK_SIZE];
		let inode = RawInode {
			mode: 0o100644,
			index_block: 7,
			filesize: 128,
			nr_entries: 0,
		};
		encode_inode_into(&mut buf, 3, &inode);
		assert_eq!(decode_inode_from(&buf, 3), inode);
		// Untouched slots stay zero.
		assert_eq!(decode_inode_from(&buf, 0), RawInode::default());
	}

	#[test]
	fn dir_block_roundtrip_with_max_len_name() {
		let name = vec![b'a'; FILENAME_LEN];
		let entries = vec![
			RawDirEntry::new(1, b"short").unwrap(),
			RawDirEntry::new(2, &name).unwrap(),
		];
		let buf = encode_dir_block(&entries);
		let decoded = decode_dir_block(&buf);
		assert_eq!(decoded[0], entries[0]);
		assert_eq!(decoded[1], entries[1]);
		// Unused tail slots decode to inode 0 and an empty name.
		assert_eq!(decoded[2].inode, 0);
		assert!(decoded[2].filename.is_empty());
	}

	#[test]
	fn name_too_long_rejected() {
		let name = vec![b'a'; FILENAME_LEN + 1];
		assert!(matches!(
			RawDirEntry::new(1, &name),
			Err(PnlError::NameTooLong)
		));
	}

	#[test]
	fn file_index_block_roundtrip() {
		let entries = vec![10, 11, 12];
		let buf = encode_file_index_block(&entries);
		let decoded = decode_file_index_block(&buf);
		assert_eq!(&decoded[..3], &entries[..]);
		assert!(decoded[3..].iter().all(|&b| b == 0));
	}
}
