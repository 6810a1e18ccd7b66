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

//! On-disk layout constants. `BLOCK_SIZE` and `FILENAME_LEN` are generated
//! by `build.rs` from `pnlfs.toml`; everything derived from them lives here.

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// On-disk size, in bytes, of one directory entry record
/// (`inode: u32` + `filename: [u8; FILENAME_LEN]`).
pub const DIR_ENTRY_SIZE: usize = 4 + FILENAME_LEN;

/// Maximum number of live entries a single directory block can hold.
pub const MAX_DIR_ENTRIES: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

/// On-disk size, in bytes, of one file-index-block slot (a block number).
pub const FILE_INDEX_ENTRY_SIZE: usize = 4;

/// Maximum number of data-block pointers a single file-index block can hold.
pub const MAX_FILE_INDEX_ENTRIES: usize = BLOCK_SIZE / FILE_INDEX_ENTRY_SIZE;

/// Number of inode records packed into one inode-store block.
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_RECORD_SIZE;

/// Number of bits packed into one on-disk bitmap word.
pub const BITMAP_WORD_BITS: usize = 64;

/// Number of bitmap words packed into one block.
pub const BITMAP_WORDS_PER_BLOCK: usize = BLOCK_SIZE / 8;

/// Number of bits a single bitmap block can represent.
pub const BITMAP_BITS_PER_BLOCK: usize = BITMAP_WORDS_PER_BLOCK * BITMAP_WORD_BITS;

/// Inode number of the filesystem root. Always allocated; removal is
/// rejected (§3 Invariants).
pub const ROOT_INODE: u32 = 0;

/// File-type bits packed into the high nibble of an inode's `mode` field,
/// matching the convention used throughout the example pack (and POSIX
/// `st_mode`): the low 12 bits are permission bits, the type occupies the
/// bits above that.
pub const S_IFMT: u16 = 0o170000;
/// Regular file type bit.
pub const S_IFREG: u16 = 0o100000;
/// Directory type bit.
pub const S_IFDIR: u16 = 0o040000;

/// The type of file an inode's `mode` word designates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileType {
	Regular,
	Directory,
}

impl FileType {
	/// Extracts the file type from a raw `mode` word, if it names one this
	/// filesystem supports (symlinks, devices, etc. are out of scope, §1).
	pub fn from_mode(mode: u16) -> Option<Self> {
		match mode & S_IFMT {
			S_IFREG => Some(Self::Regular),
			S_IFDIR => Some(Self::Directory),
			_ => None,
		}
	}

	/// Returns the type bits to OR into a `mode` word.
	pub fn to_bits(self) -> u16 {
		match self {
			Self::Regular => S_IFREG,
			Self::Directory => S_IFDIR,
		}
	}
}
