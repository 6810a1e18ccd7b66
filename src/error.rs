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

//! Error kinds returned by the core. Every fallible operation in this crate
//! returns [`PnlResult`]; there is no panicking or exception-like unwinding
//! on the failure paths described by the specification.

use std::io;

/// The result type returned by every core operation.
pub type PnlResult<T> = Result<T, PnlError>;

/// A core error. Variants map 1:1 to the error kinds of the specification.
#[derive(Debug, thiserror::Error)]
pub enum PnlError {
	/// The superblock's magic number (or another structural field) is
	/// invalid; mount refuses to proceed.
	#[error("not a valid PNLFS image")]
	BadImage,
	/// The underlying block device reported an I/O failure.
	#[error("block device I/O error: {0}")]
	BlockIo(#[from] io::Error),
	/// The inode free-bitmap is exhausted.
	#[error("no free inode")]
	NoFreeInode,
	/// The block free-bitmap is exhausted.
	#[error("no free block")]
	NoFreeBlock,
	/// A directory already holds `MAX_DIR_ENTRIES` live entries.
	#[error("directory is full")]
	DirFull,
	/// `create`/`mkdir`/`link` target name already exists in the directory.
	#[error("name already exists")]
	NameExists,
	/// A requested name's byte length exceeds `FILENAME_LEN`.
	#[error("name too long")]
	NameTooLong,
	/// No entry matches the requested name, or the inode doesn't exist.
	#[error("not found")]
	NotFound,
	/// Target is a directory where a regular file was expected.
	#[error("is a directory")]
	IsADirectory,
	/// Target is not a directory where one was expected.
	#[error("not a directory")]
	NotADirectory,
	/// A directory removal/replacement target still has live entries.
	#[error("directory not empty")]
	NotEmpty,
	/// A bitmap bit was found in a state inconsistent with its counter (for
	/// example freeing an already-free resource). Production release
	/// semantics treat this as a warning and an idempotent no-op; debug
	/// builds assert instead (see `bitmap::Bitmap::free`).
	#[error("inconsistent bitmap state")]
	InconsistentBitmap,
}
