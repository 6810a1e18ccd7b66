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

//! pnlfs is a block-backed hierarchical filesystem core: a superblock, a
//! pair of free-bitmap allocators, an inode store, a directory service and
//! the namespace operations built on top of them, all driven through a
//! pluggable [`block::BlockDevice`].
//!
//! This crate does not own a page cache, a VFS dentry layer, or the actual
//! byte-copy path for file contents — those are host responsibilities it
//! only provides the metadata hooks for ([`namespace`] file-index mapping).
//! It also does not format fresh images; `Volume::mount` expects a device
//! that already holds a valid superblock, inode store and bitmaps.
//!
//! Concurrency: every [`Volume`] method takes `&mut self`, so exclusive
//! access to a `Volume` is the mutation lock described in the
//! specification's scheduling model. A host serving multiple threads wraps
//! a `Volume` in its own `Mutex`/`RwLock` (see the crate-level tests and
//! `tests/scenarios.rs` for the pattern); this crate does not impose one.

pub mod bitmap;
pub mod block;
pub mod codec;
pub mod dir;
pub mod error;
pub mod inode;
pub mod layout;
pub mod namespace;
pub mod volume;

pub use block::{Block, BlockDevice, FileBlockDevice, MemBlockDevice};
pub use codec::{RawDirEntry, RawInode, RawSuperblock};
pub use error::{PnlError, PnlResult};
pub use layout::{BLOCK_SIZE, FILENAME_LEN, FileType, ROOT_INODE};
pub use namespace::DirEntryOut;
pub use volume::Volume;
