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

//! Namespace operations (§4.F): `lookup`/`create`/`mkdir`/`unlink`/`rmdir`/
//! `rename`/`readdir`, sequencing the codec, bitmap allocator, inode store
//! and directory service. This is a second `impl<D: BlockDevice> Volume<D>`
//! block; `mount`/`sync`/`unmount` live in `volume.rs`.
//!
//! Ordering matters here, not just correctness: every mutating operation
//! is sequenced so that a crash between any two steps never leaves a
//! dangling pointer reachable from live metadata (§5). `create`/`mkdir`
//! allocate and initialize the new inode and its index block before
//! linking the directory entry; `unlink`/`rmdir` remove the directory
//! entry before freeing the inode and its blocks.

use crate::{
	block::BlockDevice,
	codec::{RawInode, decode_file_index_block},
	dir,
	error::{PnlError, PnlResult},
	layout::{FileType, MAX_DIR_ENTRIES, MAX_FILE_INDEX_ENTRIES},
	volume::Volume,
};

/// One entry produced by [`Volume::readdir`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntryOut {
	pub ino: u32,
	pub name: Vec<u8>,
	/// `None` only if the target inode's mode doesn't name a type this
	/// filesystem supports — shouldn't happen on an image this crate wrote,
	/// but a foreign or corrupted image must not panic over it.
	pub file_type: Option<FileType>,
}

impl<D: BlockDevice> Volume<D> {
	fn alloc_block(&mut self) -> PnlResult<u32> {
		let local = self.block_bitmap.alloc().ok_or(PnlError::NoFreeBlock)?;
		Ok(self.data_start() + local)
	}

	fn free_block(&mut self, blk: u32) {
		self.block_bitmap.free(blk - self.data_start());
	}

	fn free_regular_file(&mut self, inode: &RawInode) -> PnlResult<()> {
		let block = self.dev.read_block(inode.index_block)?;
		let entries = decode_file_index_block(&block);
		for &blk in &entries[..inode.nr_entries as usize] {
			self.free_block(blk);
		}
		self.free_block(inode.index_block);
		Ok(())
	}

	/// Resolves `name` within directory `dir_ino` to an inode number (§4.F).
	pub fn lookup(&mut self, dir_ino: u32, name: &[u8]) -> PnlResult<u32> {
		let dir = self.inodes.load(&mut self.dev, dir_ino)?;
		dir::lookup(&mut self.dev, dir.index_block, dir.nr_entries, name)?.ok_or(PnlError::NotFound)
	}

	/// Creates a new inode of `file_type` named `name` in directory
	/// `dir_ino` (§4.F `create`/`mkdir`): allocates the inode and its index
	/// block, initializes an empty inode record, and only then links it
	/// into the parent directory.
	fn create_entry(&mut self, dir_ino: u32, name: &[u8], mode: u16, file_type: FileType) -> PnlResult<u32> {
		if name.len() > crate::layout::FILENAME_LEN {
			return Err(PnlError::NameTooLong);
		}
		let mut dir = self.inodes.load(&mut self.dev, dir_ino)?;
		if FileType::from_mode(dir.mode) != Some(FileType::Directory) {
			return Err(PnlError::NotADirectory);
		}
		if dir.nr_entries as usize == MAX_DIR_ENTRIES {
			return Err(PnlError::DirFull);
		}
		if dir::lookup(&mut self.dev, dir.index_block, dir.nr_entries, name)?.is_some() {
			return Err(PnlError::NameExists);
		}

		let ino = self.inode_bitmap.alloc().ok_or(PnlError::NoFreeInode)?;
		let index_block = match self.alloc_block() {
			Ok(b) => b,
			Err(e) => {
				self.inode_bitmap.free(ino);
				return Err(e);
			}
		};
		let new_inode = RawInode {
			mode: mode | file_type.to_bits(),
			index_block,
			filesize: 0,
			nr_entries: 0,
		};
		self.inodes.write(&mut self.dev, ino, new_inode)?;

		dir.nr_entries = dir::insert(&mut self.dev, dir.index_block, dir.nr_entries, name, ino)?;
		self.inodes.write(&mut self.dev, dir_ino, dir)?;
		Ok(ino)
	}

	/// Creates a regular file (§4.F `create`).
	pub fn create(&mut self, dir_ino: u32, name: &[u8], mode: u16) -> PnlResult<u32> {
		self.create_entry(dir_ino, name, mode, FileType::Regular)
	}

	/// Creates a directory (§4.F `mkdir`). The new directory's own entry
	/// block starts with `nr_entries == 0`; `.` and `..` are synthesized by
	/// `readdir` and never persisted (§9).
	pub fn mkdir(&mut self, dir_ino: u32, name: &[u8], mode: u16) -> PnlResult<u32> {
		self.create_entry(dir_ino, name, mode, FileType::Directory)
	}

	/// Removes a regular-file entry (§4.F `unlink`): the directory entry is
	/// removed before the target's resources are freed, so a crash
	/// mid-operation leaves either the old entry pointing at a live inode,
	/// or nothing at all — never an entry pointing at freed blocks.
	pub fn unlink(&mut self, dir_ino: u32, name: &[u8]) -> PnlResult<()> {
		let mut dir = self.inodes.load(&mut self.dev, dir_ino)?;
		let ino = dir::lookup(&mut self.dev, dir.index_block, dir.nr_entries, name)?
			.ok_or(PnlError::NotFound)?;
		let target = self.inodes.load(&mut self.dev, ino)?;
		if FileType::from_mode(target.mode) == Some(FileType::Directory) {
			return Err(PnlError::IsADirectory);
		}

		dir.nr_entries = dir::remove(&mut self.dev, dir.index_block, dir.nr_entries, name)?;
		self.inodes.write(&mut self.dev, dir_ino, dir)?;

		self.free_regular_file(&target)?;
		self.inode_bitmap.free(ino);
		Ok(())
	}

	/// Removes an empty subdirectory (§4.F `rmdir`). Same entry-before-
	/// resources ordering as `unlink`. The root inode can never appear as a
	/// directory entry's target under normal operation (§9 doesn't persist
	/// `.`/`..`), but the empty-root edge case is rejected defensively with
	/// `NotEmpty`, the closest existing error kind to "this directory may
	/// never be removed".
	pub fn rmdir(&mut self, dir_ino: u32, name: &[u8]) -> PnlResult<()> {
		let mut dir = self.inodes.load(&mut self.dev, dir_ino)?;
		let ino = dir::lookup(&mut self.dev, dir.index_block, dir.nr_entries, name)?
			.ok_or(PnlError::NotFound)?;
		let target = self.inodes.load(&mut self.dev, ino)?;
		if FileType::from_mode(target.mode) != Some(FileType::Directory) {
			return Err(PnlError::NotADirectory);
		}
		if ino == self.root_ino() || target.nr_entries != 0 {
			return Err(PnlError::NotEmpty);
		}

		dir.nr_entries = dir::remove(&mut self.dev, dir.index_block, dir.nr_entries, name)?;
		self.inodes.write(&mut self.dev, dir_ino, dir)?;

		self.free_block(target.index_block);
		self.inode_bitmap.free(ino);
		Ok(())
	}

	/// Moves `old_name` from `old_dir_ino` to `new_name` in `new_dir_ino`
	/// (§4.F `rename`). If `new_name` already exists it is replaced
	/// ("clean-replace" semantics, §9 Open Question): a pre-existing empty
	/// directory or regular file at the destination is removed first and
	/// its resources freed, then the source entry is retargeted onto the
	/// destination slot (or inserted fresh if the destination didn't
	/// exist). Renaming a name onto itself is a no-op. `flags` is accepted
	/// for interface parity with the external API (§6) but unused: this
	/// crate implements only clean-replace, not an atomic-exchange mode.
	///
	/// `new_name`'s length is checked before any mutation (including the
	/// no-op check), the same ordering `create_entry` uses: a precondition
	/// violation must never leave `old_name` removed from `old_dir_ino`
	/// with nowhere for it to land (§7).
	pub fn rename(
		&mut self,
		old_dir_ino: u32,
		old_name: &[u8],
		new_dir_ino: u32,
		new_name: &[u8],
		_flags: u32,
	) -> PnlResult<()> {
		if new_name.len() > crate::layout::FILENAME_LEN {
			return Err(PnlError::NameTooLong);
		}
		if old_dir_ino == new_dir_ino && old_name == new_name {
			return Ok(());
		}

		let old_dir = self.inodes.load(&mut self.dev, old_dir_ino)?;
		let source_ino = dir::lookup(&mut self.dev, old_dir.index_block, old_dir.nr_entries, old_name)?
			.ok_or(PnlError::NotFound)?;

		let new_dir = self.inodes.load(&mut self.dev, new_dir_ino)?;
		let existing =
			dir::lookup(&mut self.dev, new_dir.index_block, new_dir.nr_entries, new_name)?;

		if let Some(target_ino) = existing {
			let target = self.inodes.load(&mut self.dev, target_ino)?;
			match FileType::from_mode(target.mode) {
				Some(FileType::Directory) => {
					if target.nr_entries != 0 {
						return Err(PnlError::NotEmpty);
					}
					self.free_block(target.index_block);
				}
				Some(FileType::Regular) => self.free_regular_file(&target)?,
				None => {}
			}
			self.inode_bitmap.free(target_ino);
		} else if new_dir.nr_entries as usize == MAX_DIR_ENTRIES {
			return Err(PnlError::DirFull);
		}

		let mut old_dir = self.inodes.load(&mut self.dev, old_dir_ino)?;
		old_dir.nr_entries =
			dir::remove(&mut self.dev, old_dir.index_block, old_dir.nr_entries, old_name)?;
		self.inodes.write(&mut self.dev, old_dir_ino, old_dir)?;

		let mut new_dir = self.inodes.load(&mut self.dev, new_dir_ino)?;
		if existing.is_some() {
			dir::set_entry_inode(
				&mut self.dev,
				new_dir.index_block,
				new_dir.nr_entries,
				new_name,
				source_ino,
			)?;
		} else {
			new_dir.nr_entries = dir::insert(
				&mut self.dev,
				new_dir.index_block,
				new_dir.nr_entries,
				new_name,
				source_ino,
			)?;
			self.inodes.write(&mut self.dev, new_dir_ino, new_dir)?;
		}
		Ok(())
	}

	/// Enumerates directory `dir_ino`'s entries starting at `cursor` (§4.F
	/// `readdir`). `parent_ino` is supplied by the caller since this crate
	/// doesn't persist `.`/`..` linkage (§9) — the host's dentry cache is
	/// expected to track it. Cursor `0` yields `.`, cursor `1` yields `..`,
	/// cursor `2 + i` yields the `i`-th live directory entry. `emit`
	/// receives the cursor value to resume from and stops enumeration by
	/// returning `false`. Enumeration snapshots `nr_entries` and the
	/// directory block once at entry (§4.F): a mutation racing with an
	/// in-flight `readdir` may cause an entry to be skipped or duplicated,
	/// which the spec allows.
	pub fn readdir(
		&mut self,
		dir_ino: u32,
		parent_ino: u32,
		cursor: u64,
		mut emit: impl FnMut(u64, &DirEntryOut) -> bool,
	) -> PnlResult<()> {
		let dir = self.inodes.load(&mut self.dev, dir_ino)?;
		let mut next = cursor;
		if next == 0 {
			let dot = DirEntryOut {
				ino: dir_ino,
				name: b".".to_vec(),
				file_type: Some(FileType::Directory),
			};
			if !emit(1, &dot) {
				return Ok(());
			}
			next = 1;
		}
		if next == 1 {
			let dotdot = DirEntryOut {
				ino: parent_ino,
				name: b"..".to_vec(),
				file_type: Some(FileType::Directory),
			};
			if !emit(2, &dotdot) {
				return Ok(());
			}
			next = 2;
		}

		let entries = dir::live_entries(&mut self.dev, dir.index_block, dir.nr_entries)?;
		let start = (next - 2) as usize;
		for (i, raw) in entries.iter().enumerate().skip(start) {
			let child = self.inodes.load(&mut self.dev, raw.inode)?;
			let out = DirEntryOut {
				ino: raw.inode,
				name: raw.filename.clone(),
				file_type: FileType::from_mode(child.mode),
			};
			let resume_at = 2 + i as u64 + 1;
			if !emit(resume_at, &out) {
				return Ok(());
			}
		}
		Ok(())
	}

	/// Looks up the physical block backing logical block `logical` of a
	/// regular file's contents, if it's been allocated (§1: the byte copy
	/// itself is delegated to the host's page cache — this is the mapping
	/// step the file-index block exists for).
	pub fn file_block_lookup(&mut self, ino: u32, logical: u32) -> PnlResult<Option<u32>> {
		let inode = self.inodes.load(&mut self.dev, ino)?;
		if FileType::from_mode(inode.mode) == Some(FileType::Directory) {
			return Err(PnlError::IsADirectory);
		}
		if logical >= inode.nr_entries {
			return Ok(None);
		}
		let block = self.dev.read_block(inode.index_block)?;
		let entries = decode_file_index_block(&block);
		Ok(Some(entries[logical as usize]))
	}

	/// Appends one freshly-allocated data block to a regular file's index,
	/// growing it by exactly one logical block (§1 file-index mapping
	/// contract). Growth beyond `MAX_FILE_INDEX_ENTRIES` is the per-inode
	/// addressing limit named as out of scope (§1 Non-goals) and reports
	/// `NoFreeBlock`, the same kind returned when the allocator itself is
	/// exhausted.
	pub fn file_block_alloc(&mut self, ino: u32) -> PnlResult<u32> {
		let mut inode = self.inodes.load(&mut self.dev, ino)?;
		if FileType::from_mode(inode.mode) == Some(FileType::Directory) {
			return Err(PnlError::IsADirectory);
		}
		if inode.nr_entries as usize == MAX_FILE_INDEX_ENTRIES {
			return Err(PnlError::NoFreeBlock);
		}
		let new_block = self.alloc_block()?;
		let block = self.dev.read_block(inode.index_block)?;
		let mut entries = decode_file_index_block(&block);
		entries.truncate(inode.nr_entries as usize);
		entries.push(new_block);
		let buf = crate::codec::encode_file_index_block(&entries);
		self.dev.write_block(inode.index_block, &buf)?;
		self.dev.mark_dirty(inode.index_block);

		inode.nr_entries += 1;
		self.inodes.write(&mut self.dev, ino, inode)?;
		Ok(new_block)
	}
}
