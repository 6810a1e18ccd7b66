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

//! The directory service (§4.E): add/remove/lookup name-to-inode entries
//! within a single directory's index block. Operates on an already-loaded
//! directory inode's `(index_block, nr_entries)` pair; the caller
//! (namespace operations, §4.F) is responsible for updating `nr_entries`
//! on the owning inode with the value these functions return and for
//! marking the owning inode dirty.

use crate::{
	block::BlockDevice,
	codec::{RawDirEntry, decode_dir_block, encode_dir_block},
	error::{PnlError, PnlResult},
	layout::MAX_DIR_ENTRIES,
};

/// Scans live entries `0..nr_entries` for `name`, returning the matching
/// inode number. First match wins (§4.E); ties cannot occur since `insert`
/// rejects duplicate names (§4.F), but the scan order is specified anyway
/// so `remove`'s tie-break stays consistent with it.
pub fn lookup(
	dev: &mut dyn BlockDevice,
	index_block: u32,
	nr_entries: u32,
	name: &[u8],
) -> PnlResult<Option<u32>> {
	let block = dev.read_block(index_block)?;
	let entries = decode_dir_block(&block);
	let nr_entries = nr_entries as usize;
	Ok(entries[..nr_entries]
		.iter()
		.find(|e| e.name_matches(name))
		.map(|e| e.inode))
}

/// Returns every live entry, in storage order, for `readdir`/emptiness
/// checks/rename bookkeeping.
pub fn live_entries(
	dev: &mut dyn BlockDevice,
	index_block: u32,
	nr_entries: u32,
) -> PnlResult<Vec<RawDirEntry>> {
	let block = dev.read_block(index_block)?;
	let mut entries = decode_dir_block(&block);
	entries.truncate(nr_entries as usize);
	Ok(entries)
}

/// Appends `(name, ino)` as the new slot `nr_entries`. Returns the new
/// entry count. Duplicate-name detection is the caller's responsibility
/// (§4.F) — this function does not re-scan for an existing name.
pub fn insert(
	dev: &mut dyn BlockDevice,
	index_block: u32,
	nr_entries: u32,
	name: &[u8],
	ino: u32,
) -> PnlResult<u32> {
	if nr_entries as usize == MAX_DIR_ENTRIES {
		return Err(PnlError::DirFull);
	}
	let new_entry = RawDirEntry::new(ino, name)?;
	let block = dev.read_block(index_block)?;
	let mut entries = decode_dir_block(&block);
	entries.truncate(nr_entries as usize);
	entries.push(new_entry);
	let buf = encode_dir_block(&entries);
	dev.write_block(index_block, &buf)?;
	dev.mark_dirty(index_block);
	Ok(nr_entries + 1)
}

/// Removes the first live entry matching `name`, compacting the entries
/// that followed it one slot to the left (§4.E). Returns the new entry
/// count. The shift happens even when the match is the last live slot —
/// `entries[k+1..nr_entries]` is then empty and the compaction is a no-op
/// past truncation, which is exactly what's needed.
pub fn remove(
	dev: &mut dyn BlockDevice,
	index_block: u32,
	nr_entries: u32,
	name: &[u8],
) -> PnlResult<u32> {
	let block = dev.read_block(index_block)?;
	let mut entries = decode_dir_block(&block);
	let nr_entries = nr_entries as usize;
	let k = entries[..nr_entries]
		.iter()
		.position(|e| e.name_matches(name))
		.ok_or(PnlError::NotFound)?;
	entries.remove(k);
	entries.truncate(nr_entries - 1);
	let buf = encode_dir_block(&entries);
	dev.write_block(index_block, &buf)?;
	dev.mark_dirty(index_block);
	Ok((nr_entries - 1) as u32)
}

/// Overwrites the inode number of the entry named `name` in place, used by
/// `rename` to retarget a directory entry without touching its position
/// (§4.F step 4 / exchange semantics).
pub fn set_entry_inode(
	dev: &mut dyn BlockDevice,
	index_block: u32,
	nr_entries: u32,
	name: &[u8],
	new_ino: u32,
) -> PnlResult<()> {
	let block = dev.read_block(index_block)?;
	let mut entries = decode_dir_block(&block);
	let nr_entries = nr_entries as usize;
	let k = entries[..nr_entries]
		.iter()
		.position(|e| e.name_matches(name))
		.ok_or(PnlError::NotFound)?;
	entries[k].inode = new_ino;
	entries.truncate(nr_entries);
	let buf = encode_dir_block(&entries);
	dev.write_block(index_block, &buf)?;
	dev.mark_dirty(index_block);
	Ok(())
}
