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

//! The bitmap allocator (§4.C): a free-bitmap held in memory, convention
//! **bit set = free**. Used identically for the inode bitmap and the block
//! bitmap; which counter each affects in the superblock is the caller's
//! concern (§4.G).

use crate::{
	block::Block,
	layout::{BITMAP_BITS_PER_BLOCK, BITMAP_WORDS_PER_BLOCK, BLOCK_SIZE},
};
use byteorder::{ByteOrder, LittleEndian};

/// An in-memory free-bitmap with a circular allocation cursor (§4.C scan
/// policy: amortizes allocation cost, wraps once before giving up).
#[derive(Debug, Clone)]
pub struct Bitmap {
	words: Vec<u64>,
	nr_bits: usize,
	nr_free: u32,
	cursor: usize,
}

impl Bitmap {
	/// Builds a bitmap of `nr_bits` bits, all marked free.
	pub fn new_all_free(nr_bits: usize) -> Self {
		let nr_words = nr_bits.div_ceil(64);
		let mut words = vec![!0u64; nr_words];
		// Clear any padding bits past `nr_bits` in the last word so they
		// never get handed out by `alloc`.
		let used_bits_in_last = nr_bits % 64;
		if used_bits_in_last != 0 {
			if let Some(last) = words.last_mut() {
				*last &= (1u64 << used_bits_in_last) - 1;
			}
		}
		Self {
			words,
			nr_bits,
			nr_free: nr_bits as u32,
			cursor: 0,
		}
	}

	/// Rebuilds a bitmap from already-decoded words (mount path, §4.G);
	/// `nr_free` is recomputed as the popcount invariant (§3) requires.
	pub fn from_words(words: Vec<u64>, nr_bits: usize) -> Self {
		let nr_free = words.iter().map(|w| w.count_ones()).sum();
		Self {
			words,
			nr_bits,
			nr_free,
			cursor: 0,
		}
	}

	/// Number of free bits, maintained equal to the popcount of the
	/// underlying words (§3 invariant).
	pub fn nr_free(&self) -> u32 {
		self.nr_free
	}

	/// Total number of addressable bits.
	pub fn nr_bits(&self) -> usize {
		self.nr_bits
	}

	/// Reports whether bit `index` is currently free. Exposed publicly so
	/// callers that decode a bitmap straight off a device (fsck-style
	/// checks, or the invariant-checking test harness in `tests/
	/// invariants.rs`) can query individual resources without having to
	/// re-derive `nr_free`'s bookkeeping themselves.
	pub fn is_free(&self, index: u32) -> bool {
		let index = index as usize;
		let word = self.words[index / 64];
		word & (1 << (index % 64)) != 0
	}

	/// Finds the lowest-indexed free bit starting the scan at the cursor,
	/// clears it, and returns its index. Returns `None` if every bit is
	/// allocated (a full wrap without success, §4.C).
	pub fn alloc(&mut self) -> Option<u32> {
		if self.nr_free == 0 {
			return None;
		}
		for step in 0..self.nr_bits {
			let index = (self.cursor + step) % self.nr_bits;
			if self.is_free(index as u32) {
				self.words[index / 64] &= !(1 << (index % 64));
				self.nr_free -= 1;
				self.cursor = (index + 1) % self.nr_bits;
				return Some(index as u32);
			}
		}
		None
	}

	/// Marks `index` free again.
	///
	/// Freeing an already-free resource is a programming error (§4.C):
	/// debug builds assert, release builds are idempotent (no counter
	/// change) and log a [`log::warn!`]. Returns `true` if the bit was
	/// actually flipped (i.e. it was allocated beforehand).
	pub fn free(&mut self, index: u32) -> bool {
		let index = index as usize;
		debug_assert!(
			index < self.nr_bits,
			"free() index {index} out of range (nr_bits={})",
			self.nr_bits
		);
		if index >= self.nr_bits {
			log::warn!("pnlfs: free() of out-of-range bit {index}, ignoring");
			return false;
		}
		if self.is_free(index as u32) {
			debug_assert!(false, "double free of bit {index}");
			log::warn!("pnlfs: double free of bit {index}, ignoring");
			return false;
		}
		self.words[index / 64] |= 1 << (index % 64);
		self.nr_free += 1;
		true
	}

	/// Packs the bitmap into `nr_blocks` on-disk blocks, 64 bits/word
	/// little-endian (§9 "Bitmap word semantics").
	pub fn encode_to_blocks(&self, nr_blocks: u32) -> Vec<Block> {
		(0..nr_blocks)
			.map(|b| {
				let mut buf = [0u8; BLOCK_SIZE];
				let word_base = b as usize * BITMAP_WORDS_PER_BLOCK;
				for w in 0..BITMAP_WORDS_PER_BLOCK {
					let word = self.words.get(word_base + w).copied().unwrap_or(0);
					LittleEndian::write_u64(&mut buf[w * 8..w * 8 + 8], word);
				}
				buf
			})
			.collect()
	}

	/// Rebuilds a bitmap of `nr_bits` bits from `nr_blocks` on-disk blocks
	/// (§4.G mount step 2/3).
	pub fn decode_from_blocks(blocks: &[Block], nr_bits: usize) -> Self {
		let mut words = Vec::with_capacity(blocks.len() * BITMAP_WORDS_PER_BLOCK);
		for block in blocks {
			for w in 0..BITMAP_WORDS_PER_BLOCK {
				words.push(LittleEndian::read_u64(&block[w * 8..w * 8 + 8]));
			}
		}
		words.truncate(nr_bits.div_ceil(64));
		Self::from_words(words, nr_bits)
	}

	/// Number of on-disk blocks needed to store `nr_bits` bits.
	pub fn blocks_needed(nr_bits: usize) -> u32 {
		nr_bits.div_ceil(BITMAP_BITS_PER_BLOCK) as u32
	}
}
