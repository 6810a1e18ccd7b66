//! Reads `pnlfs.toml` (if present) and turns it into the compile-time block
//! layout constants consumed by `src/layout.rs`. Mirrors the teacher's
//! pattern of deriving build-time configuration from a TOML file instead of
//! hard-coding constants in source.

use serde::Deserialize;
use std::{env, fs, path::PathBuf, process::exit};

#[derive(Deserialize, Default)]
struct Manifest {
	#[serde(default)]
	layout: Layout,
}

#[derive(Deserialize)]
struct Layout {
	block_size: usize,
	filename_len: usize,
}

impl Default for Layout {
	fn default() -> Self {
		Self {
			block_size: 4096,
			filename_len: 60,
		}
	}
}

const MAGIC: u32 = 0x504e_4c31; // "PNL1"
const INODE_RECORD_SIZE: usize = 16;

fn read_manifest(path: &str) -> Manifest {
	match fs::read_to_string(path) {
		Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
			eprintln!("pnlfs: failed to parse {path}: {e}");
			exit(1);
		}),
		Err(_) => Manifest::default(),
	}
}

fn main() {
	println!("cargo:rerun-if-changed=pnlfs.toml");
	println!("cargo:rerun-if-changed=build.rs");

	let manifest = read_manifest("pnlfs.toml");
	let block_size = manifest.layout.block_size;
	let filename_len = manifest.layout.filename_len;

	if !block_size.is_power_of_two() || block_size < 512 {
		eprintln!("pnlfs: layout.block_size must be a power of two >= 512, got {block_size}");
		exit(1);
	}
	let dir_entry_size = 4 + filename_len;
	if dir_entry_size >= block_size {
		eprintln!(
			"pnlfs: layout.filename_len ({filename_len}) leaves no room for a directory entry in a {block_size}-byte block"
		);
		exit(1);
	}
	if block_size < INODE_RECORD_SIZE {
		eprintln!("pnlfs: layout.block_size must be large enough to hold one inode record");
		exit(1);
	}

	let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
	let generated = format!(
		"/// Size in bytes of a block on the device.\n\
		 pub const BLOCK_SIZE: usize = {block_size};\n\
		 /// Maximum byte length of a filename stored in a directory entry.\n\
		 pub const FILENAME_LEN: usize = {filename_len};\n\
		 /// On-disk magic number identifying a valid PNLFS image.\n\
		 pub const MAGIC: u32 = {MAGIC:#010x};\n\
		 /// Fixed on-disk size of one inode record.\n\
		 pub const INODE_RECORD_SIZE: usize = {INODE_RECORD_SIZE};\n",
	);
	fs::write(out_dir.join("config.rs"), generated).unwrap_or_else(|e| {
		eprintln!("pnlfs: failed to write generated config: {e}");
		exit(1);
	});
}
