//! Zsection: compressed object-file section contents (debug sections in
//! particular).
//!
//! The crate provides:
//! - Recognition of the two on-disk compression header conventions
//!   (`header`): the legacy 12-byte `"ZLIB"` form and the structured
//!   format-specific form, with a ready-made ELF Chdr codec (`chdr`)
//! - A streaming zlib engine for multi-member section payloads (`zstream`)
//! - The per-section content lifecycle (probe, size, decompress, cache,
//!   compress, convert) over a pluggable object-file model (`contents`,
//!   `object`, `section`)
//! - An in-memory object file (`memory`)
//!
//! # Quick Start
//!
//! ```
//! use zsection::contents::{compress_section, get_full_contents};
//! use zsection::memory::MemoryFile;
//! use zsection::object::Direction;
//! use zsection::section::Section;
//!
//! // Compress a section's contents while writing an object file.
//! let mut file = MemoryFile::new(Direction::Write);
//! let data = vec![0u8; 4096];
//! let mut section = Section::new(".debug_info", data.len() as u64);
//!
//! compress_section(&mut file, &mut section, data).unwrap();
//! assert!(section.size < 4096);
//!
//! // The materialized contents carry the legacy header.
//! let contents = get_full_contents(&mut file, &section, None).unwrap().unwrap();
//! assert!(contents.starts_with(b"ZLIB"));
//! ```

pub mod chdr;
pub mod contents;
pub mod error;
pub mod header;
pub mod memory;
pub mod object;
pub mod section;
pub mod zstream;
