// Interface to the surrounding object-file model.
//
// The compression core never performs file I/O or structured-header
// encoding itself; both come in through the `ObjectFile` trait. The
// `read_section` method is raw by contract: it returns the section's
// on-disk bytes regardless of the section's compress status, so no path
// in this crate ever needs to flip section state around an internal read.

use std::io;

use crate::section::Section;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way the file handle is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Open for reading an existing file.
    Read,
    /// Open for producing a new file.
    Write,
}

// ---------------------------------------------------------------------------
// Decoded structured header
// ---------------------------------------------------------------------------

/// The two scalar fields the core needs out of a structured compression
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHeader {
    /// Uncompressed length recorded in the header.
    pub uncompressed_size: u64,
    /// log2 alignment of the uncompressed data.
    pub alignment_power: u32,
}

// ---------------------------------------------------------------------------
// ObjectFile trait
// ---------------------------------------------------------------------------

/// The object-file model a section belongs to.
///
/// Implementations provide raw section byte access and the structured
/// compression-header codec for their format. An in-memory implementation
/// is available as [`MemoryFile`](crate::memory::MemoryFile).
pub trait ObjectFile {
    /// Which way the file handle is open.
    fn direction(&self) -> Direction;

    /// Total size of the underlying file in bytes, or 0 if unknown.
    fn file_size(&self) -> u64;

    /// Read `dest.len()` bytes of the section's on-disk image starting at
    /// `offset`. This is a raw read: it must not consult the section's
    /// compress status and must fail if the range lies outside the
    /// section's on-disk extent.
    fn read_section(&mut self, section: &Section, dest: &mut [u8], offset: u64)
    -> io::Result<()>;

    /// Size in bytes of the structured compression header governing this
    /// section's existing on-disk bytes. 0 means the legacy
    /// `"ZLIB"` + big-endian length convention applies.
    fn compression_header_size(&self, section: &Section) -> usize;

    /// Size in bytes of the structured header for newly produced
    /// compressed contents. 0 means new contents use the legacy form.
    fn output_compression_header_size(&self) -> usize;

    /// Decode a structured compression header. Returns `None` when the
    /// bytes do not form a supported header.
    fn decode_compression_header(&self, header: &[u8], section: &Section) -> Option<DecodedHeader>;

    /// Encode a structured compression header describing the section's
    /// current `size` and `alignment_power` into `dest`, which is exactly
    /// [`output_compression_header_size`](Self::output_compression_header_size)
    /// bytes. Only called when that size is nonzero.
    fn encode_compression_header(&self, dest: &mut [u8], section: &Section);

    /// Whether this file format carries its own private compression
    /// convention for nominally uncompressed sections. Such formats are
    /// exempt from the section-larger-than-file truncation check.
    fn uses_private_compression(&self) -> bool {
        false
    }
}
