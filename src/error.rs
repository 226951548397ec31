// Crate-wide error type.
//
// Failures surface as one of a few coarse kinds; the human-readable detail
// rides along in the Display output. All failures are local to the
// operation that produced them, nothing is retried internally.

use std::io;

use crate::zstream::CodecError;

/// Errors surfaced by the section content operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A precondition on section state (`status`, `rawsize`, size) was
    /// violated by the caller sequence.
    #[error("invalid operation for the section's current state")]
    InvalidOperation,

    /// The section's header bytes do not match any recognized compressed
    /// form where one was required.
    #[error("section does not have a recognized compression header")]
    WrongFormat,

    /// Compression or decompression of otherwise well-formed data failed.
    #[error("bad value: {0}")]
    BadValue(#[from] CodecError),

    /// A section claims more bytes than the file holds.
    #[error("section size ({size:#x} bytes) is larger than file size ({file_size:#x} bytes)")]
    FileTruncated {
        /// Size the section declares.
        size: u64,
        /// Actual file size.
        file_size: u64,
    },

    /// A content buffer could not be allocated.
    #[error("section is too large ({0:#x} bytes)")]
    NoMemory(u64),

    /// The raw section read failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
