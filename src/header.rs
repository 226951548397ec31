// Compression header recognition.
//
// Two incompatible on-disk conventions exist for compressed debug sections:
//   - Legacy: 12 bytes, the ASCII tag "ZLIB" followed by the uncompressed
//     length as a big-endian u64. Used by .zdebug_* sections. Carries no
//     alignment information.
//   - Structured: a format-specific header of up to 24 bytes, decoded by
//     the object-file model (for ELF this is the Chdr, see `chdr`).
//
// Which convention governs a section is decided by the object file: a
// nonzero `compression_header_size` selects the structured form.

use crate::object::ObjectFile;
use crate::section::Section;

/// Tag opening the legacy compression header.
pub const ZLIB_MAGIC: &[u8; 4] = b"ZLIB";

/// Total size of the legacy `"ZLIB"` + big-endian length header.
pub const LEGACY_HEADER_SIZE: usize = 12;

/// Upper bound on any structured compression header. An object-file model
/// reporting a larger size is defective.
pub const MAX_COMPRESSION_HEADER_SIZE: usize = 24;

// ---------------------------------------------------------------------------
// Legacy header codec
// ---------------------------------------------------------------------------

/// Write the 12-byte legacy header into `dest`.
pub fn encode_legacy_header(dest: &mut [u8], uncompressed_size: u64) {
    dest[..4].copy_from_slice(ZLIB_MAGIC);
    dest[4..LEGACY_HEADER_SIZE].copy_from_slice(&uncompressed_size.to_be_bytes());
}

/// Uncompressed length recorded in a legacy header. `header` must hold at
/// least the full 12 bytes.
pub fn decode_legacy_size(header: &[u8]) -> u64 {
    let mut be = [0u8; 8];
    be.copy_from_slice(&header[4..LEGACY_HEADER_SIZE]);
    u64::from_be_bytes(be)
}

// ---------------------------------------------------------------------------
// Probe result
// ---------------------------------------------------------------------------

/// Which header convention a probe found in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// The legacy 12-byte `"ZLIB"` form.
    Legacy,
    /// A structured header of the given size.
    Structured(usize),
    /// The section looks compressed but its structured header is not a
    /// supported form. Distinguishes "compressed but unreadable" from
    /// "not compressed".
    Unsupported,
}

/// Result of probing a section's leading bytes for a compression header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionInfo {
    /// Whether the section's bytes are compressed.
    pub compressed: bool,
    /// Header convention in force.
    pub kind: HeaderKind,
    /// Decompressed length the header claims; the section's current size
    /// when not compressed or when the header is unsupported.
    pub uncompressed_size: u64,
    /// log2 alignment recorded in the header (0 for the legacy form).
    pub alignment_power: u32,
}

impl CompressionInfo {
    /// Whether the section is compressed in a form this crate can actually
    /// decompress.
    pub fn is_supported_compression(&self) -> bool {
        self.compressed && self.kind != HeaderKind::Unsupported && self.uncompressed_size > 0
    }
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

fn is_printable_ascii(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// Classify already-read leading section bytes.
///
/// `header` holds at least the governing header's size worth of bytes from
/// the start of the section's on-disk image; shorter input classifies as
/// not compressed. Section state is never touched.
pub fn probe_bytes<F: ObjectFile + ?Sized>(
    file: &F,
    section: &Section,
    header: &[u8],
) -> CompressionInfo {
    let chdr_size = file.compression_header_size(section);
    assert!(
        chdr_size <= MAX_COMPRESSION_HEADER_SIZE,
        "structured compression header size {chdr_size} exceeds the {MAX_COMPRESSION_HEADER_SIZE}-byte maximum"
    );

    let not_compressed = CompressionInfo {
        compressed: false,
        kind: if chdr_size == 0 {
            HeaderKind::Legacy
        } else {
            HeaderKind::Structured(chdr_size)
        },
        uncompressed_size: section.size,
        alignment_power: 0,
    };

    if chdr_size == 0 {
        if header.len() < LEGACY_HEADER_SIZE || header[..4] != *ZLIB_MAGIC {
            return not_compressed;
        }
        // Heuristic: an uncompressed .debug_str section can begin with the
        // string "ZLIB...". A genuine big-endian size field's high byte is
        // almost never printable ASCII, so a printable byte right after the
        // tag is taken to mean the section is an ordinary string table.
        if section.name == ".debug_str" && is_printable_ascii(header[4]) {
            return not_compressed;
        }
        CompressionInfo {
            compressed: true,
            kind: HeaderKind::Legacy,
            uncompressed_size: decode_legacy_size(header),
            alignment_power: 0,
        }
    } else {
        if header.len() < chdr_size {
            return not_compressed;
        }
        match file.decode_compression_header(&header[..chdr_size], section) {
            Some(decoded) => CompressionInfo {
                compressed: true,
                kind: HeaderKind::Structured(chdr_size),
                uncompressed_size: decoded.uncompressed_size,
                alignment_power: decoded.alignment_power,
            },
            // Still treated as compressed for sizing purposes so callers
            // can tell "compressed but unreadable" apart.
            None => CompressionInfo {
                compressed: true,
                kind: HeaderKind::Unsupported,
                uncompressed_size: section.size,
                alignment_power: 0,
            },
        }
    }
}

/// Read a section's leading bytes through the raw read path and classify
/// them. A failed read classifies as not compressed.
pub fn probe_section<F: ObjectFile + ?Sized>(file: &mut F, section: &Section) -> CompressionInfo {
    let chdr_size = file.compression_header_size(section);
    assert!(
        chdr_size <= MAX_COMPRESSION_HEADER_SIZE,
        "structured compression header size {chdr_size} exceeds the {MAX_COMPRESSION_HEADER_SIZE}-byte maximum"
    );
    let header_size = if chdr_size == 0 {
        LEGACY_HEADER_SIZE
    } else {
        chdr_size
    };

    let mut header = [0u8; MAX_COMPRESSION_HEADER_SIZE];
    if file
        .read_section(section, &mut header[..header_size], 0)
        .is_err()
    {
        return CompressionInfo {
            compressed: false,
            kind: if chdr_size == 0 {
                HeaderKind::Legacy
            } else {
                HeaderKind::Structured(chdr_size)
            },
            uncompressed_size: section.size,
            alignment_power: 0,
        };
    }
    probe_bytes(file, section, &header[..header_size])
}

/// Whether `section` is compressed in a supported form with a nonzero
/// decompressed size.
pub fn is_section_compressed<F: ObjectFile + ?Sized>(file: &mut F, section: &Section) -> bool {
    probe_section(file, section).is_supported_compression()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
