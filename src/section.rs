// Section data model for compressed content management.
//
// `CompressStatus` is a tagged enum carrying exactly the data that is valid
// in each state: the on-disk compressed size exists only while a section is
// sized-but-not-materialized, and the owned contents buffer exists only once
// the section is materialized. Invalid combinations cannot be constructed.

use bitflags::bitflags;

use crate::object::Direction;

bitflags! {
    /// Section flags consulted by the content retrieval paths.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u32 {
        /// The section occupies space in the file.
        const HAS_CONTENTS = 1 << 0;
        /// The section was synthesized by the linker and may legitimately
        /// claim a size larger than the file it nominally lives in.
        const LINKER_CREATED = 1 << 1;
        /// The section's final contents are held in memory.
        const IN_MEMORY = 1 << 2;
    }
}

// ---------------------------------------------------------------------------
// Compress status
// ---------------------------------------------------------------------------

/// Content lifecycle state of a section.
///
/// Transitions are one-way: `None -> Sized` via
/// [`init_decompress_status`](crate::contents::init_decompress_status),
/// `Sized -> Materialized` via a full read plus
/// [`cache_contents`](crate::contents::cache_contents), and
/// `None -> Materialized` directly on the compression paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompressStatus {
    /// The bytes on disk (or in memory) are exactly what callers see.
    #[default]
    None,
    /// The section is known to be compressed. `size` and `alignment_power`
    /// already describe the decompressed view; no buffer is allocated yet.
    Sized {
        /// On-disk byte count of the still-compressed section, header included.
        compressed_size: u64,
    },
    /// The final bytes callers receive are resident and owned by the section.
    Materialized {
        /// Exactly `size` bytes.
        contents: Vec<u8>,
    },
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A named, sized region of an object file's logical content.
///
/// Only the fields involved in compression handling are modeled here; the
/// surrounding object-file model owns everything else about a section.
#[derive(Debug, Clone)]
pub struct Section {
    /// Section name, e.g. `.debug_info` or `.zdebug_info`.
    pub name: String,
    /// Logical size advertised to consumers. Reflects the decompressed view
    /// once the section has been sized for decompression.
    pub size: u64,
    /// On-disk size before any size correction is applied; 0 once corrected.
    pub rawsize: u64,
    /// log2 alignment requirement of the uncompressed data.
    pub alignment_power: u32,
    /// Flags consulted by the retrieval paths.
    pub flags: SectionFlags,
    /// Content lifecycle state.
    pub status: CompressStatus,
}

impl Section {
    /// Create a section with on-disk contents of `size` bytes, in the
    /// pristine `None` state.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            rawsize: 0,
            alignment_power: 0,
            flags: SectionFlags::HAS_CONTENTS,
            status: CompressStatus::None,
        }
    }

    /// The size a full-content read must produce: `rawsize` when a
    /// size correction is pending and the file is open for reading,
    /// otherwise the logical size.
    pub fn effective_size(&self, direction: Direction) -> u64 {
        if direction != Direction::Write && self.rawsize != 0 {
            self.rawsize
        } else {
            self.size
        }
    }

    /// The materialized contents, if any.
    pub fn contents(&self) -> Option<&[u8]> {
        match &self.status {
            CompressStatus::Materialized { contents } => Some(contents),
            _ => None,
        }
    }

    /// The on-disk compressed size, valid only in the `Sized` state.
    pub fn compressed_size(&self) -> Option<u64> {
        match self.status {
            CompressStatus::Sized { compressed_size } => Some(compressed_size),
            _ => None,
        }
    }

    /// Whether the final contents are resident.
    pub fn is_materialized(&self) -> bool {
        matches!(self.status, CompressStatus::Materialized { .. })
    }

    /// Set the log2 alignment of the uncompressed data.
    pub fn set_alignment(&mut self, power: u32) {
        self.alignment_power = power;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
