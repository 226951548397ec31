// In-memory object file.
//
// `MemoryFile` backs the `ObjectFile` trait with per-section byte images.
// It is what the crate's own tests run against and serves callers that
// already hold a file image rather than a file handle.

use std::collections::HashMap;
use std::io;

use crate::chdr::ElfCompressionCodec;
use crate::object::{DecodedHeader, Direction, ObjectFile};
use crate::section::Section;

struct Image {
    bytes: Vec<u8>,
    /// Whether this section's on-disk bytes carry the structured header
    /// (the in-memory equivalent of SHF_COMPRESSED).
    structured: bool,
}

/// An object file held entirely in memory.
pub struct MemoryFile {
    direction: Direction,
    file_size_override: Option<u64>,
    codec: Option<ElfCompressionCodec>,
    output_structured: bool,
    images: HashMap<String, Image>,
}

impl MemoryFile {
    /// An empty file with no structured-header codec: every section uses
    /// the legacy compression convention.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            file_size_override: None,
            codec: None,
            output_structured: false,
            images: HashMap::new(),
        }
    }

    /// Attach a structured-header codec. Newly compressed contents will
    /// use it unless [`legacy_output`](Self::legacy_output) is also set.
    pub fn with_codec(mut self, codec: ElfCompressionCodec) -> Self {
        self.codec = Some(codec);
        self.output_structured = true;
        self
    }

    /// Keep the codec for reading structured sections but emit newly
    /// compressed contents in the legacy form.
    pub fn legacy_output(mut self) -> Self {
        self.output_structured = false;
        self
    }

    /// Override the reported file size (by default the sum of all section
    /// images).
    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size_override = Some(size);
        self
    }

    /// Install a section's on-disk image under the legacy convention.
    pub fn insert_image(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(
            name.into(),
            Image {
                bytes,
                structured: false,
            },
        );
    }

    /// Install a section's on-disk image whose bytes are governed by the
    /// structured header codec.
    pub fn insert_structured_image(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(
            name.into(),
            Image {
                bytes,
                structured: true,
            },
        );
    }

    /// A section's on-disk image, if present.
    pub fn image(&self, name: &str) -> Option<&[u8]> {
        self.images.get(name).map(|i| i.bytes.as_slice())
    }
}

impl ObjectFile for MemoryFile {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn file_size(&self) -> u64 {
        self.file_size_override
            .unwrap_or_else(|| self.images.values().map(|i| i.bytes.len() as u64).sum())
    }

    fn read_section(
        &mut self,
        section: &Section,
        dest: &mut [u8],
        offset: u64,
    ) -> io::Result<()> {
        let image = self.images.get(&section.name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no image for section {}", section.name),
            )
        })?;
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(dest.len())
            .filter(|&end| end <= image.bytes.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "read of {} bytes at {offset} exceeds section {} ({} bytes)",
                        dest.len(),
                        section.name,
                        image.bytes.len()
                    ),
                )
            })?;
        dest.copy_from_slice(&image.bytes[start..end]);
        Ok(())
    }

    fn compression_header_size(&self, section: &Section) -> usize {
        match (&self.codec, self.images.get(&section.name)) {
            (Some(codec), Some(image)) if image.structured => codec.header_size(),
            _ => 0,
        }
    }

    fn output_compression_header_size(&self) -> usize {
        match &self.codec {
            Some(codec) if self.output_structured => codec.header_size(),
            _ => 0,
        }
    }

    fn decode_compression_header(&self, header: &[u8], _section: &Section) -> Option<DecodedHeader> {
        self.codec.as_ref()?.decode(header)
    }

    fn encode_compression_header(&self, dest: &mut [u8], section: &Section) {
        if let Some(codec) = &self.codec {
            codec.encode(dest, section.size, section.alignment_power);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
