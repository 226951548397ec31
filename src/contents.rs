// Section content lifecycle: retrieval, caching, and the compress /
// convert transform.
//
// Every operation either completes or fails before returning. Scratch
// buffers are plain `Vec`s owned by the operation, so every failure exit
// releases them by drop; the final buffer is handed to the section only on
// the single success path of each operation.

use log::{debug, error};

use crate::error::Error;
use crate::header::{self, HeaderKind, LEGACY_HEADER_SIZE, MAX_COMPRESSION_HEADER_SIZE};
use crate::object::{Direction, ObjectFile};
use crate::section::{CompressStatus, Section, SectionFlags};
use crate::zstream;

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Allocate a zeroed buffer of `len` bytes, failing with `NoMemory`
/// instead of aborting when the size is unserviceable.
pub(crate) fn alloc_buffer(len: u64) -> Result<Vec<u8>, Error> {
    let n = usize::try_from(len).map_err(|_| Error::NoMemory(len))?;
    let mut buf = Vec::new();
    if buf.try_reserve_exact(n).is_err() {
        error!("section is too large ({len:#x} bytes)");
        return Err(Error::NoMemory(len));
    }
    buf.resize(n, 0);
    Ok(buf)
}

fn prepare_dest(buf: Option<Vec<u8>>, len: u64) -> Result<Vec<u8>, Error> {
    match buf {
        Some(mut b) => {
            let n = usize::try_from(len).map_err(|_| Error::NoMemory(len))?;
            if b.try_reserve_exact(n.saturating_sub(b.len())).is_err() {
                error!("section is too large ({len:#x} bytes)");
                return Err(Error::NoMemory(len));
            }
            b.resize(n, 0);
            Ok(b)
        }
        None => alloc_buffer(len),
    }
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// Read a section's full contents, decompressing if needed.
///
/// Returns `Ok(None)` when the section's effective size is zero. When
/// `buf` is supplied it is resized and reused as the destination;
/// otherwise a buffer is allocated. The section itself is not mutated:
/// callers that want the decompressed bytes retained should follow up
/// with [`cache_contents`].
pub fn get_full_contents<F: ObjectFile + ?Sized>(
    file: &mut F,
    section: &Section,
    buf: Option<Vec<u8>>,
) -> Result<Option<Vec<u8>>, Error> {
    let sz = section.effective_size(file.direction());
    if sz == 0 {
        return Ok(None);
    }

    match section.status {
        CompressStatus::None => {
            if buf.is_none() {
                // Refuse plainly impossible sizes before trying to allocate
                // them. Linker-created sections can legitimately outgrow the
                // file, contentless sections occupy no disk space, and some
                // formats keep privately compressed bytes behind this state.
                let file_size = file.file_size();
                if file_size > 0
                    && file_size < sz
                    && !section.flags.contains(SectionFlags::LINKER_CREATED)
                    && section.flags.contains(SectionFlags::HAS_CONTENTS)
                    && !file.uses_private_compression()
                {
                    error!(
                        "section {} size ({sz:#x} bytes) is larger than file size ({file_size:#x} bytes)",
                        section.name
                    );
                    return Err(Error::FileTruncated {
                        size: sz,
                        file_size,
                    });
                }
            }
            let mut dest = prepare_dest(buf, sz)?;
            file.read_section(section, &mut dest, 0)?;
            Ok(Some(dest))
        }

        CompressStatus::Sized { compressed_size } => {
            // Stage the still-compressed bytes through the raw read path;
            // no status juggling is needed since the read never consults it.
            let mut compressed = alloc_buffer(compressed_size)?;
            file.read_section(section, &mut compressed, 0)?;

            let header_size = match file.compression_header_size(section) {
                0 => LEGACY_HEADER_SIZE,
                n => n,
            };
            if compressed.len() < header_size {
                return Err(Error::WrongFormat);
            }

            let mut dest = prepare_dest(buf, sz)?;
            zstream::decompress_contents(&compressed[header_size..], &mut dest)?;
            Ok(Some(dest))
        }

        CompressStatus::Materialized { ref contents } => {
            let n = usize::try_from(sz).map_err(|_| Error::NoMemory(sz))?;
            let src = contents.get(..n).ok_or(Error::InvalidOperation)?;
            let mut dest = prepare_dest(buf, sz)?;
            dest.copy_from_slice(src);
            Ok(Some(dest))
        }
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

/// Stash `contents` as the section's materialized bytes so later reads
/// need not decompress again.
///
/// This is the one way to leave the sized-not-materialized state without a
/// full [`get_full_contents`] cycle, for callers that decompressed
/// out-of-band.
pub fn cache_contents(section: &mut Section, contents: Vec<u8>) {
    debug!(
        "section {}: caching {} materialized bytes",
        section.name,
        contents.len()
    );
    section.status = CompressStatus::Materialized { contents };
    section.flags.insert(SectionFlags::IN_MEMORY);
}

// ---------------------------------------------------------------------------
// Initialization entry points
// ---------------------------------------------------------------------------

/// Record the compressed size, adopt the decompressed size and alignment
/// from the header, and move the section to the sized-not-materialized
/// state.
///
/// Valid only on a pristine section. Fails with `WrongFormat` when the
/// leading bytes are not a recognized compressed form.
pub fn init_decompress_status<F: ObjectFile + ?Sized>(
    file: &mut F,
    section: &mut Section,
) -> Result<(), Error> {
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

    if section.rawsize != 0 || !matches!(section.status, CompressStatus::None) {
        return Err(Error::InvalidOperation);
    }

    let mut raw = [0u8; MAX_COMPRESSION_HEADER_SIZE];
    let hdr = &mut raw[..header_size];
    if file.read_section(section, hdr, 0).is_err() {
        return Err(Error::InvalidOperation);
    }

    let (uncompressed_size, alignment_power) = if chdr_size == 0 {
        if hdr[..4] != *header::ZLIB_MAGIC {
            return Err(Error::WrongFormat);
        }
        (header::decode_legacy_size(hdr), 0)
    } else {
        let decoded = file
            .decode_compression_header(hdr, section)
            .ok_or(Error::WrongFormat)?;
        (decoded.uncompressed_size, decoded.alignment_power)
    };

    debug!(
        "section {}: sized for decompression, {} compressed -> {} uncompressed bytes",
        section.name, section.size, uncompressed_size
    );
    section.status = CompressStatus::Sized {
        compressed_size: section.size,
    };
    section.size = uncompressed_size;
    section.set_alignment(alignment_power);
    Ok(())
}

/// Read a pristine section's full contents and compress them (or convert
/// an already-compressed payload to the output header convention). Only
/// valid on a file open for reading.
pub fn init_compress_status<F: ObjectFile + ?Sized>(
    file: &mut F,
    section: &mut Section,
) -> Result<(), Error> {
    if file.direction() != Direction::Read
        || section.size == 0
        || section.rawsize != 0
        || !matches!(section.status, CompressStatus::None)
    {
        return Err(Error::InvalidOperation);
    }

    let mut buffer = alloc_buffer(section.size)?;
    file.read_section(section, &mut buffer, 0)?;

    // The buffer holds the whole on-disk image, so classify it directly
    // rather than issuing a second header read.
    let info = header::probe_bytes(file, section, &buffer);
    let existing = if info.compressed {
        match info.kind {
            HeaderKind::Legacy => Some(ExistingHeader {
                header_size: LEGACY_HEADER_SIZE,
                uncompressed_size: info.uncompressed_size,
                alignment_power: info.alignment_power,
            }),
            HeaderKind::Structured(n) => Some(ExistingHeader {
                header_size: n,
                uncompressed_size: info.uncompressed_size,
                alignment_power: info.alignment_power,
            }),
            HeaderKind::Unsupported => return Err(Error::WrongFormat),
        }
    } else {
        None
    };

    compress_contents(file, section, buffer, existing)?;
    Ok(())
}

/// Compress caller-supplied contents into a pristine section of a file
/// open for writing. `buffer` must hold exactly `section.size` bytes.
pub fn compress_section<F: ObjectFile + ?Sized>(
    file: &mut F,
    section: &mut Section,
    buffer: Vec<u8>,
) -> Result<(), Error> {
    if file.direction() != Direction::Write
        || section.size == 0
        || buffer.len() as u64 != section.size
        || !matches!(section.status, CompressStatus::None)
    {
        return Err(Error::InvalidOperation);
    }

    compress_contents(file, section, buffer, None)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Compress / convert transform
// ---------------------------------------------------------------------------

/// Source header convention of a buffer that is itself still
/// headered + compressed.
pub(crate) struct ExistingHeader {
    /// On-disk size of the source header (12 for the legacy form).
    pub header_size: usize,
    /// Decompressed length the source header claims.
    pub uncompressed_size: u64,
    /// log2 alignment the source header claims.
    pub alignment_power: u32,
}

fn write_compression_header<F: ObjectFile + ?Sized>(
    file: &F,
    section: &Section,
    dest: &mut [u8],
) {
    if file.output_compression_header_size() == 0 {
        header::encode_legacy_header(dest, section.size);
    } else {
        file.encode_compression_header(dest, section);
    }
}

/// Transform `buffer` into the section's final contents.
///
/// With `existing == None` the buffer is uncompressed input: it is
/// deflated behind a fresh header, unless that would not shrink it, in
/// which case the buffer itself is kept as the contents (a successful
/// decision not to compress). With `existing` present the buffer already
/// carries a header and deflate payload: the payload is moved behind the
/// output header convention without re-deflating, or decompressed
/// outright when the re-headered total would exceed the original
/// uncompressed size.
///
/// The buffer is consumed; on success exactly one buffer (new or the
/// original) ends up owned by the section, on failure all are dropped.
/// Returns the section's new logical size.
pub(crate) fn compress_contents<F: ObjectFile + ?Sized>(
    file: &F,
    section: &mut Section,
    buffer: Vec<u8>,
    existing: Option<ExistingHeader>,
) -> Result<u64, Error> {
    let header_size = match file.output_compression_header_size() {
        0 => LEGACY_HEADER_SIZE,
        n => n,
    };

    match existing {
        Some(orig) => {
            let payload_len = buffer
                .len()
                .checked_sub(orig.header_size)
                .ok_or(Error::WrongFormat)?;
            let new_total = (payload_len + header_size) as u64;

            if new_total > orig.uncompressed_size {
                // Swapping headers would outgrow the data itself; store it
                // uncompressed instead.
                let mut out = alloc_buffer(orig.uncompressed_size)?;
                zstream::decompress_contents(&buffer[orig.header_size..], &mut out)?;
                debug!(
                    "section {}: stored uncompressed, {} -> {} bytes",
                    section.name,
                    buffer.len(),
                    orig.uncompressed_size
                );
                section.size = orig.uncompressed_size;
                section.set_alignment(orig.alignment_power);
                section.status = CompressStatus::Materialized { contents: out };
                Ok(orig.uncompressed_size)
            } else {
                let mut out = alloc_buffer(new_total)?;
                // The header must describe the decompressed view.
                section.size = orig.uncompressed_size;
                write_compression_header(file, section, &mut out[..header_size]);
                out[header_size..].copy_from_slice(&buffer[orig.header_size..]);
                debug!(
                    "section {}: converted compression header, {} -> {} bytes",
                    section.name,
                    buffer.len(),
                    new_total
                );
                section.size = new_total;
                section.status = CompressStatus::Materialized { contents: out };
                Ok(new_total)
            }
        }

        None => {
            let uncompressed_size = buffer.len() as u64;
            let bound = zstream::compress_bound(uncompressed_size);
            let mut out = alloc_buffer(bound + header_size as u64)?;
            let payload_len = zstream::compress_into(&buffer, &mut out[header_size..])?;
            let total = (header_size + payload_len) as u64;

            if total < uncompressed_size {
                // Section size still describes the uncompressed view here,
                // which is what the header must record.
                write_compression_header(file, section, &mut out[..header_size]);
                out.truncate(total as usize);
                debug!(
                    "section {}: compressed {} -> {} bytes",
                    section.name, uncompressed_size, total
                );
                section.size = total;
                section.status = CompressStatus::Materialized { contents: out };
                Ok(total)
            } else {
                // Compression did not shrink the data; keep the original
                // bytes as the contents.
                debug!(
                    "section {}: compression not worthwhile ({} -> {} bytes), kept uncompressed",
                    section.name, uncompressed_size, total
                );
                section.size = uncompressed_size;
                section.status = CompressStatus::Materialized { contents: buffer };
                Ok(uncompressed_size)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
