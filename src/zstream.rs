// Streaming zlib engine for section payloads.
//
// Decompression treats its input as a concatenation of independent zlib
// members (producers are allowed to emit several compressed buffers back
// to back), inflating in a loop and resetting the decompressor between
// members. Compression is whole-buffer: the payload always fits in a
// `compress_bound`-sized region, so a single finishing deflate pass
// suffices.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

// ---------------------------------------------------------------------------
// Codec error
// ---------------------------------------------------------------------------

/// Failure inside the zlib engine.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The inflater rejected the stream.
    #[error("inflate failed: {0}")]
    Inflate(#[from] flate2::DecompressError),
    /// The deflater failed internally.
    #[error("deflate failed: {0}")]
    Deflate(#[from] flate2::CompressError),
    /// The compressed input did not fill the expected uncompressed size.
    #[error("decompressed data stops at {got} of {expected} bytes")]
    ShortOutput {
        /// Bytes the destination buffer expected.
        expected: usize,
        /// Bytes actually produced.
        got: usize,
    },
    /// The deflate output region was too small for the payload.
    #[error("deflate output region of {capacity} bytes overflowed")]
    Overflow {
        /// Size of the output region.
        capacity: usize,
    },
}

// ---------------------------------------------------------------------------
// Decompression
// ---------------------------------------------------------------------------

/// Inflate `input` into `output`, filling it exactly.
///
/// `input` may consist of several zlib members concatenated together; each
/// completed member must end cleanly. The final member may instead be cut
/// off by output exhaustion, provided the buffer is exactly full at that
/// point. Leftover input after the buffer fills is tolerated. On failure
/// the contents of `output` are unspecified.
pub fn decompress_contents(input: &[u8], output: &mut [u8]) -> Result<(), CodecError> {
    let mut inflate = Decompress::new(true);
    let mut in_pos = 0usize;
    let mut out_pos = 0usize;
    let mut clean = true;

    while in_pos < input.len() && out_pos < output.len() {
        let before_in = inflate.total_in();
        let before_out = inflate.total_out();
        let status = inflate.decompress(
            &input[in_pos..],
            &mut output[out_pos..],
            FlushDecompress::Finish,
        )?;
        in_pos += (inflate.total_in() - before_in) as usize;
        out_pos += (inflate.total_out() - before_out) as usize;

        match status {
            Status::StreamEnd => inflate.reset(true),
            // Forward progress without a member ending: acceptable only
            // when the destination is now exactly full.
            Status::Ok => break,
            Status::BufError => {
                clean = false;
                break;
            }
        }
    }

    if clean && out_pos == output.len() {
        Ok(())
    } else {
        Err(CodecError::ShortOutput {
            expected: output.len(),
            got: out_pos,
        })
    }
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Worst-case zlib-wrapped deflate size for `len` input bytes.
/// Mirrors zlib's `compressBound()`.
pub fn compress_bound(len: u64) -> u64 {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Deflate all of `input` into `output` as a single zlib member.
///
/// Returns the number of payload bytes written. `output` should be at
/// least [`compress_bound`] of the input length.
pub fn compress_into(input: &[u8], output: &mut [u8]) -> Result<usize, CodecError> {
    let mut deflate = Compress::new(Compression::default(), true);
    let mut in_pos = 0usize;
    let mut out_pos = 0usize;

    loop {
        let before_in = deflate.total_in();
        let before_out = deflate.total_out();
        let status = deflate.compress(
            &input[in_pos..],
            &mut output[out_pos..],
            FlushCompress::Finish,
        )?;
        in_pos += (deflate.total_in() - before_in) as usize;
        out_pos += (deflate.total_out() - before_out) as usize;

        match status {
            Status::StreamEnd => return Ok(out_pos),
            Status::Ok if deflate.total_in() != before_in || deflate.total_out() != before_out => {}
            _ => {
                return Err(CodecError::Overflow {
                    capacity: output.len(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; compress_bound(data.len() as u64) as usize];
        let n = compress_into(data, &mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    fn roundtrip() {
        let data: Vec<u8> = b"Hello, world! This is test data. "
            .iter()
            .copied()
            .cycle()
            .take(1024)
            .collect();
        let compressed = deflate(&data);
        assert!(compressed.len() < data.len());

        let mut out = vec![0u8; data.len()];
        decompress_contents(&compressed, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn roundtrip_empty() {
        let compressed = deflate(b"");
        let mut out = [0u8; 0];
        decompress_contents(&compressed, &mut out).unwrap();
    }

    #[test]
    fn concatenated_members() {
        let a = vec![0x41u8; 300];
        let b = vec![0x42u8; 500];
        let mut input = deflate(&a);
        input.extend_from_slice(&deflate(&b));

        let mut out = vec![0u8; a.len() + b.len()];
        decompress_contents(&input, &mut out).unwrap();
        assert_eq!(&out[..a.len()], &a[..]);
        assert_eq!(&out[a.len()..], &b[..]);
    }

    #[test]
    fn garbage_input_fails() {
        let mut out = vec![0u8; 64];
        assert!(matches!(
            decompress_contents(&[0xde, 0xad, 0xbe, 0xef, 0x00], &mut out),
            Err(CodecError::Inflate(_))
        ));
    }

    #[test]
    fn truncated_input_fails() {
        let data = vec![7u8; 2048];
        let compressed = deflate(&data);
        let mut out = vec![0u8; data.len()];
        let cut = &compressed[..compressed.len() / 2];
        assert!(decompress_contents(cut, &mut out).is_err());
    }

    #[test]
    fn output_larger_than_data_fails() {
        let data = vec![3u8; 100];
        let compressed = deflate(&data);
        let mut out = vec![0u8; 200];
        assert!(matches!(
            decompress_contents(&compressed, &mut out),
            Err(CodecError::ShortOutput {
                expected: 200,
                got: 100
            })
        ));
    }

    #[test]
    fn exactly_full_output_with_leftover_member_is_accepted() {
        // A member longer than the destination that fills it exactly at the
        // cut point is accepted, matching the historical engine.
        let data = vec![9u8; 1000];
        let compressed = deflate(&data);
        let mut out = vec![0u8; 400];
        decompress_contents(&compressed, &mut out).unwrap();
        assert_eq!(out, vec![9u8; 400]);
    }

    #[test]
    fn compress_overflow_detected() {
        let data = vec![0x5au8; 4096];
        let mut tiny = vec![0u8; 4];
        assert!(matches!(
            compress_into(&data, &mut tiny),
            Err(CodecError::Overflow { capacity: 4 })
        ));
    }

    #[test]
    fn bound_is_sufficient_for_incompressible_input() {
        let data: Vec<u8> = (0..4096u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        let mut out = vec![0u8; compress_bound(data.len() as u64) as usize];
        let n = compress_into(&data, &mut out).unwrap();
        assert!(n <= out.len());

        let mut back = vec![0u8; data.len()];
        decompress_contents(&out[..n], &mut back).unwrap();
        assert_eq!(back, data);
    }
}
