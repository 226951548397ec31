// ELF compression header (Chdr) codec.
//
// The structured header convention for ELF is the Chdr that prefixes a
// SHF_COMPRESSED section's contents:
//
//   Elf32_Chdr: ch_type u32, ch_size u32, ch_addralign u32        (12 bytes)
//   Elf64_Chdr: ch_type u32, ch_reserved u32, ch_size u64,
//               ch_addralign u64                                  (24 bytes)
//
// Only ELFCOMPRESS_ZLIB is supported. Object-file implementations can
// delegate their header hooks to this codec.

use crate::object::DecodedHeader;

/// `ch_type` value for zlib-compressed section contents.
pub const ELFCOMPRESS_ZLIB: u32 = 1;

/// ELF file class, which selects the Chdr layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// 32-bit layout, 12-byte Chdr.
    Elf32,
    /// 64-bit layout, 24-byte Chdr.
    Elf64,
}

/// Byte order of the Chdr fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn read_u32(self, bytes: &[u8]) -> u32 {
        let arr: [u8; 4] = bytes[..4].try_into().unwrap();
        match self {
            Endian::Little => u32::from_le_bytes(arr),
            Endian::Big => u32::from_be_bytes(arr),
        }
    }

    fn read_u64(self, bytes: &[u8]) -> u64 {
        let arr: [u8; 8] = bytes[..8].try_into().unwrap();
        match self {
            Endian::Little => u64::from_le_bytes(arr),
            Endian::Big => u64::from_be_bytes(arr),
        }
    }

    fn write_u32(self, dest: &mut [u8], v: u32) {
        let bytes = match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        dest[..4].copy_from_slice(&bytes);
    }

    fn write_u64(self, dest: &mut [u8], v: u64) {
        let bytes = match self {
            Endian::Little => v.to_le_bytes(),
            Endian::Big => v.to_be_bytes(),
        };
        dest[..8].copy_from_slice(&bytes);
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encoder/decoder for the ELF compression header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfCompressionCodec {
    class: ElfClass,
    endian: Endian,
}

impl ElfCompressionCodec {
    pub fn new(class: ElfClass, endian: Endian) -> Self {
        Self { class, endian }
    }

    /// On-disk size of the Chdr for this class.
    pub fn header_size(&self) -> usize {
        match self.class {
            ElfClass::Elf32 => 12,
            ElfClass::Elf64 => 24,
        }
    }

    /// Decode a Chdr. Returns `None` for an unsupported `ch_type` or an
    /// `ch_addralign` that is not a power of two.
    pub fn decode(&self, header: &[u8]) -> Option<DecodedHeader> {
        if header.len() < self.header_size() {
            return None;
        }
        let (ch_type, ch_size, ch_addralign) = match self.class {
            ElfClass::Elf32 => (
                self.endian.read_u32(&header[0..]),
                u64::from(self.endian.read_u32(&header[4..])),
                u64::from(self.endian.read_u32(&header[8..])),
            ),
            ElfClass::Elf64 => (
                self.endian.read_u32(&header[0..]),
                self.endian.read_u64(&header[8..]),
                self.endian.read_u64(&header[16..]),
            ),
        };
        if ch_type != ELFCOMPRESS_ZLIB {
            return None;
        }
        let alignment_power = match ch_addralign {
            0 => 0,
            a if a.is_power_of_two() => a.trailing_zeros(),
            _ => return None,
        };
        Some(DecodedHeader {
            uncompressed_size: ch_size,
            alignment_power,
        })
    }

    /// Encode a Chdr for the given decompressed view into `dest`, which
    /// must be at least [`header_size`](Self::header_size) bytes.
    pub fn encode(&self, dest: &mut [u8], uncompressed_size: u64, alignment_power: u32) {
        let addralign = 1u64 << alignment_power;
        match self.class {
            ElfClass::Elf32 => {
                self.endian.write_u32(&mut dest[0..], ELFCOMPRESS_ZLIB);
                self.endian
                    .write_u32(&mut dest[4..], uncompressed_size as u32);
                self.endian.write_u32(&mut dest[8..], addralign as u32);
            }
            ElfClass::Elf64 => {
                self.endian.write_u32(&mut dest[0..], ELFCOMPRESS_ZLIB);
                self.endian.write_u32(&mut dest[4..], 0); // ch_reserved
                self.endian.write_u64(&mut dest[8..], uncompressed_size);
                self.endian.write_u64(&mut dest[16..], addralign);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
