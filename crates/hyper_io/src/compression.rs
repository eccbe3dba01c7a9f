//! Block compression providers
//!
//! Archive codecs never talk to a compression library directly. They receive a [`Compressor`],
//! so vendor codecs that are only reachable through native libraries can be plugged in by the
//! caller while [`Zlib`] covers the formats that use plain zlib streams and [`Lzss`] the
//! byte-oriented LZSS of Crytek stream archives.

use std::collections::HashMap;
use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use tracing::instrument;

use crate::error::{Error, Result};

/// Upper bound for buffers sized by lengths read from a file
pub(crate) const MAX_PREALLOCATION: usize = 0x10_0000;

/// A block codec used for archive payloads
pub trait Compressor {
    /// Human readable codec name, used in diagnostics
    fn name(&self) -> &'static str;

    /// Compress a whole block
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress a whole block that is known to expand to `expected_size` bytes
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>>;
}

/// zlib streams through [`flate2`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zlib {
    level: u32,
}

impl Zlib {
    /// Use the given compression level (0-9)
    pub fn with_level(level: u32) -> Self {
        Zlib {
            level: level.min(9),
        }
    }
}

impl Default for Zlib {
    fn default() -> Self {
        Zlib {
            level: Compression::default().level(),
        }
    }
}

impl Compressor for Zlib {
    fn name(&self) -> &'static str {
        "zlib"
    }

    #[instrument(skip_all, fields(len = data.len()), err)]
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    #[instrument(skip_all, fields(len = data.len(), expected_size = expected_size), err)]
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(expected_size.min(MAX_PREALLOCATION));
        ZlibDecoder::new(data)
            .take(expected_size as u64 + 1)
            .read_to_end(&mut buffer)?;

        if buffer.len() != expected_size {
            return Err(Error::DecompressedSizeMismatch {
                expected: expected_size,
                actual: buffer.len(),
            });
        }

        Ok(buffer)
    }
}

/// Placeholder for a codec that is not available on this system
///
/// Every call fails with [`Error::CompressionUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsupported {
    codec: &'static str,
}

impl Unsupported {
    /// Stand in for the codec called `codec`
    pub fn new(codec: &'static str) -> Self {
        Unsupported { codec }
    }
}

impl Compressor for Unsupported {
    fn name(&self) -> &'static str {
        self.codec
    }

    fn compress(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CompressionUnavailable(self.codec))
    }

    fn decompress(&self, _data: &[u8], _expected_size: usize) -> Result<Vec<u8>> {
        Err(Error::CompressionUnavailable(self.codec))
    }
}

/// Byte-oriented LZSS found in Crytek stream archives
///
/// A block is a sequence of tokens that each start with a length. Bit 6 of the first byte marks
/// a back reference. The low 6 bits of the first byte hold the top of the length and, while bit 7
/// is set, every following byte adds 7 more bits. A back reference copies `length + 3` bytes from
/// a distance encoded the same way, with 7 bits in its first byte. Anything else is a run of
/// `length` literal bytes.
///
/// Compression is greedy and unbounded in distance, which keeps the output readable by the game
/// but not as small as the stock tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lzss;

const LZSS_MATCH: u8 = 0x40;
const LZSS_MORE: u8 = 0x80;
const LZSS_MIN_MATCH: usize = 3;

struct LzssSource<'a> {
    data: &'a [u8],
    position: usize,
}

impl LzssSource<'_> {
    fn corrupt(&self, reason: &'static str) -> Error {
        Error::CorruptStream {
            codec: "lzss",
            position: self.position,
            reason,
        }
    }

    fn next(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or_else(|| self.corrupt("token is truncated"))?;
        self.position += 1;
        Ok(byte)
    }

    /// Read a variable length value, returning its first byte and the value
    fn read_size(&mut self, mask: u8) -> Result<(u8, usize)> {
        let first = self.next()?;
        let mut size = (first & mask) as usize;

        let mut byte = first;
        while byte & LZSS_MORE != 0 {
            byte = self.next()?;
            size = size
                .checked_mul(0x80)
                .map(|size| size | (byte & 0x7F) as usize)
                .ok_or_else(|| self.corrupt("length overflows"))?;
        }

        Ok((first, size))
    }
}

fn write_size(out: &mut Vec<u8>, value: usize, first_bits: u32, flag: u8) {
    let mut groups = Vec::new();
    let mut rest = value;
    while rest >> first_bits != 0 {
        groups.push((rest & 0x7F) as u8);
        rest >>= 7;
    }

    let more = if groups.is_empty() { 0 } else { LZSS_MORE };
    out.push(rest as u8 | flag | more);
    while let Some(group) = groups.pop() {
        let more = if groups.is_empty() { 0 } else { LZSS_MORE };
        out.push(group | more);
    }
}

fn write_literals(out: &mut Vec<u8>, literals: &[u8]) {
    if literals.is_empty() {
        return;
    }
    write_size(out, literals.len(), 6, 0);
    out.extend_from_slice(literals);
}

impl Compressor for Lzss {
    fn name(&self) -> &'static str {
        "lzss"
    }

    #[instrument(skip_all, fields(len = data.len()), err)]
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() / 2 + 8);
        let mut recent = HashMap::<[u8; 3], usize>::new();
        let mut literal_start = 0;
        let mut index = 0;

        while index + LZSS_MIN_MATCH <= data.len() {
            let key = [data[index], data[index + 1], data[index + 2]];
            let Some(candidate) = recent.insert(key, index) else {
                index += 1;
                continue;
            };

            let length = data[index..]
                .iter()
                .zip(&data[candidate..])
                .take_while(|(a, b)| a == b)
                .count();

            write_literals(&mut out, &data[literal_start..index]);
            write_size(&mut out, length - LZSS_MIN_MATCH, 6, LZSS_MATCH);
            write_size(&mut out, index - candidate, 7, 0);

            let end = index + length;
            for position in index + 1..end.min(data.len() - 2) {
                let key = [data[position], data[position + 1], data[position + 2]];
                recent.insert(key, position);
            }

            index = end;
            literal_start = end;
        }

        write_literals(&mut out, &data[literal_start..]);
        Ok(out)
    }

    #[instrument(skip_all, fields(len = data.len(), expected_size = expected_size), err)]
    fn decompress(&self, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
        let mut source = LzssSource { data, position: 0 };
        let mut buffer = Vec::with_capacity(expected_size.min(MAX_PREALLOCATION));

        while source.position < data.len() && buffer.len() < expected_size {
            let (token, size) = source.read_size(0x3F)?;

            if token & LZSS_MATCH == 0 {
                let end = source
                    .position
                    .checked_add(size)
                    .filter(|end| *end <= data.len())
                    .ok_or_else(|| source.corrupt("literal run is truncated"))?;
                buffer.extend_from_slice(&data[source.position..end]);
                source.position = end;
                continue;
            }

            let length = size.saturating_add(LZSS_MIN_MATCH);
            let (_, distance) = source.read_size(0x7F)?;
            if distance == 0 || distance > buffer.len() {
                return Err(source.corrupt("back reference points before the output"));
            }
            if buffer.len().saturating_add(length) > expected_size {
                return Err(Error::DecompressedSizeMismatch {
                    expected: expected_size,
                    actual: buffer.len().saturating_add(length),
                });
            }

            let start = buffer.len() - distance;
            for offset in 0..length {
                let byte = buffer[start + offset];
                buffer.push(byte);
            }
        }

        if buffer.len() != expected_size {
            return Err(Error::DecompressedSizeMismatch {
                expected: expected_size,
                actual: buffer.len(),
            });
        }
        if source.position != data.len() {
            return Err(source.corrupt("data continues past the expected size"));
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::{Compressor, Lzss, Unsupported, Zlib};
    use crate::error::{Error, Result};

    const HELLO_WORLD: &[u8] = b"Hello World";

    #[rustfmt::skip]
    const HELLO_WORLD_ZLIB: [u8; 19] = [
        0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0x08, 0xCF,
        0x2F, 0xCA, 0x49, 0x01, 0x00, 0x18, 0x0B, 0x04, 0x1D,
    ];

    #[test]
    fn decompress_known_stream() -> Result<()> {
        assert_eq!(Zlib::default().decompress(&HELLO_WORLD_ZLIB, 11)?, HELLO_WORLD);
        Ok(())
    }

    #[test]
    fn compressed_block_expands_back() -> Result<()> {
        let zlib = Zlib::with_level(9);
        let data = HELLO_WORLD.repeat(32);
        let compressed = zlib.compress(&data)?;

        assert!(compressed.len() < data.len());
        assert_eq!(zlib.decompress(&compressed, data.len())?, data);

        Ok(())
    }

    #[test]
    fn decompress_checks_expected_size() {
        assert!(matches!(
            Zlib::default().decompress(&HELLO_WORLD_ZLIB, 12),
            Err(Error::DecompressedSizeMismatch {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn oversized_claims_do_not_preallocate() {
        assert!(matches!(
            Zlib::default().decompress(&HELLO_WORLD_ZLIB, u32::MAX as usize),
            Err(Error::DecompressedSizeMismatch { actual: 11, .. })
        ));
    }

    #[test]
    fn decompression_stops_past_the_expected_size() {
        assert!(matches!(
            Zlib::default().decompress(&HELLO_WORLD_ZLIB, 4),
            Err(Error::DecompressedSizeMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[rustfmt::skip]
    const REPEATED_LZSS: [u8; 8] = [
        0x03, b'a', b'b', b'c',
        // 6 bytes from 3 back
        0x43, 0x03,
        0x01, b'X',
    ];

    #[test]
    fn lzss_expands_back_references() -> Result<()> {
        assert_eq!(Lzss.decompress(&REPEATED_LZSS, 10)?, b"abcabcabcX");
        Ok(())
    }

    #[test]
    fn lzss_finds_repeated_runs() -> Result<()> {
        assert_eq!(Lzss.compress(b"abcabcabcX")?, REPEATED_LZSS);
        Ok(())
    }

    #[test]
    fn lzss_lengths_span_several_bytes() -> Result<()> {
        let data = (0..=255u8).chain(HELLO_WORLD.repeat(40)).collect::<Vec<_>>();
        let compressed = Lzss.compress(&data)?;

        // the first 267 bytes are literals, which needs a second length byte
        assert_eq!(&compressed[..3], &[0x82, 0x0B, 0x00]);
        assert!(compressed.len() < data.len());
        assert_eq!(Lzss.decompress(&compressed, data.len())?, data);

        Ok(())
    }

    #[test]
    fn lzss_rejects_corrupt_streams() {
        assert!(matches!(
            Lzss.decompress(&[0x40, 0x05], 3),
            Err(Error::CorruptStream { codec: "lzss", .. })
        ));
        assert!(matches!(
            Lzss.decompress(&[0x05, b'a'], 5),
            Err(Error::CorruptStream { position: 1, .. })
        ));
        assert!(matches!(
            Lzss.decompress(&REPEATED_LZSS, 9),
            Err(Error::CorruptStream { position: 6, .. })
        ));
        assert!(matches!(
            Lzss.decompress(&REPEATED_LZSS, 4),
            Err(Error::DecompressedSizeMismatch {
                expected: 4,
                actual: 9
            })
        ));
    }

    #[test]
    fn unsupported_codec_reports_itself() {
        let codec = Unsupported::new("xmem");

        assert_eq!(codec.name(), "xmem");
        assert!(matches!(
            codec.compress(HELLO_WORLD),
            Err(Error::CompressionUnavailable("xmem"))
        ));
        assert!(matches!(
            codec.decompress(HELLO_WORLD, 11),
            Err(Error::CompressionUnavailable("xmem"))
        ));
    }
}
