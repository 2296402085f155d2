//! The binary sink for one pack: header, per-entry headers (with offset or
//! reference delta bases), zlib payloads, per-entry CRC32, and the trailing
//! whole-stream hash.

use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use flate2::{Compression, write::ZlibEncoder};

use crate::{
    errors::PackError,
    hash::ObjectHash,
    utils::HashAlgorithm,
};

pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;

/// Ordered, stateful output sink. Headers and offset delta back-references
/// depend on cumulative stream position, so exactly one object may be
/// written at a time.
pub struct PackOutputStream<'a, W: Write> {
    inner: &'a mut W,
    hash: HashAlgorithm,
    offset: u64,
    entry_offset: u64,
    crc: Option<crc32fast::Hasher>,
}

impl<'a, W: Write> PackOutputStream<'a, W> {
    pub fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            hash: HashAlgorithm::new(),
            offset: 0,
            entry_offset: 0,
            crc: None,
        }
    }

    /// Total bytes emitted so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// `"PACK"`, format version, object count.
    pub fn write_pack_header(&mut self, object_count: u32) -> Result<(), PackError> {
        let mut header = Vec::with_capacity(12);
        header.extend_from_slice(PACK_SIGNATURE);
        header.write_u32::<BigEndian>(PACK_VERSION)?;
        header.write_u32::<BigEndian>(object_count)?;
        self.write_all(&header)?;
        Ok(())
    }

    /// Start one entry: remember its offset and open a CRC32 over its bytes.
    pub fn begin_entry(&mut self) -> u64 {
        self.entry_offset = self.offset;
        self.crc = Some(crc32fast::Hasher::new());
        self.entry_offset
    }

    /// Offset of the entry currently being written.
    pub fn entry_offset(&self) -> u64 {
        self.entry_offset
    }

    /// Variable-length entry header: type in bits 6-4 of the first byte,
    /// inflated size in 4 + 7n bits, msb as continuation flag.
    pub fn write_entry_header(&mut self, type_num: u8, inflated_size: u64) -> Result<(), PackError> {
        let mut buf = Vec::with_capacity(10);
        let mut s = inflated_size;

        let mut c = (type_num << 4) | (s & 0x0f) as u8;
        s >>= 4;
        while s > 0 {
            buf.push(c | 0x80);
            c = (s & 0x7f) as u8;
            s >>= 7;
        }
        buf.push(c);

        self.write_all(&buf)?;
        Ok(())
    }

    /// Negative base offset for an offset-delta entry, big-endian 7-bit
    /// groups with the bias the format requires.
    pub fn write_ofs_base(&mut self, distance: u64) -> Result<(), PackError> {
        let mut buf = Vec::with_capacity(10);
        let mut off = distance;

        buf.push((off & 0x7f) as u8);
        off >>= 7;
        while off > 0 {
            off -= 1;
            buf.push(0x80 | (off & 0x7f) as u8);
            off >>= 7;
        }
        buf.reverse();

        self.write_all(&buf)?;
        Ok(())
    }

    /// Full base object id for a reference-delta entry.
    pub fn write_ref_base(&mut self, base: &ObjectHash) -> Result<(), PackError> {
        self.write_all(base.as_ref())?;
        Ok(())
    }

    /// Finish the current entry, returning the CRC32 over its header and
    /// payload bytes.
    pub fn end_entry(&mut self) -> u32 {
        self.crc
            .take()
            .map(|h| h.finalize())
            .unwrap_or_default()
    }

    /// Hash of everything emitted so far, without ending the stream. Used to
    /// seal the trailer.
    pub fn stream_hash(&self) -> ObjectHash {
        let digest = self.hash.clone().finalize();
        ObjectHash::from_bytes(&digest).expect("digest width matches the active hash kind")
    }

    /// Emit the whole-stream hash trailer and flush; the stream is complete.
    pub fn write_trailer(&mut self) -> Result<ObjectHash, PackError> {
        let trailer = self.stream_hash();
        self.inner.write_all(trailer.as_ref())?;
        self.offset += trailer.size() as u64;
        self.inner.flush()?;
        Ok(trailer)
    }
}

impl<W: Write> Write for PackOutputStream<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        self.hash.update(buf);
        if let Some(crc) = self.crc.as_mut() {
            crc.update(buf);
        }
        self.offset += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Deflate a payload at the given level.
pub(crate) fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, PackError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a payload, failing if it exceeds `expected` bytes.
pub(crate) fn inflate_exact(data: &[u8], expected: u64) -> Result<Vec<u8>, PackError> {
    use std::io::Read;

    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected as usize);
    decoder
        .by_ref()
        .take(expected + 1)
        .read_to_end(&mut out)?;
    if out.len() as u64 != expected {
        return Err(PackError::PackEncodeError(format!(
            "inflated to {} bytes, expected {expected}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sha1::{Digest, Sha1};

    use super::{PackOutputStream, deflate, inflate_exact};
    use crate::hash::{HashKind, set_hash_kind_for_test};

    #[test]
    fn pack_header_layout() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let mut sink = Vec::new();
        let mut out = PackOutputStream::new(&mut sink);
        out.write_pack_header(3).unwrap();
        assert_eq!(&sink[0..4], b"PACK");
        assert_eq!(&sink[4..8], &[0, 0, 0, 2]);
        assert_eq!(&sink[8..12], &[0, 0, 0, 3]);
    }

    #[test]
    fn entry_header_round_trip() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        for (type_num, size) in [(3u8, 5u64), (1, 100), (2, 1 << 20), (7, 0)] {
            let mut sink = Vec::new();
            let mut out = PackOutputStream::new(&mut sink);
            out.write_entry_header(type_num, size).unwrap();

            // Decode the header by hand the way a reader would.
            let mut pos = 0;
            let c = sink[pos];
            pos += 1;
            assert_eq!((c >> 4) & 0x07, type_num);
            let mut decoded = (c & 0x0f) as u64;
            let mut shift = 4;
            let mut byte = c;
            while byte & 0x80 != 0 {
                byte = sink[pos];
                pos += 1;
                decoded |= ((byte & 0x7f) as u64) << shift;
                shift += 7;
            }
            assert_eq!(decoded, size);
            assert_eq!(pos, sink.len());
        }
    }

    #[test]
    fn ofs_base_round_trip() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        for distance in [1u64, 127, 128, 255, 256, 1000, 100_000, 1_000_000] {
            let mut sink = Vec::new();
            let mut out = PackOutputStream::new(&mut sink);
            out.write_ofs_base(distance).unwrap();

            let mut pos = 0;
            let mut c = sink[pos];
            pos += 1;
            let mut decoded = (c & 0x7f) as u64;
            while c & 0x80 != 0 {
                decoded += 1;
                c = sink[pos];
                pos += 1;
                decoded = (decoded << 7) + (c & 0x7f) as u64;
            }
            assert_eq!(decoded, distance, "round trip failed for {distance}");
        }
    }

    #[test]
    fn trailer_is_hash_of_preceding_bytes() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let mut sink = Vec::new();
        {
            let mut out = PackOutputStream::new(&mut sink);
            out.write_pack_header(0).unwrap();
            out.write_trailer().unwrap();
        }
        let body = &sink[..12];
        let trailer = &sink[12..];
        assert_eq!(trailer, Sha1::digest(body).as_slice());
    }

    #[test]
    fn crc_covers_header_and_payload() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let mut sink = Vec::new();
        let crc = {
            let mut out = PackOutputStream::new(&mut sink);
            out.begin_entry();
            out.write_entry_header(3, 4).unwrap();
            out.write_all(b"data").unwrap();
            out.end_entry()
        };

        let mut expect = crc32fast::Hasher::new();
        expect.update(&sink);
        assert_eq!(crc, expect.finalize());
    }

    #[test]
    fn deflate_inflate_round_trip() {
        let data = b"some payload worth compressing, repeated, repeated, repeated";
        let z = deflate(data, 6).unwrap();
        let back = inflate_exact(&z, data.len() as u64).unwrap();
        assert_eq!(back, data);
        assert!(inflate_exact(&z, data.len() as u64 - 1).is_err());
    }
}
