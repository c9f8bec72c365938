//! Streaming blob compression: a ZSTD frame per array, written incrementally
//! and read back lazily, matching spec.md §4.3's "ZSTD-style streaming"
//! description literally — real ZSTD rather than a reinvented frame format.
//!
//! A ZSTD frame is self-delimiting (it ends with a content checksum and a
//! frame epilogue), so a blob cut short mid-frame is detectable on read: the
//! decoder hits an unexpected end of input instead of silently returning a
//! prefix of the data.

use crate::error::{Error, ErrorKind, Result};
use std::io::{self, Read, Write};

/// Collaborator contract for a byte sink: anything the storage layer can
/// stream a blob's contents into. `BlobWriter` is the production
/// implementation; tests may substitute a plain in-memory sink.
pub trait ByteWriter {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;
}

/// Collaborator contract for a byte source: anything the storage layer can
/// read a blob's contents back out of. `BlobReader` is the production
/// implementation.
pub trait ByteReader {
    fn read_bytes(&mut self) -> Result<std::vec::Vec<u8>>;
}

impl ByteWriter for BlobWriter {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf)
            .map_err(|e| Error::new(ErrorKind::External(e.to_string())))
    }
}

impl ByteReader for BlobReader {
    fn read_bytes(&mut self) -> Result<std::vec::Vec<u8>> {
        let mut out = std::vec::Vec::new();
        self.read_to_end(&mut out).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::new(ErrorKind::TruncatedStream)
            } else {
                Error::new(ErrorKind::External(e.to_string()))
            }
        })?;
        Ok(out)
    }
}

/// Minimal in-memory [`ByteWriter`]/[`ByteReader`] pair, uncompressed —
/// suitable for tests and standalone use where ZSTD framing isn't needed.
#[derive(Debug, Default, Clone)]
pub struct MemoryByteSink {
    buf: std::vec::Vec<u8>,
}

impl ByteWriter for MemoryByteSink {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }
}

impl ByteReader for MemoryByteSink {
    fn read_bytes(&mut self) -> Result<std::vec::Vec<u8>> {
        Ok(self.buf.clone())
    }
}

/// Incrementally compresses bytes written to it, producing one ZSTD frame
/// when [`BlobWriter::finish`] is called. `flush` is a destructor-safe
/// operation: an error is demoted to a warning (spec.md §7/§9) rather than
/// propagated, since streams generally aren't flushed from a `Drop` impl in
/// this codebase (callers must call `finish` explicitly to get the blob).
pub struct BlobWriter {
    encoder: zstd::stream::write::Encoder<'static, std::vec::Vec<u8>>,
    bytes_written: usize,
}

impl BlobWriter {
    /// Start a new blob writer at the given compression level.
    pub fn new(level: i32) -> Result<Self> {
        let encoder = zstd::stream::write::Encoder::new(std::vec::Vec::new(), level)
            .map_err(|e| Error::new(ErrorKind::External(e.to_string())))?;
        Ok(Self {
            encoder,
            bytes_written: 0,
        })
    }

    /// Uncompressed bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Finalize the frame and return the compressed blob.
    pub fn finish(self) -> Result<std::vec::Vec<u8>> {
        self.encoder
            .finish()
            .map_err(|e| Error::new(ErrorKind::External(e.to_string())))
    }
}

impl Write for BlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.encoder.write(buf)?;
        self.bytes_written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Err(e) = self.encoder.flush() {
            log::warn!("blob writer flush failed: {e}");
        }
        Ok(())
    }
}

/// Decompresses a ZSTD-compressed blob on demand.
pub struct BlobReader {
    decoder: zstd::stream::read::Decoder<'static, io::BufReader<io::Cursor<std::vec::Vec<u8>>>>,
}

impl BlobReader {
    /// Open a reader over a compressed blob.
    pub fn new(blob: std::vec::Vec<u8>) -> Result<Self> {
        let decoder = zstd::stream::read::Decoder::new(io::Cursor::new(blob))
            .map_err(|e| Error::new(ErrorKind::External(e.to_string())))?;
        Ok(Self { decoder })
    }

    /// Decompress the whole blob eagerly, mapping a truncated frame to
    /// [`ErrorKind::TruncatedStream`].
    pub fn read_all(mut self) -> Result<std::vec::Vec<u8>> {
        let mut out = std::vec::Vec::new();
        self.decoder.read_to_end(&mut out).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::new(ErrorKind::TruncatedStream)
            } else {
                Error::new(ErrorKind::External(e.to_string()))
            }
        })?;
        Ok(out)
    }
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut writer = BlobWriter::new(3).unwrap();
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(100);
        writer.write_all(&payload).unwrap();
        assert_eq!(writer.bytes_written(), payload.len());
        let blob = writer.finish().unwrap();
        assert!(blob.len() < payload.len());

        let out = BlobReader::new(blob).unwrap().read_all().unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn truncated_blob_fails() {
        let mut writer = BlobWriter::new(3).unwrap();
        writer.write_all(&[1u8; 4096]).unwrap();
        let mut blob = writer.finish().unwrap();
        blob.truncate(blob.len() / 2);
        let err = BlobReader::new(blob).unwrap().read_all().unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::TruncatedStream | ErrorKind::External(_)
        ));
    }

    #[test]
    fn memory_byte_sink_round_trips_through_the_trait_pair() {
        let mut sink = MemoryByteSink::default();
        sink.write_bytes(b"hello").unwrap();
        sink.write_bytes(b" world").unwrap();
        assert_eq!(sink.read_bytes().unwrap(), b"hello world");
    }

    #[test]
    fn blob_writer_reader_round_trip_through_the_trait_pair() {
        let mut writer = BlobWriter::new(3).unwrap();
        writer.write_bytes(b"byte reader/writer contract").unwrap();
        let blob = writer.finish().unwrap();
        let out = BlobReader::new(blob).unwrap().read_bytes().unwrap();
        assert_eq!(out, b"byte reader/writer contract");
    }
}
