//! Length-prefixed block codec.
//!
//! A file is a plain sequence of `[u32 little-endian length][payload]` units
//! with no header, trailer or checksum. The codec never looks inside the
//! payloads; integrity lives one layer up in the envelopes.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

pub const LEN_PREFIX: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error")]
    Io(#[from] io::Error),

    #[error("truncated block: expected {expected} bytes, found {available}")]
    Truncated { expected: usize, available: usize },

    #[error("block of {0} bytes exceeds the 4-byte length prefix")]
    BlockTooLarge(usize),
}

pub struct BlockWriter<W: Write> {
    inner: W,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_block(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len = u32::try_from(bytes.len()).map_err(|_| CodecError::BlockTooLarge(bytes.len()))?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl BlockWriter<BufWriter<File>> {
    /// Open `path` for appending further blocks, creating it if needed.
    pub fn append(path: &Path) -> Result<Self, CodecError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Flush buffered blocks and sync them to disk; the file closes on drop.
    pub fn finish(mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        self.inner.get_ref().sync_all()?;
        Ok(())
    }
}

pub struct BlockReader<R: Read> {
    inner: R,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read exactly one block; running out of data is `Truncated`.
    pub fn read_block(&mut self) -> Result<Vec<u8>, CodecError> {
        self.next_block()?.ok_or(CodecError::Truncated {
            expected: LEN_PREFIX,
            available: 0,
        })
    }

    /// Read the next block, or `None` at a clean end of input.
    pub fn next_block(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        let mut prefix = [0u8; LEN_PREFIX];
        let got = read_up_to(&mut self.inner, &mut prefix)?;
        if got == 0 {
            return Ok(None);
        }
        if got < LEN_PREFIX {
            return Err(CodecError::Truncated {
                expected: LEN_PREFIX,
                available: got,
            });
        }

        let len = u32::from_le_bytes(prefix) as usize;
        // `take` bounds the read by what is actually there, so a corrupt
        // length cannot force a huge allocation up front.
        let mut payload = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut payload)?;
        if payload.len() < len {
            return Err(CodecError::Truncated {
                expected: len,
                available: payload.len(),
            });
        }
        Ok(Some(payload))
    }

    /// Read every remaining block.
    pub fn read_all(&mut self) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block()? {
            blocks.push(block);
        }
        Ok(blocks)
    }
}

impl BlockReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_blocks(blocks: &[&[u8]]) -> Result<Vec<u8>, CodecError> {
        let mut writer = BlockWriter::new(Vec::new());
        for block in blocks {
            writer.write_block(block)?;
        }
        Ok(writer.into_inner())
    }

    #[test]
    fn length_prefix_is_little_endian() {
        let bytes = encode_blocks(&[b"abc", b""]).unwrap();
        assert_eq!(bytes, [3, 0, 0, 0, b'a', b'b', b'c', 0, 0, 0, 0]);
    }

    #[test]
    fn reads_blocks_back_in_order() {
        let bytes = encode_blocks(&[b"website", &[0u8; 300], b""]).unwrap();
        let mut reader = BlockReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_block().unwrap(), b"website");
        assert_eq!(reader.read_block().unwrap(), vec![0u8; 300]);
        assert_eq!(reader.read_block().unwrap(), b"");
        assert!(reader.next_block().unwrap().is_none());
        assert!(matches!(
            reader.read_block().unwrap_err(),
            CodecError::Truncated { available: 0, .. }
        ));
    }

    #[test]
    fn short_prefix_is_truncated() {
        let mut reader = BlockReader::new(Cursor::new(vec![5u8, 0]));
        assert!(matches!(
            reader.read_all().unwrap_err(),
            CodecError::Truncated {
                expected: LEN_PREFIX,
                available: 2
            }
        ));
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut bytes = encode_blocks(&[b"complete", b"partial"]).unwrap();
        bytes.truncate(bytes.len() - 3);
        let mut reader = BlockReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_block().unwrap(), b"complete");
        assert!(matches!(
            reader.read_block().unwrap_err(),
            CodecError::Truncated {
                expected: 7,
                available: 4
            }
        ));
    }

    #[test]
    fn huge_declared_length_does_not_allocate() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"tiny");
        let mut reader = BlockReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_block().unwrap_err(),
            CodecError::Truncated { available: 4, .. }
        ));
    }

    #[test]
    fn append_adds_blocks_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks");

        let mut writer = BlockWriter::append(&path).unwrap();
        writer.write_block(b"first").unwrap();
        writer.finish().unwrap();

        let mut writer = BlockWriter::append(&path).unwrap();
        writer.write_block(b"second").unwrap();
        writer.write_block(b"third").unwrap();
        writer.finish().unwrap();

        let blocks = BlockReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(blocks, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn missing_file_is_io_not_found() {
        let dir = tempfile::tempdir().unwrap();
        match BlockReader::open(&dir.path().join("absent")) {
            Err(CodecError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("opened a missing file"),
        }
    }
}
