//! Structured binary I/O for segment files.
//!
//! Values are little-endian, lengths and ids are LEB128 varints, and every
//! file ends with a CRC32 of all preceding bytes.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{PlacedexError, Result};
use crate::util::varint::{decode_u64, encode_u64};

/// Writes primitives while maintaining a running checksum.
pub struct StructWriter<W: Write> {
    writer: W,
    hasher: Hasher,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.write_raw(&encode_u64(value))
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Length-prefixed byte slice.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_raw(value)
    }

    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.hasher.update(value);
        self.position += value.len() as u64;
        Ok(())
    }

    /// Ascending values stored as a count followed by gaps.
    pub fn write_delta_u64s(&mut self, values: &[u64]) -> Result<()> {
        self.write_varint(values.len() as u64)?;
        let mut previous = 0u64;
        for &value in values {
            self.write_varint(value.wrapping_sub(previous))?;
            previous = value;
        }
        Ok(())
    }

    pub fn write_delta_u32s(&mut self, values: &[u32]) -> Result<()> {
        self.write_varint(values.len() as u64)?;
        let mut previous = 0u32;
        for &value in values {
            self.write_varint(value.wrapping_sub(previous) as u64)?;
            previous = value;
        }
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append the checksum trailer and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        let checksum = self.hasher.clone().finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        Ok(self.writer)
    }
}

/// Reads primitives written by [`StructWriter`].
pub struct StructReader<R: Read> {
    reader: R,
    hasher: Hasher,
    position: u64,
    size: u64,
}

impl<R: Read> StructReader<R> {
    /// `size` is the full file size including the 4-byte trailer.
    pub fn new(reader: R, size: u64) -> Result<Self> {
        if size < 4 {
            return Err(PlacedexError::storage("File too short for checksum"));
        }
        Ok(StructReader {
            reader,
            hasher: Hasher::new(),
            position: 0,
            size,
        })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_into(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let mut bytes = Vec::with_capacity(4);
        loop {
            let byte = self.read_u8()?;
            bytes.push(byte);
            if byte & 0x80 == 0 {
                break;
            }
        }
        let (value, _) = decode_u64(&bytes)?;
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| PlacedexError::storage(format!("Invalid UTF-8: {e}")))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let length = self.read_len()?;
        let mut bytes = vec![0u8; length];
        self.read_into(&mut bytes)?;
        Ok(bytes)
    }

    /// Exactly `length` unprefixed bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        if length as u64 > self.remaining() {
            return Err(PlacedexError::storage("Unexpected end of file"));
        }
        let mut bytes = vec![0u8; length];
        self.read_into(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_delta_u64s(&mut self) -> Result<Vec<u64>> {
        let length = self.read_len()?;
        let mut values = Vec::with_capacity(length);
        let mut previous = 0u64;
        for _ in 0..length {
            previous = previous.wrapping_add(self.read_varint()?);
            values.push(previous);
        }
        Ok(values)
    }

    pub fn read_delta_u32s(&mut self) -> Result<Vec<u32>> {
        let length = self.read_len()?;
        let mut values = Vec::with_capacity(length);
        let mut previous = 0u32;
        for _ in 0..length {
            previous = previous.wrapping_add(self.read_varint()? as u32);
            values.push(previous);
        }
        Ok(values)
    }

    /// A varint length that cannot exceed the bytes left in the file.
    pub fn read_len(&mut self) -> Result<usize> {
        let length = self.read_varint()?;
        if length > self.remaining() {
            return Err(PlacedexError::storage(format!(
                "Length {length} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(length as usize)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Payload bytes left before the trailer.
    pub fn remaining(&self) -> u64 {
        (self.size - 4).saturating_sub(self.position)
    }

    /// Check that the whole payload was consumed and matches the trailer.
    pub fn verify_checksum(mut self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(PlacedexError::storage(format!(
                "{} trailing bytes before checksum",
                self.remaining()
            )));
        }
        let stored = self.reader.read_u32::<LittleEndian>()?;
        let computed = self.hasher.finalize();
        if stored != computed {
            return Err(PlacedexError::storage(format!(
                "Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
            )));
        }
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() as u64 > self.remaining() {
            return Err(PlacedexError::storage("Unexpected end of file"));
        }
        self.reader.read_exact(buf)?;
        self.hasher.update(buf);
        self.position += buf.len() as u64;
        Ok(())
    }
}
