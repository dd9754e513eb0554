//! Storage abstraction used by the segment store.
//!
//! An index only ever talks to a [`Storage`]: a flat namespace of named,
//! write-once files plus an atomic rename used for the manifest swap.

use std::fmt::Debug;
use std::io::{Read, Seek, Write};

use crate::error::Result;

/// A flat file namespace holding one index.
pub trait Storage: Send + Sync + Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Atomically replace `new_name` with `old_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Make previous renames and deletes durable.
    fn sync(&self) -> Result<()>;

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut bytes = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Write a whole file and sync it.
    fn write_all(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut output = self.create_output(name)?;
        output.write_all(bytes)?;
        output.flush_and_sync()
    }
}

/// A readable file.
pub trait StorageInput: Read + Seek + Send + Debug {
    /// Total size of the file in bytes.
    fn size(&self) -> Result<u64>;
}

/// A writable file. Data is only guaranteed to be visible after
/// [`flush_and_sync`](StorageOutput::flush_and_sync).
pub trait StorageOutput: Write + Send + Debug {
    /// Flush buffers and sync to the backing medium.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Number of bytes written so far.
    fn position(&self) -> u64;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> u64 {
        self.as_ref().position()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }
}

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Buffer size for I/O operations.
    pub buffer_size: usize,

    /// Whether to flush on every write call.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
            sync_writes: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.buffer_size, 65536);
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_read_all_write_all() {
        let storage = MemoryStorage::new();
        storage.write_all("manifest.json", b"{}").unwrap();
        assert_eq!(storage.read_all("manifest.json").unwrap(), b"{}");
        assert!(storage.read_all("missing.json").is_err());
    }
}
