//! Storage backends and the binary segment codec.
//!
//! [`FileStorage`] keeps an index in a directory; [`MemoryStorage`] keeps it
//! in a shared map for tests and throwaway indexes.

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

pub use file::{FileInput, FileOutput, FileStorage};
pub use memory::{MemoryInput, MemoryOutput, MemoryStorage};
pub use structured::{StructReader, StructWriter};
pub use traits::{Storage, StorageConfig, StorageInput, StorageOutput};
