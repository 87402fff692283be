// orgscan-core/src/infrastructure/storage/mod.rs

pub mod file;
pub mod memory;
pub mod null;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use null::NullStorage;
