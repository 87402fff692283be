// orgscan-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod storage;

pub use adapters::RestPlatformClient;
pub use storage::{FileStorage, MemoryStorage, NullStorage};
