// orgscan-core/src/ports/mod.rs

// Contracts with the outside world. The core never knows whether the platform
// is a live instance or a scripted fake, nor where cache records end up.

pub mod platform;
pub mod storage;

pub use platform::{PlatformClient, PlatformError, PlatformResponse, QueryPage};
pub use storage::KeyValueStorage;
