// orgscan-core/src/infrastructure/adapters/mod.rs

pub mod metadata_soap;
pub mod rest;

pub use rest::RestPlatformClient;
