// orgscan-core/src/lib.rs

// 1. Documentation
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// What the core needs from outside: the platform and a key/value store.
pub mod ports;

// 2. Domain
// Records, quota arithmetic, dependency fragments, score rules.
// No I/O, depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure (Adapters)
// REST client, storages, codec, config files.
pub mod infrastructure;

// 4. Application (Use Cases)
// Watchdog, access layer, cache, orchestrator, datasets, recipes.
pub mod application;

// --- ERRORS ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::OrgScanError;
