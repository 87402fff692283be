// orgscan-core/src/application/mod.rs

pub mod api;
pub mod cache;
pub mod datasets;
pub mod factory;
pub mod orchestrator;
pub mod ports;
pub mod recipes;
pub mod watchdog;

// --- RE-EXPORTS (FACADE PATTERN) ---
// The CLI builds a pipeline from these without knowing the module layout.

pub use api::ApiAccess;
pub use cache::{CacheItemDetails, DataCache};
pub use datasets::builtin_datasets;
pub use factory::DataFactory;
pub use orchestrator::DatasetOrchestrator;
pub use recipes::{RecipeManager, builtin_recipes};
pub use watchdog::QuotaWatchdog;
