// orgscan-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(orgscan::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CODEC ---
    #[error("JSON Error: {0}")]
    #[diagnostic(code(orgscan::infra::json))]
    Json(#[from] serde_json::Error),

    #[error("Hex Decoding Error: {0}")]
    #[diagnostic(
        code(orgscan::infra::hex),
        help("A cache record is not valid hex. It will be evicted on next read.")
    )]
    Hex(#[from] hex::FromHexError),

    #[error("Compression Error: {0}")]
    #[diagnostic(code(orgscan::infra::compression))]
    Compression(String),

    // --- STORAGE ---
    #[error("Storage quota exceeded writing '{key}': {requested} bytes requested, capacity {capacity}")]
    #[diagnostic(
        code(orgscan::infra::storage_quota),
        help("Clear the cache with `orgscan cache clear` or raise the storage capacity.")
    )]
    StorageQuotaExceeded {
        key: String,
        requested: usize,
        capacity: usize,
    },

    // --- HTTP ---
    #[error("HTTP Client Error: {0}")]
    #[diagnostic(code(orgscan::infra::http))]
    Http(#[from] reqwest::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(orgscan::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(orgscan::infra::config))]
    ConfigError(String),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(code(orgscan::infra::config_missing))]
    ConfigNotFound(String),
}
