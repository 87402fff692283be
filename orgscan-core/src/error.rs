// orgscan-core/src/error.rs

use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::platform::PlatformError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrgScanError {
    // --- DOMAIN (quota, sealed records, rules) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (IO, codec, config) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- PLATFORM CALLS ---
    #[error("Platform call failed while {when} ({what}): {source}")]
    Platform {
        when: String,
        what: String,
        #[source]
        source: PlatformError,
    },

    // --- ORCHESTRATION ---
    // Shared because every waiter of the same in-flight fetch receives it.
    #[error("Dataset '{alias}' failed: {source}")]
    Dataset {
        alias: String,
        #[source]
        source: Arc<OrgScanError>,
    },

    #[error("No dataset registered under alias '{0}'")]
    UnknownDataset(String),

    #[error("No recipe registered under alias '{0}'")]
    UnknownRecipe(String),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl OrgScanError {
    pub fn platform(when: impl Into<String>, what: impl Into<String>, source: PlatformError) -> Self {
        Self::Platform {
            when: when.into(),
            what: what.into(),
            source,
        }
    }

    /// True when the failure, possibly wrapped in dataset errors, is the quota gate.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Self::Domain(DomainError::QuotaExceeded { .. }) => true,
            Self::Dataset { source, .. } => source.is_quota_exceeded(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for OrgScanError {
    fn from(err: std::io::Error) -> Self {
        OrgScanError::Infrastructure(InfrastructureError::Io(err))
    }
}
