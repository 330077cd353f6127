//! Errors raised by the device registry.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The identifier was not part of the loaded device list
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The device list could not be opened
    #[error("failed to open device list {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device list was opened but is not valid CSV
    #[error("failed to read device list: {0}")]
    Csv(#[from] csv::Error),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::DeviceNotFound(_))
    }

    /// Load failures are fatal at startup; not-found errors never are.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, RegistryError::Open { .. } | RegistryError::Csv(_))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
