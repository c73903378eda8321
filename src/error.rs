//! The [`ViewError`] `enum` definition and error messages.
//!
use genomap::GenomeMapError;
use thiserror::Error;

/// The [`ViewError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum ViewError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // Backend related errors
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("Server could not provide window data: {0}")]
    WindowData(String),
    #[error("Window load {generation} was superseded by load {current}")]
    Superseded { generation: u64, current: u64 },

    // Dataset metadata errors
    #[error("Dataset metadata has not been loaded")]
    MetadataNotLoaded,
    #[error("Dataset metadata does not list any chromosomes")]
    NoChromosomes,
    #[error("Chromosome '{0}' is not in the dataset metadata")]
    UnknownChromosome(String),
    #[error("Error encountered in genomap::GenomeMap")]
    GenomeMapError(#[from] GenomeMapError),

    // Navigation errors
    #[error("Step {step} is outside the current page of {len} variants")]
    StepOutOfRange { step: usize, len: usize },
    #[error("Invalid variant width: must be greater than zero")]
    InvalidSnpWidth,

    // Configuration and command line tool related errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}

impl ViewError {
    /// Whether this error came from the transport layer (failed request,
    /// non-2xx status or an undecodable body).
    pub fn is_network(&self) -> bool {
        matches!(self, ViewError::Network { .. })
    }

    /// Whether this error only signals that a newer load replaced this one.
    pub fn is_superseded(&self) -> bool {
        matches!(self, ViewError::Superseded { .. })
    }
}
