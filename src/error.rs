//! Crate-wide error type.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by the simulation core, the policies and their persistence.
///
/// Physical limits are never errors: a clipped battery or grid flow is
/// recorded as the actual value. Only malformed inputs and lifecycle misuse
/// surface here.
#[derive(Debug, Error)]
pub enum MicrogridError {
    /// One or more configuration fields failed validation.
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Configuration(Vec<ConfigError>),

    /// The action could not be interpreted (non-finite value, wrong shape).
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// `step` was called after the episode reached its horizon.
    #[error("episode terminated after {steps} steps; call reset() first")]
    EpisodeTerminated { steps: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<ConfigError> for MicrogridError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(vec![err])
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, MicrogridError>;
