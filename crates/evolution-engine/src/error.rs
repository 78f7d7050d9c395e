//! Engine error types.

use thiserror::Error;

/// Errors that can occur while configuring the engine.
///
/// Insufficient data is not an error: empty graphs, empty windows and
/// skipped forecasts are ordinary return values.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Settings or input-layer error
    #[error(transparent)]
    Types(#[from] evolution_types::EvolutionError),
}
