//! # evolution-types
//!
//! Input-side data model and configuration for the thematic evolution engine.
//!
//! ## Modules
//!
//! - `document`: tagged records, year coercion and language tags
//! - `observation`: long-format (keyword, year, count) rows
//! - `config`: layered settings (defaults, config file, environment)
//! - `error`: shared error type

pub mod config;
pub mod document;
pub mod error;
pub mod observation;

pub use config::{
    CommunityAlgorithm, CommunitySettings, CooccurrenceSettings, ForecastSettings,
    LanguageSettings, Settings, TrendSettings, WindowSettings,
};
pub use document::{
    coerce_records, coerce_year, CoercedRecords, Language, RawRecord, RawYear, TaggedDocument,
};
pub use error::EvolutionError;
pub use observation::KeywordObservation;
