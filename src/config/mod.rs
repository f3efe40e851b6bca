//! Configuration module for Sponsor-Scout
//!
//! A run is configured from built-in defaults, an optional TOML campaign
//! file and environment variables (a `.env` file is honored by the binary).
//! The resulting [`Config`] is immutable once the run starts and is passed
//! explicitly to every component.
//!
//! # Example
//!
//! ```no_run
//! use sponsor_scout::config::{load_config, validate};
//!
//! let config = load_config(None).unwrap();
//! validate(&config).unwrap();
//! println!("Candidate cap: {}", config.pipeline.max_candidates);
//! ```

mod env;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    plain_model_name, ClassifierSettings, Config, FilterSettings, LoggingSettings,
    OutputSettings, PipelineSettings, ProviderKind, ProviderSettings, RetrySettings,
    SearchSettings, SegmentEntry, ServerSettings,
};

// Re-export loading functions
pub use env::{apply_env, process_env};
pub use parser::{load_config, load_config_with_env, parse_config};
pub use validation::{validate, validate_server};
