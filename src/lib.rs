//! # smap-validator
//!
//! This crate checks that a source map really describes the minified script it
//! belongs to: every named token must point at its name in the original source.
//!
//! ## Getting Started
//!
//! ```ignore
//! use smap_validator::{Validator, ValidatorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let validator = Validator::from_config(&ValidatorConfig::default())?;
//! let url = "https://example.com/static/app.min.js".parse()?;
//! let validation = validator.validate(&url, &CancellationToken::new()).await;
//!
//! if let Some(report) = validation.report() {
//!     println!("{} errors, {} warnings", report.errors.len(), report.warnings.len());
//! }
//! ```
//!
//! ## Overview
//!
//! ### `Validator`
//!
//! [Validator] runs one validation: it resolves the source map through
//! [SourceMapResolver], loads the original sources into a [SourceTable] and
//! verifies every token with [generate_report].
//!
//! ### `TokenVerifier`
//!
//! [TokenVerifier] checks a single [MappingToken]. Names found at the referenced
//! column, or one column to its right, pass. Names found elsewhere on the line
//! become warnings, names missing from the line become errors.
//!
//! ### `Fetch` and `Decode`
//!
//! Network access and source map decoding sit behind the [Fetch] and [Decode]
//! traits. [HttpFetcher] and [SourcemapDecoder] are the default implementations.
//!
//! ### `ValidationError`
//!
//! [ValidationError] ends a run. Every variant carries remediation hints, see
//! [ValidationError::resolutions].
//!

mod banner;
mod config;
mod context;
mod decoder;
mod error;
mod fetch;
mod report;
mod resolver;
mod source_table;
mod token;
mod verify;

pub use banner::*;
pub use config::*;
pub use context::{extract_context, narrow_line, ContextWindow, CONTEXT_LINES};
pub use decoder::*;
pub use error::*;
pub use fetch::*;
pub use report::*;
pub use resolver::*;
pub use source_table::*;
pub use token::*;
pub use verify::*;
