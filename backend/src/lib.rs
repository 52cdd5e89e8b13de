//! # Fabricator - spreadsheet metadata validation and export
//!
//! Fabricator checks digital-library metadata spreadsheets cell by cell and
//! converts accepted sheets into the canonical CSV consumed by the batch
//! ingest tool.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Spreadsheet │────▶│   Parser    │────▶│  Validator  │────▶│ Error report│
//! │ (CSV/JSON)  │     │  (auto-enc) │     │ (per cell)  │     │ {"B3": ..}  │
//! └─────────────┘     └──────┬──────┘     └─────────────┘     └─────────────┘
//!                            │            ┌─────────────┐     ┌─────────────┐
//!                            └───────────▶│ Transformer │────▶│ target.csv  │
//!                                         │ (terms/TGN) │     │ + agents    │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fabricator::{parse_csv_file, Settings, Validator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let validator = Validator::new(&settings, settings.http_client()?);
//!     let report = validator.validate(&parse_csv_file("batch.csv".as_ref())?).await;
//!     println!("{} problem cells", report.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Environment settings
//! - [`models`] - Contributors, locations and linked agents
//! - [`parser`] - CSV parsing with encoding detection
//! - [`address`] - Spreadsheet cell addresses
//! - [`registry`] - The column table shared by both engines
//! - [`validation`] - Per-cell validation
//! - [`transform`] - Canonical export
//! - [`resolver`] - Contributor taxonomy terms
//! - [`gazetteer`] - Geographic hierarchies
//! - [`staging`] - Staging-mount paths
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod address;
pub mod parser;
pub mod registry;
pub mod staging;

// Remote collaborators
pub mod gazetteer;
pub mod resolver;

// Engines
pub mod transform;
pub mod validation;

// HTTP API
pub mod api;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports - Errors and configuration
// =============================================================================

pub use config::Settings;
pub use error::{
    ConfigError, CsvError, ResolverError, ServerError, TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Contributor, ContributorName, LinkedAgent, Location, Vocabulary};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, parse_bytes_auto, parse_csv, parse_csv_file, Sheet,
};

// =============================================================================
// Re-exports - Engines
// =============================================================================

pub use address::CellAddress;
pub use gazetteer::Gazetteer;
pub use resolver::TermResolver;
pub use transform::{GeneratedFile, TransformOutput, Transformer};
pub use validation::{ErrorReport, Validator};

// Server
pub mod server {
    pub use crate::api::server::{build_router, start_server, AppState};
}
