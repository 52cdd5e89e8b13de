//! Error types for the fabricator validation and transformation engines.
//!
//! - [`CsvError`] - reading and decoding the submitted spreadsheet
//! - [`ResolverError`] - taxonomy and gazetteer lookups
//! - [`TransformError`] - fatal conversion errors (one bad cell aborts the export)
//! - [`ConfigError`] - unusable environment configuration
//! - [`ServerError`] - HTTP surface
//!
//! Validation never produces an error value: cell problems are collected into
//! an [`crate::validation::ErrorReport`] instead.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading a spreadsheet export.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV document.
    #[error("Invalid CSV format: {0}")]
    ParseError(#[from] csv::Error),

    /// The document has no header row.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Resolver Errors
// =============================================================================

/// Errors from the taxonomy and gazetteer collaborators.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Transport failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-2xx status.
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body could not be understood.
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Contributor name is not `namespace:role:vocabulary:name`.
    #[error("poorly formatted contributor: {0}")]
    MalformedName(String),

    /// Contributor vocabulary is neither `person` nor `corporate_body`.
    #[error("unknown contributor vocabulary: {0}")]
    UnknownVocabulary(String),

    /// The place hierarchy did not terminate.
    #[error("place hierarchy for {0} is deeper than {1} levels")]
    HierarchyTooDeep(String, usize),

    /// Creating a term needs a credential that is not configured.
    #[error("unable to create term {name:?}: FABRICATOR_DRUPAL_PASSWORD is not set")]
    MissingCredentials { name: String },
}

impl ResolverError {
    /// True when the failure is a configuration problem the operator can fix.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ResolverError::MissingCredentials { .. })
    }
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors that abort a conversion.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A cell value cannot be encoded for its column.
    #[error("unknown {column}: {value} ({message})")]
    Cell {
        column: String,
        value: String,
        message: String,
    },

    /// A term or place behind a cell could not be resolved.
    #[error("unable to resolve {column}: {value}: {source}")]
    Resolver {
        column: String,
        value: String,
        #[source]
        source: ResolverError,
    },

    /// The input could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// The canonical CSV could not be written.
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    /// A structured value could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    pub fn cell(
        column: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TransformError::Cell {
            column: column.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn resolver(
        column: impl Into<String>,
        value: impl Into<String>,
        source: ResolverError,
    ) -> Self {
        TransformError::Resolver {
            column: column.into(),
            value: value.into(),
            source,
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading [`crate::config::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// The shared HTTP client could not be built.
    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Conversion failed.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
