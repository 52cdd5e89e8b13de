//! REST API response bodies.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::TransformResult;
use crate::transform::{GeneratedFile, TransformOutput};

/// Body returned by `POST /workbench/transform`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Identifies this conversion in the logs.
    pub request_id: String,
    /// Name of the main export file.
    pub target: String,
    pub row_count: usize,
    pub files: Vec<GeneratedFile>,
}

impl TransformResponse {
    pub fn from_output(request_id: Uuid, output: &TransformOutput) -> TransformResult<Self> {
        Ok(Self {
            request_id: request_id.to_string(),
            target: output.target_file_name().to_string(),
            row_count: output.rows.len(),
            files: output.files()?,
        })
    }
}

/// `{"error": message}`
pub fn error_response(message: &str) -> Value {
    json!({ "error": message })
}
