//! Spreadsheet to canonical export.
//!
//! Each known column's values are encoded for its canonical field; contributor
//! and place values are resolved remotely. Any value that cannot be encoded
//! aborts the whole conversion, so callers get either a complete export or a
//! single error naming the column and value.
//!
//! # Example
//!
//! ```rust,ignore
//! use fabricator::{Settings, Transformer};
//!
//! let settings = Settings::from_env()?;
//! let mut transformer = Transformer::new(&settings, settings.http_client()?);
//! let output = transformer.transform_bytes(&std::fs::read("batch.csv")?).await?;
//! for file in output.files()? {
//!     std::fs::write(&file.name, file.content)?;
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;

use super::encode;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::Settings;
use crate::error::{TransformError, TransformResult};
use crate::gazetteer::Gazetteer;
use crate::models::{Contributor, ContributorName, LinkedAgent, Vocabulary};
use crate::parser::{parse_bytes_auto, parse_csv_file, split_values, Sheet};
use crate::registry::{self, ColumnSpec, Encoding};
use crate::resolver::{TermResolver, WORKS_FOR};
use crate::staging::StagingPaths;

/// Separator between values of one canonical field.
pub const OUTPUT_SEPARATOR: &str = "|";

/// Export file name for sheets that create new nodes.
pub const CREATE_FILE_NAME: &str = "target.csv";

/// Export file name for sheets that update existing nodes.
pub const UPDATE_FILE_NAME: &str = "target.update.csv";

pub const LINKED_AGENTS_FILE_NAME: &str = "linked_agents.csv";

/// Canonical field marking an update sheet.
const NODE_ID_FIELD: &str = "node_id";

/// One canonical row: field name to the encoded values of each source column.
pub type CanonicalRow = BTreeMap<String, Vec<String>>;

/// A generated export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// Result of a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Canonical fields actually produced, in output order.
    pub headers: BTreeSet<String>,
    pub rows: Vec<CanonicalRow>,
    /// Companion rows for contributors with extra attributes.
    pub linked_agents: Vec<LinkedAgent>,
}

impl TransformOutput {
    /// `target.update.csv` when the sheet carries node ids, else `target.csv`.
    pub fn target_file_name(&self) -> &'static str {
        if self.headers.contains(NODE_ID_FIELD) {
            UPDATE_FILE_NAME
        } else {
            CREATE_FILE_NAME
        }
    }

    /// Canonical export as CSV.
    pub fn to_csv(&self) -> TransformResult<String> {
        let mut buffer = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                let record: Vec<String> = self
                    .headers
                    .iter()
                    .map(|header| {
                        row.get(header)
                            .map(|v| v.join(OUTPUT_SEPARATOR))
                            .unwrap_or_default()
                    })
                    .collect();
                writer.write_record(&record)?;
            }
            writer.flush().map_err(csv::Error::from)?;
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Linked agents as CSV, or `None` when there are none.
    pub fn linked_agents_csv(&self) -> TransformResult<Option<String>> {
        if self.linked_agents.is_empty() {
            return Ok(None);
        }

        let mut buffer = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            writer.write_record(LinkedAgent::COLUMNS)?;
            for agent in &self.linked_agents {
                writer.write_record(agent.to_record())?;
            }
            writer.flush().map_err(csv::Error::from)?;
        }
        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }

    /// Every generated file, export first.
    pub fn files(&self) -> TransformResult<Vec<GeneratedFile>> {
        let mut files = vec![GeneratedFile {
            name: self.target_file_name().to_string(),
            content: self.to_csv()?,
        }];
        if let Some(content) = self.linked_agents_csv()? {
            files.push(GeneratedFile {
                name: LINKED_AGENTS_FILE_NAME.to_string(),
                content,
            });
        }
        Ok(files)
    }
}

// =============================================================================
// Transformer
// =============================================================================

/// Converts one batch into the canonical export.
///
/// Term and place lookups are cached for the life of the transformer, so use
/// a fresh one per batch.
#[derive(Debug)]
pub struct Transformer {
    resolver: TermResolver,
    gazetteer: Gazetteer,
    staging: StagingPaths,
    /// Serialized location per gazetteer URI.
    places: HashMap<String, String>,
}

impl Transformer {
    pub fn new(settings: &Settings, client: reqwest::Client) -> Self {
        Self {
            resolver: TermResolver::new(settings, client.clone()),
            gazetteer: Gazetteer::new(client),
            staging: StagingPaths::from_settings(settings),
            places: HashMap::new(),
        }
    }

    /// Convert CSV bytes, detecting their encoding.
    pub async fn transform_bytes(&mut self, bytes: &[u8]) -> TransformResult<TransformOutput> {
        let sheet = parse_bytes_auto(bytes)?;
        self.transform(&sheet).await
    }

    pub async fn transform_file(&mut self, path: &Path) -> TransformResult<TransformOutput> {
        let sheet = parse_csv_file(path)?;
        self.transform(&sheet).await
    }

    /// Convert a parsed sheet.
    pub async fn transform(&mut self, sheet: &Sheet) -> TransformResult<TransformOutput> {
        let columns: Vec<(usize, &'static ColumnSpec)> = sheet
            .header
            .iter()
            .enumerate()
            .filter_map(|(index, header)| match registry::lookup(header) {
                Some(spec) => Some((index, spec)),
                None => {
                    log_warning(format!("Ignoring unknown column {header:?}"));
                    None
                }
            })
            .collect();

        log_info(format!("Transforming {} rows", sheet.rows.len()));
        let mut output = TransformOutput::default();
        for cells in &sheet.rows {
            let mut row = CanonicalRow::new();
            for &(index, spec) in &columns {
                let mut values = Vec::new();
                for value in split_values(sheet.cell(cells, index)) {
                    values.push(self.encode(spec, value, &mut output.linked_agents).await?);
                }
                if values.is_empty() {
                    continue;
                }

                output.headers.insert(spec.target.to_string());
                row.entry(spec.target.to_string())
                    .or_default()
                    .push(values.join(OUTPUT_SEPARATOR));
            }
            output.rows.push(row);
        }

        log_success(format!(
            "Transformed {} rows into {} fields",
            output.rows.len(),
            output.headers.len()
        ));
        Ok(output)
    }

    async fn encode(
        &mut self,
        spec: &ColumnSpec,
        value: &str,
        linked_agents: &mut Vec<LinkedAgent>,
    ) -> TransformResult<String> {
        let column = spec.header;
        match spec.encoding {
            Encoding::Text => Ok(value.to_string()),
            Encoding::Contributor => self.encode_contributor(column, value, linked_agents).await,
            Encoding::YesNo => encode::yes_no(column, value),
            Encoding::SmallInt => encode::small_int(column, value),
            Encoding::Integer => encode::integer(column, value),
            Encoding::Geography => self.encode_place(column, value).await,
            Encoding::Rights => encode::rights(column, value),
            Encoding::Attribute(attr) => encode::attributed(value, attr),
            Encoding::PartDetail(kind) => encode::part_detail(value, kind),
            Encoding::VocabularyPrefixed(vocabulary) => {
                Ok(encode::vocabulary_prefixed(value, vocabulary))
            }
            Encoding::RelatedTitle => encode::related_title(value),
            Encoding::RelatedIdentifier(kind) => encode::related_identifier(value, kind),
            Encoding::FilePath => Ok(self.staging.normalize(value)),
        }
    }

    async fn encode_contributor(
        &mut self,
        column: &str,
        value: &str,
        linked_agents: &mut Vec<LinkedAgent>,
    ) -> TransformResult<String> {
        let contributor = Contributor::from_cell(value)
            .map_err(|e| TransformError::cell(column, value, e.to_string()))?;
        let name = ContributorName::parse(&contributor.name).ok_or_else(|| {
            TransformError::cell(column, value, "Contributor name not in proper format")
        })?;
        let is_person = Vocabulary::from_id(&name.vocabulary) == Some(Vocabulary::Person);
        if contributor.has_person_attributes() && !is_person {
            return Err(TransformError::cell(
                column,
                value,
                "Additional fields can only be applied to people",
            ));
        }

        let resolved = self
            .resolver
            .resolve(&contributor)
            .await
            .map_err(|e| TransformError::resolver(column, value, e))?;

        if let Some(agent) = linked_agent(&contributor, name)? {
            if !linked_agents.contains(&agent) {
                log_info_indent(format!("Linked agent {}", agent.term_name), 1);
                linked_agents.push(agent);
            }
        }
        Ok(resolved)
    }

    async fn encode_place(&mut self, column: &str, uri: &str) -> TransformResult<String> {
        if let Some(location) = self.places.get(uri) {
            return Ok(location.clone());
        }

        let location = self
            .gazetteer
            .resolve(uri)
            .await
            .map_err(|e| TransformError::resolver(column, uri, e))?;
        let encoded = serde_json::to_string(&location)?;
        self.places.insert(uri.to_string(), encoded.clone());
        Ok(encoded)
    }
}

/// Companion row for a person carrying attributes beyond the name.
fn linked_agent(
    contributor: &Contributor,
    name: ContributorName,
) -> TransformResult<Option<LinkedAgent>> {
    if !contributor.has_person_attributes() {
        return Ok(None);
    }

    let owned = |v: &Option<String>| v.clone().unwrap_or_default();
    let field_identifier = match contributor.orcid.as_deref() {
        Some(orcid) => encode::attributed(orcid, "orcid")?,
        None => String::new(),
    };
    Ok(Some(LinkedAgent {
        term_name: name.display_name,
        field_contributor_status: owned(&contributor.status),
        field_relationships: contributor
            .institution
            .as_ref()
            .map(|institution| format!("{WORKS_FOR}:corporate_body:{institution}"))
            .unwrap_or_default(),
        field_email: owned(&contributor.email),
        field_identifier,
    }))
}
