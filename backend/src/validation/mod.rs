//! Spreadsheet validation.
//!
//! Every cell of every data row is checked against the column registry and
//! problems are collected into an [`ErrorReport`] keyed by spreadsheet
//! address. Validation never stops early: remote lookups that fail become
//! cell messages like any other problem.
//!
//! # Evaluation order
//!
//! Rows and columns are visited in sheet order because later cells depend on
//! earlier ones (upload ids seen so far, memoized lookups). Within a cell,
//! values are checked left to right and each value runs its column's rules
//! until the first failure.
//!
//! # Tie-break
//!
//! A cell holds at most one message. When several values of one cell fail,
//! the message from the last failing value is kept.
//!
//! # Example
//!
//! ```rust,ignore
//! use fabricator::{Sheet, Settings, Validator};
//!
//! let settings = Settings::from_env()?;
//! let validator = Validator::new(&settings, settings.http_client()?);
//! let sheet = Sheet::from_rows(vec![
//!     vec!["Title".into(), "Object Model".into(), "Full Title".into()],
//!     vec!["".into(), "Image".into(), "A photograph".into()],
//! ]);
//! let report = validator.validate(&sheet).await;
//! assert_eq!(report.get("A2"), Some("Missing value"));
//! ```

pub mod edtf;
pub mod relators;

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::address::CellAddress;
use crate::api::logs::{log_info, log_warning};
use crate::config::Settings;
use crate::gazetteer::Gazetteer;
use crate::models::{Contributor, ContributorName, Vocabulary};
use crate::parser::{split_values, Sheet};
use crate::registry::{self, ColumnSpec, EmptyRule, Rule};
use crate::staging::StagingPaths;

/// Message for a sheet with a header and no data rows.
pub const NO_ROWS: &str = "No rows in CSV to process";

static DOI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,9}/[-._;()/:A-Za-z0-9]+$").expect("Invalid DOI regex"));

static SIMPLE_DATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("Invalid date regex"));

// =============================================================================
// Error report
// =============================================================================

/// Validation problems keyed by cell address (`"D2"`).
///
/// Serializes as a flat JSON object; `{}` means the sheet is clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorReport(BTreeMap<String, String>);

impl ErrorReport {
    /// Record a problem, replacing any earlier message for the same cell.
    pub fn record(&mut self, address: CellAddress, message: impl Into<String>) {
        self.0.insert(address.to_string(), message.into());
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.0.get(address).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Checks spreadsheets against the column registry.
///
/// Holds no per-batch state; each [`Validator::validate`] call starts fresh.
#[derive(Debug, Clone)]
pub struct Validator {
    site_url: String,
    client: reqwest::Client,
    gazetteer: Gazetteer,
    staging: StagingPaths,
}

/// State accumulated while walking one batch.
#[derive(Debug, Default)]
struct Batch {
    upload_ids: HashSet<String>,
    /// Existence result per node URL.
    nodes: HashMap<String, bool>,
    /// Resolution result per gazetteer URI.
    places: HashMap<String, bool>,
}

/// The row being checked.
struct Row<'a> {
    sheet: &'a Sheet,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    fn value(&self, header: &str) -> &'a str {
        self.sheet.column_value(header, self.cells).trim()
    }

    fn model(&self) -> &'a str {
        self.value(registry::OBJECT_MODEL)
    }

    fn is_update(&self) -> bool {
        !self.value(registry::NODE_ID).is_empty()
    }
}

impl Validator {
    pub fn new(settings: &Settings, client: reqwest::Client) -> Self {
        Self {
            site_url: settings.site_url.trim_end_matches('/').to_string(),
            gazetteer: Gazetteer::new(client.clone()),
            client,
            staging: StagingPaths::from_settings(settings),
        }
    }

    /// Validate a whole sheet.
    pub async fn validate(&self, sheet: &Sheet) -> ErrorReport {
        let mut report = ErrorReport::default();
        if sheet.rows.is_empty() {
            report.record(CellAddress::Header, NO_ROWS);
            return report;
        }

        let mut batch = Batch::default();
        for (row_index, cells) in sheet.rows.iter().enumerate() {
            let row = Row { sheet, cells };
            for (column, header) in sheet.header.iter().enumerate() {
                let Some(spec) = registry::lookup(header) else {
                    continue;
                };
                let address = CellAddress::cell(column, row_index);
                let cell = sheet.cell(cells, column);

                if cell.trim().is_empty() {
                    let problem = spec.when_empty.and_then(|rule| empty_cell_problem(rule, &row));
                    if let Some(message) = problem {
                        report.record(address, message);
                    }
                    continue;
                }

                for value in split_values(cell) {
                    if let Some(message) = self.check_value(spec, value, &row, &mut batch).await {
                        report.record(address, message);
                    }
                }
            }
        }

        log_info(format!(
            "Validated {} rows: {} problem cells",
            sheet.rows.len(),
            report.len()
        ));
        report
    }

    /// Validate a pre-parsed array-of-arrays payload whose first row is the header.
    pub async fn validate_rows(&self, rows: Vec<Vec<String>>) -> ErrorReport {
        self.validate(&Sheet::from_rows(rows)).await
    }

    async fn check_value(
        &self,
        spec: &ColumnSpec,
        value: &str,
        row: &Row<'_>,
        batch: &mut Batch,
    ) -> Option<String> {
        for rule in spec.rules {
            if let Err(message) = self.check_rule(*rule, spec, value, row, batch).await {
                return Some(message);
            }
        }
        None
    }

    async fn check_rule(
        &self,
        rule: Rule,
        spec: &ColumnSpec,
        value: &str,
        row: &Row<'_>,
        batch: &mut Batch,
    ) -> Result<(), String> {
        match rule {
            Rule::Integer => parse_id(value).map(|_| ()),
            Rule::CollectionExists => {
                let id = parse_id(value)?;
                if self.node_exists(id, batch).await {
                    Ok(())
                } else {
                    Err(format!("Could not identify parent collection {id}"))
                }
            }
            Rule::NodeExists => {
                let id = parse_id(value)?;
                if self.node_exists(id, batch).await {
                    Ok(())
                } else {
                    Err(format!("Could not find node ID {id}"))
                }
            }
            Rule::Url => match reqwest::Url::parse(value) {
                Ok(url) if !url.scheme().is_empty() && url.has_host() => Ok(()),
                _ => Err("Invalid URL".to_string()),
            },
            Rule::UniqueUploadId => {
                if batch.upload_ids.insert(value.to_string()) {
                    Ok(())
                } else {
                    Err("Duplicate upload ID".to_string())
                }
            }
            Rule::Date => {
                if SIMPLE_DATE_REGEX.is_match(value) || edtf::is_valid(value) {
                    Ok(())
                } else {
                    Err("Invalid EDTF value".to_string())
                }
            }
            Rule::Doi => {
                if DOI_REGEX.is_match(value) {
                    Ok(())
                } else {
                    Err("Invalid DOI".to_string())
                }
            }
            Rule::ParentReference => {
                if !batch.upload_ids.contains(value) {
                    Err("Unknown parent ID".to_string())
                } else if value == row.value(registry::UPLOAD_ID) {
                    Err("Upload ID and parent ID can not be equal".to_string())
                } else {
                    Ok(())
                }
            }
            Rule::Contributor => contributor_problem(value).map_or(Ok(()), Err),
            Rule::FileExists => {
                if self.staging.exists(value) {
                    Ok(())
                } else {
                    Err("File does not exist in islandora_staging".to_string())
                }
            }
            Rule::YesNo => match value {
                "Yes" | "No" => Ok(()),
                _ => Err("Invalid value. Must be Yes or No".to_string()),
            },
            Rule::Geography => {
                if self.place_resolves(value, batch).await {
                    Ok(())
                } else {
                    Err("Unable to get TGN".to_string())
                }
            }
            Rule::MaxLength(max) => {
                if value.chars().count() > max {
                    Err(format!("{} is longer than {max} characters", spec.header))
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn node_exists(&self, id: u64, batch: &mut Batch) -> bool {
        let url = format!("{}/node/{id}?_format=json", self.site_url);
        if let Some(exists) = batch.nodes.get(&url) {
            return *exists;
        }

        let exists = match self.client.head(&url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                log_warning(format!("Existence check failed for {url}: {e}"));
                false
            }
        };
        batch.nodes.insert(url, exists);
        exists
    }

    async fn place_resolves(&self, uri: &str, batch: &mut Batch) -> bool {
        if let Some(resolves) = batch.places.get(uri) {
            return *resolves;
        }

        let resolves = match self.gazetteer.resolve(uri).await {
            Ok(_) => true,
            Err(e) => {
                log_warning(format!("Unable to resolve {uri}: {e}"));
                false
            }
        };
        batch.places.insert(uri.to_string(), resolves);
        resolves
    }
}

fn parse_id(value: &str) -> Result<u64, String> {
    value.parse().map_err(|_| "Must be an integer".to_string())
}

/// Problem with an empty cell, given the rest of its row.
fn empty_cell_problem(rule: EmptyRule, row: &Row<'_>) -> Option<&'static str> {
    let model = row.model();
    let failed = match rule {
        EmptyRule::Required => !row.is_update(),
        EmptyRule::PagedContentNeedsParent => {
            model == registry::MODEL_PAGED_CONTENT && row.value(registry::PARENT_ID).is_empty()
        }
        EmptyRule::PageNeedsParent => {
            model == registry::MODEL_PAGE && row.value(registry::PARENT_COLLECTION).is_empty()
        }
        EmptyRule::ResourceTypeUnlessPage => model != registry::MODEL_PAGE,
        EmptyRule::SourceFile => !row.is_update() && registry::FILE_BEARING_MODELS.contains(&model),
    };
    failed.then_some(match rule {
        EmptyRule::Required => "Missing value",
        EmptyRule::PagedContentNeedsParent => {
            "Paged content must have a parent collection or parent ID"
        }
        EmptyRule::PageNeedsParent => "Pages must have a parent id or parent collection",
        EmptyRule::ResourceTypeUnlessPage => "Must have a resource type",
        EmptyRule::SourceFile => "Missing source file",
    })
}

/// Problem with one contributor value; when several apply the last one wins.
fn contributor_problem(value: &str) -> Option<String> {
    let Ok(contributor) = Contributor::from_cell(value) else {
        return Some("Contributor not in proper format".to_string());
    };
    let Some(name) = ContributorName::parse(&contributor.name) else {
        return Some("Contributor name not in proper format".to_string());
    };

    let vocabulary = Vocabulary::from_id(&name.vocabulary);
    let mut problem = None;
    if contributor.has_person_attributes() && vocabulary != Some(Vocabulary::Person) {
        problem = Some("Additional fields can only be applied to people".to_string());
    }
    if vocabulary.is_none() {
        problem = Some(format!("Bad vocabulary ID for contributor: {}", name.vocabulary));
    }
    let relator = name.relator();
    if !relators::is_valid_relator(&relator) {
        problem = Some(format!("Invalid relator: {relator}"));
    }
    problem
}
