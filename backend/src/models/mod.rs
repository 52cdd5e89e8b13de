//! Domain models shared by the validation and transformation engines.
//!
//! - [`Contributor`] - a contributor cell as submitted in the spreadsheet
//! - [`ContributorName`] - the decomposed `namespace:role:vocabulary:name` tuple
//! - [`Vocabulary`] - the taxonomy a contributor lives in
//! - [`Location`] - a resolved geographic hierarchy
//! - [`LinkedAgent`] - a companion row describing a person's extra attributes

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Contributor
// =============================================================================

/// A contributor cell, submitted as a JSON object.
///
/// Empty strings are read as absent so that spreadsheet templates which always
/// emit every key behave the same as ones that omit unused keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contributor {
    pub name: String,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

impl Contributor {
    /// Parse a contributor from its JSON cell text.
    pub fn from_cell(cell: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(cell)
    }

    /// True when any person-only attribute is set.
    pub fn has_person_attributes(&self) -> bool {
        self.orcid.is_some()
            || self.institution.is_some()
            || self.email.is_some()
            || self.status.is_some()
    }
}

// =============================================================================
// Contributor Name
// =============================================================================

/// Taxonomy vocabulary a contributor term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    Person,
    CorporateBody,
}

impl Vocabulary {
    /// Parse the vocabulary segment of a contributor name.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "person" => Some(Self::Person),
            "corporate_body" => Some(Self::CorporateBody),
            _ => None,
        }
    }

    /// Vocabulary id as understood by the taxonomy service.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::CorporateBody => "corporate_body",
        }
    }
}

/// A contributor name split into its colon-delimited parts.
///
/// `relators:cre:person:Smith, Sam` has namespace `relators`, role `cre`,
/// vocabulary `person` and display name `Smith, Sam`. The display name may
/// itself contain colons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorName {
    pub namespace: String,
    pub role: String,
    pub vocabulary: String,
    pub display_name: String,
}

impl ContributorName {
    /// Split a contributor name; `None` when it has fewer than four segments.
    pub fn parse(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split(':').collect();
        if parts.len() < 4 {
            return None;
        }

        Some(Self {
            namespace: parts[0].to_string(),
            role: parts[1].to_string(),
            vocabulary: parts[2].to_string(),
            display_name: parts[3..].join(":"),
        })
    }

    /// The `namespace:role` prefix checked against the relator vocabulary.
    pub fn relator(&self) -> String {
        format!("{}:{}", self.namespace, self.role)
    }
}

// =============================================================================
// Location
// =============================================================================

/// Administrative hierarchy of a place, filled bottom-up from the gazetteer.
///
/// All four keys are always serialized so the downstream field sees a stable
/// shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub state: String,
    pub county: String,
    pub city: String,
}

// =============================================================================
// Linked Agent
// =============================================================================

/// Companion row for a person contributor that carries extra attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkedAgent {
    pub term_name: String,
    pub field_contributor_status: String,
    pub field_relationships: String,
    pub field_email: String,
    pub field_identifier: String,
}

impl LinkedAgent {
    /// Column order of the linked-agents export.
    pub const COLUMNS: [&'static str; 5] = [
        "term_name",
        "field_contributor_status",
        "field_relationships",
        "field_email",
        "field_identifier",
    ];

    pub fn to_record(&self) -> [&str; 5] {
        [
            self.term_name.as_str(),
            self.field_contributor_status.as_str(),
            self.field_relationships.as_str(),
            self.field_email.as_str(),
            self.field_identifier.as_str(),
        ]
    }
}
