//! Column registry.
//!
//! One static table says what each spreadsheet column means: the canonical
//! field it exports to, how its values are encoded for export, which checks
//! validation runs on each value, and what an empty cell requires.
//!
//! Lookup is by exact header name. Headers absent from the table carry no
//! meaning for either engine.

/// How a cell value is rewritten for the canonical export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Literal value.
    Text,
    /// Contributor JSON resolved to `namespace:role:tid`.
    Contributor,
    /// `Yes`/`No` to `1`/`0`.
    YesNo,
    /// Short numeric reference within the batch.
    SmallInt,
    /// Integer with leading zeros stripped.
    Integer,
    /// Gazetteer URI resolved to a location object.
    Geography,
    /// Rights statement label mapped to its URI.
    Rights,
    /// `{"value": .., "attr0": ..}` with the attribute taken from the column.
    Attribute(&'static str),
    /// `{"number": .., "type": ..}` part detail.
    PartDetail(&'static str),
    /// `vocabulary:value` subject reference.
    VocabularyPrefixed(&'static str),
    /// `{"title": ..}` related item.
    RelatedTitle,
    /// `{"type": .., "identifier": ..}` related item.
    RelatedIdentifier(&'static str),
    /// Path re-rooted under the staging root.
    FilePath,
}

/// A check applied to each non-empty value of a column.
///
/// Rules run in declared order and stop at the first failure for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Non-negative integer.
    Integer,
    /// Node with this id exists and is reported as a collection reference.
    CollectionExists,
    /// Node with this id exists.
    NodeExists,
    /// Absolute URL with scheme and host.
    Url,
    /// Value not seen earlier in this column of the batch.
    UniqueUploadId,
    /// `YYYY[-MM[-DD]]` or EDTF.
    Date,
    Doi,
    /// Refers to an upload id registered earlier, and not to its own row.
    ParentReference,
    Contributor,
    /// Names a world-readable file on the staging mount.
    FileExists,
    YesNo,
    /// Gazetteer URI that resolves.
    Geography,
    /// At most this many characters.
    MaxLength(usize),
}

/// Requirement applied when a column's cell is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRule {
    /// Required unless the row updates an existing node.
    Required,
    /// Paged content needs a parent collection or a parent id.
    PagedContentNeedsParent,
    /// Pages need a parent id or a parent collection.
    PageNeedsParent,
    /// Anything but a page needs a resource type.
    ResourceTypeUnlessPage,
    /// File-bearing models need a source file on create.
    SourceFile,
}

/// Meaning of one spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub header: &'static str,
    /// Canonical field name in the export.
    pub target: &'static str,
    pub encoding: Encoding,
    pub rules: &'static [Rule],
    pub when_empty: Option<EmptyRule>,
}

// =============================================================================
// Header names referenced by row-level checks
// =============================================================================

pub const UPLOAD_ID: &str = "Upload ID";
pub const PARENT_ID: &str = "Page/Item Parent ID";
pub const PARENT_COLLECTION: &str = "Parent Collection";
pub const NODE_ID: &str = "Node ID";
pub const OBJECT_MODEL: &str = "Object Model";

pub const MODEL_PAGED_CONTENT: &str = "Paged Content";
pub const MODEL_PAGE: &str = "Page";

/// Models whose objects carry a source file.
pub const FILE_BEARING_MODELS: &[&str] =
    &["Image", "Digital Document", "Video", "Audio", "Binary", "Page"];

// =============================================================================
// Table
// =============================================================================

const fn text(header: &'static str, target: &'static str) -> ColumnSpec {
    column(header, target, Encoding::Text, &[])
}

const fn column(
    header: &'static str,
    target: &'static str,
    encoding: Encoding,
    rules: &'static [Rule],
) -> ColumnSpec {
    ColumnSpec {
        header,
        target,
        encoding,
        rules,
        when_empty: None,
    }
}

const fn required(spec: ColumnSpec, rule: EmptyRule) -> ColumnSpec {
    ColumnSpec {
        when_empty: Some(rule),
        ..spec
    }
}

const fn note(header: &'static str, attr: &'static str) -> ColumnSpec {
    column(header, "field_note", Encoding::Attribute(attr), &[])
}

const fn extent(header: &'static str, attr: &'static str) -> ColumnSpec {
    column(header, "field_extent", Encoding::Attribute(attr), &[])
}

const fn identifier(
    header: &'static str,
    attr: &'static str,
    rules: &'static [Rule],
) -> ColumnSpec {
    column(header, "field_identifier", Encoding::Attribute(attr), rules)
}

const fn part(header: &'static str, kind: &'static str) -> ColumnSpec {
    column(header, "field_part_detail", Encoding::PartDetail(kind), &[])
}

pub static COLUMNS: &[ColumnSpec] = &[
    // Structure
    column(UPLOAD_ID, "id", Encoding::SmallInt, &[Rule::UniqueUploadId]),
    required(
        column(PARENT_ID, "parent_id", Encoding::SmallInt, &[Rule::ParentReference]),
        EmptyRule::PageNeedsParent,
    ),
    column("Child Sort Order", "field_weight", Encoding::Integer, &[Rule::Integer]),
    column(NODE_ID, "node_id", Encoding::Integer, &[Rule::Integer, Rule::NodeExists]),
    required(
        column(
            PARENT_COLLECTION,
            "field_member_of",
            Encoding::Text,
            &[Rule::Integer, Rule::CollectionExists],
        ),
        EmptyRule::PagedContentNeedsParent,
    ),
    required(text(OBJECT_MODEL, "field_model"), EmptyRule::Required),
    required(
        column("Resource Type", "field_resource_type", Encoding::Text, &[]),
        EmptyRule::ResourceTypeUnlessPage,
    ),
    // Files
    required(
        column("File Path", "file", Encoding::FilePath, &[Rule::FileExists]),
        EmptyRule::SourceFile,
    ),
    column("Supplemental File", "supplemental_file", Encoding::FilePath, &[Rule::FileExists]),
    // Titles
    required(
        column("Title", "title", Encoding::Text, &[Rule::MaxLength(255)]),
        EmptyRule::Required,
    ),
    required(text("Full Title", "field_full_title"), EmptyRule::Required),
    text("Alternative Title", "field_alt_title"),
    // Agents
    column("Contributor", "field_linked_agent", Encoding::Contributor, &[Rule::Contributor]),
    text("Publisher", "field_publisher"),
    text("Place Published", "field_place_published"),
    text("Edition", "field_edition"),
    // Dates
    column("Creation Date", "field_edtf_date_created", Encoding::Text, &[Rule::Date]),
    column("Date Captured", "field_edtf_date_captured", Encoding::Text, &[Rule::Date]),
    column("Embargo Until Date", "field_edtf_date_embargo", Encoding::Text, &[Rule::Date]),
    // Identifiers
    identifier("DOI", "doi", &[Rule::Doi]),
    identifier("Catalog or ArchivesSpace URL", "uri", &[Rule::Url]),
    identifier("Call Number", "call-number", &[]),
    identifier("Report Number", "report-number", &[]),
    // Flags
    column("Add Coverpage (Y/N)", "field_add_coverpage", Encoding::YesNo, &[Rule::YesNo]),
    column("Make Public (Y/N)", "published", Encoding::YesNo, &[Rule::YesNo]),
    column("Rights Statement", "field_rights", Encoding::Rights, &[]),
    // Subjects
    column(
        "Hierarchical Geographic (Getty TGN)",
        "field_subject_hierarchical_geo",
        Encoding::Geography,
        &[Rule::Geography],
    ),
    column(
        "Subject Geographic (LCNAF)",
        "field_geographic_subject",
        Encoding::VocabularyPrefixed("geographic_naf"),
        &[],
    ),
    column(
        "Subject Geographic (Local)",
        "field_geographic_subject",
        Encoding::VocabularyPrefixed("geographic_local"),
        &[],
    ),
    text("Subject Topic (LCSH)", "field_subject_lcsh"),
    text("Subject Name (LCNAF)", "field_subjects_name"),
    text("Temporal Subject", "field_temporal_subject"),
    text("Keyword", "field_keywords"),
    text("Genre (Getty AAT)", "field_genre"),
    text("Language", "field_language"),
    // Description
    column("Description", "field_abstract", Encoding::Attribute("description"), &[]),
    column("Abstract", "field_abstract", Encoding::Attribute("abstract"), &[]),
    text("Table of Contents", "field_table_of_contents"),
    note("Preferred Citation", "preferred-citation"),
    note("Capture Device", "capture-device"),
    column("PPI", "field_note", Encoding::Attribute("ppi"), &[Rule::Integer]),
    note("Source Collection", "collection"),
    note("Box", "box"),
    note("Series", "series"),
    note("Folder", "folder"),
    // Physical description
    extent("Page Count", "page"),
    extent("Dimensions", "dimensions"),
    extent("Digital File Size", "bytes"),
    extent("Duration (Minutes)", "minutes"),
    text("Physical Format (Getty AAT)", "field_physical_form"),
    text("Digital Origin", "field_digital_origin"),
    // Host publication
    part("Volume", "volume"),
    part("Issue", "issue"),
    part("Page Numbers", "page"),
    column("Source Publication Title", "field_related_item", Encoding::RelatedTitle, &[]),
    column(
        "Source Publication ISSN",
        "field_related_item",
        Encoding::RelatedIdentifier("issn"),
        &[],
    ),
];

/// Registry entry for a header, if the column is known.
pub fn lookup(header: &str) -> Option<&'static ColumnSpec> {
    COLUMNS.iter().find(|spec| spec.header == header)
}

// =============================================================================
// Rights statements
// =============================================================================

static RIGHTS_STATEMENTS: &[(&str, &str)] = &[
    ("IN COPYRIGHT", "http://rightsstatements.org/vocab/InC/1.0/"),
    ("IN COPYRIGHT - EU ORPHAN WORK", "http://rightsstatements.org/vocab/InC-OW-EU/1.0/"),
    ("IN COPYRIGHT - EDUCATIONAL USE PERMITTED", "http://rightsstatements.org/vocab/InC-EDU/1.0/"),
    (
        "IN COPYRIGHT - NON-COMMERCIAL USE PERMITTED",
        "http://rightsstatements.org/vocab/InC-NC/1.0/",
    ),
    (
        "IN COPYRIGHT - RIGHTS-HOLDER(S) UNLOCATABLE OR UNIDENTIFIABLE",
        "http://rightsstatements.org/vocab/InC-RUU/1.0/",
    ),
    ("NO COPYRIGHT - CONTRACTUAL RESTRICTIONS", "http://rightsstatements.org/vocab/NoC-CR/1.0/"),
    ("NO COPYRIGHT - NON-COMMERCIAL USE ONLY", "http://rightsstatements.org/vocab/NoC-NC/1.0/"),
    (
        "NO COPYRIGHT - OTHER KNOWN LEGAL RESTRICTIONS",
        "http://rightsstatements.org/vocab/NoC-OKLR/1.0/",
    ),
    ("NO COPYRIGHT - UNITED STATES", "http://rightsstatements.org/vocab/NoC-US/1.0/"),
    ("COPYRIGHT NOT EVALUATED", "http://rightsstatements.org/vocab/CNE/1.0/"),
    ("COPYRIGHT UNDETERMINED", "http://rightsstatements.org/vocab/UND/1.0/"),
    ("NO KNOWN COPYRIGHT", "http://rightsstatements.org/vocab/NKC/1.0/"),
];

/// Rights statement URI for an exact label match.
pub fn rights_uri(label: &str) -> Option<&'static str> {
    RIGHTS_STATEMENTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, uri)| *uri)
}
