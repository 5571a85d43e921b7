//! In-memory representation of the normalized (V3) dataset graph.
//!
//! These records are the currency between the forward mapper, the reverse
//! mapper and the [`CatalogStore`](crate::store::CatalogStore)
//! implementations. Reference-data terms, persons and organizations are
//! embedded fully materialized so the reverse mapper can run as a pure
//! function of one graph value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kinds of controlled-vocabulary terms shared between datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    AccessType,
    License,
    RestrictionGrounds,
    FieldOfScience,
    Theme,
    Language,
    Location,
    EventOutcome,
    LifecycleEvent,
    PreservationEvent,
    Concept,
}

impl TermKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessType => "access_type",
            Self::License => "license",
            Self::RestrictionGrounds => "restriction_grounds",
            Self::FieldOfScience => "field_of_science",
            Self::Theme => "theme",
            Self::Language => "language",
            Self::Location => "location",
            Self::EventOutcome => "event_outcome",
            Self::LifecycleEvent => "lifecycle_event",
            Self::PreservationEvent => "preservation_event",
            Self::Concept => "concept",
        }
    }
}

/// A reference-data term. Canonical terms are indexed from the external
/// vocabulary service; terms created during migration carry `deprecated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: Uuid,
    pub kind: TermKind,
    /// Canonical vocabulary URL. `None` for inline concepts that the
    /// legacy document supplied without an identifier.
    pub url: Option<String>,
    /// Language map, e.g. `{"en": "Open", "fi": "Avoin"}`.
    pub pref_label: Value,
    pub in_scheme: Option<String>,
    pub definition: Option<Value>,
    pub deprecated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homepage {
    pub url: String,
    pub title: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub external_identifier: Option<String>,
    pub homepage: Option<Homepage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: Uuid,
    /// Language map.
    pub pref_label: Value,
    /// Reference-data URL; only reference-data organizations have one.
    pub url: Option<String>,
    pub external_identifier: Option<String>,
    pub email: Option<String>,
    pub homepage: Option<Homepage>,
    pub parent: Option<Box<OrganizationRecord>>,
    pub is_reference_data: bool,
    pub in_scheme: Option<String>,
    pub deprecated: Option<DateTime<Utc>>,
}

/// Actor roles, in the fixed role-bucket scan order of the legacy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Creator,
    Publisher,
    Curator,
    RightsHolder,
    Contributor,
}

impl Role {
    /// Bucket scan order. Significant: actor insertion order follows the
    /// first appearance across these buckets, and the reverse mapper
    /// reproduces per-bucket lists in that relative order.
    pub const SCAN_ORDER: [Role; 5] = [
        Role::Creator,
        Role::Publisher,
        Role::Curator,
        Role::RightsHolder,
        Role::Contributor,
    ];

    /// Key of this role's bucket in the legacy `research_dataset` object.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Publisher => "publisher",
            Role::Curator => "curator",
            Role::RightsHolder => "rights_holder",
            Role::Contributor => "contributor",
        }
    }
}

/// A person and/or organization associated with a dataset.
///
/// Invariant: one row per (person identity, organization identity) tuple;
/// an actor appearing in several legacy role buckets carries the merged
/// role set. Provenance association actors have an empty role set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: Uuid,
    pub roles: Vec<Role>,
    /// First-appearance order across the role bucket scan.
    pub position: i32,
    pub person: Option<PersonRecord>,
    pub organization: Option<OrganizationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Reference-data license term.
    pub reference: Option<TermRecord>,
    /// User-supplied title override; the term's label is the fallback.
    pub title: Option<Value>,
    pub description: Option<Value>,
    /// Free-form URL for licenses outside the vocabulary.
    pub custom_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessRightsRecord {
    pub access_type: Option<TermRecord>,
    pub license: Vec<LicenseRecord>,
    pub restriction_grounds: Vec<TermRecord>,
    pub description: Option<Value>,
    pub available: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalRecord {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub temporal_coverage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpatialRecord {
    pub geographic_name: Option<String>,
    pub full_address: Option<String>,
    pub altitude_in_meters: Option<String>,
    pub custom_wkt: Vec<String>,
    /// Reference-data location term.
    pub reference: Option<TermRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub pref_label: Value,
    pub description: Option<Value>,
    pub representation: Option<String>,
    pub concept: Option<TermRecord>,
    pub universe: Option<TermRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub outcome_description: Option<Value>,
    pub event_outcome: Option<TermRecord>,
    pub lifecycle_event: Option<TermRecord>,
    pub preservation_event: Option<TermRecord>,
    pub temporal: Option<TemporalRecord>,
    pub spatial: Option<SpatialRecord>,
    pub variables: Vec<VariableRecord>,
    pub is_associated_with: Vec<ActorRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataOwner {
    pub user: Option<String>,
    pub organization: Option<String>,
}

/// Scalar fields of the normalized dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Uuid,
    /// Language map; required.
    pub title: Value,
    pub description: Option<Value>,
    pub persistent_identifier: Option<String>,
    pub issued: Option<NaiveDate>,
    pub keyword: Vec<String>,
    pub bibliographic_citation: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deprecated: Option<DateTime<Utc>>,
    /// Removal timestamp; the legacy `removed` boolean plus
    /// `date_removed` collapse into this single nullable value.
    pub removed: Option<DateTime<Utc>>,
    pub data_catalog: Option<String>,
    pub metadata_owner: MetadataOwner,
}

/// One dataset with all adapter-managed children, fully materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetGraph {
    pub dataset: DatasetRecord,
    pub access_rights: Option<AccessRightsRecord>,
    pub actors: Vec<ActorRecord>,
    pub provenance: Vec<ProvenanceRecord>,
    pub spatial: Vec<SpatialRecord>,
    pub temporal: Vec<TemporalRecord>,
    pub field_of_science: Vec<TermRecord>,
    pub theme: Vec<TermRecord>,
    pub language: Vec<TermRecord>,
}

/// One legacy dataset wrapper row.
///
/// `raw_document` is the verbatim legacy JSON and is never rewritten;
/// every save re-derives the linked dataset and the diff from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub id: Uuid,
    pub raw_document: Value,
    pub dataset_id: Option<Uuid>,
    pub compatibility_diff: Option<Value>,
    pub migration_errors: Option<Value>,
    pub invalid_legacy_values: Option<Value>,
    pub fixed_legacy_values: Option<Value>,
    pub last_successful_migration: Option<DateTime<Utc>>,
}

impl LegacyRecord {
    /// Wrap a legacy document, taking the record id from its
    /// `identifier` field (required, must be a UUID).
    pub fn from_document(document: Value) -> Result<Self, crate::error::ConversionError> {
        use crate::error::ConversionError;

        let identifier = document
            .get("identifier")
            .and_then(Value::as_str)
            .ok_or_else(|| ConversionError::mapping("identifier", "value is required"))?;
        let id = Uuid::parse_str(identifier)
            .map_err(|_| ConversionError::mapping("identifier", "value is not a valid UUID"))?;
        Ok(Self {
            id,
            raw_document: document,
            dataset_id: None,
            compatibility_diff: None,
            migration_errors: None,
            invalid_legacy_values: None,
            fixed_legacy_values: None,
            last_successful_migration: None,
        })
    }
}
