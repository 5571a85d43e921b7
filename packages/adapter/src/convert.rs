//! Forward mapping, phase 1: legacy document to a dataset draft.
//!
//! Phase 1 is all-or-nothing. It maps the scalar rename table and the
//! single-valued nested objects (access rights, data catalog, metadata
//! owner) and leaves list-valued children untouched for
//! [`post_process`](crate::post_process) to pick up once the dataset row
//! exists. A missing or malformed required field aborts the whole
//! conversion for the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::dates::{parse_date, parse_datetime};
use common::json::{coerce_list, get_str, index_path, join_path};

use crate::document::{ConceptFragment, LegacyDocument, LicenseFragment, fix_url, is_valid_url};
use crate::error::ConversionError;
use crate::graph::{
    AccessRightsRecord, DatasetRecord, LicenseRecord, MetadataOwner, TermKind,
};
use crate::resolver::Resolver;
use crate::store::CatalogStore;

/// One value that was dropped or rewritten during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub path: String,
    pub value: Value,
    pub note: String,
}

/// Bookkeeping for values the converter could not take verbatim.
///
/// Invalid values are dropped from the normalized dataset but kept here;
/// fixed values were rewritten in place. Both are persisted on the legacy
/// record for operator inspection.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub invalid: Vec<Annotation>,
    pub fixed: Vec<Annotation>,
}

impl Annotations {
    pub fn mark_invalid(&mut self, path: &str, value: Value, note: impl Into<String>) {
        self.invalid.push(Annotation {
            path: path.to_string(),
            value,
            note: note.into(),
        });
    }

    pub fn mark_fixed(&mut self, path: &str, value: Value, note: impl Into<String>) {
        self.fixed.push(Annotation {
            path: path.to_string(),
            value,
            note: note.into(),
        });
    }

    pub fn invalid_json(&self) -> Option<Value> {
        (!self.invalid.is_empty()).then(|| serde_json::to_value(&self.invalid).unwrap_or_default())
    }

    pub fn fixed_json(&self) -> Option<Value> {
        (!self.fixed.is_empty()).then(|| serde_json::to_value(&self.fixed).unwrap_or_default())
    }
}

/// Phase-1 output: the scalar dataset row plus its single-valued nested
/// records, with the source document retained for phase 2.
#[derive(Debug)]
pub struct DatasetDraft {
    pub document: LegacyDocument,
    pub dataset: DatasetRecord,
    pub access_rights: Option<AccessRightsRecord>,
}

pub async fn prepare<S: CatalogStore + ?Sized>(
    document: &LegacyDocument,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<DatasetDraft, ConversionError> {
    let id = document.identifier()?;

    let title = document
        .rd_get("title")
        .filter(|t| t.is_object())
        .cloned()
        .ok_or_else(|| {
            ConversionError::mapping("research_dataset.title", "a language map is required")
        })?;

    let created = document
        .get_str("date_created")
        .and_then(parse_datetime)
        .ok_or_else(|| {
            ConversionError::mapping("date_created", "a valid timestamp is required")
        })?;
    let modified = document
        .get_str("date_modified")
        .and_then(parse_datetime)
        .unwrap_or(created);

    let issued = match document.rd_str("issued") {
        Some(raw) => match parse_date(raw) {
            Some(date) => Some(date),
            None => {
                annotations.mark_invalid(
                    "research_dataset.issued",
                    Value::String(raw.to_string()),
                    "not a valid date",
                );
                None
            }
        },
        None => None,
    };

    let keyword = coerce_list(document.rd_get("keyword"))
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let dataset = DatasetRecord {
        id,
        title,
        description: document.rd_get("description").cloned(),
        persistent_identifier: document.rd_str("preferred_identifier").map(str::to_string),
        issued,
        keyword,
        bibliographic_citation: document.rd_str("bibliographic_citation").map(str::to_string),
        created,
        modified,
        deprecated: flag_timestamp(document, "deprecated", "date_deprecated", modified),
        removed: flag_timestamp(document, "removed", "date_removed", modified),
        data_catalog: data_catalog(document),
        metadata_owner: MetadataOwner {
            user: document.get_str("metadata_provider_user").map(str::to_string),
            organization: document
                .get_str("metadata_provider_org")
                .or_else(|| document.get_str("metadata_owner_org"))
                .map(str::to_string),
        },
    };

    let access_rights = match document.rd_get("access_rights") {
        Some(ar) => Some(map_access_rights(ar, resolver, annotations).await?),
        None => None,
    };

    Ok(DatasetDraft {
        document: document.clone(),
        dataset,
        access_rights,
    })
}

/// Collapse a legacy boolean flag + companion timestamp into one nullable
/// timestamp. A set flag without a parseable timestamp falls back to the
/// modification time.
fn flag_timestamp(
    document: &LegacyDocument,
    flag: &str,
    date_key: &str,
    fallback: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let set = match document.get(flag) {
        Some(Value::Bool(b)) => *b,
        // A bare timestamp under the flag key also counts as set.
        Some(Value::String(s)) => return parse_datetime(s),
        _ => false,
    };
    if !set {
        return None;
    }
    Some(
        document
            .get_str(date_key)
            .and_then(parse_datetime)
            .unwrap_or(fallback),
    )
}

fn data_catalog(document: &LegacyDocument) -> Option<String> {
    match document.get("data_catalog") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(catalog) => get_str(catalog, "identifier").map(str::to_string),
        None => None,
    }
}

async fn map_access_rights<S: CatalogStore + ?Sized>(
    value: &Value,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<AccessRightsRecord, ConversionError> {
    let base = "research_dataset.access_rights";
    if !value.is_object() {
        return Err(ConversionError::malformed(base, "expected an object"));
    }

    let access_type = match value.get("access_type").filter(|v| !v.is_null()) {
        Some(at) => {
            let path = join_path(base, "access_type");
            let fragment = ConceptFragment::parse(at, &path)?;
            Some(
                resolver
                    .resolve_term(TermKind::AccessType, &fragment, &path, annotations)
                    .await?,
            )
        }
        None => None,
    };

    let mut license = Vec::new();
    let license_base = join_path(base, "license");
    for (i, entry) in coerce_list(value.get("license")).into_iter().enumerate() {
        let path = index_path(&license_base, i);
        license.push(map_license(entry, &path, resolver, annotations).await?);
    }

    let mut restriction_grounds = Vec::new();
    let rg_base = join_path(base, "restriction_grounds");
    for (i, entry) in coerce_list(value.get("restriction_grounds"))
        .into_iter()
        .enumerate()
    {
        let path = index_path(&rg_base, i);
        let fragment = ConceptFragment::parse(entry, &path)?;
        restriction_grounds.push(
            resolver
                .resolve_term(TermKind::RestrictionGrounds, &fragment, &path, annotations)
                .await?,
        );
    }

    Ok(AccessRightsRecord {
        access_type,
        license,
        restriction_grounds,
        description: value.get("description").filter(|v| !v.is_null()).cloned(),
        available: get_str(value, "available").and_then(parse_date),
    })
}

async fn map_license<S: CatalogStore + ?Sized>(
    value: &Value,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<LicenseRecord, ConversionError> {
    let fragment = LicenseFragment::parse(value, path)?;

    let reference = match fragment.identifier.as_deref().filter(|id| is_valid_url(id)) {
        Some(_) => {
            let concept = ConceptFragment {
                identifier: fragment.identifier.clone(),
                pref_label: fragment.title.clone(),
                in_scheme: None,
                definition: None,
            };
            Some(
                resolver
                    .resolve_term(TermKind::License, &concept, path, annotations)
                    .await?,
            )
        }
        None => None,
    };

    let custom_url = match &fragment.custom_url {
        Some(raw) => {
            let (url, fixed) = fix_url(raw);
            if !is_valid_url(&url) {
                annotations.mark_invalid(
                    &join_path(path, "license"),
                    Value::String(raw.clone()),
                    "not a valid URL",
                );
                None
            } else {
                if fixed {
                    annotations.mark_fixed(
                        &join_path(path, "license"),
                        Value::String(url.clone()),
                        "cleaned whitespace in URL",
                    );
                }
                Some(url)
            }
        }
        None => None,
    };

    if reference.is_none() && custom_url.is_none() && fragment.title.is_none() {
        return Err(ConversionError::mapping(
            path,
            "license needs an identifier, a URL or a title",
        ));
    }

    Ok(LicenseRecord {
        reference,
        title: fragment.title,
        description: fragment.description,
        custom_url,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::resolver::{ConvertOptions, ResolutionScope};
    use crate::store::MemoryStore;

    use super::*;

    fn doc(value: Value) -> LegacyDocument {
        LegacyDocument::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_prepare_maps_scalar_renames() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let document = doc(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25T16:34:00+03:00",
            "date_modified": "2020-01-01T00:00:00Z",
            "removed": false,
            "metadata_provider_user": "tester",
            "metadata_provider_org": "test-org",
            "data_catalog": {"identifier": "urn:nbn:fi:att:data-catalog-ida"},
            "research_dataset": {
                "title": {"en": "Test dataset"},
                "description": {"en": "About it"},
                "preferred_identifier": "urn:nbn:fi:att:1",
                "issued": "2019-10-01",
                "keyword": ["first", "second"],
            }
        }));

        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        let d = &draft.dataset;
        assert_eq!(d.title, json!({"en": "Test dataset"}));
        assert_eq!(d.persistent_identifier.as_deref(), Some("urn:nbn:fi:att:1"));
        assert_eq!(d.keyword, vec!["first", "second"]);
        assert_eq!(d.issued.unwrap().to_string(), "2019-10-01");
        assert_eq!(d.created.to_rfc3339(), "2019-09-25T13:34:00+00:00");
        assert!(d.removed.is_none());
        assert_eq!(
            d.data_catalog.as_deref(),
            Some("urn:nbn:fi:att:data-catalog-ida")
        );
        assert_eq!(d.metadata_owner.user.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn test_prepare_requires_title_and_created() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let document = doc(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25T16:34:00+03:00",
            "research_dataset": {}
        }));
        let err = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Mapping { ref path, .. } if path == "research_dataset.title"));
    }

    #[tokio::test]
    async fn test_removed_flag_folds_into_timestamp() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let document = doc(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "removed": true,
            "date_removed": "2021-05-05T10:00:00Z",
            "research_dataset": {"title": {"en": "x"}}
        }));
        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        assert_eq!(
            draft.dataset.removed.unwrap().to_rfc3339(),
            "2021-05-05T10:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_invalid_issued_date_is_dropped_and_marked() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let document = doc(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "research_dataset": {"title": {"en": "x"}, "issued": "around 2015"}
        }));
        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        assert!(draft.dataset.issued.is_none());
        assert_eq!(annotations.invalid.len(), 1);
        assert_eq!(annotations.invalid[0].path, "research_dataset.issued");
    }

    #[tokio::test]
    async fn test_access_rights_resolves_terms() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let document = doc(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "research_dataset": {
                "title": {"en": "x"},
                "access_rights": {
                    "access_type": {
                        "identifier": "http://uri.suomi.fi/codelist/fairdata/access_type/code/open",
                        "pref_label": {"en": "Open"},
                    },
                    "license": [{
                        "identifier": "http://uri.suomi.fi/codelist/fairdata/license/code/CC-BY-4.0",
                        "title": {"en": "CC BY 4.0"},
                    }],
                }
            }
        }));
        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        let ar = draft.access_rights.unwrap();
        assert!(ar.access_type.is_some());
        assert_eq!(ar.license.len(), 1);
        assert!(ar.license[0].reference.is_some());
    }
}
