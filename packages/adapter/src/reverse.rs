//! Reverse mapping: normalized dataset graph back to the legacy shape.
//!
//! A pure function of one graph value, no persistence. The output always
//! carries the current canonical values, never the originally submitted
//! ones; the differ surfaces whatever that changed.

use serde_json::{Map, Value, json};

use common::json::omit_empty;

use crate::graph::{
    ActorRecord, DatasetGraph, Homepage, OrganizationRecord, ProvenanceRecord, Role,
    SpatialRecord, TemporalRecord, TermRecord,
};

/// Reconstruct the legacy document shape from a dataset graph.
pub fn to_legacy_document(graph: &DatasetGraph) -> Value {
    let d = &graph.dataset;

    let mut root = Map::new();
    root.insert("identifier".into(), json!(d.id.to_string()));
    root.insert("date_created".into(), json!(d.created.to_rfc3339()));
    root.insert("date_modified".into(), json!(d.modified.to_rfc3339()));
    // unset flags are omitted rather than emitted as false, matching the
    // empty-value pruning the differ applies anyway
    if let Some(removed) = &d.removed {
        root.insert("removed".into(), json!(true));
        root.insert("date_removed".into(), json!(removed.to_rfc3339()));
    }
    if let Some(deprecated) = &d.deprecated {
        root.insert("deprecated".into(), json!(true));
        root.insert("date_deprecated".into(), json!(deprecated.to_rfc3339()));
    }
    if let Some(catalog) = &d.data_catalog {
        root.insert("data_catalog".into(), json!({"identifier": catalog}));
    }
    if let Some(user) = &d.metadata_owner.user {
        root.insert("metadata_provider_user".into(), json!(user));
    }
    if let Some(org) = &d.metadata_owner.organization {
        root.insert("metadata_provider_org".into(), json!(org));
    }

    let mut rd = Map::new();
    rd.insert("title".into(), d.title.clone());
    if let Some(description) = &d.description {
        rd.insert("description".into(), description.clone());
    }
    if let Some(pid) = &d.persistent_identifier {
        rd.insert("preferred_identifier".into(), json!(pid));
    }
    if let Some(issued) = &d.issued {
        rd.insert("issued".into(), json!(issued.to_string()));
    }
    if !d.keyword.is_empty() {
        rd.insert("keyword".into(), json!(d.keyword));
    }
    if let Some(citation) = &d.bibliographic_citation {
        rd.insert("bibliographic_citation".into(), json!(citation));
    }

    if let Some(ar) = &graph.access_rights {
        let mut access_rights = Map::new();
        if let Some(access_type) = &ar.access_type {
            access_rights.insert("access_type".into(), term_value(access_type, "pref_label"));
        }
        if !ar.license.is_empty() {
            let licenses: Vec<Value> = ar
                .license
                .iter()
                .map(|l| {
                    let mut out = match &l.reference {
                        Some(reference) => {
                            let mut out = term_value(reference, "title");
                            // user-supplied title override survives
                            if let (Some(title), Some(obj)) = (&l.title, out.as_object_mut()) {
                                obj.insert("title".into(), title.clone());
                            }
                            out
                        }
                        None => json!({"title": l.title.clone()}),
                    };
                    if let Some(obj) = out.as_object_mut() {
                        if let Some(description) = &l.description {
                            obj.insert("description".into(), description.clone());
                        }
                        if let Some(url) = &l.custom_url {
                            obj.insert("license".into(), json!(url));
                        }
                    }
                    out
                })
                .collect();
            access_rights.insert("license".into(), Value::Array(licenses));
        }
        if !ar.restriction_grounds.is_empty() {
            access_rights.insert(
                "restriction_grounds".into(),
                Value::Array(
                    ar.restriction_grounds
                        .iter()
                        .map(|t| term_value(t, "pref_label"))
                        .collect(),
                ),
            );
        }
        if let Some(description) = &ar.description {
            access_rights.insert("description".into(), description.clone());
        }
        if let Some(available) = &ar.available {
            access_rights.insert("available".into(), json!(available.to_string()));
        }
        rd.insert("access_rights".into(), Value::Object(access_rights));
    }

    // Role buckets: an actor with N roles appears in each applicable
    // bucket, in first-appearance order. Publisher stays a single object.
    let mut ordered: Vec<&ActorRecord> = graph.actors.iter().collect();
    ordered.sort_by_key(|a| a.position);
    for role in Role::SCAN_ORDER {
        let bucket: Vec<Value> = ordered
            .iter()
            .filter(|a| a.roles.contains(&role))
            .map(|a| actor_value(a))
            .collect();
        if bucket.is_empty() {
            continue;
        }
        let value = if role == Role::Publisher {
            bucket.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::Array(bucket)
        };
        rd.insert(role.legacy_key().into(), value);
    }

    if !graph.provenance.is_empty() {
        rd.insert(
            "provenance".into(),
            Value::Array(graph.provenance.iter().map(provenance_value).collect()),
        );
    }
    if !graph.spatial.is_empty() {
        rd.insert(
            "spatial".into(),
            Value::Array(graph.spatial.iter().map(spatial_value).collect()),
        );
    }
    if !graph.temporal.is_empty() {
        rd.insert(
            "temporal".into(),
            Value::Array(graph.temporal.iter().map(temporal_value).collect()),
        );
    }
    if !graph.field_of_science.is_empty() {
        rd.insert(
            "field_of_science".into(),
            Value::Array(
                graph
                    .field_of_science
                    .iter()
                    .map(|t| term_value(t, "pref_label"))
                    .collect(),
            ),
        );
    }
    if !graph.theme.is_empty() {
        rd.insert(
            "theme".into(),
            Value::Array(graph.theme.iter().map(|t| term_value(t, "pref_label")).collect()),
        );
    }
    if !graph.language.is_empty() {
        rd.insert(
            "language".into(),
            Value::Array(graph.language.iter().map(|t| term_value(t, "title")).collect()),
        );
    }

    root.insert("research_dataset".into(), Value::Object(rd));
    omit_empty(&Value::Object(root)).unwrap_or_else(|| json!({}))
}

/// Serialize a term back to its legacy concept shape. Language concepts
/// label themselves under `title` instead of `pref_label`.
fn term_value(term: &TermRecord, label_key: &str) -> Value {
    let mut out = Map::new();
    if let Some(url) = &term.url {
        out.insert("identifier".into(), json!(url));
    }
    out.insert(label_key.into(), term.pref_label.clone());
    if let Some(in_scheme) = &term.in_scheme {
        out.insert("in_scheme".into(), json!(in_scheme));
    }
    if let Some(definition) = &term.definition {
        out.insert("definition".into(), definition.clone());
    }
    Value::Object(out)
}

fn homepage_value(homepage: &Homepage) -> Value {
    let mut out = Map::new();
    out.insert("identifier".into(), json!(homepage.url));
    if let Some(title) = &homepage.title {
        out.insert("title".into(), title.clone());
    }
    Value::Object(out)
}

fn organization_value(org: &OrganizationRecord) -> Value {
    let mut out = Map::new();
    out.insert("@type".into(), json!("Organization"));
    out.insert("name".into(), org.pref_label.clone());
    if let Some(url) = &org.url {
        out.insert("identifier".into(), json!(url));
    } else if let Some(external) = &org.external_identifier {
        out.insert("identifier".into(), json!(external));
    }
    if let Some(email) = &org.email {
        out.insert("email".into(), json!(email));
    }
    if let Some(homepage) = &org.homepage {
        out.insert("homepage".into(), homepage_value(homepage));
    }
    if let Some(parent) = &org.parent {
        out.insert("is_part_of".into(), organization_value(parent));
    }
    Value::Object(out)
}

fn actor_value(actor: &ActorRecord) -> Value {
    match &actor.person {
        Some(person) => {
            let mut out = Map::new();
            out.insert("@type".into(), json!("Person"));
            out.insert("name".into(), json!(person.name));
            if let Some(email) = &person.email {
                out.insert("email".into(), json!(email));
            }
            if let Some(identifier) = &person.external_identifier {
                out.insert("identifier".into(), json!(identifier));
            }
            if let Some(homepage) = &person.homepage {
                out.insert("homepage".into(), homepage_value(homepage));
            }
            if let Some(org) = &actor.organization {
                out.insert("member_of".into(), organization_value(org));
            }
            Value::Object(out)
        }
        None => match &actor.organization {
            Some(org) => organization_value(org),
            None => Value::Null,
        },
    }
}

fn temporal_value(temporal: &TemporalRecord) -> Value {
    let mut out = Map::new();
    if let Some(start) = &temporal.start_date {
        out.insert("start_date".into(), json!(start.to_string()));
    }
    if let Some(end) = &temporal.end_date {
        out.insert("end_date".into(), json!(end.to_string()));
    }
    if let Some(coverage) = &temporal.temporal_coverage {
        out.insert("temporal_coverage".into(), json!(coverage));
    }
    Value::Object(out)
}

fn spatial_value(spatial: &SpatialRecord) -> Value {
    let mut out = Map::new();
    if let Some(name) = &spatial.geographic_name {
        out.insert("geographic_name".into(), json!(name));
    }
    if let Some(address) = &spatial.full_address {
        out.insert("full_address".into(), json!(address));
    }
    if let Some(alt) = &spatial.altitude_in_meters {
        out.insert("alt".into(), json!(alt));
    }
    if !spatial.custom_wkt.is_empty() {
        out.insert("as_wkt".into(), json!(spatial.custom_wkt));
    }
    if let Some(reference) = &spatial.reference {
        out.insert("place_uri".into(), term_value(reference, "pref_label"));
    }
    Value::Object(out)
}

fn provenance_value(provenance: &ProvenanceRecord) -> Value {
    let mut out = Map::new();
    if let Some(title) = &provenance.title {
        out.insert("title".into(), title.clone());
    }
    if let Some(description) = &provenance.description {
        out.insert("description".into(), description.clone());
    }
    if let Some(outcome) = &provenance.outcome_description {
        out.insert("outcome_description".into(), outcome.clone());
    }
    if let Some(term) = &provenance.event_outcome {
        out.insert("event_outcome".into(), term_value(term, "pref_label"));
    }
    if let Some(term) = &provenance.lifecycle_event {
        out.insert("lifecycle_event".into(), term_value(term, "pref_label"));
    }
    if let Some(term) = &provenance.preservation_event {
        out.insert("preservation_event".into(), term_value(term, "pref_label"));
    }
    if let Some(temporal) = &provenance.temporal {
        out.insert("temporal".into(), temporal_value(temporal));
    }
    if let Some(spatial) = &provenance.spatial {
        out.insert("spatial".into(), spatial_value(spatial));
    }
    if !provenance.variables.is_empty() {
        let variables: Vec<Value> = provenance
            .variables
            .iter()
            .map(|v| {
                let mut out = Map::new();
                out.insert("pref_label".into(), v.pref_label.clone());
                if let Some(description) = &v.description {
                    out.insert("description".into(), description.clone());
                }
                if let Some(representation) = &v.representation {
                    out.insert("representation".into(), json!(representation));
                }
                if let Some(concept) = &v.concept {
                    out.insert("concept".into(), term_value(concept, "pref_label"));
                }
                if let Some(universe) = &v.universe {
                    out.insert("universe".into(), term_value(universe, "pref_label"));
                }
                Value::Object(out)
            })
            .collect();
        out.insert("variable".into(), Value::Array(variables));
    }
    if !provenance.is_associated_with.is_empty() {
        let mut actors: Vec<&ActorRecord> = provenance.is_associated_with.iter().collect();
        actors.sort_by_key(|a| a.position);
        out.insert(
            "was_associated_with".into(),
            Value::Array(actors.into_iter().map(actor_value).collect()),
        );
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::convert::{Annotations, prepare};
    use crate::document::LegacyDocument;
    use crate::post_process::post_process;
    use crate::resolver::{ConvertOptions, ResolutionScope, Resolver};
    use crate::store::MemoryStore;

    use super::*;

    async fn round_trip(document: Value) -> Value {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let document = LegacyDocument::new(document).unwrap();
        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        let (graph, errors) = post_process(draft, &mut resolver, &mut annotations)
            .await
            .unwrap();
        assert!(errors.is_empty(), "{errors:?}");
        to_legacy_document(&graph)
    }

    #[tokio::test]
    async fn test_scalar_fields_round_trip() {
        let out = round_trip(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25T13:34:00+00:00",
            "research_dataset": {
                "title": {"en": "Test dataset"},
                "preferred_identifier": "urn:nbn:fi:att:1",
                "keyword": ["first"],
                "issued": "2019-10-01",
            }
        }))
        .await;

        assert_eq!(
            out["identifier"],
            json!("c955e904-e3dd-4d7e-99f1-3fed446f96d1")
        );
        let rd = &out["research_dataset"];
        assert_eq!(rd["title"], json!({"en": "Test dataset"}));
        assert_eq!(rd["preferred_identifier"], json!("urn:nbn:fi:att:1"));
        assert_eq!(rd["keyword"], json!(["first"]));
        assert_eq!(rd["issued"], json!("2019-10-01"));
    }

    #[tokio::test]
    async fn test_rename_table_paths_all_survive_a_round_trip() {
        let out = round_trip(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25T13:34:00+00:00",
            "research_dataset": {
                "title": {"en": "Test dataset"},
                "description": {"en": "About it"},
                "preferred_identifier": "urn:nbn:fi:att:1",
                "keyword": ["first"],
                "issued": "2019-10-01",
                "bibliographic_citation": "Doe 2019",
            }
        }))
        .await;

        for (legacy_path, _) in crate::document::SCALAR_RENAMES {
            let mut cursor = &out;
            for segment in legacy_path.split('.') {
                cursor = &cursor[segment];
            }
            assert!(
                !cursor.is_null(),
                "reconstruction lost legacy path {legacy_path}"
            );
        }
    }

    #[tokio::test]
    async fn test_multi_role_actor_appears_in_every_bucket() {
        let out = round_trip(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "research_dataset": {
                "title": {"en": "x"},
                "creator": [{"@type": "Person", "name": "A"}],
                "contributor": [{"@type": "Person", "name": "A"}],
            }
        }))
        .await;

        let rd = &out["research_dataset"];
        assert_eq!(rd["creator"][0]["name"], json!("A"));
        assert_eq!(rd["contributor"][0]["name"], json!("A"));
    }

    #[tokio::test]
    async fn test_publisher_emitted_as_single_object() {
        let out = round_trip(json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "research_dataset": {
                "title": {"en": "x"},
                "publisher": {"@type": "Organization", "name": {"en": "Pub"}},
            }
        }))
        .await;

        let publisher = &out["research_dataset"]["publisher"];
        assert!(publisher.is_object());
        assert_eq!(publisher["@type"], json!("Organization"));
    }
}
