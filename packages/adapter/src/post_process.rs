//! Forward mapping, phase 2: list-valued children of the dataset.
//!
//! Runs once the dataset row exists. Unlike phase 1, mapping and
//! conflict failures here are collected per entry: a bad actor or
//! provenance entry is skipped and reported while its siblings keep
//! processing. Structural malformation (cyclic organization chains) and
//! store failures stay fatal and abort the record.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use common::dates::parse_date;
use common::json::join_path;

use crate::convert::{Annotations, DatasetDraft};
use crate::document::{
    ActorFragment, ConceptFragment, ProvenanceFragment, SpatialFragment, TemporalFragment,
};
use crate::error::{ConversionError, EntryError};
use crate::graph::{
    ActorRecord, DatasetGraph, ProvenanceRecord, Role, SpatialRecord, TemporalRecord, TermKind,
    TermRecord, VariableRecord,
};
use crate::resolver::Resolver;
use crate::store::CatalogStore;

/// Identity key for actor deduplication: resolved person and organization
/// row ids.
type ActorKey = (Option<Uuid>, Option<Uuid>);

/// Route one entry-level failure: mapping and conflict errors are
/// collected, anything structural or store-related propagates.
fn collect(
    path: String,
    error: ConversionError,
    errors: &mut Vec<EntryError>,
) -> Result<(), ConversionError> {
    match error {
        ConversionError::MalformedInput { .. } | ConversionError::Store(_) => Err(error),
        other => {
            debug!(path, %other, "skipping legacy entry");
            errors.push(EntryError::new(path, &other));
            Ok(())
        }
    }
}

pub async fn post_process<S: CatalogStore + ?Sized>(
    draft: DatasetDraft,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<(DatasetGraph, Vec<EntryError>), ConversionError> {
    let mut errors = Vec::new();
    let document = &draft.document;

    // Actors, scanned bucket by bucket in the fixed role order. The same
    // identity appearing in several buckets merges into one row.
    let mut actors: Vec<ActorRecord> = Vec::new();
    let mut by_identity: HashMap<ActorKey, usize> = HashMap::new();
    for role in Role::SCAN_ORDER {
        for (path, value) in document.role_bucket(role) {
            match resolve_actor(value, &path, resolver, annotations).await {
                Ok(actor) => {
                    let key = (
                        actor.person.as_ref().map(|p| p.id),
                        actor.organization.as_ref().map(|o| o.id),
                    );
                    match by_identity.get(&key) {
                        Some(&index) => {
                            if !actors[index].roles.contains(&role) {
                                actors[index].roles.push(role);
                            }
                        }
                        None => {
                            let mut actor = actor;
                            actor.roles = vec![role];
                            actor.position = actors.len() as i32;
                            by_identity.insert(key, actors.len());
                            actors.push(actor);
                        }
                    }
                }
                Err(error) => collect(path, error, &mut errors)?,
            }
        }
    }

    let mut provenance = Vec::new();
    for (path, value) in document.rd_list("provenance") {
        match map_provenance(value, &path, resolver, annotations).await {
            Ok(record) => provenance.push(record),
            Err(error) => collect(path, error, &mut errors)?,
        }
    }

    let mut spatial = Vec::new();
    for (path, value) in document.rd_list("spatial") {
        match map_spatial(value, &path, resolver, annotations).await {
            Ok(record) => spatial.push(record),
            Err(error) => collect(path, error, &mut errors)?,
        }
    }

    let mut temporal = Vec::new();
    for (path, value) in document.rd_list("temporal") {
        match TemporalFragment::parse(value, &path) {
            Ok(fragment) => temporal.push(map_temporal(&fragment, &path, annotations)),
            Err(error) => collect(path, error, &mut errors)?,
        }
    }

    let field_of_science = term_list(
        document.rd_list("field_of_science"),
        TermKind::FieldOfScience,
        "pref_label",
        resolver,
        annotations,
        &mut errors,
    )
    .await?;
    let theme = term_list(
        document.rd_list("theme"),
        TermKind::Theme,
        "pref_label",
        resolver,
        annotations,
        &mut errors,
    )
    .await?;
    // Language concepts label themselves under `title`.
    let language = term_list(
        document.rd_list("language"),
        TermKind::Language,
        "title",
        resolver,
        annotations,
        &mut errors,
    )
    .await?;

    let graph = DatasetGraph {
        dataset: draft.dataset,
        access_rights: draft.access_rights,
        actors,
        provenance,
        spatial,
        temporal,
        field_of_science,
        theme,
        language,
    };
    Ok((graph, errors))
}

async fn resolve_actor<S: CatalogStore + ?Sized>(
    value: &Value,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<ActorRecord, ConversionError> {
    let fragment = ActorFragment::parse(value, path)?;
    resolve_actor_fragment(&fragment, path, resolver, annotations).await
}

async fn resolve_actor_fragment<S: CatalogStore + ?Sized>(
    fragment: &ActorFragment,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<ActorRecord, ConversionError> {
    let (person, organization) = match fragment {
        ActorFragment::Person(person) => {
            let record = resolver.resolve_person(person, path, annotations).await?;
            let org = match &person.member_of {
                Some(org) => Some(
                    resolver
                        .resolve_organization(org, &join_path(path, "member_of"), annotations)
                        .await?,
                ),
                None => None,
            };
            (Some(record), org)
        }
        ActorFragment::Organization(org) => (
            None,
            Some(resolver.resolve_organization(org, path, annotations).await?),
        ),
    };
    Ok(ActorRecord {
        id: Uuid::new_v4(),
        roles: Vec::new(),
        position: 0,
        person,
        organization,
    })
}

async fn map_provenance<S: CatalogStore + ?Sized>(
    value: &Value,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<ProvenanceRecord, ConversionError> {
    let fragment = ProvenanceFragment::parse(value, path)?;

    let event_outcome = optional_term(
        TermKind::EventOutcome,
        &fragment.event_outcome,
        &join_path(path, "event_outcome"),
        resolver,
        annotations,
    )
    .await?;
    let lifecycle_event = optional_term(
        TermKind::LifecycleEvent,
        &fragment.lifecycle_event,
        &join_path(path, "lifecycle_event"),
        resolver,
        annotations,
    )
    .await?;
    let preservation_event = optional_term(
        TermKind::PreservationEvent,
        &fragment.preservation_event,
        &join_path(path, "preservation_event"),
        resolver,
        annotations,
    )
    .await?;

    let temporal = fragment
        .temporal
        .as_ref()
        .map(|t| map_temporal(t, &join_path(path, "temporal"), annotations));
    let spatial = match &fragment.spatial {
        Some(s) => Some(map_spatial_fragment(s, &join_path(path, "spatial"), resolver, annotations).await?),
        None => None,
    };

    let mut variables = Vec::new();
    for (var_path, var) in &fragment.variables {
        let concept = match &var.concept {
            Some(c) => Some(
                resolver
                    .resolve_inline_concept(c, &join_path(var_path, "concept"), annotations)
                    .await?,
            ),
            None => None,
        };
        let universe = match &var.universe {
            Some(u) => Some(
                resolver
                    .resolve_inline_concept(u, &join_path(var_path, "universe"), annotations)
                    .await?,
            ),
            None => None,
        };
        variables.push(VariableRecord {
            pref_label: var
                .pref_label
                .clone()
                .ok_or_else(|| {
                    ConversionError::mapping(join_path(var_path, "pref_label"), "value is required")
                })?,
            description: var.description.clone(),
            representation: var.representation.clone(),
            concept,
            universe,
        });
    }

    let mut is_associated_with = Vec::new();
    for (i, (actor_path, actor)) in fragment.was_associated_with.iter().enumerate() {
        let mut actor = resolve_actor_fragment(actor, actor_path, resolver, annotations).await?;
        actor.position = i as i32;
        is_associated_with.push(actor);
    }

    Ok(ProvenanceRecord {
        title: fragment.title,
        description: fragment.description,
        outcome_description: fragment.outcome_description,
        event_outcome,
        lifecycle_event,
        preservation_event,
        temporal,
        spatial,
        variables,
        is_associated_with,
    })
}

fn map_temporal(
    fragment: &TemporalFragment,
    path: &str,
    annotations: &mut Annotations,
) -> TemporalRecord {
    let (mut start_date, mut end_date) = {
        let mut date = |key: &str, raw: &Option<String>| {
            raw.as_deref().and_then(|raw| match parse_date(raw) {
                Some(date) => Some(date),
                None => {
                    annotations.mark_invalid(
                        &join_path(path, key),
                        Value::String(raw.to_string()),
                        "not a valid date",
                    );
                    None
                }
            })
        };
        (
            date("start_date", &fragment.start_date),
            date("end_date", &fragment.end_date),
        )
    };
    if let (Some(start), Some(end)) = (start_date, end_date)
        && end < start
    {
        annotations.mark_fixed(
            path,
            json!({"start_date": end.to_string(), "end_date": start.to_string()}),
            "swapped reversed date range",
        );
        (start_date, end_date) = (end_date, start_date);
    }
    TemporalRecord {
        start_date,
        end_date,
        temporal_coverage: fragment.temporal_coverage.clone(),
    }
}

async fn map_spatial<S: CatalogStore + ?Sized>(
    value: &Value,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<SpatialRecord, ConversionError> {
    let fragment = SpatialFragment::parse(value, path)?;
    map_spatial_fragment(&fragment, path, resolver, annotations).await
}

async fn map_spatial_fragment<S: CatalogStore + ?Sized>(
    fragment: &SpatialFragment,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<SpatialRecord, ConversionError> {
    let reference = match &fragment.place_uri {
        Some(place) => Some(
            resolver
                .resolve_term(
                    TermKind::Location,
                    place,
                    &join_path(path, "place_uri"),
                    annotations,
                )
                .await?,
        ),
        None => None,
    };
    Ok(SpatialRecord {
        geographic_name: fragment.geographic_name.clone(),
        full_address: fragment.full_address.clone(),
        altitude_in_meters: fragment.altitude.clone(),
        custom_wkt: fragment.as_wkt.clone(),
        reference,
    })
}

async fn term_list<S: CatalogStore + ?Sized>(
    entries: Vec<(String, &Value)>,
    kind: TermKind,
    label_key: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
    errors: &mut Vec<EntryError>,
) -> Result<Vec<TermRecord>, ConversionError> {
    let mut terms: Vec<TermRecord> = Vec::new();
    for (path, value) in entries {
        let result = match ConceptFragment::parse_with_label_key(value, &path, label_key) {
            Ok(fragment) => resolver.resolve_term(kind, &fragment, &path, annotations).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(term) => {
                if !terms.iter().any(|t| t.id == term.id) {
                    terms.push(term);
                }
            }
            Err(error) => collect(path, error, errors)?,
        }
    }
    Ok(terms)
}

async fn optional_term<S: CatalogStore + ?Sized>(
    kind: TermKind,
    concept: &Option<ConceptFragment>,
    path: &str,
    resolver: &mut Resolver<'_, S>,
    annotations: &mut Annotations,
) -> Result<Option<TermRecord>, ConversionError> {
    match concept {
        Some(concept) => Ok(Some(
            resolver.resolve_term(kind, concept, path, annotations).await?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::convert::prepare;
    use crate::document::LegacyDocument;
    use crate::resolver::{ConvertOptions, ResolutionScope};
    use crate::store::MemoryStore;

    use super::*;

    async fn run(document: Value) -> (DatasetGraph, Vec<EntryError>) {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let document = LegacyDocument::new(document).unwrap();
        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        post_process(draft, &mut resolver, &mut annotations)
            .await
            .unwrap()
    }

    fn base(rd: Value) -> Value {
        json!({
            "identifier": "c955e904-e3dd-4d7e-99f1-3fed446f96d1",
            "date_created": "2019-09-25",
            "research_dataset": rd,
        })
    }

    #[tokio::test]
    async fn test_actor_appearing_in_two_buckets_collapses() {
        let (graph, errors) = run(base(json!({
            "title": {"en": "x"},
            "creator": [{"@type": "Person", "name": "A"}],
            "publisher": {"@type": "Person", "name": "A"},
        })))
        .await;

        assert!(errors.is_empty());
        assert_eq!(graph.actors.len(), 1);
        assert_eq!(graph.actors[0].roles, vec![Role::Creator, Role::Publisher]);
    }

    #[tokio::test]
    async fn test_actor_order_follows_bucket_scan() {
        let (graph, _) = run(base(json!({
            "title": {"en": "x"},
            "curator": [{"@type": "Person", "name": "C"}],
            "creator": [
                {"@type": "Person", "name": "A"},
                {"@type": "Person", "name": "B"},
            ],
        })))
        .await;

        let names: Vec<_> = graph
            .actors
            .iter()
            .map(|a| a.person.as_ref().unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(graph.actors[2].position, 2);
    }

    #[tokio::test]
    async fn test_bad_actor_entry_is_skipped_not_fatal() {
        let (graph, errors) = run(base(json!({
            "title": {"en": "x"},
            "creator": [
                {"@type": "Person", "name": "A"},
                {"@type": "Cyborg", "name": "B"},
                {"@type": "Person", "name": "C"},
            ],
        })))
        .await;

        assert_eq!(graph.actors.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "research_dataset.creator[1]");
    }

    #[tokio::test]
    async fn test_person_with_member_of_links_both() {
        let (graph, errors) = run(base(json!({
            "title": {"en": "x"},
            "creator": [{
                "@type": "Person",
                "name": "A",
                "member_of": {"name": {"en": "Org"}},
            }],
        })))
        .await;

        assert!(errors.is_empty());
        let actor = &graph.actors[0];
        assert!(actor.person.is_some());
        assert!(actor.organization.is_some());
    }

    #[tokio::test]
    async fn test_provenance_with_variables_and_association() {
        let (graph, errors) = run(base(json!({
            "title": {"en": "x"},
            "provenance": [{
                "title": {"en": "Collection"},
                "lifecycle_event": {
                    "identifier": "http://uri.suomi.fi/codelist/fairdata/lifecycle_event/code/collected",
                    "pref_label": {"en": "Collected"},
                },
                "temporal": {"start_date": "2018-01-01", "end_date": "2018-12-31"},
                "variable": [{"pref_label": {"en": "temperature"}}],
                "was_associated_with": [{"@type": "Person", "name": "A"}],
            }],
        })))
        .await;

        assert!(errors.is_empty(), "{errors:?}");
        let prov = &graph.provenance[0];
        assert!(prov.lifecycle_event.is_some());
        assert_eq!(prov.variables.len(), 1);
        assert_eq!(prov.is_associated_with.len(), 1);
        assert!(prov.temporal.as_ref().unwrap().start_date.is_some());
    }

    #[tokio::test]
    async fn test_reversed_temporal_range_is_swapped_and_marked() {
        let store = MemoryStore::new();
        let opts = ConvertOptions::default();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let document = LegacyDocument::new(base(json!({
            "title": {"en": "x"},
            "temporal": [{"start_date": "2020-12-31", "end_date": "2020-01-01"}],
        })))
        .unwrap();

        let draft = prepare(&document, &mut resolver, &mut annotations)
            .await
            .unwrap();
        let (graph, errors) = post_process(draft, &mut resolver, &mut annotations)
            .await
            .unwrap();

        assert!(errors.is_empty());
        let t = &graph.temporal[0];
        assert_eq!(t.start_date.unwrap().to_string(), "2020-01-01");
        assert_eq!(t.end_date.unwrap().to_string(), "2020-12-31");
        assert_eq!(annotations.fixed.len(), 1);
        assert_eq!(annotations.fixed[0].path, "research_dataset.temporal[0]");
    }

    #[tokio::test]
    async fn test_language_terms_use_title_label() {
        let (graph, errors) = run(base(json!({
            "title": {"en": "x"},
            "language": [{
                "identifier": "http://lexvo.org/id/iso639-3/fin",
                "title": {"en": "Finnish"},
            }],
        })))
        .await;

        assert!(errors.is_empty());
        assert_eq!(graph.language.len(), 1);
        assert_eq!(graph.language[0].pref_label, json!({"en": "Finnish"}));
    }
}
