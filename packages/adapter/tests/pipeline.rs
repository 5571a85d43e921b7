//! End-to-end pipeline tests against the in-memory store.

use std::sync::atomic::AtomicBool;

use serde_json::{Value, json};
use uuid::Uuid;

use adapter::graph::{OrganizationRecord, Role};
use adapter::{
    CatalogStore, LegacyRecord, MemoryStore, PipelineOptions, StaticLegacySource, StoreSink,
    migrate_batch, migrate_stored, on_save,
};

fn document(id: &str, rd: Value) -> Value {
    json!({
        "identifier": id,
        "date_created": "2019-09-25T16:34:00+03:00",
        "research_dataset": rd,
    })
}

const ID_1: &str = "11111111-1111-4111-8111-111111111111";
const ID_2: &str = "22222222-2222-4222-8222-222222222222";
const ID_3: &str = "33333333-3333-4333-8333-333333333333";

#[tokio::test]
async fn test_creator_and_publisher_collapse_with_empty_diff() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let record = LegacyRecord::from_document(document(
        ID_1,
        json!({
            "title": {"en": "Shared actor"},
            "creator": [{"@type": "Person", "name": "A"}],
            "publisher": {"@type": "Person", "name": "A"},
        }),
    ))
    .unwrap();

    let outcome = on_save(&store, record, &options).await.unwrap();
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.graph.actors.len(), 1);
    assert_eq!(
        outcome.graph.actors[0].roles,
        vec![Role::Creator, Role::Publisher]
    );
    assert!(outcome.diff.is_empty(), "{:?}", outcome.diff);
    assert_eq!(outcome.record.dataset_id, Some(outcome.graph.dataset.id));
    assert!(outcome.record.last_successful_migration.is_some());
}

#[tokio::test]
async fn test_on_save_is_idempotent() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let record = LegacyRecord::from_document(document(
        ID_1,
        json!({
            "title": {"en": "Stable"},
            "creator": [
                {"@type": "Person", "name": "A", "email": "a@example.com"},
                {"@type": "Organization", "name": {"en": "Org"}},
            ],
            "field_of_science": [{
                "identifier": "http://www.yso.fi/onto/okm-tieteenala/ta111",
                "pref_label": {"en": "Mathematics"},
            }],
            "provenance": [{"title": {"en": "Collected"}}],
        }),
    ))
    .unwrap();

    let first = on_save(&store, record, &options).await.unwrap();
    let second = on_save(&store, first.record.clone(), &options)
        .await
        .unwrap();

    assert_eq!(first.graph.dataset.id, second.graph.dataset.id);
    assert_eq!(second.graph.actors.len(), 2);
    assert_eq!(second.graph.provenance.len(), 1);

    // resolved entities keep their row ids across runs
    let persons =
        |g: &adapter::DatasetGraph| -> Vec<Uuid> {
            g.actors.iter().filter_map(|a| a.person.as_ref().map(|p| p.id)).collect()
        };
    assert_eq!(persons(&first.graph), persons(&second.graph));
    assert_eq!(
        first.graph.field_of_science[0].id,
        second.graph.field_of_science[0].id
    );
    assert_eq!(first.diff.to_json(), second.diff.to_json());
}

#[tokio::test]
async fn test_editing_raw_document_rederives_the_dataset() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let record = LegacyRecord::from_document(document(
        ID_1,
        json!({"title": {"en": "Before"}, "keyword": ["old"]}),
    ))
    .unwrap();
    let first = on_save(&store, record, &options).await.unwrap();

    let mut edited = first.record.clone();
    edited.raw_document = document(ID_1, json!({"title": {"en": "After"}}));
    let second = on_save(&store, edited, &options).await.unwrap();

    assert_eq!(second.graph.dataset.id, first.graph.dataset.id);
    assert_eq!(second.graph.dataset.title, json!({"en": "After"}));
    assert!(second.graph.dataset.keyword.is_empty());

    let stored = store
        .get_graph(first.graph.dataset.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.dataset.title, json!({"en": "After"}));
}

#[tokio::test]
async fn test_reference_data_label_wins_over_supplied() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let url = "http://uri.suomi.fi/codelist/fairdata/organization/code/01901";
    store
        .insert_organization(&OrganizationRecord {
            id: Uuid::new_v4(),
            pref_label: json!({"en": "University of Helsinki"}),
            url: Some(url.to_string()),
            external_identifier: None,
            email: None,
            homepage: None,
            parent: None,
            is_reference_data: true,
            in_scheme: None,
            deprecated: None,
        })
        .await
        .unwrap();

    let record = LegacyRecord::from_document(document(
        ID_1,
        json!({
            "title": {"en": "x"},
            "creator": [{
                "@type": "Organization",
                "identifier": url,
                "name": {"en": "Totally Wrong Name"},
            }],
        }),
    ))
    .unwrap();
    let outcome = on_save(&store, record, &options).await.unwrap();

    let org = outcome.graph.actors[0].organization.as_ref().unwrap();
    assert_eq!(org.pref_label, json!({"en": "University of Helsinki"}));
}

#[tokio::test]
async fn test_bad_entries_are_reported_on_the_record() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let record = LegacyRecord::from_document(document(
        ID_1,
        json!({
            "title": {"en": "x"},
            "creator": [
                {"@type": "Person", "name": "A"},
                {"@type": "Mystery", "name": "B"},
            ],
        }),
    ))
    .unwrap();

    let outcome = on_save(&store, record, &options).await.unwrap();
    assert_eq!(outcome.graph.actors.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].path, "research_dataset.creator[1]");
    assert!(outcome.record.migration_errors.is_some());
}

#[tokio::test]
async fn test_batch_isolates_cyclic_organization_failure() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let good = |id: &str| {
        document(
            id,
            json!({"title": {"en": "ok"}, "creator": [{"@type": "Person", "name": "A"}]}),
        )
    };
    // identifier repeats along its own parent chain
    let cyclic = document(
        ID_2,
        json!({
            "title": {"en": "bad"},
            "creator": [{
                "@type": "Organization",
                "identifier": "org-a",
                "name": {"en": "A"},
                "is_part_of": {"identifier": "org-a", "name": {"en": "A again"}},
            }],
        }),
    );

    let source = StaticLegacySource::new(vec![good(ID_1), cyclic, good(ID_3)], 2);
    let sink = StoreSink {
        store: &store,
        options: &options,
    };
    let stop = AtomicBool::new(false);
    let summary = migrate_batch(&source, &sink, 10, None, &stop).await.unwrap();

    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].identifier.as_deref(), Some(ID_2));
    assert!(summary.failed[0].detail.contains("cyclic"));
    assert!(summary.next_cursor.is_none());

    // the failing record did not stop its neighbors from persisting
    let id_1: Uuid = ID_1.parse().unwrap();
    let id_3: Uuid = ID_3.parse().unwrap();
    assert!(store.get_legacy(id_1).await.unwrap().is_some());
    assert!(store.get_legacy(id_3).await.unwrap().is_some());
    assert!(store.get_legacy(ID_2.parse().unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_batch_honors_cooperative_stop() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let source = StaticLegacySource::new(
        vec![document(ID_1, json!({"title": {"en": "x"}}))],
        10,
    );
    let sink = StoreSink {
        store: &store,
        options: &options,
    };
    let stop = AtomicBool::new(true);

    let summary = migrate_batch(&source, &sink, 10, None, &stop).await.unwrap();
    assert!(summary.stopped);
    assert!(summary.succeeded.is_empty());
    assert!(summary.failed.is_empty());
}

#[tokio::test]
async fn test_stored_records_can_be_remigrated_per_catalog() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let mut in_catalog = document(ID_1, json!({"title": {"en": "a"}}));
    in_catalog["data_catalog"] = json!({"identifier": "urn:nbn:fi:att:data-catalog-ida"});
    let outside = document(ID_2, json!({"title": {"en": "b"}}));

    for doc in [in_catalog, outside] {
        let record = LegacyRecord::from_document(doc).unwrap();
        on_save(&store, record, &options).await.unwrap();
    }

    let sink = StoreSink {
        store: &store,
        options: &options,
    };
    let stop = AtomicBool::new(false);
    let summary = migrate_stored(
        &store,
        &sink,
        Some("urn:nbn:fi:att:data-catalog-ida"),
        10,
        &stop,
    )
    .await
    .unwrap();

    assert_eq!(summary.succeeded, vec![ID_1.parse::<Uuid>().unwrap()]);
    assert!(summary.failed.is_empty());

    let all = migrate_stored(&store, &sink, None, 10, &stop).await.unwrap();
    assert_eq!(all.succeeded.len(), 2);
}

#[tokio::test]
async fn test_limit_below_page_size_still_reports_a_resume_cursor() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let docs: Vec<Value> = [ID_1, ID_2, ID_3]
        .iter()
        .map(|id| document(id, json!({"title": {"en": "x"}})))
        .collect();
    let source = StaticLegacySource::new(docs, 2);
    let sink = StoreSink {
        store: &store,
        options: &options,
    };
    let stop = AtomicBool::new(false);

    // the limit lands mid-page: the whole fetched page is processed and
    // the cursor points at the remainder
    let summary = migrate_batch(&source, &sink, 1, None, &stop).await.unwrap();
    assert_eq!(summary.succeeded.len(), 2);
    assert!(!summary.stopped);
    assert_eq!(summary.next_cursor.as_deref(), Some("2"));

    let resumed = migrate_batch(&source, &sink, 1, summary.next_cursor.as_deref(), &stop)
        .await
        .unwrap();
    assert_eq!(resumed.succeeded.len(), 1);
    assert!(resumed.next_cursor.is_none());

    // no record fell between the two runs
    for id in [ID_1, ID_2, ID_3] {
        assert!(store.get_legacy(id.parse().unwrap()).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_batch_respects_limit_and_returns_cursor() {
    let store = MemoryStore::new();
    let options = PipelineOptions::default();
    let docs: Vec<Value> = [ID_1, ID_2, ID_3]
        .iter()
        .map(|id| document(id, json!({"title": {"en": "x"}})))
        .collect();
    let source = StaticLegacySource::new(docs, 1);
    let sink = StoreSink {
        store: &store,
        options: &options,
    };
    let stop = AtomicBool::new(false);

    let summary = migrate_batch(&source, &sink, 2, None, &stop).await.unwrap();
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.next_cursor.as_deref(), Some("2"));

    let resumed = migrate_batch(&source, &sink, 2, summary.next_cursor.as_deref(), &stop)
        .await
        .unwrap();
    assert_eq!(resumed.succeeded.len(), 1);
    assert!(resumed.next_cursor.is_none());
}
