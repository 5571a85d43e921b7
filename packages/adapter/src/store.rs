//! Persistence seams for the conversion pipeline.
//!
//! The mappers and the orchestrator only ever talk to these traits; the
//! server provides a relational implementation and previews run against
//! [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::graph::{
    DatasetGraph, LegacyRecord, OrganizationRecord, PersonRecord, TermKind, TermRecord,
};

/// Backing store for shared entities and dataset graphs.
///
/// Implementations must make `find_*` + `insert_*` atomic enough that two
/// concurrent conversions resolving the same reference-data URL cannot
/// create duplicate rows; the relational store does this with unique
/// constraints, the in-memory store with a single lock.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonRecord>, StoreError>;
    async fn get_organization(&self, id: Uuid) -> Result<Option<OrganizationRecord>, StoreError>;
    /// Look up a canonical term by vocabulary URL.
    async fn find_term(&self, kind: TermKind, url: &str) -> Result<Option<TermRecord>, StoreError>;
    /// Look up a reference-data organization by vocabulary URL.
    async fn find_reference_organization(
        &self,
        url: &str,
    ) -> Result<Option<OrganizationRecord>, StoreError>;

    async fn insert_person(&self, person: &PersonRecord) -> Result<(), StoreError>;
    async fn insert_organization(&self, organization: &OrganizationRecord)
    -> Result<(), StoreError>;
    async fn insert_term(&self, term: &TermRecord) -> Result<(), StoreError>;

    async fn get_legacy(&self, id: Uuid) -> Result<Option<LegacyRecord>, StoreError>;
    async fn save_legacy(&self, record: &LegacyRecord) -> Result<(), StoreError>;
    /// Load the fully materialized graph linked to a dataset id.
    async fn get_graph(&self, dataset_id: Uuid) -> Result<Option<DatasetGraph>, StoreError>;
    /// Persist a graph, replacing the previous children wholesale.
    async fn save_graph(&self, graph: &DatasetGraph) -> Result<(), StoreError>;
    async fn list_legacy_ids(&self, catalog: Option<&str>) -> Result<Vec<Uuid>, StoreError>;
}

/// One page of legacy documents from a remote V1/V2 service.
#[derive(Debug, Clone)]
pub struct LegacyPage {
    pub documents: Vec<Value>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// Paged reader over a remote legacy dataset API.
#[async_trait]
pub trait LegacySource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<LegacyPage, StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    persons: HashMap<Uuid, PersonRecord>,
    organizations: HashMap<Uuid, OrganizationRecord>,
    terms: HashMap<Uuid, TermRecord>,
    legacy: HashMap<Uuid, LegacyRecord>,
    graphs: HashMap<Uuid, DatasetGraph>,
}

/// Lock-backed store used in tests and dry-run previews.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().persons.get(&id).cloned())
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<OrganizationRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().organizations.get(&id).cloned())
    }

    async fn find_term(&self, kind: TermKind, url: &str) -> Result<Option<TermRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .terms
            .values()
            .find(|t| t.kind == kind && t.url.as_deref() == Some(url))
            .cloned())
    }

    async fn find_reference_organization(
        &self,
        url: &str,
    ) -> Result<Option<OrganizationRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .organizations
            .values()
            .find(|o| o.is_reference_data && o.url.as_deref() == Some(url))
            .cloned())
    }

    async fn insert_person(&self, person: &PersonRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .persons
            .insert(person.id, person.clone());
        Ok(())
    }

    async fn insert_organization(
        &self,
        organization: &OrganizationRecord,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .organizations
            .insert(organization.id, organization.clone());
        Ok(())
    }

    async fn insert_term(&self, term: &TermRecord) -> Result<(), StoreError> {
        self.inner.lock().unwrap().terms.insert(term.id, term.clone());
        Ok(())
    }

    async fn get_legacy(&self, id: Uuid) -> Result<Option<LegacyRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().legacy.get(&id).cloned())
    }

    async fn save_legacy(&self, record: &LegacyRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .legacy
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get_graph(&self, dataset_id: Uuid) -> Result<Option<DatasetGraph>, StoreError> {
        Ok(self.inner.lock().unwrap().graphs.get(&dataset_id).cloned())
    }

    async fn save_graph(&self, graph: &DatasetGraph) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .graphs
            .insert(graph.dataset.id, graph.clone());
        Ok(())
    }

    async fn list_legacy_ids(&self, catalog: Option<&str>) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut ids: Vec<Uuid> = inner
            .legacy
            .values()
            .filter(|r| match catalog {
                Some(catalog) => {
                    common::json::get_str(&r.raw_document, "data_catalog") == Some(catalog)
                        || r.raw_document
                            .get("data_catalog")
                            .and_then(|c| common::json::get_str(c, "identifier"))
                            == Some(catalog)
                }
                None => true,
            })
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory legacy source backed by a fixed document list; paging is
/// simulated with index cursors.
pub struct StaticLegacySource {
    documents: Vec<Value>,
    page_size: usize,
}

impl StaticLegacySource {
    pub fn new(documents: Vec<Value>, page_size: usize) -> Self {
        Self {
            documents,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl LegacySource for StaticLegacySource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<LegacyPage, StoreError> {
        let start: usize = match cursor {
            Some(cursor) => cursor
                .parse()
                .map_err(|_| StoreError::Internal(format!("bad cursor: {cursor}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(self.documents.len());
        let next = (end < self.documents.len()).then(|| end.to_string());
        Ok(LegacyPage {
            documents: self.documents[start..end].to_vec(),
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_finds_terms_by_kind_and_url() {
        let store = MemoryStore::new();
        let term = TermRecord {
            id: Uuid::new_v4(),
            kind: TermKind::AccessType,
            url: Some("http://uri.suomi.fi/codelist/fairdata/access_type/code/open".into()),
            pref_label: json!({"en": "Open"}),
            in_scheme: None,
            definition: None,
            deprecated: None,
        };
        store.insert_term(&term).await.unwrap();

        let found = store
            .find_term(
                TermKind::AccessType,
                "http://uri.suomi.fi/codelist/fairdata/access_type/code/open",
            )
            .await
            .unwrap();
        assert_eq!(found.as_ref().map(|t| t.id), Some(term.id));

        let miss = store
            .find_term(
                TermKind::License,
                "http://uri.suomi.fi/codelist/fairdata/access_type/code/open",
            )
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_static_source_pages_through_documents() {
        let source = StaticLegacySource::new(vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})], 2);

        let first = source.fetch_page(None).await.unwrap();
        assert_eq!(first.documents.len(), 2);
        let second = source.fetch_page(first.next.as_deref()).await.unwrap();
        assert_eq!(second.documents.len(), 1);
        assert!(second.next.is_none());
    }
}
