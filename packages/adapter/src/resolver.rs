//! Entity resolution for persons, organizations and reference-data terms.
//!
//! Identity precedence is fixed: an explicit internal id wins, then a
//! reference-data URL, then a scoped match on comparison fields; only
//! when all three miss is a new row created. Rows created here for
//! URL-bearing entities are persisted immediately so concurrent
//! conversions converge on the same row.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use common::json::join_path;
use common::lang::{single_translation, und_map};

use crate::convert::Annotations;
use crate::document::{
    ConceptFragment, HomepageFragment, OrganizationFragment, PersonFragment, fix_url,
    is_valid_email, is_valid_url,
};
use crate::error::ConversionError;
use crate::graph::{
    DatasetGraph, Homepage, OrganizationRecord, PersonRecord, TermKind, TermRecord,
};
use crate::store::CatalogStore;

/// Tunables for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Scheme URL assigned to organizations minted from bare URLs.
    pub organization_scheme: String,
    /// Identifiers under this prefix denote reference-data organizations.
    pub organization_base_uri: String,
    /// Upper bound on `is_part_of` chain length.
    pub max_organization_depth: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            organization_scheme: "http://uri.suomi.fi/codelist/fairdata/organization".to_string(),
            organization_base_uri: "http://uri.suomi.fi/codelist/fairdata/organization/code/"
                .to_string(),
            max_organization_depth: 10,
        }
    }
}

type PersonKey = (String, String, String);
type OrgKey = (Option<Uuid>, String);

/// Per-conversion entity caches. Seeding from the previously linked graph
/// makes re-runs reuse existing row ids instead of minting new ones.
#[derive(Default)]
pub struct ResolutionScope {
    persons_by_key: HashMap<PersonKey, PersonRecord>,
    orgs_by_url: HashMap<String, OrganizationRecord>,
    orgs_by_key: HashMap<OrgKey, OrganizationRecord>,
    terms_by_url: HashMap<(TermKind, String), TermRecord>,
}

impl ResolutionScope {
    pub fn seed_from_graph(&mut self, graph: &DatasetGraph) {
        let mut actors = graph.actors.iter().collect::<Vec<_>>();
        for provenance in &graph.provenance {
            actors.extend(provenance.is_associated_with.iter());
        }
        for actor in actors {
            if let Some(person) = &actor.person {
                self.cache_person(person.clone());
            }
            if let Some(org) = &actor.organization {
                self.cache_organization_chain(org);
            }
        }
        let terms = graph
            .field_of_science
            .iter()
            .chain(graph.theme.iter())
            .chain(graph.language.iter())
            .chain(graph.access_rights.iter().flat_map(|ar| {
                ar.access_type
                    .iter()
                    .chain(ar.restriction_grounds.iter())
                    .chain(ar.license.iter().filter_map(|l| l.reference.as_ref()))
            }));
        for term in terms {
            self.cache_term(term.clone());
        }
    }

    fn cache_person(&mut self, person: PersonRecord) {
        self.persons_by_key.insert(person_key(&person), person);
    }

    fn cache_organization_chain(&mut self, org: &OrganizationRecord) {
        if let Some(parent) = &org.parent {
            self.cache_organization_chain(parent);
        }
        if let Some(url) = &org.url {
            self.orgs_by_url.insert(url.clone(), org.clone());
        }
        if let Some(label) = single_translation(&org.pref_label) {
            let parent_id = org.parent.as_ref().map(|p| p.id);
            self.orgs_by_key.insert((parent_id, label), org.clone());
        }
    }

    pub fn cache_term(&mut self, term: TermRecord) {
        if let Some(url) = &term.url {
            self.terms_by_url.insert((term.kind, url.clone()), term);
        }
    }
}

fn person_key(person: &PersonRecord) -> PersonKey {
    (
        person.name.clone(),
        person.email.clone().unwrap_or_default(),
        person.external_identifier.clone().unwrap_or_default(),
    )
}

fn fragment_person_key(fragment: &PersonFragment) -> PersonKey {
    (
        fragment.name.clone(),
        fragment.email.clone().unwrap_or_default(),
        fragment.external_identifier.clone().unwrap_or_default(),
    )
}

fn to_homepage(fragment: &Option<HomepageFragment>) -> Option<Homepage> {
    fragment.as_ref().map(|h| Homepage {
        url: h.url.clone(),
        title: h.title.clone(),
    })
}

/// Compare a supplied value against a stored one; a non-empty mismatch is
/// a conflict, absence on either side is not.
fn check_conflict(
    field: &str,
    supplied: Option<&str>,
    stored: Option<&str>,
) -> Result<(), ConversionError> {
    if let (Some(supplied), Some(stored)) = (supplied, stored)
        && !supplied.is_empty()
        && supplied != stored
    {
        return Err(ConversionError::conflict(
            field,
            format!("supplied '{supplied}' does not match stored '{stored}'"),
        ));
    }
    Ok(())
}

pub struct Resolver<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    options: &'a ConvertOptions,
    scope: ResolutionScope,
}

impl<'a, S: CatalogStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, options: &'a ConvertOptions, scope: ResolutionScope) -> Self {
        Self {
            store,
            options,
            scope,
        }
    }

    pub async fn resolve_person(
        &mut self,
        fragment: &PersonFragment,
        path: &str,
        annotations: &mut Annotations,
    ) -> Result<PersonRecord, ConversionError> {
        // 1. explicit internal id
        if let Some(id) = fragment.id {
            let stored = self
                .store
                .get_person(id)
                .await?
                .ok_or_else(|| ConversionError::mapping(join_path(path, "id"), "unknown person id"))?;
            check_conflict("name", Some(&fragment.name), Some(&stored.name))?;
            check_conflict("email", fragment.email.as_deref(), stored.email.as_deref())?;
            check_conflict(
                "identifier",
                fragment.external_identifier.as_deref(),
                stored.external_identifier.as_deref(),
            )?;
            self.scope.cache_person(stored.clone());
            return Ok(stored);
        }

        let mut fragment = fragment.clone();
        if let Some(email) = &fragment.email
            && !is_valid_email(email)
        {
            annotations.mark_invalid(
                &join_path(path, "email"),
                Value::String(email.clone()),
                "not a valid email address",
            );
            fragment.email = None;
        }

        // 2. scoped comparison-data match
        if let Some(existing) = self.scope.persons_by_key.get(&fragment_person_key(&fragment)) {
            return Ok(existing.clone());
        }

        // 3. create
        let person = PersonRecord {
            id: Uuid::new_v4(),
            name: fragment.name.clone(),
            email: fragment.email.clone(),
            external_identifier: fragment.external_identifier.clone(),
            homepage: to_homepage(&fragment.homepage),
        };
        self.store.insert_person(&person).await?;
        self.scope.cache_person(person.clone());
        Ok(person)
    }

    pub async fn resolve_organization(
        &mut self,
        fragment: &OrganizationFragment,
        path: &str,
        annotations: &mut Annotations,
    ) -> Result<OrganizationRecord, ConversionError> {
        let mut seen = HashSet::new();
        self.resolve_organization_inner(fragment, path, annotations, 0, &mut seen)
            .await
    }

    async fn resolve_organization_inner(
        &mut self,
        fragment: &OrganizationFragment,
        path: &str,
        annotations: &mut Annotations,
        depth: usize,
        seen: &mut HashSet<String>,
    ) -> Result<OrganizationRecord, ConversionError> {
        if depth >= self.options.max_organization_depth {
            return Err(ConversionError::malformed(
                path,
                format!(
                    "organization parent chain exceeds {} levels",
                    self.options.max_organization_depth
                ),
            ));
        }
        if let Some(identifier) = &fragment.identifier
            && !seen.insert(identifier.clone())
        {
            return Err(ConversionError::malformed(
                path,
                format!("cyclic organization parent chain at '{identifier}'"),
            ));
        }

        // Parents resolve first so a child can link to the resolved row.
        let parent = match &fragment.parent {
            Some(parent) => Some(Box::new(
                Box::pin(self.resolve_organization_inner(
                    parent,
                    &join_path(path, "is_part_of"),
                    annotations,
                    depth + 1,
                    seen,
                ))
                .await?,
            )),
            None => None,
        };

        // 1. explicit internal id
        if let Some(id) = fragment.id {
            let stored = self.store.get_organization(id).await?.ok_or_else(|| {
                ConversionError::mapping(join_path(path, "id"), "unknown organization id")
            })?;
            let supplied = fragment.name.as_ref().and_then(single_translation);
            let existing = single_translation(&stored.pref_label);
            check_conflict("pref_label", supplied.as_deref(), existing.as_deref())?;
            check_conflict("email", fragment.email.as_deref(), stored.email.as_deref())?;
            check_conflict(
                "identifier",
                fragment.identifier.as_deref(),
                stored.external_identifier.as_deref(),
            )?;
            self.scope.cache_organization_chain(&stored);
            return Ok(stored);
        }

        // 2. reference-data URL
        if let Some(identifier) = &fragment.identifier
            && is_valid_url(identifier)
        {
            let (url, fixed) = fix_url(identifier);
            if fixed {
                annotations.mark_fixed(
                    &join_path(path, "identifier"),
                    Value::String(url.clone()),
                    "cleaned whitespace in URL",
                );
            }
            if let Some(cached) = self.scope.orgs_by_url.get(&url) {
                return Ok(cached.clone());
            }
            if let Some(stored) = self.store.find_reference_organization(&url).await? {
                // Canonical record wins over supplied labels.
                self.scope.cache_organization_chain(&stored);
                return Ok(stored);
            }
            if url.starts_with(&self.options.organization_base_uri) {
                // Unknown code in the organization vocabulary: mint a
                // deprecated reference row so later datasets reuse it.
                let org = OrganizationRecord {
                    id: Uuid::new_v4(),
                    pref_label: org_label(fragment, &url),
                    url: Some(url),
                    external_identifier: None,
                    email: fragment.email.clone(),
                    homepage: to_homepage(&fragment.homepage),
                    parent,
                    is_reference_data: true,
                    in_scheme: Some(self.options.organization_scheme.clone()),
                    deprecated: Some(Utc::now()),
                };
                self.store.insert_organization(&org).await?;
                self.scope.cache_organization_chain(&org);
                return Ok(org);
            }
        }

        // 3. scoped match on (parent, label)
        let label = org_label(fragment, "");
        let key = (
            parent.as_ref().map(|p| p.id),
            single_translation(&label).unwrap_or_default(),
        );
        if let Some(existing) = self.scope.orgs_by_key.get(&key) {
            return Ok(existing.clone());
        }

        // 4. create a dataset-scoped organization
        let org = OrganizationRecord {
            id: Uuid::new_v4(),
            pref_label: label,
            url: None,
            external_identifier: fragment.identifier.clone(),
            email: fragment.email.clone(),
            homepage: to_homepage(&fragment.homepage),
            parent,
            is_reference_data: false,
            in_scheme: None,
            deprecated: None,
        };
        self.store.insert_organization(&org).await?;
        self.scope.cache_organization_chain(&org);
        Ok(org)
    }

    /// Resolve a concept against a controlled vocabulary. Terms without a
    /// usable identifier are rejected for vocabulary-bound kinds.
    pub async fn resolve_term(
        &mut self,
        kind: TermKind,
        fragment: &ConceptFragment,
        path: &str,
        annotations: &mut Annotations,
    ) -> Result<TermRecord, ConversionError> {
        let identifier = fragment
            .identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConversionError::mapping(join_path(path, "identifier"), "value is required")
            })?;
        if !is_valid_url(identifier) {
            return Err(ConversionError::mapping(
                join_path(path, "identifier"),
                format!("'{identifier}' is not a vocabulary URL"),
            ));
        }
        let (url, fixed) = fix_url(identifier);
        if fixed {
            annotations.mark_fixed(
                &join_path(path, "identifier"),
                Value::String(url.clone()),
                "cleaned whitespace in URL",
            );
        }

        if let Some(cached) = self.scope.terms_by_url.get(&(kind, url.clone())) {
            return Ok(cached.clone());
        }
        if let Some(stored) = self.store.find_term(kind, &url).await? {
            // Canonical labels overwrite whatever the document supplied.
            self.scope.cache_term(stored.clone());
            return Ok(stored);
        }

        let term = TermRecord {
            id: Uuid::new_v4(),
            kind,
            pref_label: fragment
                .pref_label
                .clone()
                .unwrap_or_else(|| und_map(last_url_segment(&url))),
            in_scheme: fragment.in_scheme.clone(),
            definition: fragment.definition.clone(),
            deprecated: Some(Utc::now()),
            url: Some(url),
        };
        self.store.insert_term(&term).await?;
        self.scope.cache_term(term.clone());
        Ok(term)
    }

    /// Concepts that may legitimately lack an identifier (variable
    /// concept/universe). Identifier-less concepts stay graph-local.
    pub async fn resolve_inline_concept(
        &mut self,
        fragment: &ConceptFragment,
        path: &str,
        annotations: &mut Annotations,
    ) -> Result<TermRecord, ConversionError> {
        if fragment
            .identifier
            .as_deref()
            .is_some_and(|id| is_valid_url(id))
        {
            return self
                .resolve_term(TermKind::Concept, fragment, path, annotations)
                .await;
        }
        Ok(TermRecord {
            id: Uuid::new_v4(),
            kind: TermKind::Concept,
            url: None,
            pref_label: fragment
                .pref_label
                .clone()
                .unwrap_or_else(|| und_map("concept")),
            in_scheme: fragment.in_scheme.clone(),
            definition: fragment.definition.clone(),
            deprecated: None,
        })
    }

    pub fn into_scope(self) -> ResolutionScope {
        self.scope
    }
}

fn org_label(fragment: &OrganizationFragment, url: &str) -> Value {
    match &fragment.name {
        Some(name @ Value::Object(_)) => name.clone(),
        Some(Value::String(s)) => und_map(s),
        _ if !url.is_empty() => und_map(last_url_segment(url)),
        _ => und_map("organization"),
    }
}

fn last_url_segment(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::store::MemoryStore;

    use super::*;

    fn options() -> ConvertOptions {
        ConvertOptions::default()
    }

    #[tokio::test]
    async fn test_reference_organization_reuses_stored_row() {
        let store = MemoryStore::new();
        let url = "http://uri.suomi.fi/codelist/fairdata/organization/code/01901";
        let canonical = OrganizationRecord {
            id: Uuid::new_v4(),
            pref_label: json!({"en": "University of Helsinki"}),
            url: Some(url.to_string()),
            external_identifier: None,
            email: None,
            homepage: None,
            parent: None,
            is_reference_data: true,
            in_scheme: Some(options().organization_scheme),
            deprecated: None,
        };
        store.insert_organization(&canonical).await.unwrap();

        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = OrganizationFragment::parse(
            &json!({"identifier": url, "name": {"en": "Stale Name"}}),
            "o",
        )
        .unwrap();

        let resolved = resolver
            .resolve_organization(&fragment, "o", &mut annotations)
            .await
            .unwrap();
        assert_eq!(resolved.id, canonical.id);
        // canonical label wins over the document's stale copy
        assert_eq!(resolved.pref_label, json!({"en": "University of Helsinki"}));
    }

    #[tokio::test]
    async fn test_unknown_vocabulary_code_mints_deprecated_row() {
        let store = MemoryStore::new();
        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = OrganizationFragment::parse(
            &json!({
                "identifier": "http://uri.suomi.fi/codelist/fairdata/organization/code/99999",
                "name": {"en": "Ghost Org"},
            }),
            "o",
        )
        .unwrap();

        let resolved = resolver
            .resolve_organization(&fragment, "o", &mut annotations)
            .await
            .unwrap();
        assert!(resolved.is_reference_data);
        assert!(resolved.deprecated.is_some());

        // second resolution returns the same row
        let again = resolver
            .resolve_organization(&fragment, "o", &mut annotations)
            .await
            .unwrap();
        assert_eq!(again.id, resolved.id);
    }

    #[tokio::test]
    async fn test_person_conflict_on_explicit_id() {
        let store = MemoryStore::new();
        let stored = PersonRecord {
            id: Uuid::new_v4(),
            name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            external_identifier: None,
            homepage: None,
        };
        store.insert_person(&stored).await.unwrap();

        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = PersonFragment {
            id: Some(stored.id),
            name: "Someone Else".to_string(),
            email: None,
            external_identifier: None,
            homepage: None,
            member_of: None,
        };

        let err = resolver
            .resolve_person(&fragment, "p", &mut annotations)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Conflict { .. }));

        // the stored row is left untouched
        let after = store.get_person(stored.id).await.unwrap().unwrap();
        assert_eq!(after, stored);
    }

    #[tokio::test]
    async fn test_organization_conflict_on_explicit_id() {
        let store = MemoryStore::new();
        let stored = OrganizationRecord {
            id: Uuid::new_v4(),
            pref_label: json!({"en": "Research Institute"}),
            url: None,
            external_identifier: None,
            email: Some("office@example.org".to_string()),
            homepage: None,
            parent: None,
            is_reference_data: false,
            in_scheme: None,
            deprecated: None,
        };
        store.insert_organization(&stored).await.unwrap();

        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = OrganizationFragment {
            id: Some(stored.id),
            name: Some(json!({"en": "Research Institute"})),
            identifier: None,
            email: Some("someone-else@example.org".to_string()),
            homepage: None,
            parent: None,
        };

        let err = resolver
            .resolve_organization(&fragment, "o", &mut annotations)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::Conflict { ref field, .. } if field == "email"));

        let after = store.get_organization(stored.id).await.unwrap().unwrap();
        assert_eq!(after, stored);
    }

    #[tokio::test]
    async fn test_invalid_email_is_dropped_and_marked() {
        let store = MemoryStore::new();
        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = PersonFragment {
            id: None,
            name: "Jane Doe".to_string(),
            email: Some("not-an-email".to_string()),
            external_identifier: None,
            homepage: None,
            member_of: None,
        };

        let person = resolver
            .resolve_person(&fragment, "research_dataset.creator[0]", &mut annotations)
            .await
            .unwrap();
        assert!(person.email.is_none());
        assert_eq!(annotations.invalid.len(), 1);
        assert_eq!(
            annotations.invalid[0].path,
            "research_dataset.creator[0].email"
        );
    }

    #[tokio::test]
    async fn test_cyclic_parent_chain_is_rejected_by_depth() {
        let store = MemoryStore::new();
        let opts = ConvertOptions {
            max_organization_depth: 3,
            ..options()
        };
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();

        let deep = json!({
            "name": {"en": "a"},
            "is_part_of": {"name": {"en": "b"}, "is_part_of": {
                "name": {"en": "c"}, "is_part_of": {"name": {"en": "d"}}
            }}
        });
        let fragment = OrganizationFragment::parse(&deep, "o").unwrap();
        let err = resolver
            .resolve_organization(&fragment, "o", &mut annotations)
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn test_term_gets_canonical_label() {
        let store = MemoryStore::new();
        let url = "http://uri.suomi.fi/codelist/fairdata/access_type/code/open";
        let canonical = TermRecord {
            id: Uuid::new_v4(),
            kind: TermKind::AccessType,
            url: Some(url.to_string()),
            pref_label: json!({"en": "Open", "fi": "Avoin"}),
            in_scheme: None,
            definition: None,
            deprecated: None,
        };
        store.insert_term(&canonical).await.unwrap();

        let opts = options();
        let mut resolver = Resolver::new(&store, &opts, ResolutionScope::default());
        let mut annotations = Annotations::default();
        let fragment = ConceptFragment {
            identifier: Some(url.to_string()),
            pref_label: Some(json!({"en": "open???"})),
            in_scheme: None,
            definition: None,
        };

        let term = resolver
            .resolve_term(TermKind::AccessType, &fragment, "t", &mut annotations)
            .await
            .unwrap();
        assert_eq!(term.id, canonical.id);
        assert_eq!(term.pref_label, json!({"en": "Open", "fi": "Avoin"}));
    }
}
