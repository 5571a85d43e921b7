//! Relational [`CatalogStore`] implementation.
//!
//! Generic over the connection so the same store runs against the pooled
//! connection or a transaction; the conversion pipeline is always given
//! a transaction-bound store so phase-1 and phase-2 writes commit or
//! roll back together. Shared entities (persons, organizations, terms)
//! are only ever inserted; dataset children are replaced wholesale on
//! every save.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use serde_json::{Value, json};
use uuid::Uuid;

use adapter::graph::{
    AccessRightsRecord, ActorRecord, DatasetGraph, DatasetRecord, Homepage, LegacyRecord,
    LicenseRecord, MetadataOwner, OrganizationRecord, PersonRecord, ProvenanceRecord, Role,
    SpatialRecord, TemporalRecord, TermKind, TermRecord, VariableRecord,
};
use adapter::{CatalogStore, StoreError};

use crate::entity::{
    access_rights, access_rights_term, actor, dataset, dataset_term, legacy_record, license,
    organization, person, provenance, provenance_variable, spatial_coverage, temporal_coverage,
    term,
};

pub struct SeaOrmStore<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SeaOrmStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

fn db_err(err: DbErr) -> StoreError {
    StoreError::Internal(err.to_string())
}

fn corrupt(what: &str) -> StoreError {
    StoreError::Internal(format!("stored {what} failed to deserialize"))
}

const TERM_KINDS: [TermKind; 11] = [
    TermKind::AccessType,
    TermKind::License,
    TermKind::RestrictionGrounds,
    TermKind::FieldOfScience,
    TermKind::Theme,
    TermKind::Language,
    TermKind::Location,
    TermKind::EventOutcome,
    TermKind::LifecycleEvent,
    TermKind::PreservationEvent,
    TermKind::Concept,
];

fn parse_kind(raw: &str) -> Result<TermKind, StoreError> {
    TERM_KINDS
        .into_iter()
        .find(|k| k.as_str() == raw)
        .ok_or_else(|| corrupt("term kind"))
}

fn roles_to_json(roles: &[Role]) -> Value {
    serde_json::to_value(roles).unwrap_or_else(|_| json!([]))
}

fn roles_from_json(value: &Value) -> Result<Vec<Role>, StoreError> {
    serde_json::from_value(value.clone()).map_err(|_| corrupt("actor roles"))
}

fn homepage_to_json(homepage: &Option<Homepage>) -> Option<Value> {
    homepage
        .as_ref()
        .and_then(|h| serde_json::to_value(h).ok())
}

fn homepage_from_json(value: &Option<Value>) -> Option<Homepage> {
    value
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn wkt_to_json(wkt: &[String]) -> Option<Value> {
    (!wkt.is_empty()).then(|| json!(wkt))
}

fn wkt_from_json(value: &Option<Value>) -> Vec<String> {
    value
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn person_to_record(model: person::Model) -> PersonRecord {
    PersonRecord {
        id: model.id,
        name: model.name,
        email: model.email,
        external_identifier: model.external_identifier,
        homepage: homepage_from_json(&model.homepage),
    }
}

fn term_to_record(model: term::Model) -> Result<TermRecord, StoreError> {
    Ok(TermRecord {
        id: model.id,
        kind: parse_kind(&model.kind)?,
        url: model.url,
        pref_label: model.pref_label,
        in_scheme: model.in_scheme,
        definition: model.definition,
        deprecated: model.deprecated,
    })
}

impl<'a, C: ConnectionTrait> SeaOrmStore<'a, C> {
    /// Materialize an organization with its full parent chain.
    async fn load_organization_chain(
        &self,
        id: Uuid,
    ) -> Result<Option<OrganizationRecord>, StoreError> {
        let mut chain = Vec::new();
        let mut next = Some(id);
        let mut seen = HashSet::new();
        while let Some(id) = next {
            // a corrupt parent loop must not hang the request
            if !seen.insert(id) {
                return Err(corrupt("organization parent chain"));
            }
            let Some(model) = organization::Entity::find_by_id(id)
                .one(self.conn)
                .await
                .map_err(db_err)?
            else {
                break;
            };
            next = model.parent_id;
            chain.push(model);
        }
        if chain.is_empty() {
            return Ok(None);
        }
        let mut record: Option<OrganizationRecord> = None;
        for model in chain.into_iter().rev() {
            record = Some(OrganizationRecord {
                id: model.id,
                pref_label: model.pref_label,
                url: model.url,
                external_identifier: model.external_identifier,
                email: model.email,
                homepage: homepage_from_json(&model.homepage),
                parent: record.map(Box::new),
                is_reference_data: model.is_reference_data,
                in_scheme: model.in_scheme,
                deprecated: model.deprecated,
            });
        }
        Ok(record)
    }

    async fn load_term(&self, id: Uuid) -> Result<Option<TermRecord>, StoreError> {
        term::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .map(term_to_record)
            .transpose()
    }

    async fn optional_term(&self, id: Option<Uuid>) -> Result<Option<TermRecord>, StoreError> {
        match id {
            Some(id) => self.load_term(id).await,
            None => Ok(None),
        }
    }

    async fn load_actor(&self, model: actor::Model) -> Result<ActorRecord, StoreError> {
        let person = match model.person_id {
            Some(id) => person::Entity::find_by_id(id)
                .one(self.conn)
                .await
                .map_err(db_err)?
                .map(person_to_record),
            None => None,
        };
        let organization = match model.organization_id {
            Some(id) => self.load_organization_chain(id).await?,
            None => None,
        };
        Ok(ActorRecord {
            id: model.id,
            roles: roles_from_json(&model.roles)?,
            position: model.position,
            person,
            organization,
        })
    }

    async fn load_access_rights(
        &self,
        dataset_id: Uuid,
    ) -> Result<Option<AccessRightsRecord>, StoreError> {
        let Some(model) = access_rights::Entity::find()
            .filter(access_rights::Column::DatasetId.eq(dataset_id))
            .one(self.conn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut licenses = Vec::new();
        let license_models = license::Entity::find()
            .filter(license::Column::AccessRightsId.eq(model.id))
            .order_by_asc(license::Column::Position)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        for l in license_models {
            licenses.push(LicenseRecord {
                reference: self.optional_term(l.term_id).await?,
                title: l.title,
                description: l.description,
                custom_url: l.custom_url,
            });
        }

        let mut restriction_grounds = Vec::new();
        let links = access_rights_term::Entity::find()
            .filter(access_rights_term::Column::AccessRightsId.eq(model.id))
            .order_by_asc(access_rights_term::Column::Position)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        for link in links {
            if let Some(term) = self.load_term(link.term_id).await? {
                restriction_grounds.push(term);
            }
        }

        Ok(Some(AccessRightsRecord {
            access_type: self.optional_term(model.access_type_id).await?,
            license: licenses,
            restriction_grounds,
            description: model.description,
            available: model.available,
        }))
    }

    async fn load_provenance(
        &self,
        dataset_id: Uuid,
    ) -> Result<Vec<ProvenanceRecord>, StoreError> {
        let models = provenance::Entity::find()
            .filter(provenance::Column::DatasetId.eq(dataset_id))
            .order_by_asc(provenance::Column::Position)
            .all(self.conn)
            .await
            .map_err(db_err)?;

        let mut records = Vec::new();
        for model in models {
            let mut variables = Vec::new();
            let variable_models = provenance_variable::Entity::find()
                .filter(provenance_variable::Column::ProvenanceId.eq(model.id))
                .order_by_asc(provenance_variable::Column::Position)
                .all(self.conn)
                .await
                .map_err(db_err)?;
            for v in variable_models {
                variables.push(VariableRecord {
                    pref_label: v.pref_label,
                    description: v.description,
                    representation: v.representation,
                    concept: self.optional_term(v.concept_id).await?,
                    universe: self.optional_term(v.universe_id).await?,
                });
            }

            let mut is_associated_with = Vec::new();
            let actor_models = actor::Entity::find()
                .filter(actor::Column::ProvenanceId.eq(model.id))
                .order_by_asc(actor::Column::Position)
                .all(self.conn)
                .await
                .map_err(db_err)?;
            for a in actor_models {
                is_associated_with.push(self.load_actor(a).await?);
            }

            let temporal = model.has_temporal.then(|| TemporalRecord {
                start_date: model.start_date,
                end_date: model.end_date,
                temporal_coverage: model.temporal_coverage.clone(),
            });
            let spatial = if model.has_spatial {
                Some(SpatialRecord {
                    geographic_name: model.geographic_name.clone(),
                    full_address: model.full_address.clone(),
                    altitude_in_meters: model.altitude_in_meters.clone(),
                    custom_wkt: wkt_from_json(&model.custom_wkt),
                    reference: self.optional_term(model.location_id).await?,
                })
            } else {
                None
            };

            records.push(ProvenanceRecord {
                title: model.title,
                description: model.description,
                outcome_description: model.outcome_description,
                event_outcome: self.optional_term(model.event_outcome_id).await?,
                lifecycle_event: self.optional_term(model.lifecycle_event_id).await?,
                preservation_event: self.optional_term(model.preservation_event_id).await?,
                temporal,
                spatial,
                variables,
                is_associated_with,
            });
        }
        Ok(records)
    }

    async fn load_term_list(
        &self,
        dataset_id: Uuid,
        kind: TermKind,
    ) -> Result<Vec<TermRecord>, StoreError> {
        let links = dataset_term::Entity::find()
            .filter(dataset_term::Column::DatasetId.eq(dataset_id))
            .filter(dataset_term::Column::Kind.eq(kind.as_str()))
            .order_by_asc(dataset_term::Column::Position)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        let mut terms = Vec::new();
        for link in links {
            if let Some(term) = self.load_term(link.term_id).await? {
                terms.push(term);
            }
        }
        Ok(terms)
    }

    /// Drop every dataset-owned child row. Shared persons, organizations
    /// and terms are left alone.
    async fn delete_children(&self, dataset_id: Uuid) -> Result<(), StoreError> {
        let provenance_ids: Vec<Uuid> = provenance::Entity::find()
            .filter(provenance::Column::DatasetId.eq(dataset_id))
            .all(self.conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|p| p.id)
            .collect();

        if !provenance_ids.is_empty() {
            provenance_variable::Entity::delete_many()
                .filter(provenance_variable::Column::ProvenanceId.is_in(provenance_ids.clone()))
                .exec(self.conn)
                .await
                .map_err(db_err)?;
            actor::Entity::delete_many()
                .filter(actor::Column::ProvenanceId.is_in(provenance_ids))
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }
        actor::Entity::delete_many()
            .filter(actor::Column::DatasetId.eq(dataset_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        provenance::Entity::delete_many()
            .filter(provenance::Column::DatasetId.eq(dataset_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        let ar_ids: Vec<Uuid> = access_rights::Entity::find()
            .filter(access_rights::Column::DatasetId.eq(dataset_id))
            .all(self.conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|ar| ar.id)
            .collect();
        if !ar_ids.is_empty() {
            license::Entity::delete_many()
                .filter(license::Column::AccessRightsId.is_in(ar_ids.clone()))
                .exec(self.conn)
                .await
                .map_err(db_err)?;
            access_rights_term::Entity::delete_many()
                .filter(access_rights_term::Column::AccessRightsId.is_in(ar_ids))
                .exec(self.conn)
                .await
                .map_err(db_err)?;
            access_rights::Entity::delete_many()
                .filter(access_rights::Column::DatasetId.eq(dataset_id))
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }

        spatial_coverage::Entity::delete_many()
            .filter(spatial_coverage::Column::DatasetId.eq(dataset_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        temporal_coverage::Entity::delete_many()
            .filter(temporal_coverage::Column::DatasetId.eq(dataset_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        dataset_term::Entity::delete_many()
            .filter(dataset_term::Column::DatasetId.eq(dataset_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_actor_row(
        &self,
        actor: &ActorRecord,
        dataset_id: Option<Uuid>,
        provenance_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        actor::ActiveModel {
            id: Set(actor.id),
            dataset_id: Set(dataset_id),
            provenance_id: Set(provenance_id),
            roles: Set(roles_to_json(&actor.roles)),
            position: Set(actor.position),
            person_id: Set(actor.person.as_ref().map(|p| p.id)),
            organization_id: Set(actor.organization.as_ref().map(|o| o.id)),
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_children(&self, graph: &DatasetGraph) -> Result<(), StoreError> {
        let dataset_id = graph.dataset.id;

        if let Some(ar) = &graph.access_rights {
            let ar_id = Uuid::new_v4();
            access_rights::ActiveModel {
                id: Set(ar_id),
                dataset_id: Set(dataset_id),
                access_type_id: Set(ar.access_type.as_ref().map(|t| t.id)),
                description: Set(ar.description.clone()),
                available: Set(ar.available),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
            for (i, l) in ar.license.iter().enumerate() {
                license::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    access_rights_id: Set(ar_id),
                    term_id: Set(l.reference.as_ref().map(|t| t.id)),
                    title: Set(l.title.clone()),
                    description: Set(l.description.clone()),
                    custom_url: Set(l.custom_url.clone()),
                    position: Set(i as i32),
                }
                .insert(self.conn)
                .await
                .map_err(db_err)?;
            }
            for (i, t) in ar.restriction_grounds.iter().enumerate() {
                access_rights_term::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    access_rights_id: Set(ar_id),
                    term_id: Set(t.id),
                    position: Set(i as i32),
                }
                .insert(self.conn)
                .await
                .map_err(db_err)?;
            }
        }

        for actor in &graph.actors {
            self.insert_actor_row(actor, Some(dataset_id), None).await?;
        }

        for (i, p) in graph.provenance.iter().enumerate() {
            let provenance_id = Uuid::new_v4();
            let temporal = p.temporal.clone().unwrap_or_default();
            let spatial = p.spatial.clone().unwrap_or_default();
            provenance::ActiveModel {
                id: Set(provenance_id),
                dataset_id: Set(dataset_id),
                title: Set(p.title.clone()),
                description: Set(p.description.clone()),
                outcome_description: Set(p.outcome_description.clone()),
                event_outcome_id: Set(p.event_outcome.as_ref().map(|t| t.id)),
                lifecycle_event_id: Set(p.lifecycle_event.as_ref().map(|t| t.id)),
                preservation_event_id: Set(p.preservation_event.as_ref().map(|t| t.id)),
                start_date: Set(temporal.start_date),
                end_date: Set(temporal.end_date),
                temporal_coverage: Set(temporal.temporal_coverage),
                geographic_name: Set(spatial.geographic_name),
                full_address: Set(spatial.full_address),
                altitude_in_meters: Set(spatial.altitude_in_meters),
                custom_wkt: Set(wkt_to_json(&spatial.custom_wkt)),
                location_id: Set(spatial.reference.as_ref().map(|t| t.id)),
                has_spatial: Set(p.spatial.is_some()),
                has_temporal: Set(p.temporal.is_some()),
                position: Set(i as i32),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;

            for (j, v) in p.variables.iter().enumerate() {
                // inline concepts live only in the graph; persist them
                // alongside the variable so reloads stay faithful
                for concept in [&v.concept, &v.universe].into_iter().flatten() {
                    if concept.url.is_none() {
                        self.ensure_term(concept).await?;
                    }
                }
                provenance_variable::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    provenance_id: Set(provenance_id),
                    pref_label: Set(v.pref_label.clone()),
                    description: Set(v.description.clone()),
                    representation: Set(v.representation.clone()),
                    concept_id: Set(v.concept.as_ref().map(|t| t.id)),
                    universe_id: Set(v.universe.as_ref().map(|t| t.id)),
                    position: Set(j as i32),
                }
                .insert(self.conn)
                .await
                .map_err(db_err)?;
            }
            for actor in &p.is_associated_with {
                self.insert_actor_row(actor, None, Some(provenance_id)).await?;
            }
        }

        for (i, s) in graph.spatial.iter().enumerate() {
            spatial_coverage::ActiveModel {
                id: Set(Uuid::new_v4()),
                dataset_id: Set(dataset_id),
                geographic_name: Set(s.geographic_name.clone()),
                full_address: Set(s.full_address.clone()),
                altitude_in_meters: Set(s.altitude_in_meters.clone()),
                custom_wkt: Set(wkt_to_json(&s.custom_wkt)),
                location_id: Set(s.reference.as_ref().map(|t| t.id)),
                position: Set(i as i32),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }
        for (i, t) in graph.temporal.iter().enumerate() {
            temporal_coverage::ActiveModel {
                id: Set(Uuid::new_v4()),
                dataset_id: Set(dataset_id),
                start_date: Set(t.start_date),
                end_date: Set(t.end_date),
                temporal_coverage: Set(t.temporal_coverage.clone()),
                position: Set(i as i32),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        for (kind, terms) in [
            (TermKind::FieldOfScience, &graph.field_of_science),
            (TermKind::Theme, &graph.theme),
            (TermKind::Language, &graph.language),
        ] {
            for (i, t) in terms.iter().enumerate() {
                dataset_term::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    dataset_id: Set(dataset_id),
                    term_id: Set(t.id),
                    kind: Set(kind.as_str().to_string()),
                    position: Set(i as i32),
                }
                .insert(self.conn)
                .await
                .map_err(db_err)?;
            }
        }
        Ok(())
    }

    /// Insert a term row unless it already exists.
    async fn ensure_term(&self, record: &TermRecord) -> Result<(), StoreError> {
        let exists = term::Entity::find_by_id(record.id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            self.insert_term(record).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C: ConnectionTrait> CatalogStore for SeaOrmStore<'_, C> {
    async fn get_person(&self, id: Uuid) -> Result<Option<PersonRecord>, StoreError> {
        Ok(person::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .map(person_to_record))
    }

    async fn get_organization(&self, id: Uuid) -> Result<Option<OrganizationRecord>, StoreError> {
        self.load_organization_chain(id).await
    }

    async fn find_term(&self, kind: TermKind, url: &str) -> Result<Option<TermRecord>, StoreError> {
        term::Entity::find()
            .filter(term::Column::Kind.eq(kind.as_str()))
            .filter(term::Column::Url.eq(url))
            .one(self.conn)
            .await
            .map_err(db_err)?
            .map(term_to_record)
            .transpose()
    }

    async fn find_reference_organization(
        &self,
        url: &str,
    ) -> Result<Option<OrganizationRecord>, StoreError> {
        let Some(model) = organization::Entity::find()
            .filter(organization::Column::Url.eq(url))
            .filter(organization::Column::IsReferenceData.eq(true))
            .one(self.conn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        self.load_organization_chain(model.id).await
    }

    async fn insert_person(&self, record: &PersonRecord) -> Result<(), StoreError> {
        person::ActiveModel {
            id: Set(record.id),
            name: Set(record.name.clone()),
            email: Set(record.email.clone()),
            external_identifier: Set(record.external_identifier.clone()),
            homepage: Set(homepage_to_json(&record.homepage)),
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_organization(&self, record: &OrganizationRecord) -> Result<(), StoreError> {
        organization::ActiveModel {
            id: Set(record.id),
            pref_label: Set(record.pref_label.clone()),
            url: Set(record.url.clone()),
            external_identifier: Set(record.external_identifier.clone()),
            email: Set(record.email.clone()),
            homepage: Set(homepage_to_json(&record.homepage)),
            parent_id: Set(record.parent.as_ref().map(|p| p.id)),
            is_reference_data: Set(record.is_reference_data),
            in_scheme: Set(record.in_scheme.clone()),
            deprecated: Set(record.deprecated),
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_term(&self, record: &TermRecord) -> Result<(), StoreError> {
        term::ActiveModel {
            id: Set(record.id),
            kind: Set(record.kind.as_str().to_string()),
            url: Set(record.url.clone()),
            pref_label: Set(record.pref_label.clone()),
            in_scheme: Set(record.in_scheme.clone()),
            definition: Set(record.definition.clone()),
            deprecated: Set(record.deprecated),
        }
        .insert(self.conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_legacy(&self, id: Uuid) -> Result<Option<LegacyRecord>, StoreError> {
        Ok(legacy_record::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .map(|m| LegacyRecord {
                id: m.id,
                raw_document: m.raw_document,
                dataset_id: m.dataset_id,
                compatibility_diff: m.compatibility_diff,
                migration_errors: m.migration_errors,
                invalid_legacy_values: m.invalid_legacy_values,
                fixed_legacy_values: m.fixed_legacy_values,
                last_successful_migration: m.last_successful_migration,
            }))
    }

    async fn save_legacy(&self, record: &LegacyRecord) -> Result<(), StoreError> {
        let active = legacy_record::ActiveModel {
            id: Set(record.id),
            raw_document: Set(record.raw_document.clone()),
            dataset_id: Set(record.dataset_id),
            compatibility_diff: Set(record.compatibility_diff.clone()),
            migration_errors: Set(record.migration_errors.clone()),
            invalid_legacy_values: Set(record.invalid_legacy_values.clone()),
            fixed_legacy_values: Set(record.fixed_legacy_values.clone()),
            last_successful_migration: Set(record.last_successful_migration),
        };
        let exists = legacy_record::Entity::find_by_id(record.id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .is_some();
        if exists {
            active.update(self.conn).await.map_err(db_err)?;
        } else {
            active.insert(self.conn).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn get_graph(&self, dataset_id: Uuid) -> Result<Option<DatasetGraph>, StoreError> {
        let Some(model) = dataset::Entity::find_by_id(dataset_id)
            .one(self.conn)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut actors = Vec::new();
        let actor_models = actor::Entity::find()
            .filter(actor::Column::DatasetId.eq(dataset_id))
            .order_by_asc(actor::Column::Position)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        for a in actor_models {
            actors.push(self.load_actor(a).await?);
        }

        let dataset = DatasetRecord {
            id: model.id,
            title: model.title,
            description: model.description,
            persistent_identifier: model.persistent_identifier,
            issued: model.issued,
            keyword: serde_json::from_value(model.keyword).map_err(|_| corrupt("keywords"))?,
            bibliographic_citation: model.bibliographic_citation,
            created: model.created,
            modified: model.modified,
            deprecated: model.deprecated,
            removed: model.removed,
            data_catalog: model.data_catalog,
            metadata_owner: MetadataOwner {
                user: model.metadata_owner_user,
                organization: model.metadata_owner_org,
            },
        };

        Ok(Some(DatasetGraph {
            access_rights: self.load_access_rights(dataset_id).await?,
            actors,
            provenance: self.load_provenance(dataset_id).await?,
            spatial: {
                let mut out = Vec::new();
                let models = spatial_coverage::Entity::find()
                    .filter(spatial_coverage::Column::DatasetId.eq(dataset_id))
                    .order_by_asc(spatial_coverage::Column::Position)
                    .all(self.conn)
                    .await
                    .map_err(db_err)?;
                for s in models {
                    out.push(SpatialRecord {
                        geographic_name: s.geographic_name,
                        full_address: s.full_address,
                        altitude_in_meters: s.altitude_in_meters,
                        custom_wkt: wkt_from_json(&s.custom_wkt),
                        reference: self.optional_term(s.location_id).await?,
                    });
                }
                out
            },
            temporal: temporal_coverage::Entity::find()
                .filter(temporal_coverage::Column::DatasetId.eq(dataset_id))
                .order_by_asc(temporal_coverage::Column::Position)
                .all(self.conn)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|t| TemporalRecord {
                    start_date: t.start_date,
                    end_date: t.end_date,
                    temporal_coverage: t.temporal_coverage,
                })
                .collect(),
            field_of_science: self.load_term_list(dataset_id, TermKind::FieldOfScience).await?,
            theme: self.load_term_list(dataset_id, TermKind::Theme).await?,
            language: self.load_term_list(dataset_id, TermKind::Language).await?,
            dataset,
        }))
    }

    async fn save_graph(&self, graph: &DatasetGraph) -> Result<(), StoreError> {
        let d = &graph.dataset;
        let active = dataset::ActiveModel {
            id: Set(d.id),
            title: Set(d.title.clone()),
            description: Set(d.description.clone()),
            persistent_identifier: Set(d.persistent_identifier.clone()),
            issued: Set(d.issued),
            keyword: Set(json!(d.keyword)),
            bibliographic_citation: Set(d.bibliographic_citation.clone()),
            created: Set(d.created),
            modified: Set(d.modified),
            deprecated: Set(d.deprecated),
            removed: Set(d.removed),
            data_catalog: Set(d.data_catalog.clone()),
            metadata_owner_user: Set(d.metadata_owner.user.clone()),
            metadata_owner_org: Set(d.metadata_owner.organization.clone()),
        };
        let exists = dataset::Entity::find_by_id(d.id)
            .one(self.conn)
            .await
            .map_err(db_err)?
            .is_some();
        if exists {
            self.delete_children(d.id).await?;
            active.update(self.conn).await.map_err(db_err)?;
        } else {
            active.insert(self.conn).await.map_err(db_err)?;
        }
        self.insert_children(graph).await
    }

    async fn list_legacy_ids(&self, catalog: Option<&str>) -> Result<Vec<Uuid>, StoreError> {
        let models = legacy_record::Entity::find()
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(models
            .into_iter()
            .filter(|m| match catalog {
                Some(catalog) => {
                    common::json::get_str(&m.raw_document, "data_catalog") == Some(catalog)
                        || m.raw_document
                            .get("data_catalog")
                            .and_then(|c| common::json::get_str(c, "identifier"))
                            == Some(catalog)
                }
                None => true,
            })
            .map(|m| m.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_roles_survive_json_storage() {
        let roles = vec![Role::Creator, Role::RightsHolder];
        let stored = roles_to_json(&roles);
        assert_eq!(stored, json!(["creator", "rights_holder"]));
        assert_eq!(roles_from_json(&stored).unwrap(), roles);
    }

    #[test]
    fn test_every_term_kind_round_trips_through_its_column_value() {
        for kind in TERM_KINDS {
            assert_eq!(parse_kind(kind.as_str()).unwrap(), kind);
        }
        assert!(parse_kind("no_such_kind").is_err());
    }

    #[test]
    fn test_homepage_storage_tolerates_absent_value() {
        assert_eq!(homepage_to_json(&None), None);
        assert_eq!(homepage_from_json(&None), None);

        let homepage = Some(Homepage {
            url: "https://example.edu".into(),
            title: Some(json!({"en": "Example"})),
        });
        let stored = homepage_to_json(&homepage);
        assert_eq!(homepage_from_json(&stored), homepage);
    }
}
