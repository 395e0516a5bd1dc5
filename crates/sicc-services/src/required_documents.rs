//! Required-documents generator.
//!
//! Entities with no documents yet are matched against the document parameters active
//! today (entity × parameter), and one `toPresent` document is created per resolved
//! document type. An entity that already owns any document in its collection is left
//! alone; that check is the only idempotence gate.
//!
//! The three bulk inserts run concurrently and are not rolled back: if one fails after
//! another succeeded the error is returned and the created rows stay.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use sicc_core::constants::{collections, fields};
use sicc_core::models::{
    Document, DocumentOwner, DocumentType, EntityKind, NewDocument, Person, Provider,
    RequiredDocumentParameter, Vehicle,
};
use sicc_core::{fetch_items, FilterOp, ItemId, ItemQuery, ItemStore, SiccResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cancellable;
use crate::index::TreeIndex;
use crate::tree::CustomerTree;

/// Providers and the `*ByParent` maps the generator decides eligibility from.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub providers: &'a [Provider],
    pub documents_by_provider: &'a HashMap<ItemId, Vec<Document>>,
    pub persons_by_provider: &'a HashMap<ItemId, Vec<Person>>,
    pub vehicles_by_provider: &'a HashMap<ItemId, Vec<Vehicle>>,
    pub documents_by_person: &'a HashMap<ItemId, Vec<Document>>,
    pub documents_by_vehicle: &'a HashMap<ItemId, Vec<Document>>,
}

impl<'a> GenerationInput<'a> {
    pub fn new(providers: &'a [Provider], index: &'a TreeIndex) -> Self {
        Self {
            providers,
            documents_by_provider: &index.documents_by_provider,
            persons_by_provider: &index.persons_by_provider,
            vehicles_by_provider: &index.vehicles_by_provider,
            documents_by_person: &index.documents_by_person,
            documents_by_vehicle: &index.documents_by_vehicle,
        }
    }

    /// Every provider of a loaded tree. A tree with a degraded document read is refused,
    /// since its owners would all look eligible.
    pub fn from_tree(tree: &'a CustomerTree, index: &'a TreeIndex) -> SiccResult<Self> {
        tree.ensure_documents_complete()?;
        Ok(Self::new(&tree.providers, index))
    }

    /// Restrict generation to `providers`.
    pub fn with_providers(self, providers: &'a [Provider]) -> Self {
        Self { providers, ..self }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub created_provider_docs: usize,
    pub created_person_docs: usize,
    pub created_vehicle_docs: usize,
    pub providers_processed: usize,
    pub persons_processed: usize,
    pub vehicles_processed: usize,
    pub skipped_providers: usize,
    pub skipped_persons: usize,
    pub skipped_vehicles: usize,
    pub parameters_count: usize,
    /// Rows returned by the bulk inserts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created_documents: Vec<Value>,
}

impl GenerationResult {
    pub fn total_created(&self) -> usize {
        self.created_provider_docs + self.created_person_docs + self.created_vehicle_docs
    }
}

/// Split `entities` into those without documents and a skipped count.
fn eligible<'e, T>(
    entities: impl IntoIterator<Item = &'e T>,
    id_of: impl Fn(&T) -> &ItemId,
    documents: &HashMap<ItemId, Vec<Document>>,
) -> (Vec<&'e T>, usize)
where
    T: 'e,
{
    let mut skipped = 0;
    let eligible = entities
        .into_iter()
        .filter(|entity| {
            let has_documents = documents
                .get(id_of(entity))
                .is_some_and(|docs| !docs.is_empty());
            if has_documents {
                skipped += 1;
            }
            !has_documents
        })
        .collect();
    (eligible, skipped)
}

/// Candidate rows for every `owner × parameter` whose document type resolves.
fn cross_join(
    owners: impl IntoIterator<Item = DocumentOwner>,
    parameters: &[&RequiredDocumentParameter],
    types: &HashMap<ItemId, DocumentType>,
) -> Vec<NewDocument> {
    let mut candidates = Vec::new();
    for owner in owners {
        for parameter in parameters {
            let Some(document_type) = parameter.document_type_id().and_then(|id| types.get(&id))
            else {
                continue;
            };
            candidates.push(NewDocument::to_present(owner.clone(), document_type));
        }
    }
    candidates
}

#[derive(Clone)]
pub struct RequiredDocumentsGenerator {
    store: Arc<dyn ItemStore>,
}

impl RequiredDocumentsGenerator {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Generate with today's UTC date as the parameter validity day.
    pub async fn generate(
        &self,
        input: GenerationInput<'_>,
        cancel: &CancellationToken,
    ) -> SiccResult<GenerationResult> {
        self.generate_on(input, Utc::now().date_naive(), cancel)
            .await
    }

    /// Generate with parameters active on `today`. `cancel` only applies to the reads;
    /// once the inserts are issued they run to completion.
    #[tracing::instrument(skip_all, fields(today = %today, providers = input.providers.len()))]
    pub async fn generate_on(
        &self,
        input: GenerationInput<'_>,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> SiccResult<GenerationResult> {
        let (providers, skipped_providers) =
            eligible(input.providers, |p| &p.id, input.documents_by_provider);

        let all_persons = input
            .providers
            .iter()
            .filter_map(|p| input.persons_by_provider.get(&p.id))
            .flatten();
        let (persons, skipped_persons) = eligible(all_persons, |p| &p.id, input.documents_by_person);

        let all_vehicles = input
            .providers
            .iter()
            .filter_map(|p| input.vehicles_by_provider.get(&p.id))
            .flatten();
        let (vehicles, skipped_vehicles) =
            eligible(all_vehicles, |v| &v.id, input.documents_by_vehicle);

        let mut result = GenerationResult {
            skipped_providers,
            skipped_persons,
            skipped_vehicles,
            ..GenerationResult::default()
        };

        if providers.is_empty() && persons.is_empty() && vehicles.is_empty() {
            tracing::info!(
                skipped_providers,
                skipped_persons,
                skipped_vehicles,
                "Every entity already has documents, nothing to generate"
            );
            return Ok(result);
        }

        result.providers_processed = providers.len();
        result.persons_processed = persons.len();
        result.vehicles_processed = vehicles.len();

        let parameters = cancellable(cancel, self.fetch_parameters(today)).await?;
        result.parameters_count = parameters.len();

        let mut by_kind: HashMap<EntityKind, Vec<&RequiredDocumentParameter>> = HashMap::new();
        for parameter in &parameters {
            if let Some(kind) = parameter.entity_kind() {
                by_kind.entry(kind).or_default().push(parameter);
            }
        }
        let scoped = |kind: EntityKind| by_kind.get(&kind).map_or(&[][..], Vec::as_slice);

        let mut seen = HashSet::new();
        let type_ids: Vec<ItemId> = parameters
            .iter()
            .filter_map(RequiredDocumentParameter::document_type_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if type_ids.is_empty() {
            tracing::info!(parameters = parameters.len(), "No document types referenced by active parameters");
            return Ok(result);
        }

        let types: HashMap<ItemId, DocumentType> =
            cancellable(cancel, self.fetch_document_types(&type_ids))
                .await?
                .into_iter()
                .filter(|t| t.id.is_truthy())
                .map(|t| (t.id.clone(), t))
                .collect();

        let provider_docs = cross_join(
            providers.iter().map(|p| DocumentOwner::Provider(p.id.clone())),
            scoped(EntityKind::Provider),
            &types,
        );
        let person_docs = cross_join(
            persons.iter().map(|p| DocumentOwner::Person(p.id.clone())),
            scoped(EntityKind::Person),
            &types,
        );
        let vehicle_docs = cross_join(
            vehicles.iter().map(|v| DocumentOwner::Vehicle(v.id.clone())),
            scoped(EntityKind::Vehicle),
            &types,
        );

        if provider_docs.is_empty() && person_docs.is_empty() && vehicle_docs.is_empty() {
            tracing::info!("No candidate documents for the eligible entities");
            return Ok(result);
        }

        result.created_provider_docs = provider_docs.len();
        result.created_person_docs = person_docs.len();
        result.created_vehicle_docs = vehicle_docs.len();

        let (provider_rows, person_rows, vehicle_rows) = tokio::join!(
            self.insert_all(collections::PROVIDER_DOCUMENTS, provider_docs),
            self.insert_all(collections::PERSON_DOCUMENTS, person_docs),
            self.insert_all(collections::VEHICLE_DOCUMENTS, vehicle_docs),
        );
        let outcomes = [
            (collections::PROVIDER_DOCUMENTS, provider_rows),
            (collections::PERSON_DOCUMENTS, person_rows),
            (collections::VEHICLE_DOCUMENTS, vehicle_rows),
        ];

        let mut first_error = None;
        let mut committed = Vec::new();
        for (collection, outcome) in outcomes {
            match outcome {
                Ok(rows) => {
                    if !rows.is_empty() {
                        committed.push(collection);
                    }
                    result.created_documents.extend(rows);
                }
                Err(e) => {
                    tracing::error!(collection, error = %e, "Bulk insert of required documents failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(err) = first_error {
            if !committed.is_empty() {
                tracing::warn!(?committed, "Required documents partially created, no rollback applied");
            }
            return Err(err);
        }

        tracing::info!(
            provider_docs = result.created_provider_docs,
            person_docs = result.created_person_docs,
            vehicle_docs = result.created_vehicle_docs,
            parameters = result.parameters_count,
            "Required documents generated"
        );
        Ok(result)
    }

    async fn fetch_parameters(&self, today: NaiveDate) -> SiccResult<Vec<RequiredDocumentParameter>> {
        let day = today.format("%Y-%m-%d").to_string();
        let codes: Vec<ItemId> = EntityKind::CODES.iter().copied().map(ItemId::Int).collect();
        let mut parameters: Vec<RequiredDocumentParameter> = fetch_items(
            self.store.as_ref(),
            collections::DOCUMENT_PARAMETERS,
            &ItemQuery::new()
                .fields(fields::DOCUMENT_PARAMETER)
                .filter_in("idTipoEntidad", &codes)
                .filter("fechaDesde", FilterOp::Lte, day.clone())
                .filter("fechaHasta", FilterOp::Gte, day),
        )
        .await?;

        // Rows with a missing or malformed bound slip through the backend comparison.
        let fetched = parameters.len();
        parameters.retain(|p| p.is_active_on(today));
        if parameters.len() != fetched {
            tracing::warn!(
                dropped = fetched - parameters.len(),
                "Ignoring parameters outside their validity window"
            );
        }
        Ok(parameters)
    }

    async fn fetch_document_types(&self, type_ids: &[ItemId]) -> SiccResult<Vec<DocumentType>> {
        fetch_items(
            self.store.as_ref(),
            collections::DOCUMENT_TYPES,
            &ItemQuery::new()
                .fields(fields::DOCUMENT_TYPE)
                .filter_in("id", type_ids),
        )
        .await
    }

    /// One bulk insert; an empty set makes no call.
    async fn insert_all(&self, collection: &str, documents: Vec<NewDocument>) -> SiccResult<Vec<Value>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let rows = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.store.create_many(collection, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parameter(value: Value) -> RequiredDocumentParameter {
        serde_json::from_value(value).unwrap()
    }

    fn doc_type(id: i64, days: i64) -> DocumentType {
        DocumentType {
            id: ItemId::Int(id),
            nombre_documento: Some(format!("Tipo {}", id)),
            validez_documento_dias: Some(days),
        }
    }

    #[test]
    fn cross_join_skips_unresolved_types() {
        let resolved = parameter(json!({ "id": 1, "idTipoDocumento": 7, "idTipoEntidad": 1 }));
        let missing = parameter(json!({ "id": 2, "idTipoDocumento": 99, "idTipoEntidad": 1 }));
        let types = HashMap::from([(ItemId::Int(7), doc_type(7, 180))]);

        let candidates = cross_join(
            [
                DocumentOwner::Provider(ItemId::Int(1)),
                DocumentOwner::Provider(ItemId::Int(2)),
            ],
            &[&resolved, &missing],
            &types,
        );

        assert_eq!(candidates.len(), 2);
        assert!(candidates
            .iter()
            .all(|c| c.validez_dias == Some(180) && c.id_parametro == ItemId::Int(7)));
    }

    #[test]
    fn eligibility_counts_skipped_entities() {
        let persons: Vec<Person> = serde_json::from_value(json!([
            { "id": 1 }, { "id": 2 }, { "id": 3 }
        ]))
        .unwrap();
        let documents = HashMap::from([
            (ItemId::Int(2), vec![serde_json::from_value(json!({ "id": 9 })).unwrap()]),
            (ItemId::Int(3), Vec::new()),
        ]);

        let (eligible_persons, skipped) = eligible(&persons, |p| &p.id, &documents);

        let ids: Vec<&ItemId> = eligible_persons.iter().map(|p| &p.id).collect();
        assert_eq!(ids, vec![&ItemId::Int(1), &ItemId::Int(3)]);
        assert_eq!(skipped, 1);
    }
}
