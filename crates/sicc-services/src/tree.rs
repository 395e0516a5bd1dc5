//! Customer tree loader.
//!
//! Assembles customer → sites → requirements → providers → persons/vehicles → documents
//! with one filtered read per level. The backbone levels are sequential because each
//! filter needs the ids of the level above; persons/vehicles and the three document
//! collections are read concurrently.
//!
//! Failures split in two classes. A backbone read (customer, sites, requirements,
//! providers) is critical and fails the whole load, and so does a customer that does not
//! exist. A leaf read (persons, vehicles,
//! documents, document types) is degraded: it is logged, recorded in
//! [`CustomerTree::degraded`] and replaced by an empty result. Cancellation is never
//! degraded.

use serde::Serialize;
use sicc_core::constants::{collections, fields};
use sicc_core::models::{
    Customer, Document, DocumentType, Person, Provider, Requirement, Site, Vehicle,
};
use sicc_core::{fetch_item, fetch_items, ItemId, ItemQuery, ItemStore, SiccError, SiccResult};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{cache_bust_token, cancellable};

/// Leaf reads that degrade to an empty result on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeStep {
    Persons,
    Vehicles,
    ProviderDocuments,
    PersonDocuments,
    VehicleDocuments,
    DocumentTypes,
}

impl TreeStep {
    /// Reads whose rows decide whether an entity already has documents.
    pub fn reads_documents(self) -> bool {
        matches!(
            self,
            TreeStep::ProviderDocuments | TreeStep::PersonDocuments | TreeStep::VehicleDocuments
        )
    }
}

impl fmt::Display for TreeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeStep::Persons => "persons",
            TreeStep::Vehicles => "vehicles",
            TreeStep::ProviderDocuments => "provider_documents",
            TreeStep::PersonDocuments => "person_documents",
            TreeStep::VehicleDocuments => "vehicle_documents",
            TreeStep::DocumentTypes => "document_types",
        };
        f.write_str(name)
    }
}

/// A leaf read that failed and was replaced by an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedStep {
    pub step: TreeStep,
    pub error: String,
}

/// Denormalized tree of one customer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerTree {
    /// Always set by [`CustomerTreeLoader::load`].
    pub customer: Option<Customer>,
    pub sites: Vec<Site>,
    pub requirements: Vec<Requirement>,
    pub providers: Vec<Provider>,
    pub persons: Vec<Person>,
    pub vehicles: Vec<Vehicle>,
    /// Unique by id, each enriched with its `documentType` when it resolves.
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedStep>,
}

impl CustomerTree {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Fails when a document read was degraded. An owner whose documents could not be
    /// read looks like it has none.
    pub fn ensure_documents_complete(&self) -> SiccResult<()> {
        let missing: Vec<String> = self
            .degraded
            .iter()
            .filter(|d| d.step.reads_documents())
            .map(|d| d.step.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(SiccError::Incomplete(format!(
            "No se pudieron leer los documentos existentes ({}). Recargá el cliente antes de generar.",
            missing.join(", ")
        )))
    }
}

/// Keep a leaf result, or record the failure and substitute an empty list.
fn settle<T>(
    degraded: &mut Vec<DegradedStep>,
    step: TreeStep,
    result: SiccResult<Vec<T>>,
) -> SiccResult<Vec<T>> {
    match result {
        Ok(rows) => Ok(rows),
        Err(SiccError::Aborted) => Err(SiccError::Aborted),
        Err(e) => {
            tracing::warn!(step = %step, error = %e, "Tree step degraded to empty result");
            degraded.push(DegradedStep {
                step,
                error: e.to_string(),
            });
            Ok(Vec::new())
        }
    }
}

fn ids<'a>(keys: impl IntoIterator<Item = &'a ItemId>) -> Vec<ItemId> {
    keys.into_iter().filter(|id| id.is_truthy()).cloned().collect()
}

/// Concatenate document lists, keeping one row per id. A later duplicate replaces the
/// earlier row in place.
pub fn dedupe_documents(lists: impl IntoIterator<Item = Vec<Document>>) -> Vec<Document> {
    let mut unique: Vec<Document> = Vec::new();
    let mut position: HashMap<ItemId, usize> = HashMap::new();
    for document in lists.into_iter().flatten() {
        if !document.id.is_truthy() {
            continue;
        }
        match position.get(&document.id) {
            Some(&at) => unique[at] = document,
            None => {
                position.insert(document.id.clone(), unique.len());
                unique.push(document);
            }
        }
    }
    unique
}

#[derive(Clone)]
pub struct CustomerTreeLoader {
    store: Arc<dyn ItemStore>,
}

impl CustomerTreeLoader {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Load the tree of `customer_id`. Every call re-reads the backend.
    #[tracing::instrument(skip_all, fields(customer_id = %customer_id))]
    pub async fn load(
        &self,
        customer_id: &ItemId,
        cancel: &CancellationToken,
    ) -> SiccResult<CustomerTree> {
        let store = self.store.as_ref();
        let bust = cache_bust_token();
        let bust = Some(bust.as_str());

        let customer: Customer = cancellable(
            cancel,
            fetch_item(
                store,
                collections::CUSTOMERS,
                customer_id,
                &ItemQuery::new().fields(fields::CUSTOMER).cache_bust(bust),
            ),
        )
        .await?
        .ok_or_else(|| SiccError::NotFound(format!("Cliente {} no encontrado.", customer_id)))?;

        let sites: Vec<Site> = cancellable(
            cancel,
            fetch_items(
                store,
                collections::SITES,
                &ItemQuery::new()
                    .filter_eq("idCliente", customer_id)
                    .sort("nombre")
                    .fields(fields::SITE)
                    .cache_bust(bust),
            ),
        )
        .await?;

        let mut tree = CustomerTree {
            customer: Some(customer),
            sites,
            ..CustomerTree::default()
        };
        let site_ids = ids(tree.sites.iter().map(|s| &s.id));
        if site_ids.is_empty() {
            tracing::info!(sites = 0, "Customer tree loaded");
            return Ok(tree);
        }

        tree.requirements = cancellable(cancel, self.fetch_requirements(&site_ids, bust)).await?;
        let requirement_ids = ids(tree.requirements.iter().map(|r| &r.id));

        if !requirement_ids.is_empty() {
            tree.providers = cancellable(
                cancel,
                fetch_items(
                    store,
                    collections::PROVIDERS,
                    &ItemQuery::new()
                        .sort("nombre")
                        .fields(fields::PROVIDER)
                        .filter_in("idRequerimientos", &requirement_ids)
                        .cache_bust(bust),
                ),
            )
            .await?;
        }
        let provider_ids = ids(tree.providers.iter().map(|p| &p.id));

        let (persons, vehicles) = tokio::join!(
            cancellable(
                cancel,
                self.fetch_owned::<Person>(
                    collections::PERSONS,
                    "nombre",
                    fields::PERSON,
                    &provider_ids,
                    bust,
                ),
            ),
            cancellable(
                cancel,
                self.fetch_owned::<Vehicle>(
                    collections::VEHICLES,
                    "dominio",
                    fields::VEHICLE,
                    &provider_ids,
                    bust,
                ),
            ),
        );
        tree.persons = settle(&mut tree.degraded, TreeStep::Persons, persons)?;
        tree.vehicles = settle(&mut tree.degraded, TreeStep::Vehicles, vehicles)?;

        let person_ids = ids(tree.persons.iter().map(|p| &p.id));
        let vehicle_ids = ids(tree.vehicles.iter().map(|v| &v.id));

        let (provider_docs, person_docs, vehicle_docs) = tokio::join!(
            cancellable(
                cancel,
                self.fetch_documents(
                    collections::PROVIDER_DOCUMENTS,
                    "idProveedor",
                    &provider_ids,
                    bust,
                ),
            ),
            cancellable(
                cancel,
                self.fetch_documents(collections::PERSON_DOCUMENTS, "idPersona", &person_ids, bust),
            ),
            cancellable(
                cancel,
                self.fetch_documents(
                    collections::VEHICLE_DOCUMENTS,
                    "idVehiculo",
                    &vehicle_ids,
                    bust,
                ),
            ),
        );
        let provider_docs = settle(&mut tree.degraded, TreeStep::ProviderDocuments, provider_docs)?;
        let person_docs = settle(&mut tree.degraded, TreeStep::PersonDocuments, person_docs)?;
        let vehicle_docs = settle(&mut tree.degraded, TreeStep::VehicleDocuments, vehicle_docs)?;

        let mut documents = dedupe_documents([provider_docs, person_docs, vehicle_docs]);
        let types = cancellable(cancel, self.fetch_document_types(&documents, bust)).await;
        let types = settle(&mut tree.degraded, TreeStep::DocumentTypes, types)?;
        attach_document_types(&mut documents, types);
        tree.documents = documents;

        tracing::info!(
            sites = tree.sites.len(),
            requirements = tree.requirements.len(),
            providers = tree.providers.len(),
            persons = tree.persons.len(),
            vehicles = tree.vehicles.len(),
            documents = tree.documents.len(),
            degraded = tree.degraded.len(),
            "Customer tree loaded"
        );
        Ok(tree)
    }

    /// Requirements of `site_ids`. When the scalar filter matches nothing the read is
    /// repeated with the nested `idSites.id` form, for backends that store the relation
    /// as an embedded object.
    async fn fetch_requirements(
        &self,
        site_ids: &[ItemId],
        bust: Option<&str>,
    ) -> SiccResult<Vec<Requirement>> {
        let base = ItemQuery::new()
            .sort("nombre")
            .fields(fields::REQUIREMENT)
            .cache_bust(bust);

        let requirements: Vec<Requirement> = fetch_items(
            self.store.as_ref(),
            collections::REQUIREMENTS,
            &base.clone().filter_in("idSites", site_ids),
        )
        .await?;
        if !requirements.is_empty() {
            return Ok(requirements);
        }

        tracing::debug!("No requirements with scalar idSites filter, retrying nested form");
        fetch_items(
            self.store.as_ref(),
            collections::REQUIREMENTS,
            &base.filter_nested_in("idSites", site_ids),
        )
        .await
    }

    /// Persons or vehicles whose `idProveedor` is one of `provider_ids`.
    async fn fetch_owned<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        sort: &str,
        field_list: &[&str],
        provider_ids: &[ItemId],
        bust: Option<&str>,
    ) -> SiccResult<Vec<T>> {
        if provider_ids.is_empty() {
            return Ok(Vec::new());
        }
        fetch_items(
            self.store.as_ref(),
            collection,
            &ItemQuery::new()
                .filter_in("idProveedor", provider_ids)
                .sort(sort)
                .fields(field_list)
                .cache_bust(bust),
        )
        .await
    }

    /// Documents of one collection owned by `owner_ids`. A failed read is retried once
    /// with the nested `{field}.id` filter.
    async fn fetch_documents(
        &self,
        collection: &str,
        field: &str,
        owner_ids: &[ItemId],
        bust: Option<&str>,
    ) -> SiccResult<Vec<Document>> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }
        let base = ItemQuery::new()
            .sort("id")
            .fields(fields::DOCUMENT)
            .cache_bust(bust);

        match fetch_items(
            self.store.as_ref(),
            collection,
            &base.clone().filter_in(field, owner_ids),
        )
        .await
        {
            Ok(documents) => Ok(documents),
            Err(e) => {
                tracing::debug!(collection, error = %e, "Document read failed, retrying nested filter");
                fetch_items(
                    self.store.as_ref(),
                    collection,
                    &base.filter_nested_in(field, owner_ids),
                )
                .await
            }
        }
    }

    async fn fetch_document_types(
        &self,
        documents: &[Document],
        bust: Option<&str>,
    ) -> SiccResult<Vec<DocumentType>> {
        let mut seen = HashSet::new();
        let type_ids: Vec<ItemId> = documents
            .iter()
            .filter_map(|d| d.id_parametro.key())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        if type_ids.is_empty() {
            return Ok(Vec::new());
        }
        fetch_items(
            self.store.as_ref(),
            collections::DOCUMENT_TYPES,
            &ItemQuery::new()
                .filter_in("id", &type_ids)
                .fields(fields::DOCUMENT_TYPE)
                .cache_bust(bust),
        )
        .await
    }
}

fn attach_document_types(documents: &mut [Document], types: Vec<DocumentType>) {
    let by_id: HashMap<ItemId, DocumentType> = types
        .into_iter()
        .filter(|t| t.id.is_truthy())
        .map(|t| (t.id.clone(), t))
        .collect();
    for document in documents.iter_mut() {
        if let Some(document_type) = document.id_parametro.key().and_then(|id| by_id.get(&id)) {
            document.document_type = Some(document_type.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn dedupe_keeps_first_position_and_last_value() {
        let documents = dedupe_documents([
            vec![
                doc(json!({ "id": 1, "status": "toPresent" })),
                doc(json!({ "id": 2, "status": "toPresent" })),
            ],
            vec![doc(json!({ "id": 1, "status": "presented" }))],
        ]);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, ItemId::Int(1));
        assert_eq!(
            documents[0].status,
            Some(sicc_core::models::DocumentStatus::Presented)
        );
    }

    #[test]
    fn dedupe_drops_rows_without_id() {
        let documents = dedupe_documents([vec![doc(json!({ "id": 0 })), doc(json!({ "id": 3 }))]]);
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn settle_records_degraded_step() {
        let mut degraded = Vec::new();
        let result: SiccResult<Vec<u8>> = Err(SiccError::Transport("connection reset".to_string()));
        let rows = settle(&mut degraded, TreeStep::Persons, result).unwrap();
        assert!(rows.is_empty());
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].step, TreeStep::Persons);
    }

    #[test]
    fn settle_never_degrades_cancellation() {
        let mut degraded = Vec::new();
        let result: SiccResult<Vec<u8>> = Err(SiccError::Aborted);
        assert!(settle(&mut degraded, TreeStep::Vehicles, result).unwrap_err().is_aborted());
        assert!(degraded.is_empty());
    }

    #[test]
    fn document_types_attach_through_any_relation_shape() {
        let mut documents = vec![
            doc(json!({ "id": 1, "idParametro": 7 })),
            doc(json!({ "id": 2, "idParametro": [{ "id": 7 }] })),
            doc(json!({ "id": 3, "idParametro": 8 })),
        ];
        attach_document_types(
            &mut documents,
            vec![DocumentType {
                id: ItemId::Int(7),
                nombre_documento: Some("Seguro".to_string()),
                validez_documento_dias: Some(365),
            }],
        );
        assert_eq!(documents[0].display_name(), "Seguro");
        assert_eq!(documents[1].display_name(), "Seguro");
        assert!(documents[2].document_type.is_none());
    }
}
