//! Catalog reads and writes: customer listing, entity creation and document file actions.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use sicc_core::constants::{collections, fields};
use sicc_core::models::{
    Customer, DocumentStatus, NewCustomer, NewPerson, NewProvider, NewRequirement, NewSite,
    NewVehicle, Person, Provider, Requirement, Site, Vehicle,
};
use sicc_core::store::decode_rows;
use sicc_core::validation::is_blank;
use sicc_core::{FilterOp, ItemId, ItemQuery, ItemStore, SiccError, SiccResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::cancellable;

/// One page of the customer list plus the filtered total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ItemStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Customers sorted by name, `page` is 1-based. A non-blank `search` filters by name,
    /// case-insensitively.
    pub async fn customers_page(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
        cancel: &CancellationToken,
    ) -> SiccResult<CustomerPage> {
        if page == 0 || page_size == 0 {
            return Err(SiccError::InvalidInput(
                "La página y el tamaño de página deben ser mayores a cero.".to_string(),
            ));
        }

        let mut query = ItemQuery::new()
            .fields(fields::CUSTOMER)
            .sort("name")
            .limit(i64::from(page_size))
            .page(page)
            .with_filter_count();
        if let Some(term) = search.filter(|s| !is_blank(s)) {
            query = query.filter("name", FilterOp::IContains, term.trim());
        }

        let response = cancellable(cancel, self.store.list(collections::CUSTOMERS, &query)).await?;
        let total = response.filter_count();
        Ok(CustomerPage {
            customers: decode_rows(collections::CUSTOMERS, response.data)?,
            total,
        })
    }

    /// Every customer, for the manager selector.
    pub async fn manager_customers(&self, cancel: &CancellationToken) -> SiccResult<Vec<Customer>> {
        let query = ItemQuery::new()
            .fields(fields::CUSTOMER)
            .sort("name")
            .limit(-1);
        let response = cancellable(cancel, self.store.list(collections::CUSTOMERS, &query)).await?;
        decode_rows(collections::CUSTOMERS, response.data)
    }

    pub async fn create_customer(&self, form: NewCustomer) -> SiccResult<Customer> {
        let form = form.normalized();
        form.validate()?;
        self.create(collections::CUSTOMERS, &form).await
    }

    pub async fn create_site(&self, form: NewSite) -> SiccResult<Site> {
        let form = form.normalized();
        form.validate()?;
        self.create(collections::SITES, &form).await
    }

    pub async fn create_requirement(&self, form: NewRequirement) -> SiccResult<Requirement> {
        let form = form.normalized();
        form.validate()?;
        if form.fecha_proyectada_fin < form.fecha_inicio {
            return Err(SiccError::InvalidInput(
                "La fecha de fin no puede ser anterior a la de inicio.".to_string(),
            ));
        }
        self.create(collections::REQUIREMENTS, &form).await
    }

    pub async fn create_provider(&self, form: NewProvider) -> SiccResult<Provider> {
        let form = form.normalized();
        form.validate()?;
        self.create(collections::PROVIDERS, &form).await
    }

    pub async fn create_person(&self, form: NewPerson) -> SiccResult<Person> {
        let form = form.normalized();
        form.validate()?;
        self.create(collections::PERSONS, &form).await
    }

    pub async fn create_vehicle(&self, form: NewVehicle) -> SiccResult<Vehicle> {
        let form = form.normalized();
        form.validate()?;
        self.create(collections::VEHICLES, &form).await
    }

    /// Link an uploaded file to a provider document and mark it presented.
    pub async fn attach_document_file(
        &self,
        document_id: &ItemId,
        file_id: &ItemId,
    ) -> SiccResult<Value> {
        tracing::info!(document_id = %document_id, file_id = %file_id, "Attaching file to document");
        self.store
            .update(
                collections::PROVIDER_DOCUMENTS,
                document_id,
                json!({
                    "archivo": file_id.to_value(),
                    "status": DocumentStatus::Presented.as_str(),
                }),
            )
            .await
    }

    /// Archive a provider document and detach its file.
    pub async fn archive_document(&self, document_id: &ItemId) -> SiccResult<Value> {
        tracing::info!(document_id = %document_id, "Archiving document");
        self.store
            .update(
                collections::PROVIDER_DOCUMENTS,
                document_id,
                json!({
                    "status": DocumentStatus::Archived.as_str(),
                    "archivo": Value::Null,
                }),
            )
            .await
    }

    async fn create<F, T>(&self, collection: &str, form: &F) -> SiccResult<T>
    where
        F: Serialize + Sync,
        T: DeserializeOwned,
    {
        let row = self.store.create(collection, serde_json::to_value(form)?).await?;
        tracing::info!(collection, id = ?row.get("id"), "Item created");
        serde_json::from_value(row).map_err(|e| {
            SiccError::InvalidResponse(format!("Respuesta inválida de {}: {}", collection, e))
        })
    }
}
