use chrono::NaiveDate;
use serde_json::{json, Value};
use sicc_core::constants::collections;
use sicc_core::models::Provider;
use sicc_core::{ItemId, SiccError};
use sicc_services::testing::{MemoryStore, StoreMethod};
use sicc_services::{
    CustomerTreeLoader, GenerationInput, RequiredDocumentsGenerator, TreeIndex, TreeStep,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn parameter(id: i64, document_type: i64, entity: i64, until: &str) -> Value {
    json!({
        "id": id,
        "idTipoDocumento": document_type,
        "idTipoEntidad": entity,
        "fechaDesde": "2026-01-01",
        "fechaHasta": until,
    })
}

/// Customer 42 with one site, one requirement, providers 20 and 21, person 30 under
/// provider 20 and vehicle 40 under provider 21. Provider 21 already has a document.
fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(
            collections::CUSTOMERS,
            [json!({ "id": 42, "name": "Acme", "CUIT": "30-12345678-9" })],
        )
        .insert(
            collections::SITES,
            [json!({ "id": 1, "nombre": "Planta", "idCliente": 42 })],
        )
        .insert(
            collections::REQUIREMENTS,
            [json!({ "id": 10, "nombre": "Obra", "idSites": 1 })],
        )
        .insert(
            collections::PROVIDERS,
            [
                json!({ "id": 20, "nombre": "Transportes Sur", "idRequerimientos": 10 }),
                json!({ "id": 21, "nombre": "Grúas Norte", "idRequerimientos": 10 }),
            ],
        )
        .insert(
            collections::PERSONS,
            [json!({ "id": 30, "nombre": "Ana", "apellido": "Pérez", "idProveedor": 20 })],
        )
        .insert(
            collections::VEHICLES,
            [json!({ "id": 40, "dominio": "AB123CD", "idProveedor": 21 })],
        )
        .insert(
            collections::PROVIDER_DOCUMENTS,
            [json!({ "id": 500, "status": "approved", "idProveedor": 21, "idParametro": 7 })],
        )
        .insert(
            collections::DOCUMENT_PARAMETERS,
            [
                parameter(1, 7, 1, "2026-12-31"),
                parameter(2, 8, 2, "2026-12-31"),
                parameter(3, 9, 3, "2026-12-31"),
                parameter(4, 10, 4, "2026-12-31"),
                parameter(5, 11, 3, "2026-06-30"),
            ],
        )
        .insert(
            collections::DOCUMENT_TYPES,
            [
                json!({ "id": 7, "nombreDocumento": "Seguro", "validezDocumentoDias": 365 }),
                json!({ "id": 8, "nombreDocumento": "ART", "validezDocumentoDias": 30 }),
                json!({ "id": 9, "nombreDocumento": "Apto médico", "validezDocumentoDias": 180 }),
                json!({ "id": 10, "nombreDocumento": "VTV", "validezDocumentoDias": null }),
                json!({ "id": 11, "nombreDocumento": "Curso vencido", "validezDocumentoDias": 90 }),
            ],
        );
    store
}

#[tokio::test]
async fn generation_is_idempotent_across_reloads() {
    let store = seeded_store();
    let loader = CustomerTreeLoader::new(store.clone());
    let generator = RequiredDocumentsGenerator::new(store.clone());
    let cancel = CancellationToken::new();
    let customer = ItemId::Int(42);

    let tree = loader.load(&customer, &cancel).await.unwrap();
    assert_eq!(tree.customer.as_ref().map(|c| c.display_name()), Some("Acme"));
    assert_eq!(tree.documents.len(), 1);
    assert_eq!(tree.documents[0].display_name(), "Seguro");
    assert!(!tree.is_degraded());

    let index = TreeIndex::build(&tree);
    let first = generator
        .generate_on(GenerationInput::from_tree(&tree, &index).unwrap(), today(), &cancel)
        .await
        .unwrap();

    assert_eq!(first.parameters_count, 4);
    assert_eq!(first.created_provider_docs, 2);
    assert_eq!(first.created_person_docs, 1);
    assert_eq!(first.created_vehicle_docs, 1);
    assert_eq!(first.providers_processed, 1);
    assert_eq!(first.skipped_providers, 1);
    assert_eq!(first.created_documents.len(), 4);

    let person_docs = store.rows(collections::PERSON_DOCUMENTS);
    assert_eq!(person_docs.len(), 1);
    assert_eq!(person_docs[0]["idPersona"], 30);
    assert_eq!(person_docs[0]["idParametro"], 9);
    assert_eq!(person_docs[0]["validezDias"], 180);
    assert_eq!(person_docs[0]["status"], "toPresent");
    let vehicle_docs = store.rows(collections::VEHICLE_DOCUMENTS);
    assert_eq!(vehicle_docs[0]["validezDias"], Value::Null);

    let tree = loader.load(&customer, &cancel).await.unwrap();
    let index = TreeIndex::build(&tree);
    let second = generator
        .generate_on(GenerationInput::from_tree(&tree, &index).unwrap(), today(), &cancel)
        .await
        .unwrap();

    assert_eq!(second.total_created(), 0);
    assert_eq!(second.skipped_providers, 2);
    assert_eq!(second.skipped_persons, 1);
    assert_eq!(second.skipped_vehicles, 1);
    assert_eq!(
        store
            .calls_to(StoreMethod::List, collections::DOCUMENT_PARAMETERS)
            .len(),
        1
    );
}

#[tokio::test]
async fn every_eligible_provider_gets_every_provider_parameter() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(
            collections::DOCUMENT_PARAMETERS,
            [
                parameter(1, 7, 1, "2026-12-31"),
                parameter(2, 8, 2, "2026-12-31"),
                parameter(3, 9, 1, "2026-12-31"),
                parameter(4, 12, 3, "2026-12-31"),
            ],
        )
        .insert(
            collections::DOCUMENT_TYPES,
            [
                json!({ "id": 7, "validezDocumentoDias": 365 }),
                json!({ "id": 8, "validezDocumentoDias": 30 }),
                json!({ "id": 9, "validezDocumentoDias": 60 }),
                json!({ "id": 12, "validezDocumentoDias": 60 }),
            ],
        );
    let providers: Vec<Provider> = serde_json::from_value(json!([
        { "id": 1 }, { "id": 2 }, { "id": 3 }, { "id": 4 }, { "id": 5 }
    ]))
    .unwrap();
    let existing: sicc_core::models::Document =
        serde_json::from_value(json!({ "id": 99, "idProveedor": 4 })).unwrap();
    let documents_by_provider = HashMap::from([
        (ItemId::Int(4), vec![existing.clone()]),
        (ItemId::Int(5), vec![existing]),
    ]);
    let empty = HashMap::new();
    let (no_persons, no_vehicles) = (HashMap::new(), HashMap::new());

    let result = RequiredDocumentsGenerator::new(store.clone())
        .generate_on(
            GenerationInput {
                providers: &providers,
                documents_by_provider: &documents_by_provider,
                persons_by_provider: &no_persons,
                vehicles_by_provider: &no_vehicles,
                documents_by_person: &empty,
                documents_by_vehicle: &empty,
            },
            today(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.providers_processed, 3);
    assert_eq!(result.skipped_providers, 2);
    assert_eq!(result.created_provider_docs, 9);
    assert_eq!(result.created_person_docs, 0);
    assert!(store
        .calls_to(StoreMethod::CreateMany, collections::PERSON_DOCUMENTS)
        .is_empty());

    let parameter_call = &store.calls_to(StoreMethod::List, collections::DOCUMENT_PARAMETERS)[0];
    assert_eq!(parameter_call.param("filter[idTipoEntidad][_in]"), Some("1,2,3,4"));
    assert_eq!(parameter_call.param("filter[fechaDesde][_lte]"), Some("2026-10-18"));
    assert_eq!(parameter_call.param("filter[fechaHasta][_gte]"), Some("2026-10-18"));
}

#[tokio::test]
async fn failed_bulk_insert_keeps_the_other_collections() {
    let store = seeded_store();
    store.fail_method(
        collections::PERSON_DOCUMENTS,
        StoreMethod::CreateMany,
        500,
        "Internal Server Error",
    );
    let cancel = CancellationToken::new();
    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &cancel)
        .await
        .unwrap();
    let index = TreeIndex::build(&tree);

    let err = RequiredDocumentsGenerator::new(store.clone())
        .generate_on(GenerationInput::from_tree(&tree, &index).unwrap(), today(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SiccError::Http { status: 500, .. }));
    assert_eq!(store.rows(collections::PROVIDER_DOCUMENTS).len(), 3);
    assert_eq!(store.rows(collections::VEHICLE_DOCUMENTS).len(), 1);
    assert!(store.rows(collections::PERSON_DOCUMENTS).is_empty());
}

#[tokio::test]
async fn customer_without_sites_loads_an_empty_tree() {
    let store = Arc::new(MemoryStore::new());
    store.insert(collections::CUSTOMERS, [json!({ "id": 42, "name": "Acme" })]);

    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &CancellationToken::new())
        .await
        .unwrap();

    assert!(tree.customer.is_some());
    assert!(tree.sites.is_empty() && tree.providers.is_empty() && tree.documents.is_empty());
    assert!(store
        .calls_to(StoreMethod::List, collections::REQUIREMENTS)
        .is_empty());
}

#[tokio::test]
async fn failed_person_read_degrades_the_tree() {
    let store = seeded_store();
    store.fail(collections::PERSONS, 503, "Service Unavailable");

    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &CancellationToken::new())
        .await
        .unwrap();

    assert!(tree.persons.is_empty());
    assert_eq!(tree.vehicles.len(), 1);
    assert_eq!(tree.degraded.len(), 1);
    assert_eq!(tree.degraded[0].step, TreeStep::Persons);
    assert!(store
        .calls_to(StoreMethod::List, collections::PERSON_DOCUMENTS)
        .is_empty());
}

#[tokio::test]
async fn degraded_document_read_blocks_generation() {
    let store = seeded_store();
    store.fail_method(
        collections::PROVIDER_DOCUMENTS,
        StoreMethod::List,
        403,
        "You don't have permission to access this.",
    );
    let cancel = CancellationToken::new();

    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &cancel)
        .await
        .unwrap();
    assert_eq!(tree.degraded[0].step, TreeStep::ProviderDocuments);
    let index = TreeIndex::build(&tree);

    let err = GenerationInput::from_tree(&tree, &index).unwrap_err();

    assert!(matches!(err, SiccError::Incomplete(_)));
    assert!(err.to_string().contains("provider_documents"));
    assert_eq!(store.rows(collections::PROVIDER_DOCUMENTS).len(), 1);
    assert!(store
        .calls_to(StoreMethod::List, collections::DOCUMENT_PARAMETERS)
        .is_empty());
}

#[tokio::test]
async fn degraded_person_read_still_allows_generation() {
    let store = seeded_store();
    store.fail(collections::PERSONS, 503, "Service Unavailable");
    let cancel = CancellationToken::new();

    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &cancel)
        .await
        .unwrap();
    let index = TreeIndex::build(&tree);

    let result = RequiredDocumentsGenerator::new(store.clone())
        .generate_on(GenerationInput::from_tree(&tree, &index).unwrap(), today(), &cancel)
        .await
        .unwrap();

    assert_eq!(result.created_person_docs, 0);
    assert_eq!(result.skipped_providers, 1);
    assert!(store.rows(collections::PERSON_DOCUMENTS).is_empty());
}

#[tokio::test]
async fn document_reads_request_only_tree_fields() {
    let store = seeded_store();

    CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &CancellationToken::new())
        .await
        .unwrap();

    for collection in [
        collections::PROVIDER_DOCUMENTS,
        collections::PERSON_DOCUMENTS,
        collections::VEHICLE_DOCUMENTS,
    ] {
        let call = &store.calls_to(StoreMethod::List, collection)[0];
        assert_eq!(
            call.param("fields"),
            Some("id,status,idProveedor,idPersona,idVehiculo,idParametro,fechaPresentacion,proximaFechaPresentacion"),
            "{}",
            collection
        );
    }
}

#[tokio::test]
async fn missing_customer_fails_the_load() {
    let store = seeded_store();

    let err = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(9999), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SiccError::NotFound(_)));
    assert!(store.calls_to(StoreMethod::List, collections::SITES).is_empty());
}

#[tokio::test]
async fn failed_provider_read_fails_the_load() {
    let store = seeded_store();
    store.fail(collections::PROVIDERS, 500, "boom");

    let err = CustomerTreeLoader::new(store)
        .load(&ItemId::Int(42), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SiccError::Http { status: 500, .. }));
}

#[tokio::test]
async fn embedded_relations_use_the_nested_filters() {
    let store = Arc::new(MemoryStore::new());
    store
        .insert(collections::CUSTOMERS, [json!({ "id": 42, "name": "Acme" })])
        .insert(collections::SITES, [json!({ "id": 1, "idCliente": 42 })])
        .insert(
            collections::REQUIREMENTS,
            [json!({ "id": 10, "idSites": { "id": 1, "nombre": "Planta" } })],
        )
        .insert(
            collections::PROVIDERS,
            [json!({ "id": 20, "idRequerimientos": 10 })],
        )
        .insert(
            collections::PROVIDER_DOCUMENTS,
            [json!({ "id": 600, "idProveedor": { "id": 20 } })],
        );
    store.fail_query(
        collections::PROVIDER_DOCUMENTS,
        "filter[idProveedor][_in]",
        400,
        "Invalid filter",
    );

    let tree = CustomerTreeLoader::new(store.clone())
        .load(&ItemId::Int(42), &CancellationToken::new())
        .await
        .unwrap();

    assert!(tree.customer.is_some());
    assert_eq!(tree.requirements.len(), 1);
    assert_eq!(tree.providers.len(), 1);
    assert_eq!(tree.documents.len(), 1);
    assert!(!tree.is_degraded());

    let requirement_calls = store.calls_to(StoreMethod::List, collections::REQUIREMENTS);
    assert_eq!(requirement_calls.len(), 2);
    assert_eq!(requirement_calls[1].param("filter[idSites][id][_in]"), Some("1"));
}

#[tokio::test]
async fn cancelled_load_is_aborted() {
    let store = seeded_store();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = CustomerTreeLoader::new(store)
        .load(&ItemId::Int(42), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_aborted());
}
