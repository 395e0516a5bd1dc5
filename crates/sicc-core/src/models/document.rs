use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::relation::{ItemId, Relation};

/// Lifecycle status of a required document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentStatus {
    ToPresent,
    Presented,
    Approved,
    Archived,
    Finalized,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::ToPresent => "toPresent",
            DocumentStatus::Presented => "presented",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Archived => "archived",
            DocumentStatus::Finalized => "finalized",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::ToPresent => "A Presentar",
            DocumentStatus::Presented => "Presentado",
            DocumentStatus::Approved => "Aprobado",
            DocumentStatus::Archived => "Archivado",
            DocumentStatus::Finalized => "Vencido",
            DocumentStatus::Rejected => "Rechazado",
            DocumentStatus::Unknown => "Sin estado",
        }
    }

    /// Label for a raw status key as the dashboard shows it: known statuses get their
    /// Spanish label, unknown keys have underscores replaced by spaces.
    pub fn label_for_key(key: &str) -> String {
        if key.is_empty() {
            return "Sin estado".to_string();
        }
        match serde_json::from_value::<DocumentStatus>(serde_json::Value::from(key)) {
            Ok(DocumentStatus::Unknown) | Err(_) => key.replace('_', " "),
            Ok(status) => status.label().to_string(),
        }
    }
}

/// Which kind of entity a document (or a requirement parameter) applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Provider,
    Person,
    Vehicle,
}

impl EntityKind {
    /// Every entity-type code a parameter may carry.
    pub const CODES: [i64; 4] = [1, 2, 3, 4];

    /// Codes 1 and 2 both mean provider.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 | 2 => Some(EntityKind::Provider),
            3 => Some(EntityKind::Person),
            4 => Some(EntityKind::Vehicle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: ItemId,
    #[serde(default)]
    pub nombre_documento: Option<String>,
    #[serde(default)]
    pub validez_documento_dias: Option<i64>,
}

/// Time-bounded rule: entities of one kind must present a document of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocumentParameter {
    pub id: ItemId,
    #[serde(default)]
    pub id_tipo_documento: Relation,
    #[serde(default)]
    pub id_tipo_entidad: Relation,
    #[serde(default)]
    pub fecha_desde: Option<String>,
    #[serde(default)]
    pub fecha_hasta: Option<String>,
}

impl RequiredDocumentParameter {
    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.id_tipo_entidad
            .id()
            .and_then(|id| id.as_i64())
            .and_then(EntityKind::from_code)
    }

    pub fn document_type_id(&self) -> Option<ItemId> {
        self.id_tipo_documento.key()
    }

    /// Inclusive `[fechaDesde, fechaHasta]` check. A missing or unparseable bound fails.
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        match (
            self.fecha_desde.as_deref().and_then(parse_day),
            self.fecha_hasta.as_deref().and_then(parse_day),
        ) {
            (Some(from), Some(to)) => from <= day && day <= to,
            _ => false,
        }
    }
}

/// Parse the date part of a Directus date or datetime string.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// A document row from any of the three document collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: ItemId,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub id_parametro: Relation,
    #[serde(default)]
    pub id_proveedor: Relation,
    #[serde(default)]
    pub id_persona: Relation,
    #[serde(default)]
    pub id_vehiculo: Relation,
    #[serde(default)]
    pub fecha_presentacion: Option<String>,
    #[serde(default)]
    pub proxima_fecha_presentacion: Option<String>,
    /// Joined in-process by the tree loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
}

impl Document {
    pub fn display_name(&self) -> String {
        self.document_type
            .as_ref()
            .and_then(|t| t.nombre_documento.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Documento {}", self.id))
    }
}

/// The entity a new document belongs to. Set once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentOwner {
    Provider(ItemId),
    Person(ItemId),
    Vehicle(ItemId),
}

/// Payload of a generated document row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub status: DocumentStatus,
    pub validez_dias: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_proveedor: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_persona: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_vehiculo: Option<ItemId>,
    pub id_parametro: ItemId,
}

impl NewDocument {
    /// A `toPresent` document of `document_type` owned by `owner`.
    pub fn to_present(owner: DocumentOwner, document_type: &DocumentType) -> Self {
        let mut doc = Self {
            status: DocumentStatus::ToPresent,
            validez_dias: document_type.validez_documento_dias,
            id_proveedor: None,
            id_persona: None,
            id_vehiculo: None,
            id_parametro: document_type.id.clone(),
        };
        match owner {
            DocumentOwner::Provider(id) => doc.id_proveedor = Some(id),
            DocumentOwner::Person(id) => doc.id_persona = Some(id),
            DocumentOwner::Vehicle(id) => doc.id_vehiculo = Some(id),
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seguro() -> DocumentType {
        DocumentType {
            id: ItemId::Int(7),
            nombre_documento: Some("Seguro".to_string()),
            validez_documento_dias: Some(365),
        }
    }

    #[test]
    fn new_document_serializes_only_its_owner_key() {
        let doc = NewDocument::to_present(DocumentOwner::Person(ItemId::Int(11)), &seguro());
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "status": "toPresent",
                "validezDias": 365,
                "idPersona": 11,
                "idParametro": 7
            })
        );
    }

    #[test]
    fn new_document_keeps_null_validity() {
        let mut doc_type = seguro();
        doc_type.validez_documento_dias = None;
        let doc = NewDocument::to_present(DocumentOwner::Vehicle(ItemId::Int(2)), &doc_type);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["validezDias"], serde_json::Value::Null);
        assert_eq!(value["idVehiculo"], json!(2));
    }

    #[test]
    fn unknown_status_deserializes() {
        let doc: Document =
            serde_json::from_value(json!({ "id": 1, "status": "pendingReview" })).unwrap();
        assert_eq!(doc.status, Some(DocumentStatus::Unknown));
    }

    #[test]
    fn status_labels() {
        assert_eq!(DocumentStatus::label_for_key("toPresent"), "A Presentar");
        assert_eq!(DocumentStatus::label_for_key("finalized"), "Vencido");
        assert_eq!(DocumentStatus::label_for_key("en_revision"), "en revision");
        assert_eq!(DocumentStatus::label_for_key(""), "Sin estado");
    }

    #[test]
    fn entity_kind_codes() {
        assert_eq!(EntityKind::from_code(1), Some(EntityKind::Provider));
        assert_eq!(EntityKind::from_code(2), Some(EntityKind::Provider));
        assert_eq!(EntityKind::from_code(3), Some(EntityKind::Person));
        assert_eq!(EntityKind::from_code(4), Some(EntityKind::Vehicle));
        assert_eq!(EntityKind::from_code(5), None);
    }

    #[test]
    fn parameter_entity_kind_accepts_embedded_relation() {
        let parameter: RequiredDocumentParameter = serde_json::from_value(json!({
            "id": 1,
            "idTipoDocumento": { "id": 7 },
            "idTipoEntidad": { "id": 3, "nombre": "Persona" },
            "fechaDesde": "2026-01-01",
            "fechaHasta": "2026-12-31T00:00:00"
        }))
        .unwrap();
        assert_eq!(parameter.entity_kind(), Some(EntityKind::Person));
        assert_eq!(parameter.document_type_id(), Some(ItemId::Int(7)));
    }

    #[test]
    fn parameter_window_is_inclusive() {
        let parameter: RequiredDocumentParameter = serde_json::from_value(json!({
            "id": 1,
            "fechaDesde": "2026-10-01",
            "fechaHasta": "2026-10-18"
        }))
        .unwrap();
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(parameter.is_active_on(day("2026-10-01")));
        assert!(parameter.is_active_on(day("2026-10-18")));
        assert!(!parameter.is_active_on(day("2026-10-19")));
        assert!(!parameter.is_active_on(day("2026-09-30")));
    }
}
