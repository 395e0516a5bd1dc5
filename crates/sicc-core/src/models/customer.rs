use serde::{Deserialize, Serialize};

use crate::relation::{ItemId, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "CUIT")]
    pub cuit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Sin nombre")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: ItemId,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url_slug: Option<String>,
    #[serde(default)]
    pub id_cliente: Relation,
}

impl Site {
    pub fn display_name(&self) -> &str {
        self.nombre.as_deref().unwrap_or("Sin nombre")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: ItemId,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fecha_inicio: Option<String>,
    #[serde(default)]
    pub fecha_proyectada_fin: Option<String>,
    #[serde(default)]
    pub id_sites: Relation,
}

impl Requirement {
    pub fn display_name(&self) -> &str {
        self.nombre.as_deref().unwrap_or("Sin nombre")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requirement_accepts_embedded_site_relation() {
        let requirement: Requirement = serde_json::from_value(json!({
            "id": 10,
            "nombre": "Mantenimiento",
            "fechaInicio": "2026-01-01",
            "idSites": { "id": 3, "nombre": "Planta Norte" }
        }))
        .unwrap();
        assert_eq!(requirement.id_sites.id(), Some(ItemId::Int(3)));
        assert_eq!(requirement.fecha_inicio.as_deref(), Some("2026-01-01"));
        assert!(requirement.fecha_proyectada_fin.is_none());
    }

    #[test]
    fn customer_reads_uppercase_cuit() {
        let customer: Customer =
            serde_json::from_value(json!({ "id": 42, "name": "ACME", "CUIT": "30-12345678-9" }))
                .unwrap();
        assert_eq!(customer.cuit.as_deref(), Some("30-12345678-9"));
        assert_eq!(customer.display_name(), "ACME");
    }
}
