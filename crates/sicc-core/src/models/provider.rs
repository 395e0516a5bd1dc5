use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::relation::{ItemId, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ItemId,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub razon_social: Option<String>,
    #[serde(default, rename = "CUIT")]
    pub cuit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id_requerimientos: Relation,
}

impl Provider {
    /// `nombre`, then `name`, then `razonSocial`.
    pub fn display_name(&self) -> &str {
        [&self.nombre, &self.name, &self.razon_social]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or("Sin nombre")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: ItemId,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub apellido: Option<String>,
    /// Stored as a number by the forms, but older rows carry strings.
    #[serde(default, rename = "DNI")]
    pub dni: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id_proveedor: Relation,
}

impl Person {
    pub fn full_name(&self) -> String {
        let full: Vec<&str> = [&self.nombre, &self.apellido]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if full.is_empty() {
            format!("Persona {}", self.id)
        } else {
            full.join(" ")
        }
    }

    pub fn dni_display(&self) -> String {
        match &self.dni {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: ItemId,
    #[serde(default)]
    pub dominio: Option<String>,
    #[serde(default)]
    pub marca: Option<String>,
    #[serde(default)]
    pub modelo: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id_proveedor: Relation,
}

impl Vehicle {
    /// `dominio`, then `modelo`, then a generic label.
    pub fn display_name(&self) -> String {
        [&self.dominio, &self.modelo]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Vehículo {}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_display_name_falls_back() {
        let provider: Provider =
            serde_json::from_value(json!({ "id": 1, "razonSocial": "Transportes SA" })).unwrap();
        assert_eq!(provider.display_name(), "Transportes SA");

        let unnamed: Provider = serde_json::from_value(json!({ "id": 2 })).unwrap();
        assert_eq!(unnamed.display_name(), "Sin nombre");
    }

    #[test]
    fn person_accepts_numeric_and_string_dni() {
        let numeric: Person =
            serde_json::from_value(json!({ "id": 1, "nombre": "Ana", "DNI": 30111222 })).unwrap();
        let text: Person =
            serde_json::from_value(json!({ "id": 2, "apellido": "Paz", "DNI": "28999000" }))
                .unwrap();
        assert_eq!(numeric.dni_display(), "30111222");
        assert_eq!(text.dni_display(), "28999000");
        assert_eq!(numeric.full_name(), "Ana");
        assert_eq!(text.full_name(), "Paz");
    }

    #[test]
    fn vehicle_display_name_prefers_dominio() {
        let vehicle: Vehicle = serde_json::from_value(
            json!({ "id": 5, "dominio": "AB123CD", "modelo": "Hilux", "idProveedor": [{ "id": 9 }] }),
        )
        .unwrap();
        assert_eq!(vehicle.display_name(), "AB123CD");
        assert_eq!(vehicle.id_proveedor.id(), Some(ItemId::Int(9)));
    }
}
