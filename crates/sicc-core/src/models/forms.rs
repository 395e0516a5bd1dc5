//! Create-entity payloads.
//!
//! Each form is trimmed with `normalized()` and checked with `validator` before anything
//! is sent, so field errors surface inline without a network round trip.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use validator::Validate;

use crate::relation::ItemId;
use crate::validation::{slugify, trimmed, CUIT_PATTERN, DNI_PATTERN, EMAIL_PATTERN};

/// Publication status of catalog rows (customers, sites, requirements, providers, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Published,
    Draft,
    Archived,
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "published" => Ok(RecordStatus::Published),
            "draft" => Ok(RecordStatus::Draft),
            "archived" => Ok(RecordStatus::Archived),
            other => Err(format!("Estado desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(regex(path = *EMAIL_PATTERN, message = "Ingresá un email válido."))]
    pub email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewCustomer {
    pub status: RecordStatus,
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio (máx. 120 caracteres)."))]
    pub name: String,
    #[serde(rename = "CUIT")]
    #[validate(regex(path = *CUIT_PATTERN, message = "El CUIT debe tener el formato NN-NNNNNNNN-N."))]
    pub cuit: Option<String>,
}

impl NewCustomer {
    pub fn normalized(self) -> Self {
        Self {
            status: self.status,
            name: self.name.trim().to_string(),
            cuit: trimmed(self.cuit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSite {
    pub status: RecordStatus,
    #[validate(length(min = 1, max = 100, message = "El nombre es obligatorio (máx. 100 caracteres)."))]
    pub nombre: String,
    pub url_slug: Option<String>,
    pub id_cliente: ItemId,
}

impl NewSite {
    pub fn normalized(self) -> Self {
        let nombre = self.nombre.trim().to_string();
        Self {
            url_slug: Some(slug_or_name(&nombre)),
            nombre,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRequirement {
    pub status: RecordStatus,
    #[validate(length(min = 1, max = 255, message = "El nombre es obligatorio (máx. 255 caracteres)."))]
    pub nombre: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_proyectada_fin: NaiveDate,
    pub id_sites: ItemId,
}

impl NewRequirement {
    pub fn normalized(self) -> Self {
        Self {
            nombre: self.nombre.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProvider {
    pub status: RecordStatus,
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio (máx. 120 caracteres)."))]
    pub nombre: String,
    #[serde(rename = "CUIT")]
    #[validate(length(max = 20, message = "El CUIT no puede superar 20 caracteres."))]
    pub cuit: Option<String>,
    pub id_requerimientos: ItemId,
    pub url_slug: Option<String>,
}

impl NewProvider {
    pub fn normalized(self) -> Self {
        let nombre = self.nombre.trim().to_string();
        Self {
            url_slug: Some(slug_or_name(&nombre)),
            cuit: trimmed(self.cuit),
            nombre,
            ..self
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub status: RecordStatus,
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio (máx. 120 caracteres)."))]
    pub nombre: String,
    #[validate(length(min = 1, max = 120, message = "El apellido es obligatorio (máx. 120 caracteres)."))]
    pub apellido: String,
    /// Sent as a number.
    #[serde(rename = "DNI", serialize_with = "serialize_dni")]
    #[validate(regex(path = *DNI_PATTERN, message = "El DNI debe ser numérico."))]
    pub dni: String,
    pub id_proveedor: ItemId,
}

impl NewPerson {
    pub fn normalized(self) -> Self {
        Self {
            nombre: self.nombre.trim().to_string(),
            apellido: self.apellido.trim().to_string(),
            dni: self.dni.trim().to_string(),
            ..self
        }
    }
}

fn serialize_dni<S: Serializer>(dni: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match dni.parse::<u64>() {
        Ok(n) => serializer.serialize_u64(n),
        Err(_) => serializer.serialize_str(dni),
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub status: RecordStatus,
    #[validate(length(max = 20, message = "El dominio no puede superar 20 caracteres."))]
    pub dominio: Option<String>,
    #[validate(length(max = 120, message = "La marca no puede superar 120 caracteres."))]
    pub marca: Option<String>,
    #[validate(length(max = 120, message = "El modelo no puede superar 120 caracteres."))]
    pub modelo: Option<String>,
    #[validate(length(max = 60, message = "El color no puede superar 60 caracteres."))]
    pub color: Option<String>,
    #[validate(length(max = 255, message = "Las observaciones no pueden superar 255 caracteres."))]
    pub observaciones: Option<String>,
    pub id_proveedor: ItemId,
}

impl NewVehicle {
    pub fn normalized(self) -> Self {
        Self {
            status: self.status,
            dominio: trimmed(self.dominio),
            marca: trimmed(self.marca),
            modelo: trimmed(self.modelo),
            color: trimmed(self.color),
            observaciones: trimmed(self.observaciones),
            id_proveedor: self.id_proveedor,
        }
    }
}

fn slug_or_name(nombre: &str) -> String {
    let slug = slugify(nombre);
    if slug.is_empty() {
        nombre.to_string()
    } else {
        slug
    }
}
