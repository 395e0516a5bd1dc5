//! Backend collection names, field lists and fixed keys.

/// Storage key of the persisted auth session.
pub const SESSION_STORAGE_KEY: &str = "directus_auth";

pub mod collections {
    pub const CUSTOMERS: &str = "Clientes";
    pub const SITES: &str = "sites";
    pub const REQUIREMENTS: &str = "requerimiento";
    pub const PROVIDERS: &str = "proveedor";
    pub const PERSONS: &str = "persona";
    pub const VEHICLES: &str = "vehiculo";
    pub const PROVIDER_DOCUMENTS: &str = "DocumentosRequeridos";
    pub const PERSON_DOCUMENTS: &str = "documentosRequeridosPersonas";
    pub const VEHICLE_DOCUMENTS: &str = "documentosRequeridosVehiculos";
    pub const DOCUMENT_PARAMETERS: &str = "parametrosDocumentosRequeridosProveedor";
    pub const DOCUMENT_TYPES: &str = "tiposDocumentos";
}

pub mod fields {
    pub const CUSTOMER: &[&str] = &["id", "name", "CUIT", "status"];
    pub const SITE: &[&str] = &["id", "nombre", "status", "urlSlug", "idCliente"];
    pub const REQUIREMENT: &[&str] = &[
        "id",
        "nombre",
        "status",
        "fechaInicio",
        "fechaProyectadaFin",
        "idSites",
    ];
    pub const PROVIDER: &[&str] = &[
        "id",
        "nombre",
        "name",
        "razonSocial",
        "CUIT",
        "status",
        "idRequerimientos",
    ];
    pub const PERSON: &[&str] = &["id", "nombre", "apellido", "DNI", "status", "idProveedor"];
    pub const VEHICLE: &[&str] = &[
        "id",
        "dominio",
        "marca",
        "modelo",
        "color",
        "status",
        "idProveedor",
    ];
    pub const DOCUMENT: &[&str] = &[
        "id",
        "status",
        "idProveedor",
        "idPersona",
        "idVehiculo",
        "idParametro",
        "fechaPresentacion",
        "proximaFechaPresentacion",
    ];
    pub const UPCOMING_DOCUMENT: &[&str] = &[
        "id",
        "status",
        "idParametro",
        "idProveedor",
        "proximaFechaPresentacion",
        "fechaPresentacion",
    ];
    pub const DOCUMENT_TYPE: &[&str] = &["id", "nombreDocumento", "validezDocumentoDias"];
    pub const DOCUMENT_PARAMETER: &[&str] = &[
        "id",
        "idTipoDocumento",
        "idTipoEntidad",
        "fechaDesde",
        "fechaHasta",
    ];
}

/// Content type accepted for document file uploads.
pub const DOCUMENT_UPLOAD_CONTENT_TYPE: &str = "application/pdf";
