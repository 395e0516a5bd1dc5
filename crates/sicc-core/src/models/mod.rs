//! Domain models
//!
//! Rows of the backend collections, deserialized leniently: every field except the
//! primary key may be missing because queries restrict `fields`.

pub mod customer;
pub mod document;
pub mod forms;
pub mod provider;

pub use customer::{Customer, Requirement, Site};
pub use document::{
    Document, DocumentOwner, DocumentStatus, DocumentType, EntityKind, NewDocument,
    RequiredDocumentParameter,
};
pub use forms::{
    LoginRequest, NewCustomer, NewPerson, NewProvider, NewRequirement, NewSite, NewVehicle,
    RecordStatus,
};
pub use provider::{Person, Provider, Vehicle};
