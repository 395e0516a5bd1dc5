//! `*ByParent` maps over a loaded [`CustomerTree`].

use sicc_core::models::{Document, Person, Provider, Requirement, Vehicle};
use sicc_core::{group_by, ItemId};
use std::collections::HashMap;

use crate::tree::CustomerTree;

/// Children grouped under their parent's normalized id. Rows whose relation is missing
/// or falsy appear in no group.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    pub requirements_by_site: HashMap<ItemId, Vec<Requirement>>,
    pub providers_by_requirement: HashMap<ItemId, Vec<Provider>>,
    pub persons_by_provider: HashMap<ItemId, Vec<Person>>,
    pub vehicles_by_provider: HashMap<ItemId, Vec<Vehicle>>,
    pub documents_by_provider: HashMap<ItemId, Vec<Document>>,
    pub documents_by_person: HashMap<ItemId, Vec<Document>>,
    pub documents_by_vehicle: HashMap<ItemId, Vec<Document>>,
}

impl TreeIndex {
    pub fn build(tree: &CustomerTree) -> Self {
        Self {
            requirements_by_site: group_by(tree.requirements.iter().cloned(), |r| r.id_sites.key()),
            providers_by_requirement: group_by(tree.providers.iter().cloned(), |p| {
                p.id_requerimientos.key()
            }),
            persons_by_provider: group_by(tree.persons.iter().cloned(), |p| p.id_proveedor.key()),
            vehicles_by_provider: group_by(tree.vehicles.iter().cloned(), |v| v.id_proveedor.key()),
            documents_by_provider: group_by(tree.documents.iter().cloned(), |d| d.id_proveedor.key()),
            documents_by_person: group_by(tree.documents.iter().cloned(), |d| d.id_persona.key()),
            documents_by_vehicle: group_by(tree.documents.iter().cloned(), |d| d.id_vehiculo.key()),
        }
    }

    pub fn requirements_of(&self, site: &ItemId) -> &[Requirement] {
        self.requirements_by_site.get(site).map_or(&[], Vec::as_slice)
    }

    pub fn providers_of(&self, requirement: &ItemId) -> &[Provider] {
        self.providers_by_requirement
            .get(requirement)
            .map_or(&[], Vec::as_slice)
    }

    pub fn persons_of(&self, provider: &ItemId) -> &[Person] {
        self.persons_by_provider.get(provider).map_or(&[], Vec::as_slice)
    }

    pub fn vehicles_of(&self, provider: &ItemId) -> &[Vehicle] {
        self.vehicles_by_provider.get(provider).map_or(&[], Vec::as_slice)
    }

    pub fn documents_of_provider(&self, provider: &ItemId) -> &[Document] {
        self.documents_by_provider
            .get(provider)
            .map_or(&[], Vec::as_slice)
    }

    pub fn documents_of_person(&self, person: &ItemId) -> &[Document] {
        self.documents_by_person.get(person).map_or(&[], Vec::as_slice)
    }

    pub fn documents_of_vehicle(&self, vehicle: &ItemId) -> &[Document] {
        self.documents_by_vehicle.get(vehicle).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows<T: serde::de::DeserializeOwned>(value: Value) -> Vec<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn groups_each_level_by_normalized_parent() {
        let tree = CustomerTree {
            requirements: rows(json!([
                { "id": 10, "idSites": 1 },
                { "id": 11, "idSites": { "id": 1 } },
                { "id": 12, "idSites": null }
            ])),
            providers: rows(json!([{ "id": 20, "idRequerimientos": [{ "id": 10 }] }])),
            persons: rows(json!([{ "id": 30, "idProveedor": 20 }])),
            documents: rows(json!([
                { "id": 40, "idProveedor": 20 },
                { "id": 41, "idPersona": { "id": 30 } }
            ])),
            ..CustomerTree::default()
        };

        let index = TreeIndex::build(&tree);

        let site_requirements: Vec<&ItemId> =
            index.requirements_of(&ItemId::Int(1)).iter().map(|r| &r.id).collect();
        assert_eq!(site_requirements, vec![&ItemId::Int(10), &ItemId::Int(11)]);
        assert_eq!(index.requirements_by_site.len(), 1);
        assert_eq!(index.providers_of(&ItemId::Int(10)).len(), 1);
        assert_eq!(index.persons_of(&ItemId::Int(20)).len(), 1);
        assert_eq!(index.documents_of_provider(&ItemId::Int(20))[0].id, ItemId::Int(40));
        assert_eq!(index.documents_of_person(&ItemId::Int(30))[0].id, ItemId::Int(41));
        assert!(index.documents_of_vehicle(&ItemId::Int(99)).is_empty());
        assert!(index.vehicles_of(&ItemId::Int(20)).is_empty());
    }
}
