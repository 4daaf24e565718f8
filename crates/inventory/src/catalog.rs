//! Reference records items point at: categories, storage locations, suppliers.

use serde::{Deserialize, Serialize};

use fiberstock_core::{CategoryId, DomainError, DomainResult, Entity, LocationId, SupplierId};

/// Which business a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    /// Wireless ISP.
    Wisp,
    /// Fiber network operator.
    Fno,
    #[default]
    Both,
}

impl Company {
    pub fn label(self) -> &'static str {
        match self {
            Company::Wisp => "WISP",
            Company::Fno => "FNO",
            Company::Both => "Both",
        }
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub parent_id: Option<CategoryId>,
    pub company: Company,
}

/// Item category (e.g. Radio, Fiber, Tools, Civil Materials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub parent_id: Option<CategoryId>,
    pub company: Company,
}

impl Category {
    pub fn new(id: CategoryId, new: NewCategory) -> DomainResult<Self> {
        if new.parent_id == Some(id) {
            return Err(DomainError::validation("category cannot be its own parent"));
        }
        Ok(Self {
            id,
            name: required("category name", &new.name)?,
            description: new.description,
            parent_id: new.parent_id,
            company: new.company,
        })
    }

    /// Full path such as `Network > Fiber > Splice Closures`.
    ///
    /// `lookup` resolves parents; a missing parent or a cycle ends the walk.
    pub fn full_name<'a, F>(&'a self, lookup: F) -> String
    where
        F: Fn(CategoryId) -> Option<&'a Category>,
    {
        let mut names = vec![self.name.as_str()];
        let mut seen = vec![self.id];
        let mut next = self.parent_id;
        while let Some(parent_id) = next {
            if seen.contains(&parent_id) {
                break;
            }
            let Some(parent) = lookup(parent_id) else {
                break;
            };
            names.push(parent.name.as_str());
            seen.push(parent_id);
            next = parent.parent_id;
        }
        names.reverse();
        names.join(" > ")
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn kind() -> &'static str {
        "category"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub description: String,
    pub address: String,
    pub company: Company,
}

/// A place stock is kept (warehouse, van, POP site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub is_active: bool,
    pub company: Company,
}

impl Location {
    pub fn new(id: LocationId, new: NewLocation) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required("location name", &new.name)?,
            description: new.description,
            address: new.address,
            is_active: true,
            company: new.company,
        })
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> LocationId {
        self.id
    }

    fn kind() -> &'static str {
        "location"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub notes: String,
    pub is_active: bool,
}

impl Supplier {
    pub fn new(id: SupplierId, new: NewSupplier) -> DomainResult<Self> {
        let email = new.email.trim().to_string();
        if !email.is_empty() && !email.contains('@') {
            return Err(DomainError::validation(format!(
                "supplier email '{email}' is not an address"
            )));
        }
        Ok(Self {
            id,
            name: required("supplier name", &new.name)?,
            contact_person: new.contact_person,
            email,
            phone: new.phone,
            address: new.address,
            website: new.website,
            notes: new.notes,
            is_active: true,
        })
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }

    fn kind() -> &'static str {
        "supplier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn category(name: &str, parent: Option<CategoryId>) -> Category {
        Category::new(
            CategoryId::new(),
            NewCategory {
                name: name.to_string(),
                description: String::new(),
                parent_id: parent,
                company: Company::Fno,
            },
        )
        .unwrap()
    }

    #[test]
    fn full_name_walks_parents() {
        let network = category("Network", None);
        let fiber = category("Fiber", Some(network.id));
        let closures = category("Splice Closures", Some(fiber.id));

        let all: HashMap<CategoryId, Category> = [network, fiber, closures.clone()]
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        assert_eq!(
            closures.full_name(|id| all.get(&id)),
            "Network > Fiber > Splice Closures"
        );
    }

    #[test]
    fn full_name_stops_on_missing_parent() {
        let orphan = category("Radios", Some(CategoryId::new()));
        assert_eq!(orphan.full_name(|_| None), "Radios");
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = Location::new(
            LocationId::new(),
            NewLocation {
                name: "   ".to_string(),
                description: String::new(),
                address: String::new(),
                company: Company::Wisp,
            },
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("location name cannot be empty"));
    }

    #[test]
    fn supplier_email_must_look_like_an_address() {
        let err = Supplier::new(
            SupplierId::new(),
            NewSupplier {
                name: "Huawei Distributor".to_string(),
                email: "sales.example.com".to_string(),
                ..NewSupplier::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
