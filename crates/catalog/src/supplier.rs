use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, SupplierId};

use crate::category::NAME_REQUIRED;

/// A vendor stock is purchased from. Names are unique (exact match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplier {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewSupplier {
    pub fn new(
        name: Option<String>,
        contact_person: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        address: Option<String>,
    ) -> DomainResult<Self> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DomainError::validation(NAME_REQUIRED))?;
        Ok(Self {
            name,
            contact_person,
            email,
            phone,
            address,
        })
    }
}

/// Partial update of a supplier; `Some(None)` clears a contact field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierChanges {
    pub name: Option<String>,
    pub contact_person: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

impl SupplierChanges {
    pub fn validate(&self) -> DomainResult<()> {
        match &self.name {
            Some(name) if name.is_empty() => Err(DomainError::validation(NAME_REQUIRED)),
            _ => Ok(()),
        }
    }

    pub fn renames(&self, supplier: &Supplier) -> Option<&str> {
        self.name.as_deref().filter(|n| *n != supplier.name)
    }

    pub fn apply(self, supplier: &mut Supplier, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            supplier.name = name;
        }
        if let Some(contact_person) = self.contact_person {
            supplier.contact_person = contact_person;
        }
        if let Some(email) = self.email {
            supplier.email = email;
        }
        if let Some(phone) = self.phone {
            supplier.phone = phone;
        }
        if let Some(address) = self.address {
            supplier.address = address;
        }
        supplier.updated_at = now;
    }
}
