use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;

/// A top-level directory record: one person with their mailing addresses.
///
/// Contacts are immutable once loaded; the store hands them out behind `Arc`
/// so display rows and background workers can share them without copying.
/// Missing fields in the source deserialize to their empty defaults --
/// validating records is not this crate's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contact {
    /// Unique, stable identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Ordered list of addresses owned by this contact.
    pub addresses: Vec<Address>,
}

/// A mailing address owned by exactly one contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    /// Address category (home, work, billing, ...). Free text.
    pub kind: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

impl Contact {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            addresses: Vec::new(),
        }
    }

    /// Appends an address, preserving insertion order.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }
}

impl Address {
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            street: street.into(),
            city: city.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// The loaded dataset. Replaced wholesale on every (re)load; pure data.
#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: Vec<Arc<Contact>>,
}

impl ContactStore {
    pub fn from_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: contacts.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn contacts(&self) -> &[Arc<Contact>] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let contact: Contact = serde_json::from_str(r#"{"id": 3}"#).expect("parse");
        assert_eq!(contact.id, 3);
        assert_eq!(contact.name, "");
        assert_eq!(contact.email, "");
        assert!(contact.addresses.is_empty());

        let address: Address = serde_json::from_str(r#"{"city": "Lyon"}"#).expect("parse");
        assert_eq!(address.kind, "");
        assert_eq!(address.city, "Lyon");
    }

    #[test]
    fn store_preserves_source_order() {
        let store = ContactStore::from_contacts(vec![
            Contact::new(2, "b", "b@example.com"),
            Contact::new(1, "a", "a@example.com"),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.contacts()[0].id, 2);
        assert_eq!(store.contacts()[1].id, 1);
    }
}
