use crate::model::Contact;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Back-reference from a display row to the record it was built from.
/// Opaque to the pipeline; ownership flows strictly parent to child.
#[derive(Debug, Clone)]
pub enum RowTag {
    Contact(Arc<Contact>),
    Address {
        contact: Arc<Contact>,
        /// Position of the address within its contact.
        position: usize,
    },
}

/// A display-tree node wrapping a contact (parent, level 0) or one of its
/// addresses (child, level 1).
///
/// Parent rows are created once per load and live in the master cache for
/// the whole session. Child rows are materialized on first expansion and
/// cached on the parent forever after. The search-index string transitions
/// once from unset to populated and is immutable from then on, which is
/// what makes index builds idempotent.
#[derive(Debug)]
pub struct Row {
    pub id: String,
    pub name: String,
    pub email: String,
    pub detail: String,
    pub is_parent: bool,
    pub level: u8,
    expanded: AtomicBool,
    parent: Weak<Row>,
    tag: RowTag,
    children: OnceLock<Vec<Arc<Row>>>,
    search_index: OnceLock<String>,
}

impl Row {
    /// Builds the parent row for a contact. Children are deferred to the
    /// first expansion.
    pub(crate) fn parent_row(contact: Arc<Contact>) -> Arc<Row> {
        Arc::new(Row {
            id: contact.id.to_string(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            detail: format!("{} address(es)", contact.addresses.len()),
            is_parent: true,
            level: 0,
            expanded: AtomicBool::new(false),
            parent: Weak::new(),
            tag: RowTag::Contact(contact),
            children: OnceLock::new(),
            search_index: OnceLock::new(),
        })
    }

    fn child_row(parent: &Arc<Row>, contact: Arc<Contact>, position: usize) -> Arc<Row> {
        let address = &contact.addresses[position];
        Arc::new(Row {
            id: String::new(),
            name: address.kind.clone(),
            email: address.street.clone(),
            detail: format!("{} - {}", address.postal_code, address.city),
            is_parent: false,
            level: 1,
            expanded: AtomicBool::new(false),
            parent: Arc::downgrade(parent),
            tag: RowTag::Address { contact, position },
            children: OnceLock::new(),
            search_index: OnceLock::new(),
        })
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::Relaxed)
    }

    pub(crate) fn set_expanded(&self, expanded: bool) {
        self.expanded.store(expanded, Ordering::Relaxed);
    }

    /// The owning parent row; `None` for parent rows themselves.
    pub fn parent(&self) -> Option<Arc<Row>> {
        self.parent.upgrade()
    }

    pub fn tag(&self) -> &RowTag {
        &self.tag
    }

    /// Cached child rows, if they have been materialized.
    pub fn children(&self) -> Option<&[Arc<Row>]> {
        self.children.get().map(Vec::as_slice)
    }

    /// Child rows, materializing them from the contact's addresses on the
    /// first call. Subsequent calls return the same cached rows.
    pub(crate) fn children_or_materialize(row: &Arc<Row>) -> &[Arc<Row>] {
        row.children.get_or_init(|| match &row.tag {
            RowTag::Contact(contact) => (0..contact.addresses.len())
                .map(|position| Row::child_row(row, contact.clone(), position))
                .collect(),
            RowTag::Address { .. } => Vec::new(),
        })
    }

    /// The precomputed search string, once the index builder has reached
    /// this row.
    pub fn search_index(&self) -> Option<&str> {
        self.search_index.get().map(String::as_str)
    }

    /// Computes and stores the search string unless it is already present.
    /// Returns whether this call did the work.
    pub(crate) fn ensure_search_index(&self) -> bool {
        if self.search_index.get().is_some() {
            return false;
        }
        self.search_index.set(self.compose_search_index()).is_ok()
    }

    /// Case-folded concatenation of every searchable field of the contact
    /// and its addresses, joined by single spaces.
    fn compose_search_index(&self) -> String {
        let RowTag::Contact(contact) = &self.tag else {
            return String::new();
        };
        let mut terms = Vec::with_capacity(3 + contact.addresses.len() * 4);
        terms.push(contact.id.to_string());
        terms.push(contact.name.to_lowercase());
        terms.push(contact.email.to_lowercase());
        for address in &contact.addresses {
            terms.push(address.kind.to_lowercase());
            terms.push(address.street.to_lowercase());
            terms.push(address.city.to_lowercase());
            terms.push(address.postal_code.to_lowercase());
        }
        terms.join(" ")
    }

    /// Substring match against a lowercased needle.
    ///
    /// The index string is only consulted once the whole index is built;
    /// until then (and for any row a cancelled build never reached) the
    /// match falls back to the identifier, name, and email. Address fields
    /// are not matchable before indexing.
    pub(crate) fn matches(&self, needle: &str, index_ready: bool) -> bool {
        if index_ready && let Some(index) = self.search_index() {
            return index.contains(needle);
        }
        self.id.contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;
    use pretty_assertions::assert_eq;

    fn sample_contact() -> Arc<Contact> {
        Arc::new(
            Contact::new(7, "Jean Dupont", "client7@example.com")
                .with_address(Address::new("home", "1 Rue de la Paix", "Marseille", "13001"))
                .with_address(Address::new("work", "2 Avenue des Champs", "Paris", "75008")),
        )
    }

    #[test]
    fn parent_row_copies_display_fields() {
        let row = Row::parent_row(sample_contact());
        assert_eq!(row.id, "7");
        assert_eq!(row.name, "Jean Dupont");
        assert_eq!(row.email, "client7@example.com");
        assert_eq!(row.detail, "2 address(es)");
        assert!(row.is_parent);
        assert_eq!(row.level, 0);
        assert!(!row.is_expanded());
        assert!(row.parent().is_none());
        assert!(row.children().is_none());
    }

    #[test]
    fn children_materialize_once_and_back_reference() {
        let row = Row::parent_row(sample_contact());
        let first = Row::children_or_materialize(&row).to_vec();
        let second = Row::children_or_materialize(&row).to_vec();
        assert_eq!(first.len(), 2);
        for (child, again) in first.iter().zip(&second) {
            assert!(Arc::ptr_eq(child, again));
            let parent = child.parent().expect("child keeps a parent reference");
            assert!(Arc::ptr_eq(&parent, &row));
            assert_eq!(child.level, 1);
            assert!(!child.is_parent);
        }
        assert_eq!(first[0].name, "home");
        assert_eq!(first[0].email, "1 Rue de la Paix");
        assert_eq!(first[0].detail, "13001 - Marseille");
    }

    #[test]
    fn index_composition_is_case_folded_and_space_joined() {
        let row = Row::parent_row(sample_contact());
        assert!(row.ensure_search_index());
        assert!(!row.ensure_search_index());
        let index = row.search_index().expect("index set");
        assert_eq!(
            index,
            "7 jean dupont client7@example.com \
             home 1 rue de la paix marseille 13001 \
             work 2 avenue des champs paris 75008"
        );
    }

    #[test]
    fn matching_falls_back_to_raw_fields_until_indexed() {
        let row = Row::parent_row(sample_contact());
        assert!(row.matches("dupont", false));
        assert!(row.matches("7", false));
        assert!(!row.matches("marseille", false));

        row.ensure_search_index();
        assert!(row.matches("marseille", true));
        assert!(row.matches("dupont", true));
        assert!(!row.matches("bordeaux", true));
    }
}
