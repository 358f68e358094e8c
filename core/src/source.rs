use crate::error::Result;
use crate::model::Contact;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Parses a whole-buffer JSON array of contact records.
///
/// The contract with the rest of the pipeline is narrow: produce the full
/// ordered contact list, or fail with a parse error. Streaming reads are
/// deliberately not attempted.
pub fn parse_contacts(bytes: &[u8]) -> Result<Vec<Contact>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Reads and parses a contact dataset from disk.
pub async fn read_contacts(path: impl AsRef<Path>) -> Result<Vec<Contact>> {
    let path = path.as_ref();
    let started = Instant::now();
    let bytes = tokio::fs::read(path).await?;
    let contacts = parse_contacts(&bytes)?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        contacts = contacts.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "contact source loaded"
    );
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RolodexError;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_ordered_records() {
        let payload = r#"[
            {"id": 1, "name": "Jean Dupont", "email": "jean@example.com",
             "addresses": [{"kind": "home", "street": "1 Rue de la Paix",
                            "city": "Paris", "postalCode": "75001"}]},
            {"id": 2, "name": "Marie Roux", "email": "marie@example.com"}
        ]"#;
        let contacts = parse_contacts(payload.as_bytes()).expect("parse");
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].id, 1);
        assert_eq!(contacts[0].addresses[0].city, "Paris");
        assert_eq!(contacts[1].addresses.len(), 0);
    }

    #[test]
    fn rejects_malformed_json() {
        let result = parse_contacts(b"[{\"id\": ");
        assert!(matches!(result, Err(RolodexError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = read_contacts("/definitely/not/here.json").await;
        assert!(matches!(result, Err(RolodexError::Io(_))));
    }
}
