use crate::model::Contact;
use crate::row::Row;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing::warn;

/// Builds one parent row per contact, preserving source order.
///
/// Construction fans out over `max_workers` blocking workers, each owning a
/// disjoint contiguous slice of the contacts, so no mutable cell is shared
/// across workers. The per-worker outputs are rejoined in order and handed
/// back as a single vector for the caller to swap into the master cache in
/// one operation. Child rows are not built here; they are deferred to the
/// first expansion of each parent.
pub(crate) async fn materialize_parent_rows(
    contacts: &[Arc<Contact>],
    max_workers: usize,
) -> Vec<Arc<Row>> {
    if contacts.is_empty() {
        return Vec::new();
    }
    let started = Instant::now();
    let workers = max_workers.clamp(1, contacts.len());
    let chunk_len = contacts.len().div_ceil(workers);

    let mut handles = Vec::with_capacity(workers);
    for chunk in contacts.chunks(chunk_len) {
        let chunk = chunk.to_vec();
        handles.push(tokio::task::spawn_blocking(move || {
            chunk
                .into_iter()
                .map(Row::parent_row)
                .collect::<Vec<Arc<Row>>>()
        }));
    }

    let mut rows = Vec::with_capacity(contacts.len());
    for handle in handles {
        match handle.await {
            Ok(mut built) => rows.append(&mut built),
            // A worker panic is a programming bug; surface it instead of
            // returning a silently truncated cache.
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => warn!("row materializer worker aborted: {err}"),
        }
    }
    info!(
        rows = rows.len(),
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "parent rows materialized"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;
    use crate::row::RowTag;
    use pretty_assertions::assert_eq;

    fn contacts(count: usize) -> Vec<Arc<Contact>> {
        (1..=count as u64)
            .map(|id| {
                Arc::new(
                    Contact::new(id, format!("contact {id}"), format!("c{id}@example.com"))
                        .with_address(Address::new("home", "street", "city", "00000")),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn preserves_source_order_across_workers() {
        let input = contacts(101);
        let rows = materialize_parent_rows(&input, 4).await;
        assert_eq!(rows.len(), 101);
        for (row, contact) in rows.iter().zip(&input) {
            assert_eq!(row.id, contact.id.to_string());
            let RowTag::Contact(tagged) = row.tag() else {
                panic!("parent rows must be tagged with their contact");
            };
            assert!(Arc::ptr_eq(tagged, contact));
        }
    }

    #[tokio::test]
    async fn empty_input_produces_an_empty_cache() {
        let rows = materialize_parent_rows(&[], 4).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn more_workers_than_contacts_is_fine() {
        let rows = materialize_parent_rows(&contacts(3), 16).await;
        assert_eq!(rows.len(), 3);
    }
}
