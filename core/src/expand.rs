use crate::row::Row;
use crate::sequence::RowSequence;
use std::sync::Arc;
use tracing::debug;

/// Flips a parent row's expansion state and splices its children in or out
/// of the displayed sequence. This is the only path that mutates the
/// sequence incrementally rather than wholesale.
///
/// Children are materialized on the first expansion and cached on the
/// parent permanently; later cycles reuse the same rows. The flag flips
/// even when the parent is not currently visible (the splice is then a
/// no-op), so a filtered-out parent reopens expanded once it passes a
/// filter again and is re-expanded by the presentation layer.
///
/// Returns `false` for child rows, which cannot expand.
pub(crate) async fn toggle_expand(sequence: &RowSequence, row: &Arc<Row>) -> bool {
    if !row.is_parent {
        return false;
    }
    let expanded = !row.is_expanded();
    row.set_expanded(expanded);
    if expanded {
        let children = Row::children_or_materialize(row);
        let inserted = sequence.insert_children_after(row, children).await;
        debug!(parent = %row.id, inserted, "parent expanded");
    } else {
        let removed = sequence.remove_children_of(row).await;
        debug!(parent = %row.id, removed, "parent collapsed");
    }
    true
}
