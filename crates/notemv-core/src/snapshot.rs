//! Pre-rename backlink capture.
//!
//! Rather than storing text offsets, which go stale the moment any document
//! changes, the snapshot records reference slot indices per document. The
//! rewrite phase re-reads each document, re-parses it, and applies the
//! recorded slots to the fresh parse, so offsets are always taken from
//! current content.

use crate::index::CorpusIndex;
use crate::matcher::must_fix;
use std::collections::{BTreeMap, BTreeSet};

/// Document path -> reference slot indices to rewrite, in parse order.
/// BTree containers keep the rewrite pass deterministic.
pub type PendingFixSet = BTreeMap<String, BTreeSet<usize>>;

/// Capture every reference in the corpus that points at `target_path` under
/// its current title and must be retargeted after the rename.
pub fn snapshot(index: &CorpusIndex, target_path: &str, old_title: &str) -> PendingFixSet {
    let mut fixes = PendingFixSet::new();
    for source in index.referencing_documents(target_path, old_title) {
        let slots: BTreeSet<usize> = index
            .references_of(&source)
            .iter()
            .enumerate()
            .filter(|(_, r)| must_fix(r, target_path, old_title))
            .map(|(i, _)| i)
            .collect();
        if !slots.is_empty() {
            fixes.insert(source, slots);
        }
    }
    fixes
}
