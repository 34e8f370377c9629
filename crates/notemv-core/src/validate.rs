//! Rename preconditions, evaluated in a fixed order against live store state.

use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationErrorKind {
    #[error("no new title provided")]
    EmptyTitle,
    #[error("the title did not change")]
    Unchanged,
    #[error("a document with the new title already exists")]
    Collision,
    #[error("the title cannot start with a dot")]
    LeadingDot,
}

/// Check a proposed rename. `Ok(None)` means valid; `Ok(Some(kind))` names
/// the first failing rule.
///
/// Rules, in order, first failure wins:
/// 1. empty new title;
/// 2. title unchanged (exact, case-sensitive);
/// 3. case-only change — accepted immediately, skipping the collision
///    check, since on case-insensitive stores `exists(new_path)` would
///    report the document itself;
/// 4. target path already occupied;
/// 5. leading dot (hidden-file semantics).
///
/// Existence is queried at call time, never cached: the store can change
/// between the user prompt and the commit.
pub async fn validate(
    store: &dyn DocumentStore,
    old_title: &str,
    new_title: &str,
    new_path: &str,
) -> Result<Option<ValidationErrorKind>, StoreError> {
    if new_title.is_empty() {
        return Ok(Some(ValidationErrorKind::EmptyTitle));
    }

    if new_title == old_title {
        return Ok(Some(ValidationErrorKind::Unchanged));
    }

    if new_title.to_lowercase() == old_title.to_lowercase() {
        return Ok(None);
    }

    if store.exists(new_path).await? {
        return Ok(Some(ValidationErrorKind::Collision));
    }

    if new_title.starts_with('.') {
        return Ok(Some(ValidationErrorKind::LeadingDot));
    }

    Ok(None)
}
