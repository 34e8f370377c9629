//! Decides which references must be fixed when a document is renamed.

use crate::reference::{stripped_display, Reference};

/// Whether `reference` points at the document being renamed.
///
/// A resolved reference qualifies through its resolution alone: it must
/// target the renamed document's path. A reference resolved to any other
/// document never qualifies, no matter what its text says. Only when the
/// index has no resolution do the textual fallbacks apply:
/// 1. the raw syntax literally contains the bracketed old title;
/// 2. the display text, minus section qualifier and path prefix, equals
///    the old title exactly.
///
/// Deterministic and side-effect free; never mutates the reference.
pub fn must_fix(reference: &Reference, target_path: &str, old_title: &str) -> bool {
    if let Some(resolved) = reference.resolved.as_deref() {
        return resolved == target_path;
    }

    if reference.raw.contains(&format!("[{old_title}]")) {
        return true;
    }

    reference
        .display
        .as_deref()
        .map(|d| stripped_display(d) == old_title)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::parse_references;

    fn first_ref(markdown: &str) -> Reference {
        parse_references(markdown).into_iter().next().unwrap()
    }

    #[test]
    fn resolved_target_match_qualifies() {
        let mut r = first_ref("[[Something Else]]");
        r.resolved = Some("Notes/Foo.md".to_string());
        assert!(must_fix(&r, "Notes/Foo.md", "Foo"));
    }

    #[test]
    fn resolved_to_other_document_does_not_qualify_alone() {
        let mut r = first_ref("[[Other]]");
        r.resolved = Some("Other.md".to_string());
        assert!(!must_fix(&r, "Notes/Foo.md", "Foo"));
    }

    #[test]
    fn unresolved_raw_bracketed_old_title_qualifies() {
        let r = first_ref("[[Foo]]");
        assert!(must_fix(&r, "Foo.md", "Foo"));
        let r = first_ref("[Foo](somewhere.md)");
        assert!(must_fix(&r, "Foo.md", "Foo"));
    }

    #[test]
    fn resolution_to_another_document_beats_any_text_match() {
        // A neighbor's link whose text happens to name the renamed title
        // must not be captured once the index has resolved it elsewhere.
        let mut r = first_ref("[Foo](Other.md)");
        r.resolved = Some("Other.md".to_string());
        assert!(!must_fix(&r, "Foo.md", "Foo"));

        let mut r = first_ref("[[Other|Foo]]");
        r.resolved = Some("Other.md".to_string());
        assert!(!must_fix(&r, "Foo.md", "Foo"));
    }

    #[test]
    fn substring_of_another_title_does_not_qualify() {
        // "Food" contains "Foo" but is not a bracketed occurrence of it
        let r = first_ref("[[Food]]");
        assert!(!must_fix(&r, "Foo.md", "Foo"));
    }

    #[test]
    fn display_with_section_qualifier_matches() {
        // display "Foo > Section" strips to "Foo"
        let r = first_ref("[[Foo#Section]]");
        assert!(must_fix(&r, "Foo.md", "Foo"));
    }

    #[test]
    fn display_with_path_prefix_matches() {
        let r = first_ref("[[Archive/Foo]]");
        assert!(must_fix(&r, "Archive/Foo.md", "Foo"));
    }

    #[test]
    fn unrelated_alias_does_not_match_by_display() {
        let r = first_ref("[[Other|my favorite note]]");
        assert!(!must_fix(&r, "Foo.md", "Foo"));
    }

    #[test]
    fn display_match_is_exact_not_case_insensitive() {
        let r = first_ref("[[Other|foo]]");
        assert!(!must_fix(&r, "Foo.md", "Foo"));
    }
}
