//! Reference rewriting.
//!
//! Splicing is a single left-to-right pass over the original text: copy the
//! untouched run before each reference, emit the re-rendered reference, and
//! advance the cursor past the old span. Offsets are only ever read from the
//! parse of the exact content being spliced.

use crate::docpath::retarget;
use crate::reference::{
    parse_references, render_inline, render_wikilink, stripped_display, RefKind, Reference,
};
use std::collections::BTreeSet;

/// Rewrite the references at `slots` (parse-order indices) so they point at
/// the renamed document. Slots past the end of the current parse are
/// ignored; the document changed under us and those references are gone.
pub fn splice_references(
    content: &str,
    slots: &BTreeSet<usize>,
    old_title: &str,
    new_title: &str,
) -> String {
    let refs = parse_references(content);
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0usize;
    for slot in slots {
        let Some(r) = refs.get(*slot) else { continue };
        out.push_str(&content[cursor..r.start]);
        out.push_str(&render_fixed(r, old_title, new_title));
        cursor = r.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// Render one reference with its target retargeted to the new title.
///
/// Display handling preserves reader-visible text: a display that named the
/// old title keeps naming it (as an alias on the new target), an explicit
/// alias survives untouched, and a display that already spells the new
/// title collapses back to the bare old title alias only when it was the
/// implied one.
fn render_fixed(r: &Reference, old_title: &str, new_title: &str) -> String {
    let new_target = retarget(&r.target, new_title);
    match r.kind {
        RefKind::Wikilink => {
            let alias = wikilink_alias(r, old_title, new_title);
            render_wikilink(&new_target, r.anchor.as_deref(), alias.as_deref())
        }
        RefKind::Inline => {
            let display = inline_display(r, old_title, new_title);
            render_inline(&display, &new_target, r.anchor.as_deref())
        }
    }
}

/// The text the link showed before the rename, pinned as the alias on the
/// new target. An explicit alias is kept verbatim; an implied display is
/// stripped of section and path qualifiers first. An explicit alias that
/// now spells the new title is dropped, the bare link reads the same.
fn wikilink_alias(r: &Reference, old_title: &str, new_title: &str) -> Option<String> {
    if r.has_explicit_alias() {
        let alias = r.display.clone().unwrap_or_default();
        if alias.eq_ignore_ascii_case(new_title) {
            return None;
        }
        return Some(alias);
    }
    let display = stripped_display(r.display.as_deref().unwrap_or(&r.target)).to_string();
    if display.eq_ignore_ascii_case(new_title) {
        return Some(old_title.to_string());
    }
    Some(display)
}

fn inline_display(r: &Reference, old_title: &str, new_title: &str) -> String {
    match r.display.as_deref() {
        None | Some("") => old_title.to_string(),
        Some(d) if d.eq_ignore_ascii_case(new_title) => old_title.to_string(),
        Some(d) => d.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_slots(content: &str) -> BTreeSet<usize> {
        (0..parse_references(content).len()).collect()
    }

    #[test]
    fn wikilink_gains_old_title_alias() {
        let content = "see [[Foo]] for details";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [[Bar|Foo]] for details");
    }

    #[test]
    fn explicit_alias_is_preserved() {
        let content = "see [[Foo|the foo doc]]";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [[Bar|the foo doc]]");
    }

    #[test]
    fn alias_equal_to_new_title_is_dropped() {
        let content = "see [[Foo|Bar]]";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [[Bar]]");
    }

    #[test]
    fn path_qualified_wikilink_keeps_its_prefix() {
        let content = "see [[Notes/Foo]]";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [[Notes/Bar|Foo]]");
    }

    #[test]
    fn anchor_survives_the_rewrite() {
        let content = "see [[Foo#Usage]]";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [[Bar#Usage|Foo]]");
    }

    #[test]
    fn inline_link_display_pins_old_title() {
        let content = "see [Foo](Foo.md)";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [Foo](Bar.md)");
    }

    #[test]
    fn inline_link_custom_display_survives() {
        let content = "see [the docs](Foo.md#Usage)";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "see [the docs](Bar.md#Usage)");
    }

    #[test]
    fn inline_target_with_space_is_percent_encoded() {
        let content = "see [Foo](Foo.md)";
        let out = splice_references(content, &all_slots(content), "Foo", "New Name");
        assert_eq!(out, "see [Foo](New%20Name.md)");
    }

    #[test]
    fn untouched_slots_stay_verbatim() {
        let content = "a [[Foo]] b [[Other]] c [[Foo]] d";
        let out = splice_references(content, &BTreeSet::from([0, 2]), "Foo", "Bar");
        assert_eq!(out, "a [[Bar|Foo]] b [[Other]] c [[Bar|Foo]] d");
    }

    #[test]
    fn stale_slot_past_end_is_ignored() {
        let content = "only [[Foo]] here";
        let out = splice_references(content, &BTreeSet::from([0, 7]), "Foo", "Bar");
        assert_eq!(out, "only [[Bar|Foo]] here");
    }

    #[test]
    fn embed_bang_is_left_in_place() {
        let content = "inline ![[Foo]] embed";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "inline ![[Bar|Foo]] embed");
    }

    #[test]
    fn code_spans_are_never_touched() {
        let content = "real [[Foo]] and `[[Foo]]` literal";
        let out = splice_references(content, &all_slots(content), "Foo", "Bar");
        assert_eq!(out, "real [[Bar|Foo]] and `[[Foo]]` literal");
    }
}
