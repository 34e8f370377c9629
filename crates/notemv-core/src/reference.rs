
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

// Compile regexes once, reuse across calls
static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

static INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]\(([^()]+)\)").unwrap());

static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\n.*?```|~~~[^\n]*\n.*?~~~").unwrap());

static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]*`").unwrap());

/// Syntax of an in-document reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    /// `[[Target#Anchor|Alias]]`
    Wikilink,
    /// `[text](target)`
    Inline,
}

/// One occurrence of link syntax pointing at another document.
///
/// Byte offsets index the referencing document's content as of the parse;
/// references within one document are ordered by `start` and never overlap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Byte offset of the first character of the reference syntax.
    pub start: usize,
    /// Byte offset one past the last character of the reference syntax.
    pub end: usize,
    /// Verbatim source span, `content[start..end]`.
    pub raw: String,
    /// Reader-facing text: the alias or bracket text when present, otherwise
    /// the written target (with any anchor shown as a ` > ` qualifier).
    pub display: Option<String>,
    /// Written target, without anchor; percent-decoded for inline links.
    pub target: String,
    /// Section/block qualifier following `#`, if any.
    pub anchor: Option<String>,
    /// Corpus path this reference points at, filled in by the index.
    /// `None` until resolved, or when no document matches.
    pub resolved: Option<String>,
    pub kind: RefKind,
}

impl Reference {
    /// Whether the author wrote an explicit `|alias` (wikilinks only).
    pub fn has_explicit_alias(&self) -> bool {
        self.kind == RefKind::Wikilink && self.raw.contains('|')
    }
}

/// Build the set of byte ranges covered by fenced code blocks or inline code.
fn build_excluded_ranges(markdown: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for m in FENCED_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    for m in INLINE_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    ranges
}

fn is_excluded(offset: usize, excluded: &[(usize, usize)]) -> bool {
    excluded.iter().any(|&(start, end)| offset >= start && offset < end)
}

fn looks_external(target: &str) -> bool {
    // scheme:rest, e.g. https://..., mailto:...
    target
        .split_once(':')
        .map(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}

/// Extract all references from markdown text, ordered by start offset.
///
/// Wikilinks and inline links are parsed in one pass over the source with
/// excluded ranges for code spans, so byte offsets index the original
/// content directly. Inline matches overlapping a wikilink span are
/// discarded (the wikilink wins).
pub fn parse_references(markdown: &str) -> Vec<Reference> {
    let excluded = build_excluded_ranges(markdown);
    let mut refs: Vec<Reference> = Vec::new();

    for cap in WIKILINK_RE.captures_iter(markdown) {
        let full = cap.get(0).unwrap();
        if is_excluded(full.start(), &excluded) {
            continue;
        }

        let inner = &cap[1];

        // Alias is everything after the first '|'; anchor after the first '#'
        // of the pre-alias part.
        let (name_and_anchor, alias) = match inner.split_once('|') {
            Some((head, alias)) => (head, Some(alias)),
            None => (inner, None),
        };
        let (name, anchor) = match name_and_anchor.split_once('#') {
            Some((name, anchor)) => (name, Some(anchor)),
            None => (name_and_anchor, None),
        };

        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let display = match (alias, anchor) {
            (Some(a), _) => Some(a.to_string()),
            (None, Some(anchor)) => Some(format!("{name} > {anchor}")),
            (None, None) => Some(name.to_string()),
        };

        refs.push(Reference {
            start: full.start(),
            end: full.end(),
            raw: full.as_str().to_string(),
            display,
            target: name.to_string(),
            anchor: anchor.map(|a| a.to_string()),
            resolved: None,
            kind: RefKind::Wikilink,
        });
    }

    let wikilink_spans: Vec<(usize, usize)> = refs.iter().map(|r| (r.start, r.end)).collect();

    for cap in INLINE_RE.captures_iter(markdown) {
        let full = cap.get(0).unwrap();
        if is_excluded(full.start(), &excluded) {
            continue;
        }
        if wikilink_spans
            .iter()
            .any(|&(s, e)| full.start() < e && full.end() > s)
        {
            continue;
        }

        let text = &cap[1];
        let raw_target = cap[2].trim();
        if raw_target.is_empty() || looks_external(raw_target) {
            continue;
        }

        let (target_part, anchor) = match raw_target.split_once('#') {
            Some((t, a)) => (t, Some(a.to_string())),
            None => (raw_target, None),
        };
        let target = urlencoding::decode(target_part)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| target_part.to_string());
        if target.is_empty() {
            continue;
        }

        refs.push(Reference {
            start: full.start(),
            end: full.end(),
            raw: full.as_str().to_string(),
            display: (!text.is_empty()).then(|| text.to_string()),
            target,
            anchor,
            resolved: None,
            kind: RefKind::Inline,
        });
    }

    refs.sort_by_key(|r| r.start);
    refs
}

/// Strip a display text down to the bare title it shows for a document:
/// drop any trailing ` > section` qualifier, then any path prefix.
pub fn stripped_display(display: &str) -> &str {
    let head = display.split(" > ").next().unwrap_or(display);
    head.rsplit('/').next().unwrap_or(head)
}

/// Canonical wikilink constructor. The alias is omitted when it adds
/// nothing over the bare link text.
pub fn render_wikilink(target: &str, anchor: Option<&str>, alias: Option<&str>) -> String {
    let name = match anchor {
        Some(anchor) => format!("{target}#{anchor}"),
        None => target.to_string(),
    };
    match alias {
        Some(alias) if alias != name => format!("[[{name}|{alias}]]"),
        _ => format!("[[{name}]]"),
    }
}

/// Canonical inline link constructor. Each path segment of the target is
/// percent-encoded; `/` separators are kept verbatim.
pub fn render_inline(display: &str, target: &str, anchor: Option<&str>) -> String {
    let encoded: String = target
        .split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    match anchor {
        Some(anchor) => format!("[{display}]({encoded}#{anchor})"),
        None => format!("[{display}]({encoded})"),
    }
}
