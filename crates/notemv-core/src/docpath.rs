//! Helpers over path-like document identifiers ("Notes/Foo.md").
//!
//! Identifiers always use '/' separators regardless of platform; the store
//! is responsible for mapping them to real filesystem paths if it has one.

/// Title of a document: basename without the last extension.
///
/// `"Notes/Foo.md"` → `"Foo"`, `"Foo"` → `"Foo"`.
pub fn title_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Directory prefix of a document path, without trailing separator.
/// Empty for root-level documents.
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Extension of a document path, including the dot. Empty if none.
pub fn extension_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    }
}

/// Path of a sibling document with a different title but the same parent
/// and extension: `sibling_path("Notes/Foo.md", "Bar")` → `"Notes/Bar.md"`.
pub fn sibling_path(path: &str, new_title: &str) -> String {
    let parent = parent_of(path);
    let ext = extension_of(path);
    if parent.is_empty() {
        format!("{new_title}{ext}")
    } else {
        format!("{parent}/{new_title}{ext}")
    }
}

pub fn is_markdown(path: &str) -> bool {
    extension_of(path).eq_ignore_ascii_case(".md")
}

/// Swap the basename of a written link target for a new title, preserving
/// any path prefix and extension: `retarget("Sub/Foo.md", "Bar")` → `"Sub/Bar.md"`,
/// `retarget("Foo", "Bar")` → `"Bar"`.
pub fn retarget(target: &str, new_title: &str) -> String {
    let (prefix, name) = match target.rfind('/') {
        Some(idx) => (&target[..=idx], &target[idx + 1..]),
        None => ("", target),
    };
    let ext = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx..],
        _ => "",
    };
    format!("{prefix}{new_title}{ext}")
}

/// Resolve `target` relative to the directory containing `source_path`,
/// collapsing `.` and `..` segments. Returns a normalized corpus path.
///
/// `resolve_relative("Notes/Source.md", "../Ideas")` → `"Ideas"`.
pub fn resolve_relative(source_path: &str, target: &str) -> String {
    let dir = parent_of(source_path);
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();

    for part in target.split('/') {
        if part == ".." {
            if !segments.is_empty() {
                segments.pop();
            }
        } else if part != "." && !part.is_empty() {
            segments.push(part);
        }
    }

    segments.join("/")
}
