//! Frontmatter and heading updates applied to a renamed document.
//!
//! These are pure content transforms; the engine applies them through the
//! store's read-modify-write. Only the handful of keys the engine touches
//! (`aliases`, `title`) are understood — this is deliberately not a YAML
//! implementation.

fn yaml_scalar(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value.trim() != value
        || value
            .chars()
            .any(|c| ":#[]{}|>&*!?,'\"%@`".contains(c));
    if needs_quoting {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

struct FrontmatterBlock<'a> {
    inner: &'a str,
    /// Byte offset of the first content byte after the closing delimiter.
    body_start: usize,
}

fn frontmatter_block(content: &str) -> Option<FrontmatterBlock<'_>> {
    let rest = content.strip_prefix("---\n")?;
    let mut offset = 4usize;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" && offset > 4 {
            return Some(FrontmatterBlock {
                inner: &content[4..offset],
                body_start: offset + line.len(),
            });
        }
        offset += line.len();
    }
    // Also accept a closing delimiter on the very first inner line
    // (empty frontmatter).
    let first = rest.split_inclusive('\n').next()?;
    if first.trim_end_matches(['\r', '\n']) == "---" {
        return Some(FrontmatterBlock {
            inner: "",
            body_start: 4 + first.len(),
        });
    }
    None
}

/// Aliases declared in the document's frontmatter. Understands both the
/// inline form `aliases: [a, b]` and the block-list form.
pub fn read_aliases(content: &str) -> Vec<String> {
    let Some(block) = frontmatter_block(content) else {
        return Vec::new();
    };

    let mut aliases = Vec::new();
    let mut in_list = false;
    for line in block.inner.lines() {
        if in_list {
            let trimmed = line.trim_start();
            if let Some(item) = trimmed.strip_prefix("- ") {
                aliases.push(unquote(item));
                continue;
            }
            if trimmed == "-" {
                continue;
            }
            break;
        }
        if let Some(value) = line.strip_prefix("aliases:") {
            let value = value.trim();
            if value.is_empty() {
                in_list = true;
            } else if let Some(listed) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
                aliases.extend(
                    listed
                        .split(',')
                        .map(unquote)
                        .filter(|a| !a.is_empty()),
                );
                break;
            } else {
                aliases.push(unquote(value));
                break;
            }
        }
    }
    aliases
}

/// Add an alias to the document's frontmatter, creating the frontmatter or
/// the `aliases` key as needed. Idempotent: an already-present alias leaves
/// the content unchanged.
pub fn add_alias(content: &str, alias: &str) -> String {
    if read_aliases(content).iter().any(|a| a == alias) {
        return content.to_string();
    }

    let Some(block) = frontmatter_block(content) else {
        return format!(
            "---\naliases:\n  - {}\n---\n{}",
            yaml_scalar(alias),
            content
        );
    };

    let body = &content[block.body_start..];
    let mut out_lines: Vec<String> = Vec::new();
    let mut inserted = false;
    let mut in_list = false;

    for line in block.inner.lines() {
        if in_list && !inserted {
            let trimmed = line.trim_start();
            if !(trimmed.starts_with("- ") || trimmed == "-") {
                out_lines.push(format!("  - {}", yaml_scalar(alias)));
                inserted = true;
                in_list = false;
            }
        }
        if !inserted {
            if let Some(value) = line.strip_prefix("aliases:") {
                let value = value.trim();
                if value.is_empty() {
                    // Block list: insert after its last item.
                    out_lines.push(line.to_string());
                    in_list = true;
                    continue;
                }
                // Inline list or single scalar: normalize to a block list.
                let mut existing: Vec<String> =
                    if let Some(listed) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']'))
                    {
                        listed.split(',').map(unquote).filter(|a| !a.is_empty()).collect()
                    } else {
                        vec![unquote(value)]
                    };
                existing.push(alias.to_string());
                out_lines.push("aliases:".to_string());
                for item in existing {
                    out_lines.push(format!("  - {}", yaml_scalar(&item)));
                }
                inserted = true;
                continue;
            }
        }
        out_lines.push(line.to_string());
    }

    if in_list && !inserted {
        out_lines.push(format!("  - {}", yaml_scalar(alias)));
        inserted = true;
    }
    if !inserted {
        out_lines.push("aliases:".to_string());
        out_lines.push(format!("  - {}", yaml_scalar(alias)));
    }

    format!("---\n{}\n---\n{}", out_lines.join("\n"), body)
}

/// Set the frontmatter `title` key, creating the frontmatter if absent.
pub fn set_title_key(content: &str, title: &str) -> String {
    let title_line = format!("title: {}", yaml_scalar(title));

    let Some(block) = frontmatter_block(content) else {
        return format!("---\n{title_line}\n---\n{content}");
    };

    let body = &content[block.body_start..];
    let mut out_lines: Vec<String> = Vec::new();
    let mut replaced = false;
    for line in block.inner.lines() {
        if !replaced && line.starts_with("title:") {
            out_lines.push(title_line.clone());
            replaced = true;
        } else {
            out_lines.push(line.to_string());
        }
    }
    if !replaced {
        out_lines.push(title_line);
    }

    format!("---\n{}\n---\n{}", out_lines.join("\n"), body)
}

/// Replace the text of the first level-1 heading with `title`, skipping
/// frontmatter and fenced code blocks. No-op when no such heading exists.
pub fn replace_first_heading(content: &str, title: &str) -> String {
    let body_start = frontmatter_block(content).map(|b| b.body_start).unwrap_or(0);
    let body = &content[body_start..];

    let mut offset = body_start;
    let mut in_fence = false;
    for line in body.split_inclusive('\n') {
        let stripped = line.trim_end_matches(['\r', '\n']);
        if stripped.starts_with("```") || stripped.starts_with("~~~") {
            in_fence = !in_fence;
        } else if !in_fence && stripped.starts_with("# ") {
            let line_end = offset + stripped.len();
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..offset]);
            out.push_str("# ");
            out.push_str(title);
            out.push_str(&content[line_end..]);
            return out;
        }
        offset += line.len();
    }
    content.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // === read_aliases ===

    #[test]
    fn reads_block_list_aliases() {
        let content = "---\naliases:\n  - Foo\n  - Old Name\n---\nbody\n";
        assert_eq!(read_aliases(content), vec!["Foo", "Old Name"]);
    }

    #[test]
    fn reads_inline_list_aliases() {
        let content = "---\naliases: [Foo, \"Bar: baz\"]\n---\n";
        assert_eq!(read_aliases(content), vec!["Foo", "Bar: baz"]);
    }

    #[test]
    fn no_frontmatter_means_no_aliases() {
        assert_eq!(read_aliases("# Title\nbody"), Vec::<String>::new());
    }

    // === add_alias ===

    #[test]
    fn add_alias_creates_frontmatter() {
        let out = add_alias("# Foo\nbody\n", "Foo");
        assert_eq!(out, "---\naliases:\n  - Foo\n---\n# Foo\nbody\n");
        assert_eq!(read_aliases(&out), vec!["Foo"]);
    }

    #[test]
    fn add_alias_appends_to_block_list() {
        let content = "---\ntags: [a]\naliases:\n  - Old\n---\nbody\n";
        let out = add_alias(content, "New");
        assert_eq!(read_aliases(&out), vec!["Old", "New"]);
        assert!(out.contains("tags: [a]"), "unrelated keys preserved: {out}");
        assert!(out.ends_with("---\nbody\n"));
    }

    #[test]
    fn add_alias_normalizes_inline_list() {
        let content = "---\naliases: [Old]\n---\nbody\n";
        let out = add_alias(content, "New");
        assert_eq!(read_aliases(&out), vec!["Old", "New"]);
    }

    #[test]
    fn add_alias_is_idempotent() {
        let content = "---\naliases:\n  - Foo\n---\nbody\n";
        assert_eq!(add_alias(content, "Foo"), content);
    }

    #[test]
    fn add_alias_quotes_special_characters() {
        let out = add_alias("body\n", "What? A title: yes");
        assert_eq!(read_aliases(&out), vec!["What? A title: yes"]);
    }

    #[test]
    fn add_alias_creates_key_in_existing_frontmatter() {
        let content = "---\ntitle: Foo\n---\nbody\n";
        let out = add_alias(content, "Old");
        assert_eq!(read_aliases(&out), vec!["Old"]);
        assert!(out.contains("title: Foo"));
    }

    // === set_title_key ===

    #[test]
    fn sets_title_in_existing_frontmatter() {
        let content = "---\ntitle: Old\ntags: [x]\n---\nbody\n";
        let out = set_title_key(content, "New");
        assert!(out.contains("title: New"));
        assert!(!out.contains("title: Old"));
        assert!(out.contains("tags: [x]"));
    }

    #[test]
    fn creates_title_key_when_missing() {
        let out = set_title_key("---\ntags: [x]\n---\nbody\n", "New");
        assert!(out.contains("title: New"));
    }

    #[test]
    fn creates_frontmatter_for_title_when_absent() {
        let out = set_title_key("body\n", "New");
        assert!(out.starts_with("---\ntitle: New\n---\n"));
    }

    // === replace_first_heading ===

    #[test]
    fn replaces_first_level_one_heading() {
        let content = "intro\n# Old Title\n## Sub\n# Another\n";
        let out = replace_first_heading(content, "New");
        assert_eq!(out, "intro\n# New\n## Sub\n# Another\n");
    }

    #[test]
    fn heading_inside_code_fence_is_ignored() {
        let content = "```\n# not a heading\n```\n# Real\n";
        let out = replace_first_heading(content, "New");
        assert_eq!(out, "```\n# not a heading\n```\n# New\n");
    }

    #[test]
    fn heading_like_line_in_frontmatter_is_ignored() {
        let content = "---\ntitle: x\n---\n# Old\n";
        let out = replace_first_heading(content, "New");
        assert_eq!(out, "---\ntitle: x\n---\n# New\n");
    }

    #[test]
    fn no_heading_is_a_noop() {
        let content = "just text\n## only level two\n";
        assert_eq!(replace_first_heading(content, "New"), content);
    }
}
