//! Forbidden-character policy for new document titles.
//!
//! The forbidden set is the union of the characters reserved by reference
//! syntax (`# ^ [ ] |`) and the characters the platform's filesystem
//! rejects in file names. The platform half differs between families:
//! Windows forbids a swath of ASCII punctuation, everything else only the
//! path separator (and NUL).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static WINDOWS_FORBIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[#^\[\]|*\\/<>:?"]"#).unwrap());

static POSIX_FORBIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#^\[\]|\x00/]").unwrap());

/// Which platform family's filename rules apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    Posix,
}

impl PlatformFamily {
    /// Family of the build target.
    pub fn current() -> Self {
        if cfg!(windows) {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Posix
        }
    }

    fn forbidden_re(self) -> &'static Regex {
        match self {
            PlatformFamily::Windows => &WINDOWS_FORBIDDEN_RE,
            PlatformFamily::Posix => &POSIX_FORBIDDEN_RE,
        }
    }
}

/// What to do when a proposed title contains forbidden characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidCharacterAction {
    /// Reject the title and surface an error to the user.
    Error,
    /// Delete every forbidden character.
    Remove,
    /// Substitute each forbidden character with a configured replacement.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("the new title has invalid characters")]
    ForbiddenCharacters,
    #[error("replacement character {0:?} is itself forbidden")]
    ForbiddenReplacement(char),
}

pub fn has_forbidden_characters(candidate: &str, family: PlatformFamily) -> bool {
    family.forbidden_re().is_match(candidate)
}

/// Clean a candidate title according to the configured action.
///
/// Titles with no forbidden characters pass through unchanged regardless of
/// action. `Error` never modifies the candidate; `Replace` validates that
/// the replacement character is not itself forbidden.
pub fn sanitize(
    candidate: &str,
    action: InvalidCharacterAction,
    replacement: char,
    family: PlatformFamily,
) -> Result<String, SanitizeError> {
    let re = family.forbidden_re();
    if !re.is_match(candidate) {
        return Ok(candidate.to_string());
    }

    match action {
        InvalidCharacterAction::Error => Err(SanitizeError::ForbiddenCharacters),
        InvalidCharacterAction::Remove => Ok(re.replace_all(candidate, "").into_owned()),
        InvalidCharacterAction::Replace => {
            let mut buf = [0u8; 4];
            let replacement_str: &str = replacement.encode_utf8(&mut buf);
            if re.is_match(replacement_str) {
                return Err(SanitizeError::ForbiddenReplacement(replacement));
            }
            Ok(re.replace_all(candidate, replacement_str).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_titles_pass_through_unchanged() {
        for title in ["Foo", "My Note 2024", "résumé", "a.b.c"] {
            assert!(!has_forbidden_characters(title, PlatformFamily::Posix));
            assert_eq!(
                sanitize(title, InvalidCharacterAction::Error, '_', PlatformFamily::Posix).unwrap(),
                title
            );
        }
    }

    #[test]
    fn reference_syntax_characters_are_always_forbidden() {
        for c in ['#', '^', '[', ']', '|'] {
            let title = format!("a{c}b");
            assert!(has_forbidden_characters(&title, PlatformFamily::Posix));
            assert!(has_forbidden_characters(&title, PlatformFamily::Windows));
        }
    }

    #[test]
    fn windows_family_forbids_more_punctuation() {
        assert!(has_forbidden_characters("a:b", PlatformFamily::Windows));
        assert!(has_forbidden_characters("a?b", PlatformFamily::Windows));
        assert!(has_forbidden_characters("a\"b", PlatformFamily::Windows));
        assert!(!has_forbidden_characters("a:b", PlatformFamily::Posix));
        assert!(!has_forbidden_characters("a?b", PlatformFamily::Posix));
    }

    #[test]
    fn separator_is_forbidden_on_both_families() {
        assert!(has_forbidden_characters("a/b", PlatformFamily::Posix));
        assert!(has_forbidden_characters("a/b", PlatformFamily::Windows));
    }

    #[test]
    fn error_action_rejects_without_modifying() {
        assert_eq!(
            sanitize("a|b", InvalidCharacterAction::Error, '_', PlatformFamily::Posix),
            Err(SanitizeError::ForbiddenCharacters)
        );
    }

    #[test]
    fn remove_action_strips_all_forbidden_characters() {
        let cleaned =
            sanitize("a#b^c[d]e|f", InvalidCharacterAction::Remove, '_', PlatformFamily::Posix)
                .unwrap();
        assert_eq!(cleaned, "abcdef");
        assert!(!has_forbidden_characters(&cleaned, PlatformFamily::Posix));
    }

    #[test]
    fn replace_action_maps_each_forbidden_character() {
        let cleaned =
            sanitize("a#b|c", InvalidCharacterAction::Replace, '_', PlatformFamily::Posix).unwrap();
        assert_eq!(cleaned, "a_b_c");
    }

    #[test]
    fn replace_rejects_forbidden_replacement() {
        assert_eq!(
            sanitize("a#b", InvalidCharacterAction::Replace, '|', PlatformFamily::Posix),
            Err(SanitizeError::ForbiddenReplacement('|'))
        );
    }

    #[test]
    fn nul_is_forbidden_on_posix() {
        assert!(has_forbidden_characters("a\0b", PlatformFamily::Posix));
    }
}
