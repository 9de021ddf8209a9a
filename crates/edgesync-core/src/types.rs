//! Shared types used across edgesync crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque identifier for one revision of the remote artifact.
///
/// Tags are compared for equality only. Stores hand out content hashes or
/// backend-assigned identifiers, neither of which sorts by age, so a
/// different tag means "a different candidate", never "a newer one".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe rendering of the tag.
    ///
    /// Every character outside `[A-Za-z0-9._-]` becomes `_`, and a tag made
    /// only of dots is replaced wholesale so it can never name `.` or `..`.
    /// Whenever the tag had to be rewritten, `+` and the first 8 hex digits
    /// of its SHA-256 are appended. `+` never survives sanitizing, so a
    /// rewritten tag cannot collide with a tag used verbatim.
    pub fn file_stem(&self) -> String {
        let mut stem: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() || stem.chars().all(|c| c == '.') {
            stem = "_".repeat(stem.len().max(1));
        }
        if stem == self.0 {
            return stem;
        }
        let digest = hex::encode(Sha256::digest(self.0.as_bytes()));
        format!("{stem}+{}", &digest[..8])
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VersionTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact() {
        assert_eq!(VersionTag::from("abc"), VersionTag::new("abc"));
        assert_ne!(VersionTag::from("abc"), VersionTag::from("ABC"));
    }

    #[test]
    fn file_stem_keeps_safe_chars() {
        assert_eq!(VersionTag::from("v2-new-model").file_stem(), "v2-new-model");
        assert_eq!(VersionTag::from("d41d8cd9.1_x").file_stem(), "d41d8cd9.1_x");
    }

    #[test]
    fn file_stem_replaces_separators_and_quotes() {
        assert_eq!(VersionTag::from("\"abc/def\"").file_stem(), "_abc_def_+b9aa6955");
        assert_eq!(VersionTag::from("a\\b c").file_stem(), "a_b_c+6a288429");
    }

    #[test]
    fn file_stem_never_names_a_parent_dir() {
        assert_eq!(VersionTag::from("..").file_stem(), "__+5ec1f7e7");
        assert_eq!(VersionTag::from(".").file_stem(), "_+cdb4ee2a");
        assert_eq!(VersionTag::from("").file_stem(), "_+e3b0c442");
    }

    #[test]
    fn distinct_tags_never_share_a_stem() {
        let rewritten = VersionTag::from("a/b").file_stem();
        let literal = VersionTag::from("a_b").file_stem();
        assert_eq!(literal, "a_b");
        assert_eq!(rewritten, "a_b+c14cddc0");
        assert_ne!(rewritten, literal);
        // Even a verbatim tag spelled like a rewritten stem stays distinct.
        assert_eq!(VersionTag::from("a_b+c14cddc0").file_stem(), "a_b_c14cddc0+32dc8488");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&VersionTag::from("v1")).unwrap();
        assert_eq!(json, "\"v1\"");
    }
}
