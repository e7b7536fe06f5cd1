//! Checksum utilities for artifact fingerprints

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of artifact text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum of a text artifact
    pub fn of(content: &str) -> Self {
        let hash = Sha256::digest(content.as_bytes());
        Self(format!("{:x}", hash))
    }

    /// First 12 hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = "type Query {\n  posts: [Post!]\n}\n";
        assert_eq!(Checksum::of(content), Checksum::of(content));
    }

    #[test]
    fn test_checksum_different_content() {
        assert_ne!(Checksum::of("model A {}"), Checksum::of("model B {}"));
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::of("");
        assert_eq!(
            checksum.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(checksum.short(), "e3b0c44298fc");
        assert_eq!(Checksum::of(""), checksum);
    }
}
