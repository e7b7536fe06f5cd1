//! Drift detection
//!
//! Compares freshly serialized artifacts against what is committed on disk.
//! An absent file never equals fresh text, even when the fresh text is empty.

use std::path::Path;

use serde::Serialize;
use similar::TextDiff;
use tracing::{debug, warn};

use crate::artifacts::{read_committed_artifacts, CommittedArtifacts, WrittenArtifacts, GRAPHQL_FILE, PRISMA_FILE};
use crate::checksum::Checksum;
use crate::config::ProjectConfig;
use crate::error::Result;

// =============================================================================
// Classification
// =============================================================================

/// Which committed artifacts disagree with the fresh output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftClassification {
    None,
    #[serde(rename = "graphql")]
    GraphQl,
    Prisma,
    Both,
}

impl DriftClassification {
    fn from_flags(graphql_drifted: bool, prisma_drifted: bool) -> Self {
        match (graphql_drifted, prisma_drifted) {
            (false, false) => DriftClassification::None,
            (true, false) => DriftClassification::GraphQl,
            (false, true) => DriftClassification::Prisma,
            (true, true) => DriftClassification::Both,
        }
    }

    pub fn is_drifted(self) -> bool {
        self != DriftClassification::None
    }

    /// Headline shown to the user; `None` when nothing drifted
    pub fn message(self) -> Option<&'static str> {
        match self {
            DriftClassification::None => None,
            DriftClassification::GraphQl => Some("Your GraphQL schema is not up to date"),
            DriftClassification::Prisma => Some("Your Prisma schema is not up to date"),
            DriftClassification::Both => Some("Your Prisma and GraphQL schemas are not up to date"),
        }
    }

    /// Noun phrase used in the prompt and remediation hint
    pub fn term(self) -> Option<&'static str> {
        match self {
            DriftClassification::None => None,
            DriftClassification::GraphQl => Some("GraphQL schema"),
            DriftClassification::Prisma => Some("Prisma schema"),
            DriftClassification::Both => Some("Prisma and GraphQL schemas"),
        }
    }
}

fn drifted(fresh: &str, committed: Option<&str>) -> bool {
    committed != Some(fresh)
}

/// Classify committed artifacts against fresh ones
pub fn classify(fresh: &CommittedArtifacts, committed: &WrittenArtifacts) -> DriftClassification {
    DriftClassification::from_flags(
        drifted(&fresh.graphql, committed.graphql.as_deref()),
        drifted(&fresh.prisma, committed.prisma.as_deref()),
    )
}

// =============================================================================
// Report
// =============================================================================

/// Per-artifact comparison summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub file: &'static str,
    pub drifted: bool,
    pub fresh_checksum: Checksum,
    /// `None` when the committed file is missing
    pub committed_checksum: Option<Checksum>,
    /// Unified diff from committed to fresh, only when drifted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ArtifactStatus {
    fn compare(file: &'static str, fresh: &str, committed: Option<&str>) -> Self {
        let is_drifted = drifted(fresh, committed);
        Self {
            file,
            drifted: is_drifted,
            fresh_checksum: Checksum::of(fresh),
            committed_checksum: committed.map(Checksum::of),
            diff: is_drifted.then(|| unified_diff(file, committed.unwrap_or(""), fresh)),
        }
    }
}

/// Unified diff from `old` to `new`, labelled with the artifact file name
pub fn unified_diff(file: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{file}"), &format!("b/{file}"))
        .to_string()
}

/// Outcome of comparing fresh artifacts with the committed ones
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub classification: DriftClassification,
    #[serde(skip)]
    pub fresh: CommittedArtifacts,
    #[serde(skip)]
    pub committed: WrittenArtifacts,
    pub graphql: ArtifactStatus,
    pub prisma: ArtifactStatus,
}

impl DriftReport {
    /// Build a report from already computed and loaded texts
    pub fn new(fresh: CommittedArtifacts, committed: WrittenArtifacts) -> Self {
        let classification = classify(&fresh, &committed);
        let graphql = ArtifactStatus::compare(GRAPHQL_FILE, &fresh.graphql, committed.graphql.as_deref());
        let prisma = ArtifactStatus::compare(PRISMA_FILE, &fresh.prisma, committed.prisma.as_deref());
        Self {
            classification,
            fresh,
            committed,
            graphql,
            prisma,
        }
    }

    pub fn is_drifted(&self) -> bool {
        self.classification.is_drifted()
    }

    /// Diffs of every drifted artifact, GraphQL first
    pub fn diffs(&self) -> impl Iterator<Item = &str> {
        [&self.graphql, &self.prisma]
            .into_iter()
            .filter_map(|status| status.diff.as_deref())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compute fresh artifacts and compare them with those committed under `root`
pub async fn detect(config: &ProjectConfig, root: &Path) -> Result<DriftReport> {
    let fresh = CommittedArtifacts::compute(config)?;
    let committed = read_committed_artifacts(root).await?;
    let report = DriftReport::new(fresh, committed);

    debug!(
        graphql = report.graphql.fresh_checksum.short(),
        prisma = report.prisma.fresh_checksum.short(),
        "fresh artifact checksums"
    );
    if report.is_drifted() {
        warn!(classification = ?report.classification, "committed artifacts drifted");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fresh() -> CommittedArtifacts {
        CommittedArtifacts {
            graphql: "type Query {\n  a: String\n}\n".to_string(),
            prisma: "model A {\n  id String @id\n}\n".to_string(),
        }
    }

    fn written(graphql: Option<&str>, prisma: Option<&str>) -> WrittenArtifacts {
        WrittenArtifacts {
            graphql: graphql.map(str::to_string),
            prisma: prisma.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_all_combinations() {
        let f = fresh();
        let (g, p) = (f.graphql.as_str(), f.prisma.as_str());

        assert_eq!(classify(&f, &written(Some(g), Some(p))), DriftClassification::None);
        assert_eq!(classify(&f, &written(Some("x"), Some(p))), DriftClassification::GraphQl);
        assert_eq!(classify(&f, &written(Some(g), Some("x"))), DriftClassification::Prisma);
        assert_eq!(classify(&f, &written(Some("x"), Some("y"))), DriftClassification::Both);
        assert_eq!(classify(&f, &written(None, None)), DriftClassification::Both);
    }

    #[test]
    fn test_missing_file_drifts_even_when_fresh_is_empty() {
        let f = CommittedArtifacts {
            graphql: String::new(),
            prisma: String::new(),
        };
        assert_eq!(classify(&f, &written(None, Some(""))), DriftClassification::GraphQl);
        assert_eq!(classify(&f, &written(Some(""), Some(""))), DriftClassification::None);
    }

    #[test]
    fn test_messages_are_distinct() {
        let kinds = [
            DriftClassification::GraphQl,
            DriftClassification::Prisma,
            DriftClassification::Both,
        ];
        for a in kinds {
            for b in kinds {
                if a != b {
                    assert_ne!(a.message(), b.message());
                    assert_ne!(a.term(), b.term());
                }
            }
        }
        assert_eq!(DriftClassification::None.message(), None);
        assert_eq!(
            DriftClassification::Prisma.message(),
            Some("Your Prisma schema is not up to date")
        );
    }

    #[test]
    fn test_report_diff_only_for_drifted() {
        let f = fresh();
        let report = DriftReport::new(f.clone(), written(Some(&f.graphql), Some("model A {}\n")));
        assert_eq!(report.classification, DriftClassification::Prisma);
        assert!(report.graphql.diff.is_none());

        let diff = report.prisma.diff.as_deref().unwrap();
        assert!(diff.contains("--- a/schema.prisma"));
        assert!(diff.contains("+++ b/schema.prisma"));
        assert!(diff.contains("-model A {}"));
        assert!(diff.contains("+  id String @id"));
        assert_eq!(report.diffs().count(), 1);
    }

    #[test]
    fn test_report_json() {
        let f = fresh();
        let report = DriftReport::new(f.clone(), written(None, Some(&f.prisma)));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["classification"], "graphql");
        assert_eq!(value["graphql"]["drifted"], true);
        assert_eq!(value["graphql"]["committed_checksum"], serde_json::Value::Null);
        assert_eq!(value["prisma"]["drifted"], false);
        assert!(value["prisma"].get("diff").is_none());
    }
}
