//! Committed artifacts
//!
//! The two files a project commits alongside its config, `schema.graphql` and
//! `schema.prisma`, are always computed as a pair from one list model and
//! always written as a pair.
//!
//! Writes are staged: both texts go to sibling temp files first and are
//! renamed into place only once both temp writes succeeded. The final pair of
//! renames is not transactional; if the second rename fails the first file
//! has already been replaced and the caller should re-run the whole pass.
//! Staging files never outlive a failed write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ProjectConfig;
use crate::error::{ArtifactError, Result};
use crate::graphql::{format_graphql_schema, print_schema, GraphQLSchema};
use crate::prisma::{format_prisma, print_prisma_schema};
use crate::schema::{initialise_lists, InitialisedLists};

/// On-disk name of the committed GraphQL schema
pub const GRAPHQL_FILE: &str = "schema.graphql";

/// On-disk name of the committed Prisma schema
pub const PRISMA_FILE: &str = "schema.prisma";

/// Locations of the committed artifacts for one project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPaths {
    pub graphql: PathBuf,
    pub prisma: PathBuf,
}

/// Resolve the committed artifact paths under `root` (no I/O)
pub fn resolve_paths(root: &Path) -> SchemaPaths {
    SchemaPaths {
        graphql: root.join(GRAPHQL_FILE),
        prisma: root.join(PRISMA_FILE),
    }
}

/// Freshly serialized artifact texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedArtifacts {
    pub graphql: String,
    pub prisma: String,
}

impl CommittedArtifacts {
    /// Serialize both artifacts from the project config
    pub fn compute(config: &ProjectConfig) -> Result<Self> {
        let lists = initialise_lists(config)?;
        Ok(Self::from_lists(&lists, config))
    }

    /// Serialize both artifacts from an already initialised list model
    pub fn from_lists(lists: &InitialisedLists, config: &ProjectConfig) -> Self {
        let schema = GraphQLSchema::build(lists);
        let prisma = print_prisma_schema(lists, config.db.provider, &config.db.prisma_preview_features);
        Self {
            graphql: format_graphql_schema(&print_schema(&schema)),
            prisma: format_prisma(&prisma),
        }
    }
}

/// Artifact texts as currently committed; `None` when the file does not exist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub graphql: Option<String>,
    pub prisma: Option<String>,
}

/// Read a text file, mapping "not found" to `None`
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "artifact not found");
            Ok(None)
        }
        Err(e) => Err(ArtifactError::io(path, e)),
    }
}

/// Read both committed artifacts concurrently
pub async fn read_committed_artifacts(root: &Path) -> Result<WrittenArtifacts> {
    let paths = resolve_paths(root);
    let (graphql, prisma) = tokio::try_join!(read_optional(&paths.graphql), read_optional(&paths.prisma))?;
    Ok(WrittenArtifacts { graphql, prisma })
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ArtifactError::io(path, e))
}

async fn rename(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| ArtifactError::io(to, e))
}

/// Best-effort removal of staging files; already renamed ones are gone
async fn remove_staged(graphql: &Path, prisma: &Path) {
    let _ = tokio::join!(tokio::fs::remove_file(graphql), tokio::fs::remove_file(prisma));
}

/// Write both committed artifacts under `root`
pub async fn write_committed_artifacts(artifacts: &CommittedArtifacts, root: &Path) -> Result<()> {
    let paths = resolve_paths(root);
    let staged_graphql = staging_path(&paths.graphql);
    let staged_prisma = staging_path(&paths.prisma);

    let staged = tokio::try_join!(
        write_file(&staged_graphql, &artifacts.graphql),
        write_file(&staged_prisma, &artifacts.prisma),
    );
    if let Err(e) = staged {
        remove_staged(&staged_graphql, &staged_prisma).await;
        return Err(e);
    }

    let renamed = tokio::try_join!(
        rename(&staged_graphql, &paths.graphql),
        rename(&staged_prisma, &paths.prisma),
    );
    if let Err(e) = renamed {
        remove_staged(&staged_graphql, &staged_prisma).await;
        return Err(e);
    }

    info!(
        graphql = %paths.graphql.display(),
        prisma = %paths.prisma.display(),
        "wrote committed artifacts"
    );
    Ok(())
}

/// Serialize and unconditionally write both committed artifacts
pub async fn generate_committed_artifacts(config: &ProjectConfig, root: &Path) -> Result<CommittedArtifacts> {
    let artifacts = CommittedArtifacts::compute(config)?;
    write_committed_artifacts(&artifacts, root).await?;
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_paths() {
        let paths = resolve_paths(Path::new("/proj"));
        assert_eq!(paths.graphql, PathBuf::from("/proj/schema.graphql"));
        assert_eq!(paths.prisma, PathBuf::from("/proj/schema.prisma"));
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/proj/schema.prisma")),
            PathBuf::from("/proj/.schema.prisma.tmp")
        );
    }

    #[tokio::test]
    async fn test_read_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_optional(&dir.path().join("schema.graphql")).await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_read_optional_propagates_other_errors() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as a file is an I/O error, not "absent"
        let err = read_optional(dir.path()).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = CommittedArtifacts {
            graphql: "type Query\n".to_string(),
            prisma: "model A {}\n".to_string(),
        };
        write_committed_artifacts(&artifacts, dir.path()).await.unwrap();

        let written = read_committed_artifacts(dir.path()).await.unwrap();
        assert_eq!(written.graphql.as_deref(), Some("type Query\n"));
        assert_eq!(written.prisma.as_deref(), Some("model A {}\n"));
        assert!(!dir.path().join(".schema.graphql.tmp").exists());
        assert!(!dir.path().join(".schema.prisma.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_rename_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        std::fs::create_dir(dir.path().join("schema.prisma")).unwrap();
        std::fs::write(dir.path().join("schema.prisma/keep"), "").unwrap();

        let artifacts = CommittedArtifacts {
            graphql: "type Query\n".to_string(),
            prisma: "model A {}\n".to_string(),
        };
        let err = write_committed_artifacts(&artifacts, dir.path()).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Io { .. }));
        assert!(!dir.path().join(".schema.graphql.tmp").exists());
        assert!(!dir.path().join(".schema.prisma.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_into_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("does-not-exist");
        let artifacts = CommittedArtifacts {
            graphql: String::new(),
            prisma: String::new(),
        };
        let err = write_committed_artifacts(&artifacts, &root).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }
}
