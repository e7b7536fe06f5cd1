//! Derived artifact generation
//!
//! Writes the files under `<root>/node_modules/.keystone` that are never
//! committed and can always be regenerated:
//!
//! ```text
//! node_modules/.keystone/
//! ├── types.d.ts
//! ├── types.js
//! ├── api.js               (experimental.generate_node_api)
//! ├── api.d.ts             (experimental.generate_node_api)
//! └── next/
//!     ├── graphql-api.js   (experimental.generate_next_graphql_api)
//!     └── graphql-api.d.ts (experimental.generate_next_graphql_api)
//! ```
//!
//! Every file is written concurrently. A failure fails the whole pass but
//! files already written stay on disk.

pub mod shims;
pub mod typescript;

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::artifacts::resolve_paths;
use crate::client::ClientGenerator;
use crate::config::ProjectConfig;
use crate::error::{ArtifactError, Result};
use crate::graphql::GraphQLSchema;
use crate::schema::{initialise_lists, InitialisedLists};

pub use shims::{next_graphql_api_js, node_api_js, sqlite_embedding};
pub use typescript::print_generated_types;

/// Output directory for derived artifacts, relative to the project root
pub const DOT_KEYSTONE_DIR: &str = "node_modules/.keystone";

// =============================================================================
// Planning
// =============================================================================

/// A derived file and its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFile {
    /// Path relative to [`DOT_KEYSTONE_DIR`]
    pub path: PathBuf,
    pub contents: String,
}

impl DerivedFile {
    fn new(path: &str, contents: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from(path),
            contents: contents.into(),
        }
    }
}

/// Plan every derived file for an already initialised list model
pub fn plan_derived_files(
    lists: &InitialisedLists,
    schema: &GraphQLSchema,
    config: &ProjectConfig,
    root: &Path,
) -> Result<Vec<DerivedFile>> {
    let mut files = vec![
        DerivedFile::new("types.d.ts", print_generated_types(schema, lists)),
        DerivedFile::new("types.js", ""),
    ];

    if config.experimental.generate_node_api {
        files.push(DerivedFile::new("api.js", node_api_js(config, root)?));
        files.push(DerivedFile::new("api.d.ts", shims::NODE_API_DTS));
    }

    if config.experimental.generate_next_graphql_api {
        files.push(DerivedFile::new("next/graphql-api.js", next_graphql_api_js(config, root)?));
        files.push(DerivedFile::new("next/graphql-api.d.ts", shims::NEXT_GRAPHQL_API_DTS));
    }

    Ok(files)
}

/// Plan every derived file from the project config
pub fn derived_files(config: &ProjectConfig, root: &Path) -> Result<Vec<DerivedFile>> {
    let lists = initialise_lists(config)?;
    let schema = GraphQLSchema::build(&lists);
    plan_derived_files(&lists, &schema, config, root)
}

// =============================================================================
// Writing
// =============================================================================

/// Write `contents` to `path`, creating parent directories
async fn output_file(path: PathBuf, contents: String) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ArtifactError::io(parent, e))?;
    }
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| ArtifactError::io(&path, e))?;
    debug!(path = %path.display(), "wrote derived artifact");
    Ok(path)
}

/// Write every derived artifact under `<root>/node_modules/.keystone`
///
/// Returns the absolute paths written.
pub async fn generate_node_modules_artifacts_without_client(
    config: &ProjectConfig,
    root: &Path,
) -> Result<Vec<PathBuf>> {
    let dir = root.join(DOT_KEYSTONE_DIR);
    let files = derived_files(config, root)?;

    let written = try_join_all(
        files
            .into_iter()
            .map(|file| output_file(dir.join(&file.path), file.contents)),
    )
    .await?;

    info!(count = written.len(), dir = %dir.display(), "generated derived artifacts");
    Ok(written)
}

/// Generate the storage client alongside the derived artifacts
pub async fn generate_node_modules_artifacts<G>(
    config: &ProjectConfig,
    root: &Path,
    generator: &G,
) -> Result<Vec<PathBuf>>
where
    G: ClientGenerator + ?Sized,
{
    let schema_path = resolve_paths(root).prisma;
    let ((), written) = tokio::try_join!(
        generator.generate(&schema_path),
        generate_node_modules_artifacts_without_client(config, root),
    )?;
    Ok(written)
}
