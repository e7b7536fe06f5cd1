//! Project configuration
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (keystone.toml / .keystone.toml in the project root)
//! - User config directory (keystone.toml)
//! - An explicit file passed on the command line
//! - Environment variables (KEYSTONE__*)
//!
//! ## Example config file (keystone.toml):
//! ```toml
//! [db]
//! provider = "sqlite"
//! url = "file:./app.db"
//!
//! [experimental]
//! generate_node_api = true
//!
//! [[lists]]
//! name = "Post"
//!
//! [[lists.fields]]
//! name = "title"
//! type = "text"
//! required = true
//!
//! [[lists.fields]]
//! name = "author"
//! type = "relationship"
//! ref = "User.posts"
//! ```

use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::paths::{normalize, resolve};

/// Main configuration for a Keystone project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Database settings
    #[serde(default)]
    pub db: DbConfig,

    /// Opt-in generated shims
    #[serde(default)]
    pub experimental: ExperimentalConfig,

    /// Storage client generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Declared lists, in declaration order
    #[serde(default)]
    pub lists: Vec<ListConfig>,
}

/// Storage provider backing the Prisma datasource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Sqlite,
    Postgresql,
    Mysql,
}

impl Provider {
    /// Prisma datasource provider name
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Sqlite => "sqlite",
            Provider::Postgresql => "postgresql",
            Provider::Mysql => "mysql",
        }
    }

    /// Whether the database lives in a single local file
    pub fn is_file_based(&self) -> bool {
        matches!(self, Provider::Sqlite)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Connection URL; `file:<path>` for sqlite
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Prisma preview features enabled on the generated client
    #[serde(default)]
    pub prisma_preview_features: Vec<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            url: default_db_url(),
            prisma_preview_features: Vec::new(),
        }
    }
}

impl DbConfig {
    /// Absolute location of the sqlite database file, resolved against `cwd`.
    ///
    /// Returns `None` for providers that are not file-based.
    pub fn sqlite_file_path(&self, cwd: &Path) -> Option<PathBuf> {
        if !self.provider.is_file_based() {
            return None;
        }
        let file = self.url.strip_prefix("file:").unwrap_or(&self.url);
        Some(normalize(&resolve(cwd, Path::new(file))))
    }
}

/// Feature flags for optional derived artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentalConfig {
    /// Generate `api.js` / `api.d.ts`
    #[serde(default)]
    pub generate_node_api: bool,

    /// Generate `next/graphql-api.js` / `next/graphql-api.d.ts`
    #[serde(default)]
    pub generate_next_graphql_api: bool,
}

/// Storage client generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Command run to generate the client; `--schema <path>` is appended
    #[serde(default = "default_generator_command")]
    pub command: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: default_generator_command(),
        }
    }
}

/// A declared list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// List key, e.g. "Post"
    pub name: String,

    /// Plural override for GraphQL names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Declared field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Decimal,
    Checkbox,
    Timestamp,
    Json,
    Select,
    Relationship,
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub indexed: bool,

    /// Options for `select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Target for `relationship` fields: "List" or "List.field"
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Relationship cardinality
    #[serde(default)]
    pub many: bool,
}

// Default value functions
fn default_db_url() -> String {
    "file:./keystone.db".to_string()
}

fn default_generator_command() -> Vec<String> {
    vec!["npx".to_string(), "prisma".to_string(), "generate".to_string()]
}

impl ProjectConfig {
    /// Load configuration, layering an explicit file on top of the defaults
    pub fn load_from(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["keystone.toml", ".keystone.toml"] {
            builder = builder.add_source(File::from(root.join(location)).required(false));
        }

        // User-level overrides (e.g. a global generator command)
        if let Some(dirs) = directories::ProjectDirs::from("dev", "keystone", "artifacts") {
            let user_config = dirs.config_dir().join("keystone.toml");
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("KEYSTONE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse configuration directly from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert_eq!(config.db.provider, Provider::Sqlite);
        assert_eq!(config.db.url, "file:./keystone.db");
        assert!(!config.experimental.generate_node_api);
        assert_eq!(config.generator.command, vec!["npx", "prisma", "generate"]);
    }

    #[test]
    fn test_parse_lists() {
        let config = ProjectConfig::from_toml_str(
            r#"
[db]
provider = "postgresql"
url = "postgres://localhost/app"

[[lists]]
name = "Post"

[[lists.fields]]
name = "title"
type = "text"
required = true

[[lists.fields]]
name = "author"
type = "relationship"
ref = "User"
"#,
        )
        .unwrap();

        assert_eq!(config.db.provider, Provider::Postgresql);
        assert_eq!(config.lists.len(), 1);
        let fields = &config.lists[0].fields;
        assert_eq!(fields[0].field_type, FieldType::Text);
        assert!(fields[0].required);
        assert_eq!(fields[1].target.as_deref(), Some("User"));
    }

    #[test]
    fn test_sqlite_file_path() {
        let db = DbConfig {
            provider: Provider::Sqlite,
            url: "file:./app.db".to_string(),
            prisma_preview_features: vec![],
        };
        assert_eq!(
            db.sqlite_file_path(Path::new("/proj")),
            Some(PathBuf::from("/proj/app.db"))
        );

        let pg = DbConfig {
            provider: Provider::Postgresql,
            ..db
        };
        assert_eq!(pg.sqlite_file_path(Path::new("/proj")), None);
    }

    #[test]
    fn test_load_from_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("keystone.toml"),
            "[experimental]\ngenerate_next_graphql_api = true\n",
        )
        .unwrap();

        let config = ProjectConfig::load_from(dir.path(), None).unwrap();
        assert!(config.experimental.generate_next_graphql_api);
        assert!(config.lists.is_empty());
    }
}
