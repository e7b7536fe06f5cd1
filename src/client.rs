//! Storage client generation
//!
//! The client is produced by an external tool from the committed
//! `schema.prisma`. [`ClientGenerator`] is the seam; the default
//! implementation shells out to the configured command.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::{ArtifactError, Result};

/// Generates the storage client from a Prisma schema file
#[async_trait]
pub trait ClientGenerator: Send + Sync {
    async fn generate(&self, schema_path: &Path) -> Result<()>;
}

/// Runs an external command (`npx prisma generate` by default) with
/// `--schema <path>` appended, in the project root
#[derive(Debug, Clone)]
pub struct CommandClientGenerator {
    program: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandClientGenerator {
    pub fn new(config: &GeneratorConfig, cwd: impl Into<PathBuf>) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| ArtifactError::InvalidConfig("generator.command must not be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.into(),
        })
    }

    /// Full command line for display
    pub fn command_line(&self, schema_path: &Path) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push("--schema".to_string());
        parts.push(schema_path.display().to_string());
        parts.join(" ")
    }
}

#[async_trait]
impl ClientGenerator for CommandClientGenerator {
    async fn generate(&self, schema_path: &Path) -> Result<()> {
        let command = self.command_line(schema_path);
        debug!(%command, cwd = %self.cwd.display(), "running client generator");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--schema")
            .arg(schema_path)
            .current_dir(&self.cwd)
            .output()
            .await
            .map_err(|source| ArtifactError::GeneratorSpawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ArtifactError::Generator {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(%command, "generated storage client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(command: &[&str], cwd: &Path) -> CommandClientGenerator {
        let config = GeneratorConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
        };
        CommandClientGenerator::new(&config, cwd).unwrap()
    }

    #[test]
    fn test_command_line_appends_schema() {
        let generator = CommandClientGenerator::new(&GeneratorConfig::default(), "/proj").unwrap();
        assert_eq!(
            generator.command_line(Path::new("/proj/schema.prisma")),
            "npx prisma generate --schema /proj/schema.prisma"
        );
    }

    #[test]
    fn test_empty_command_rejected() {
        let config = GeneratorConfig { command: vec![] };
        assert!(CommandClientGenerator::new(&config, "/proj").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&["true"], dir.path());
        generator.generate(&dir.path().join("schema.prisma")).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&["false"], dir.path());
        let err = generator
            .generate(&dir.path().join("schema.prisma"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::Generator { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(&["keystone-artifacts-no-such-program"], dir.path());
        let err = generator
            .generate(&dir.path().join("schema.prisma"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArtifactError::GeneratorSpawn { .. }));
    }
}
