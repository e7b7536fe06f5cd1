//! Keystone Artifacts CLI
//!
//! Validates, regenerates and prints the artifacts derived from a project's
//! `keystone.toml`.
//!
//! Usage:
//!   keystone-artifacts postinstall [--fix] [--skip-client]
//!   keystone-artifacts check [--format json] [--diff]
//!   keystone-artifacts build [--skip-client]
//!   keystone-artifacts print graphql
//!   keystone-artifacts -C /path/to/project check

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keystone_artifacts::{
    detect, generate_committed_artifacts, generate_node_modules_artifacts,
    generate_node_modules_artifacts_without_client, reconcile, ArtifactError, CommandClientGenerator,
    CommittedArtifacts, ProjectConfig, ReconcileOptions, TerminalPrompt,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keystone-artifacts")]
#[command(about = "Keep committed schemas and generated code in sync with keystone.toml")]
struct Cli {
    /// Project root (contains keystone.toml)
    #[arg(short = 'C', long = "root", default_value = ".", global = true)]
    root: PathBuf,

    /// Additional config file layered over the project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate committed schemas, then generate derived artifacts and the client
    Postinstall {
        /// Rewrite committed schemas without checking or prompting
        #[arg(long)]
        fix: bool,

        /// Do not run the storage client generator
        #[arg(long)]
        skip_client: bool,
    },

    /// Report drift between committed and fresh schemas (exit 1 on drift)
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print unified diffs of drifted schemas
        #[arg(long)]
        diff: bool,
    },

    /// Generate derived artifacts (and the client)
    Build {
        /// Do not run the storage client generator
        #[arg(long)]
        skip_client: bool,
    },

    /// Print a freshly serialized schema to stdout
    Print {
        #[arg(value_enum)]
        artifact: ArtifactKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ArtifactKind {
    Graphql,
    Prisma,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if let Some(ArtifactError::Exit { code }) = e.downcast_ref::<ArtifactError>() {
            std::process::exit(*code);
        }
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(&cli.root)
        .with_context(|| format!("Project root not found: {}", cli.root.display()))?;
    let config = ProjectConfig::load_from(&root, cli.config.as_deref())
        .with_context(|| format!("Failed to load config for {}", root.display()))?;

    match cli.command {
        Command::Postinstall { fix, skip_client } => {
            if fix {
                generate_committed_artifacts(&config, &root).await?;
                println!("✅ Wrote schema.graphql and schema.prisma");
            } else {
                let options = ReconcileOptions {
                    interactive: TerminalPrompt::is_interactive(),
                    show_diff: false,
                };
                let report = detect(&config, &root).await?;
                reconcile(&report, &root, options, &mut TerminalPrompt, &mut io::stdout()).await?;
            }
            build(&config, &root, skip_client).await
        }
        Command::Check { format, diff } => check(&config, &root, format, diff).await,
        Command::Build { skip_client } => build(&config, &root, skip_client).await,
        Command::Print { artifact } => {
            let artifacts = CommittedArtifacts::compute(&config)?;
            match artifact {
                ArtifactKind::Graphql => print!("{}", artifacts.graphql),
                ArtifactKind::Prisma => print!("{}", artifacts.prisma),
            }
            Ok(())
        }
    }
}

async fn check(config: &ProjectConfig, root: &Path, format: OutputFormat, diff: bool) -> anyhow::Result<()> {
    let report = detect(config, root).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", report.to_json()?);
            if report.is_drifted() {
                return Err(ArtifactError::Exit { code: 1 }.into());
            }
            Ok(())
        }
        OutputFormat::Text => {
            for status in [&report.graphql, &report.prisma] {
                let marker = if status.drifted { "⚠️ " } else { "✅" };
                let committed = status
                    .committed_checksum
                    .as_ref()
                    .map(|c| c.short().to_string())
                    .unwrap_or_else(|| "missing".to_string());
                println!(
                    "{} {}: committed {} / fresh {}",
                    marker,
                    status.file,
                    committed,
                    status.fresh_checksum.short()
                );
            }

            let options = ReconcileOptions {
                interactive: false,
                show_diff: diff,
            };
            reconcile(&report, root, options, &mut TerminalPrompt, &mut io::stdout()).await?;
            Ok(())
        }
    }
}

async fn build(config: &ProjectConfig, root: &Path, skip_client: bool) -> anyhow::Result<()> {
    let written = if skip_client {
        generate_node_modules_artifacts_without_client(config, root).await?
    } else {
        let generator = CommandClientGenerator::new(&config.generator, root)?;
        generate_node_modules_artifacts(config, root, &generator).await?
    };
    println!("✅ Generated {} files in node_modules/.keystone", written.len());
    Ok(())
}
