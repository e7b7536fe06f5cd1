//! Keystone Artifacts
//!
//! Keeps a Keystone project's generated artifacts in step with its list
//! configuration.
//!
//! ## Features
//!
//! - **Committed artifacts**: `schema.graphql` and `schema.prisma`, serialized
//!   deterministically and written as a pair
//! - **Drift detection**: classifies which committed artifacts are stale, with
//!   checksums and unified diffs
//! - **Reconciliation**: prompts (when interactive) before rewriting stale
//!   artifacts, otherwise exits with a remediation hint
//! - **Derived artifacts**: TypeScript declarations and optional runtime shims
//!   under `node_modules/.keystone`, plus storage client generation
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├── keystone.toml
//! ├── schema.graphql
//! ├── schema.prisma
//! └── node_modules/
//!     └── .keystone/
//!         ├── types.d.ts
//!         ├── types.js
//!         ├── api.js / api.d.ts
//!         └── next/graphql-api.js / next/graphql-api.d.ts
//! ```

pub mod artifacts;
pub mod checksum;
pub mod client;
pub mod codegen;
pub mod config;
pub mod drift;
pub mod error;
pub mod graphql;
pub mod paths;
pub mod prisma;
pub mod reconcile;
pub mod schema;

pub use artifacts::{
    generate_committed_artifacts, read_committed_artifacts, resolve_paths, write_committed_artifacts,
    CommittedArtifacts, SchemaPaths, WrittenArtifacts,
};
pub use checksum::Checksum;
pub use client::{ClientGenerator, CommandClientGenerator};
pub use codegen::{generate_node_modules_artifacts, generate_node_modules_artifacts_without_client};
pub use config::ProjectConfig;
pub use drift::{classify, detect, DriftClassification, DriftReport};
pub use error::{ArtifactError, Result};
pub use reconcile::{
    reconcile, validate_committed_artifacts, Prompt, ReconcileOptions, ReconcileOutcome, TerminalPrompt, FIX_COMMAND,
};
pub use schema::{initialise_lists, InitialisedLists};
