//! Reconciliation of committed artifacts
//!
//! Drives a small state machine over a drift report:
//!
//! ```text
//! Checking ──(no drift)──────────────────────────▶ Unchanged
//!    │
//!    └──(drift)──▶ Prompting ──(confirmed)──▶ Writing ──▶ Reconciled
//!                      │
//!                      └──(declined / not interactive)──▶ Aborted
//! ```
//!
//! `Aborted` prints the remediation hint and surfaces as
//! [`ArtifactError::Exit`] so the CLI can terminate with status 1.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::artifacts::write_committed_artifacts;
use crate::config::ProjectConfig;
use crate::drift::{detect, DriftClassification, DriftReport};
use crate::error::{ArtifactError, Result};

/// Command a user runs to rewrite stale committed artifacts
pub const FIX_COMMAND: &str = "keystone-artifacts postinstall --fix";

// =============================================================================
// Prompt
// =============================================================================

/// Yes/no confirmation facility
pub trait Prompt {
    fn confirm(&mut self, message: &str) -> io::Result<bool>;
}

/// Prompt reading a y/N answer from the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// True when both stdin and stdout are terminals and `CI` is unset
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal() && io::stdout().is_terminal() && std::env::var_os("CI").is_none()
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "? {message} (y/N) ")?;
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(parse_answer(&input))
    }
}

/// Interpret a y/N answer; anything but yes means no
pub fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// =============================================================================
// State machine
// =============================================================================

/// Options for [`validate_committed_artifacts`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Whether the user may be asked to confirm the update
    pub interactive: bool,
    /// Print unified diffs of drifted artifacts before prompting
    pub show_diff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Checking,
    Prompting,
    Writing,
    Aborted,
    Reconciled,
    Unchanged,
}

/// Successful end state of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    Reconciled(DriftClassification),
}

fn say<W: Write>(out: &mut W, line: &str) -> Result<()> {
    writeln!(out, "{line}").map_err(ArtifactError::Prompt)
}

/// Run the state machine over an existing report
pub async fn reconcile<P, W>(
    report: &DriftReport,
    root: &Path,
    options: ReconcileOptions,
    prompt: &mut P,
    out: &mut W,
) -> Result<ReconcileOutcome>
where
    P: Prompt,
    W: Write,
{
    let classification = report.classification;
    let mut state = ReconcileState::Checking;

    loop {
        debug!(?state, ?classification, "reconcile");
        state = match state {
            ReconcileState::Checking => {
                if classification.is_drifted() {
                    ReconcileState::Prompting
                } else {
                    ReconcileState::Unchanged
                }
            }
            ReconcileState::Prompting => {
                let (Some(message), Some(term)) = (classification.message(), classification.term()) else {
                    return Ok(ReconcileOutcome::Unchanged);
                };
                say(out, message)?;
                if options.show_diff {
                    for diff in report.diffs() {
                        say(out, diff.trim_end())?;
                    }
                }

                let confirmed = options.interactive
                    && prompt
                        .confirm(&format!("Would you like to update your {term}?"))
                        .map_err(ArtifactError::Prompt)?;
                if confirmed {
                    ReconcileState::Writing
                } else {
                    ReconcileState::Aborted
                }
            }
            ReconcileState::Writing => {
                write_committed_artifacts(&report.fresh, root).await?;
                ReconcileState::Reconciled
            }
            ReconcileState::Aborted => {
                let term = classification.term().unwrap_or_default();
                say(out, &format!("Please run {FIX_COMMAND} to update your {term}"))?;
                return Err(ArtifactError::Exit { code: 1 });
            }
            ReconcileState::Reconciled => {
                info!(?classification, "committed artifacts reconciled");
                return Ok(ReconcileOutcome::Reconciled(classification));
            }
            ReconcileState::Unchanged => return Ok(ReconcileOutcome::Unchanged),
        };
    }
}

/// Detect drift under `root` and reconcile it
pub async fn validate_committed_artifacts<P, W>(
    config: &ProjectConfig,
    root: &Path,
    options: ReconcileOptions,
    prompt: &mut P,
    out: &mut W,
) -> Result<ReconcileOutcome>
where
    P: Prompt,
    W: Write,
{
    let report = detect(config, root).await?;
    reconcile(&report, root, options, prompt, out).await
}
