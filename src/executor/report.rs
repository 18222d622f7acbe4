//! Failure aggregation and the end-of-run report
//!
//! The aggregator is append-only for the duration of a run. The report wraps
//! it with run metadata and handles JSON output and the summary table.

use crate::accounts::AccountId;
use crate::aws::Region;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// An account/region pair that did not reach the desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub account_id: AccountId,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FailureRecord {
    pub fn new(account_id: AccountId, region: Region) -> Self {
        Self {
            account_id,
            region,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.region)
    }
}

/// Ordered, append-only collection of failures for one run.
///
/// Records are kept exactly as reported: no deduplication, no reordering.
#[derive(Debug, Default)]
pub struct FailureAggregator {
    records: Vec<FailureRecord>,
}

impl FailureAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the failures returned by one action invocation
    pub fn record(&mut self, failures: impl IntoIterator<Item = FailureRecord>) {
        self.records.extend(failures);
    }

    pub fn has_failures(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn all(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn into_records(self) -> Vec<FailureRecord> {
        self.records
    }
}

/// Counters collected while walking the fleet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Accounts in the input list
    pub accounts_total: usize,
    /// Accounts skipped because discovery delegation or region listing failed
    pub accounts_skipped: usize,
    /// Regions returned by discovery across all accounts
    pub regions_discovered: usize,
    /// Regions skipped because region delegation failed
    pub regions_skipped: usize,
    /// Number of action invocations
    pub actions_invoked: usize,
}

/// Complete outcome of one fan-out run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub action: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: RunStats,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub(crate) fn new(
        run_id: Uuid,
        action: &str,
        started_at: DateTime<Utc>,
        stats: RunStats,
        failures: FailureAggregator,
    ) -> Self {
        Self {
            run_id,
            action: action.to_string(),
            started_at,
            finished_at: Utc::now(),
            stats,
            failures: failures.into_records(),
        }
    }

    /// True when no failure was recorded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `"account/region"` strings in the order failures were recorded
    pub fn failed_pairs(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        info!(path = %path.display(), "Run report written");
        Ok(())
    }

    /// Render the failures as a table, `None` when there are none
    pub fn failure_table(&self) -> Option<Table> {
        if self.failures.is_empty() {
            return None;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Account"),
                Cell::new("Region"),
                Cell::new("Reason"),
            ]);

        for failure in &self.failures {
            table.add_row(vec![
                Cell::new(failure.account_id.as_str()),
                Cell::new(failure.region.as_str()),
                Cell::new(failure.reason.as_deref().unwrap_or("-")),
            ]);
        }

        Some(table)
    }

    /// Render the end-of-run summary: counters, then either
    /// "No error during the process" or the failed pairs and their table
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n=== Run {} ({}) ===", self.run_id, self.action);
        let _ = writeln!(out, "Accounts:          {}", self.stats.accounts_total);
        let _ = writeln!(out, "  skipped:         {}", self.stats.accounts_skipped);
        let _ = writeln!(out, "Regions found:     {}", self.stats.regions_discovered);
        let _ = writeln!(out, "  skipped:         {}", self.stats.regions_skipped);
        let _ = writeln!(out, "Actions invoked:   {}", self.stats.actions_invoked);
        let _ = writeln!(out, "Failures:          {}", self.failures.len());

        match self.failure_table() {
            Some(table) => {
                let _ = writeln!(out, "\nFailed: {}", self.failed_pairs().join(", "));
                let _ = writeln!(out, "\n{table}");
            }
            None => {
                let _ = writeln!(out, "\nNo error during the process");
            }
        }
        out
    }

    /// Print [`RunReport::summary`] to stdout
    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }
}
