//! Cross-account, cross-region fan-out
//!
//! The executor walks the fleet strictly in sequence: accounts in file order,
//! regions in discovery order, one action call per pair. Each step asks the
//! delegator for a fresh credential, so no credential outlives the step that
//! requested it.
//!
//! ```text
//! LOAD_ACCOUNTS ─┬─> ASSUME_DISCOVERY_ROLE ─> DISCOVER_REGIONS ─┬─> ASSUME_REGION_ROLE ─> INVOKE_ACTION
//!                │        │ fail: skip account   │ fail: skip    │        │ fail: skip region
//!                │        v                      v   account     │        v
//!                └────────────── next account <──────────────────┴── next region
//! ```
//!
//! Only a malformed account list aborts a run. Delegation and discovery
//! failures skip the affected unit without producing a failure record; only
//! the action itself reports failures.

pub mod progress;
pub mod report;

pub use progress::{LogReporter, RunReporter};
pub use report::{FailureAggregator, FailureRecord, RunReport, RunStats};

use crate::accounts::{AccountId, AccountList};
use crate::actions::Action;
use crate::aws::{CredentialDelegator, Region, RegionEnumerator, Session, region_session_name};
use crate::config::DelegationConfig;
use crate::defaults::DISCOVERY_SESSION_NAME;
use crate::error::ConfigError;
use chrono::Utc;
use std::path::Path;
use uuid::Uuid;

/// Applies an action to every region of every account
pub struct FanOutExecutor<D, E, P> {
    config: DelegationConfig,
    delegator: D,
    regions: E,
    reporter: P,
}

impl<D, E, P> FanOutExecutor<D, E, P>
where
    D: CredentialDelegator,
    E: RegionEnumerator,
    P: RunReporter,
{
    pub fn new(config: DelegationConfig, delegator: D, regions: E, reporter: P) -> Self {
        Self {
            config,
            delegator,
            regions,
            reporter,
        }
    }

    /// Load the account list from `path` and run the action across it.
    ///
    /// Fails only if the account list cannot be loaded.
    pub async fn run_from_path<A: Action>(
        &self,
        path: impl AsRef<Path>,
        action: &A,
    ) -> Result<RunReport, ConfigError> {
        let accounts = AccountList::from_path(path)?;
        Ok(self.run(&accounts, action).await)
    }

    /// Run the action across every account in `accounts`.
    pub async fn run<A: Action>(&self, accounts: &AccountList, action: &A) -> RunReport {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        self.reporter.run_started(accounts, action.name());

        let mut failures = FailureAggregator::new();
        let mut stats = RunStats {
            accounts_total: accounts.len(),
            ..RunStats::default()
        };

        for account in accounts {
            self.process_account(account, action, &mut failures, &mut stats)
                .await;
        }

        let report = RunReport::new(run_id, action.name(), started_at, stats, failures);
        self.reporter.run_finished(&report);
        report
    }

    async fn process_account<A: Action>(
        &self,
        account: &AccountId,
        action: &A,
        failures: &mut FailureAggregator,
        stats: &mut RunStats,
    ) {
        self.reporter.account_started(account);

        let Some(regions) = self.discover_regions(account).await else {
            stats.accounts_skipped += 1;
            return;
        };
        stats.regions_discovered += regions.len();

        for region in &regions {
            let Some(session) = self.region_session(account, action, region).await else {
                stats.regions_skipped += 1;
                continue;
            };

            let region_failures = action.apply(&session, account, region).await;
            stats.actions_invoked += 1;
            drop(session);

            if region_failures.is_empty() {
                self.reporter.action_succeeded(account, region);
            }
            for failure in &region_failures {
                self.reporter.failure_recorded(failure);
            }
            failures.record(region_failures);
        }
    }

    /// Assume the discovery role at the anchor region and list regions.
    ///
    /// `None` means the account is skipped.
    async fn discover_regions(&self, account: &AccountId) -> Option<Vec<Region>> {
        let role_arn = self.config.role_arn(account);

        let session = match self
            .delegator
            .assume(
                account,
                &self.config.role,
                DISCOVERY_SESSION_NAME,
                self.config.discovery_duration,
            )
            .await
            .and_then(|credential| {
                Session::bind(credential, self.config.anchor_region.clone(), &role_arn)
            }) {
            Ok(session) => session,
            Err(e) => {
                self.reporter.discovery_role_failed(account, &e);
                return None;
            }
        };

        match self.regions.list_regions(account, &session).await {
            Ok(regions) => {
                self.reporter.regions_discovered(account, &regions);
                Some(regions)
            }
            Err(e) => {
                self.reporter.region_discovery_failed(account, &e);
                None
            }
        }
    }

    /// Assume a fresh, region-scoped credential for one pair.
    ///
    /// `None` means the region is skipped.
    async fn region_session<A: Action>(
        &self,
        account: &AccountId,
        action: &A,
        region: &Region,
    ) -> Option<Session> {
        let role_arn = self.config.role_arn(account);
        let session_name = region_session_name(action.session_prefix(), region);

        match self
            .delegator
            .assume(
                account,
                &self.config.role,
                &session_name,
                self.config.region_duration,
            )
            .await
            .and_then(|credential| Session::bind(credential, region.clone(), &role_arn))
        {
            Ok(session) => Some(session),
            Err(e) => {
                self.reporter.region_role_failed(account, region, &e);
                None
            }
        }
    }
}
