//! Progress reporting for the fan-out
//!
//! The executor never logs directly. It reports every transition through a
//! [`RunReporter`] handed to it at construction, so callers decide where
//! progress goes and tests can observe it.

use super::report::{FailureRecord, RunReport};
use crate::accounts::{AccountId, AccountList};
use crate::aws::Region;
use crate::error::{AssumeRoleError, RegionDiscoveryError};
use tracing::{error, info};

/// Trait for reporting fan-out progress
pub trait RunReporter: Send + Sync {
    /// The account list is loaded and the run is about to start
    fn run_started(&self, accounts: &AccountList, action: &str);

    /// Processing of an account begins
    fn account_started(&self, account: &AccountId);

    /// The discovery role could not be assumed; the account is skipped
    fn discovery_role_failed(&self, account: &AccountId, error: &AssumeRoleError);

    /// Region listing failed; the account is skipped
    fn region_discovery_failed(&self, account: &AccountId, error: &RegionDiscoveryError);

    /// Regions found for an account, in processing order
    fn regions_discovered(&self, account: &AccountId, regions: &[Region]);

    /// The region-scoped role could not be assumed; the region is skipped
    fn region_role_failed(&self, account: &AccountId, region: &Region, error: &AssumeRoleError);

    /// The action ran for a pair and reported no failure
    fn action_succeeded(&self, account: &AccountId, region: &Region);

    /// The action reported a failure for a pair
    fn failure_recorded(&self, failure: &FailureRecord);

    /// Every account has been processed
    fn run_finished(&self, report: &RunReport);
}

/// Progress reporter that emits `tracing` events
#[derive(Debug, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl RunReporter for LogReporter {
    fn run_started(&self, accounts: &AccountList, action: &str) {
        let ids: Vec<&str> = accounts.iter().map(AccountId::as_str).collect();
        info!(
            action = %action,
            count = accounts.len(),
            accounts = ?ids,
            "Change will be applied on all regions for the listed account(s)"
        );
    }

    fn account_started(&self, account: &AccountId) {
        info!(account_id = %account, "Processing account");
    }

    fn discovery_role_failed(&self, account: &AccountId, error: &AssumeRoleError) {
        error!(
            account_id = %account,
            role_arn = %error.role_arn(),
            error = %error,
            "Failed to assume role during regions retrieval, skipping account"
        );
    }

    fn region_discovery_failed(&self, account: &AccountId, error: &RegionDiscoveryError) {
        error!(
            account_id = %account,
            error = %error,
            "Failed to get regions, skipping account"
        );
    }

    fn regions_discovered(&self, account: &AccountId, regions: &[Region]) {
        let names: Vec<&str> = regions.iter().map(Region::as_str).collect();
        info!(account_id = %account, regions = ?names, "Regions retrieved");
    }

    fn region_role_failed(&self, account: &AccountId, region: &Region, error: &AssumeRoleError) {
        error!(
            account_id = %account,
            region = %region,
            role_arn = %error.role_arn(),
            error = %error,
            "Failed to assume role, skipping region"
        );
    }

    fn action_succeeded(&self, account: &AccountId, region: &Region) {
        info!(account_id = %account, region = %region, "Change applied");
    }

    fn failure_recorded(&self, failure: &FailureRecord) {
        error!(
            pair = %failure,
            reason = failure.reason.as_deref().unwrap_or("unspecified"),
            "Failed to apply change on {failure}"
        );
    }

    fn run_finished(&self, report: &RunReport) {
        if report.is_success() {
            info!(
                run_id = %report.run_id,
                actions = report.stats.actions_invoked,
                "No error during the process"
            );
        } else {
            error!(
                run_id = %report.run_id,
                failures = report.failures.len(),
                "Failures encountered applying change"
            );
        }
    }
}
