//! Configuration types for a fleet sweep

use crate::accounts::{AccountId, RoleName, role_arn};
use crate::aws::Region;
use crate::defaults::{
    DEFAULT_ANCHOR_REGION, DEFAULT_DISCOVERY_DURATION_SECS, DEFAULT_PARTITION,
    DEFAULT_REGION_DURATION_SECS, MAX_SESSION_DURATION_SECS, MIN_SESSION_DURATION_SECS,
};
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// How credentials are delegated into each account
#[derive(Debug, Clone)]
pub struct DelegationConfig {
    /// Role assumed in every account
    pub role: RoleName,
    /// AWS partition used in role ARNs
    pub partition: String,
    /// Region the discovery session is bound to
    pub anchor_region: Region,
    /// Lifetime requested for the discovery credential
    pub discovery_duration: Duration,
    /// Lifetime requested for each region-scoped credential
    pub region_duration: Duration,
}

impl DelegationConfig {
    /// Delegation settings for `role` with default partition, anchor region
    /// and durations
    pub fn new(role: RoleName) -> Self {
        Self {
            role,
            partition: DEFAULT_PARTITION.to_string(),
            anchor_region: Region::from_static(DEFAULT_ANCHOR_REGION),
            discovery_duration: Duration::from_secs(DEFAULT_DISCOVERY_DURATION_SECS),
            region_duration: Duration::from_secs(DEFAULT_REGION_DURATION_SECS),
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn with_anchor_region(mut self, region: Region) -> Self {
        self.anchor_region = region;
        self
    }

    /// Set both credential lifetimes, in seconds
    pub fn with_durations(
        mut self,
        discovery_secs: u64,
        region_secs: u64,
    ) -> Result<Self, ConfigError> {
        self.discovery_duration = session_duration("discovery duration", discovery_secs)?;
        self.region_duration = session_duration("region duration", region_secs)?;
        Ok(self)
    }

    /// ARN of the delegated role in `account`
    pub fn role_arn(&self, account: &AccountId) -> String {
        role_arn(&self.partition, account, &self.role)
    }
}

/// Validate a credential lifetime against the range STS accepts
fn session_duration(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if !(MIN_SESSION_DURATION_SECS..=MAX_SESSION_DURATION_SECS).contains(&secs) {
        return Err(ConfigError::InvalidDuration {
            name,
            value: secs,
            min: MIN_SESSION_DURATION_SECS,
            max: MAX_SESSION_DURATION_SECS,
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Runtime behavior flags
#[derive(Debug, Clone, Default)]
pub struct RuntimeFlags {
    /// Walk the fleet without applying the change
    pub dry_run: bool,
    /// Write the run report as JSON to this path
    pub output: Option<PathBuf>,
    /// Exit non-zero when any failure was recorded
    pub fail_on_errors: bool,
    /// AWS profile for the caller's own credentials
    pub aws_profile: Option<String>,
}

/// Configuration for a sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// JSON file holding the account list
    pub accounts_file: PathBuf,
    pub delegation: DelegationConfig,
    /// Include regions the accounts have not opted into
    pub all_regions: bool,
    pub flags: RuntimeFlags,
}
