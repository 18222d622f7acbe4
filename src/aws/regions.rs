//! Region discovery for a delegated session

use super::context::AwsContext;
use super::credentials::Session;
use crate::accounts::AccountId;
use crate::error::{ConfigError, RegionDiscoveryError};
use anyhow::{Context, Result};
use tracing::debug;

/// AWS region identifier (e.g. `eu-west-1`)
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, derive_more::Display, derive_more::Deref,
)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Parse a region identifier
    pub fn parse(s: impl Into<String>) -> Result<Self, ConfigError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        Ok(Self(s))
    }

    /// Region from a known, non-empty constant
    pub(crate) fn from_static(s: &'static str) -> Self {
        debug_assert!(!s.trim().is_empty());
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lists the regions reachable with a session.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait RegionEnumerator: Send + Sync {
    /// List regions in the order the provider returns them.
    async fn list_regions(
        &self,
        account: &AccountId,
        session: &Session,
    ) -> Result<Vec<Region>, RegionDiscoveryError>;
}

impl<T: RegionEnumerator + ?Sized> RegionEnumerator for &T {
    async fn list_regions(
        &self,
        account: &AccountId,
        session: &Session,
    ) -> Result<Vec<Region>, RegionDiscoveryError> {
        (**self).list_regions(account, session).await
    }
}

/// Region enumerator backed by EC2 DescribeRegions
pub struct Ec2RegionEnumerator {
    ctx: AwsContext,
    all_regions: bool,
}

impl Ec2RegionEnumerator {
    /// Create an enumerator listing only regions enabled for the account
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ctx: ctx.clone(),
            all_regions: false,
        }
    }

    /// Also list regions the account has not opted into
    pub fn with_all_regions(mut self, all_regions: bool) -> Self {
        self.all_regions = all_regions;
        self
    }

    async fn describe_regions(&self, session: &Session) -> Result<Vec<Region>> {
        let response = self
            .ctx
            .ec2_client(session)
            .describe_regions()
            .all_regions(self.all_regions)
            .send()
            .await
            .context("Failed to describe regions")?;

        response
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(|name| Region::parse(name).map_err(anyhow::Error::from))
            .collect()
    }
}

impl RegionEnumerator for Ec2RegionEnumerator {
    async fn list_regions(
        &self,
        account: &AccountId,
        session: &Session,
    ) -> Result<Vec<Region>, RegionDiscoveryError> {
        let regions = self
            .describe_regions(session)
            .await
            .map_err(|e| RegionDiscoveryError {
                account_id: account.to_string(),
                message: format!("{e:#}"),
            })?;

        debug!(
            account_id = %account,
            anchor_region = %session.region(),
            count = regions.len(),
            "Described regions"
        );

        Ok(regions)
    }
}
