//! Shared AWS configuration context
//!
//! `AwsContext` loads the caller's own AWS configuration once. It provides the
//! STS client used for delegation, and the base config that delegated
//! sessions are layered onto when building per-account clients.

use super::credentials::Session;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Provider name attached to delegated credentials
const DELEGATED_PROVIDER_NAME: &str = "fleet-sweep-assume-role";

/// Shared AWS configuration context for creating service clients.
///
/// # Example
/// ```ignore
/// let aws = AwsContext::with_profile("us-east-1", Some("org-admin")).await;
/// let delegator = StsDelegator::from_context(&aws, "aws");
/// let regions = Ec2RegionEnumerator::from_context(&aws);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load AWS configuration for the specified region.
    pub async fn new(region: &str) -> Self {
        Self::with_profile(region, None).await
    }

    /// Load AWS configuration for the specified region, optionally from a
    /// named profile instead of the default credential chain.
    pub async fn with_profile(region: &str, profile: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    /// Wrap an already built SDK config.
    pub fn from_sdk_config(config: SdkConfig) -> Self {
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        Self {
            config: Arc::new(config),
            region,
        }
    }

    /// Get the underlying SDK config for direct client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Get the region string.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create an STS client using the caller's own credentials.
    pub fn sts_client(&self) -> aws_sdk_sts::Client {
        aws_sdk_sts::Client::new(self.sdk_config())
    }

    /// Derive an SDK config that signs with the session's delegated
    /// credential in the session's region.
    pub fn session_config(&self, session: &Session) -> SdkConfig {
        let credential = session.credential();
        let credentials = aws_credential_types::Credentials::new(
            credential.access_key_id(),
            credential.secret_access_key(),
            Some(credential.session_token().to_string()),
            Some(credential.expires_at().into()),
            DELEGATED_PROVIDER_NAME,
        );

        self.config
            .to_builder()
            .region(Region::new(session.region().to_string()))
            .credentials_provider(
                aws_credential_types::provider::SharedCredentialsProvider::new(credentials),
            )
            .build()
    }

    /// Create an EC2 client for a delegated session.
    pub fn ec2_client(&self, session: &Session) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(&self.session_config(session))
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
