//! Default EBS encryption

use super::Action;
use crate::accounts::AccountId;
use crate::aws::{AwsContext, Region, Session};
use crate::error::ActionError;
use crate::executor::FailureRecord;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// EC2 calls needed to enforce default EBS encryption.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait EbsEncryptionOperations: Send + Sync {
    /// Whether default EBS encryption is already on in the session's region
    async fn is_enabled(&self, session: &Session) -> Result<bool>;

    /// Turn default EBS encryption on; returns the state reported back
    async fn enable(&self, session: &Session) -> Result<bool>;
}

/// EBS encryption operations backed by the EC2 API
pub struct Ec2EbsEncryption {
    ctx: AwsContext,
}

impl Ec2EbsEncryption {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl EbsEncryptionOperations for Ec2EbsEncryption {
    async fn is_enabled(&self, session: &Session) -> Result<bool> {
        let response = self
            .ctx
            .ec2_client(session)
            .get_ebs_encryption_by_default()
            .send()
            .await
            .context("Failed to get EBS encryption by default")?;

        Ok(response.ebs_encryption_by_default().unwrap_or(false))
    }

    async fn enable(&self, session: &Session) -> Result<bool> {
        let response = self
            .ctx
            .ec2_client(session)
            .enable_ebs_encryption_by_default()
            .send()
            .await
            .context("Failed to enable EBS encryption by default")?;

        Ok(response.ebs_encryption_by_default().unwrap_or(false))
    }
}

/// What `ensure_enabled` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlreadyEnabled,
    Enabled,
}

/// Turns on default EBS encryption in every region it is applied to
pub struct EnableEbsDefaultEncryption<E = Ec2EbsEncryption> {
    ops: E,
}

impl EnableEbsDefaultEncryption {
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self::new(Ec2EbsEncryption::from_context(ctx))
    }
}

impl<E: EbsEncryptionOperations> EnableEbsDefaultEncryption<E> {
    pub fn new(ops: E) -> Self {
        Self { ops }
    }

    /// The state check only saves a mutating call; if it fails, the enable
    /// call alone decides the outcome.
    async fn ensure_enabled(&self, session: &Session) -> Result<Outcome, ActionError> {
        match self.ops.is_enabled(session).await {
            Ok(true) => return Ok(Outcome::AlreadyEnabled),
            Ok(false) => {}
            Err(e) => debug!(
                region = %session.region(),
                error = %format!("{e:#}"),
                "Could not read EBS default encryption state, enabling anyway"
            ),
        }
        if self.ops.enable(session).await? {
            Ok(Outcome::Enabled)
        } else {
            Err(ActionError::NotApplied("EnableEbsEncryptionByDefault"))
        }
    }
}

impl<E: EbsEncryptionOperations> Action for EnableEbsDefaultEncryption<E> {
    fn name(&self) -> &str {
        "enable-ebs-default-encryption"
    }

    fn session_prefix(&self) -> &str {
        "enable_ebs_encryption"
    }

    async fn apply(
        &self,
        session: &Session,
        account: &AccountId,
        region: &Region,
    ) -> Vec<FailureRecord> {
        match self.ensure_enabled(session).await {
            Ok(Outcome::AlreadyEnabled) => {
                debug!(account_id = %account, region = %region, "EBS default encryption already enabled");
                Vec::new()
            }
            Ok(Outcome::Enabled) => {
                info!(account_id = %account, region = %region, "EBS default encryption enabled");
                Vec::new()
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(
                    account_id = %account,
                    region = %region,
                    error = %reason,
                    "Error during EBS default encryption activation"
                );
                vec![FailureRecord::new(account.clone(), region.clone()).with_reason(reason)]
            }
        }
    }
}
