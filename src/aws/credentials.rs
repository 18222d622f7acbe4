//! Delegated credentials obtained through STS AssumeRole
//!
//! A [`Credential`] is only ever produced by a [`CredentialDelegator`] and is
//! bound to exactly one region as a [`Session`]. Nothing here caches or
//! refreshes credentials; callers ask the delegator again for every use.

use super::context::AwsContext;
use super::regions::Region;
use crate::accounts::{AccountId, RoleName, role_arn};
use crate::defaults::MAX_SESSION_NAME_LEN;
use crate::error::{AssumeRoleError, classify_sts_error};
use aws_sdk_sts::Client;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sts::operation::assume_role::AssumeRoleError as StsAssumeRoleError;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Temporary credential for a role in one account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expires_at,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the credential is unusable at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Lifetime left at `now`, zero once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A credential bound to the region its API clients will target.
#[derive(Debug, Clone)]
pub struct Session {
    credential: Credential,
    region: Region,
}

impl Session {
    /// Bind `credential` to `region`, refusing credentials that have already
    /// expired.
    pub fn bind(
        credential: Credential,
        region: Region,
        role_arn: &str,
    ) -> Result<Self, AssumeRoleError> {
        Self::bind_at(credential, region, role_arn, Utc::now())
    }

    /// [`Session::bind`] against an explicit clock.
    pub fn bind_at(
        credential: Credential,
        region: Region,
        role_arn: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, AssumeRoleError> {
        if credential.is_expired_at(now) {
            return Err(AssumeRoleError::Expired {
                role_arn: role_arn.to_string(),
                expired_at: credential.expires_at(),
            });
        }
        Ok(Self { credential, region })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn region(&self) -> &Region {
        &self.region
    }
}

/// Performs a single role assumption.
///
/// Implementations keep no state between calls.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait CredentialDelegator: Send + Sync {
    /// Assume `role` in `account` for `duration`, tagging the session with
    /// `session_name` for the audit trail.
    async fn assume(
        &self,
        account: &AccountId,
        role: &RoleName,
        session_name: &str,
        duration: Duration,
    ) -> Result<Credential, AssumeRoleError>;
}

impl<T: CredentialDelegator + ?Sized> CredentialDelegator for &T {
    async fn assume(
        &self,
        account: &AccountId,
        role: &RoleName,
        session_name: &str,
        duration: Duration,
    ) -> Result<Credential, AssumeRoleError> {
        (**self).assume(account, role, session_name, duration).await
    }
}

/// Delegator backed by AWS STS
pub struct StsDelegator {
    client: Client,
    partition: String,
}

impl StsDelegator {
    /// Create a delegator from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext, partition: impl Into<String>) -> Self {
        Self {
            client: ctx.sts_client(),
            partition: partition.into(),
        }
    }
}

impl CredentialDelegator for StsDelegator {
    async fn assume(
        &self,
        account: &AccountId,
        role: &RoleName,
        session_name: &str,
        duration: Duration,
    ) -> Result<Credential, AssumeRoleError> {
        let role_arn = role_arn(&self.partition, account, role);
        let duration_seconds = i32::try_from(duration.as_secs()).unwrap_or(i32::MAX);

        let output = self
            .client
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(session_name)
            .duration_seconds(duration_seconds)
            .send()
            .await
            .map_err(|e| classify_assume_role_failure(&role_arn, &e))?;

        let credentials = output
            .credentials()
            .ok_or_else(|| AssumeRoleError::MissingCredentials {
                role_arn: role_arn.clone(),
            })?;

        let expiration = credentials.expiration();
        let expires_at = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| AssumeRoleError::Sdk {
                role_arn: role_arn.clone(),
                code: None,
                message: format!("Credential expiration out of range: {expiration:?}"),
            })?;

        debug!(
            role_arn = %role_arn,
            session_name = %session_name,
            expires_at = %expires_at,
            "Assumed role"
        );

        Ok(Credential::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token(),
            expires_at,
        ))
    }
}

/// Map an SDK failure onto the delegation error taxonomy
fn classify_assume_role_failure<R>(
    role_arn: &str,
    error: &SdkError<StsAssumeRoleError, R>,
) -> AssumeRoleError
where
    R: std::fmt::Debug,
{
    match error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => AssumeRoleError::Unreachable {
            role_arn: role_arn.to_string(),
            message: DisplayErrorContext(error).to_string(),
        },
        _ => classify_sts_error(role_arn, error.code(), error.message()),
    }
}

/// Restrict `raw` to the characters STS accepts in a role session name and
/// cap it at the maximum length.
pub fn sanitize_session_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "_+=,.@-".contains(c) {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SESSION_NAME_LEN)
        .collect()
}

/// Session name for the region-scoped assumption, e.g.
/// `enable_ebs_encryption_eu-west-1`
pub fn region_session_name(prefix: &str, region: &Region) -> String {
    sanitize_session_name(&format!("{prefix}_{region}"))
}
