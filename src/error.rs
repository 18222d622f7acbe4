//! Error types for the fan-out
//!
//! Only [`ConfigError`] is fatal. Every other error is local to one account or
//! one account/region pair and is turned into a skip or a failure record by
//! whoever catches it.

use thiserror::Error;

/// Invalid or unreadable run configuration (account list, role, durations)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the account file
    #[error("Failed to read account file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Account file is not the expected JSON document
    #[error("Failed to parse account file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Account file parsed but failed validation
    #[error("Invalid account file: {0}")]
    Validation(#[from] garde::Report),

    /// An account ID cannot be used to build a role ARN
    #[error("Invalid account ID '{0}': must be non-empty without whitespace, ':' or '/'")]
    InvalidAccountId(String),

    /// The role name cannot be used to build a role ARN
    #[error("Invalid role name '{0}'")]
    InvalidRoleName(String),

    /// A session lifetime outside the range STS accepts
    #[error("{name} must be between {min} and {max} seconds, got {value}")]
    InvalidDuration {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    /// A region identifier is empty
    #[error("Region cannot be empty")]
    EmptyRegion,
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Role assumption failed; the affected account or region is skipped
#[derive(Debug, Error)]
pub enum AssumeRoleError {
    /// Trust policy denies the caller, or the role does not exist
    #[error("Access denied assuming {role_arn}: {message}")]
    Denied { role_arn: String, message: String },

    /// STS could not be reached
    #[error("Delegation service unreachable while assuming {role_arn}: {message}")]
    Unreachable { role_arn: String, message: String },

    /// STS answered without a credential set
    #[error("No credentials returned when assuming {role_arn}")]
    MissingCredentials { role_arn: String },

    /// The credential expired before it could be used
    #[error("Credential for {role_arn} expired at {expired_at}")]
    Expired {
        role_arn: String,
        expired_at: chrono::DateTime<chrono::Utc>,
    },

    /// Any other STS error
    #[error("Failed to assume {role_arn}: {message}")]
    Sdk {
        role_arn: String,
        code: Option<String>,
        message: String,
    },
}

impl AssumeRoleError {
    /// ARN of the role whose assumption failed
    pub fn role_arn(&self) -> &str {
        match self {
            Self::Denied { role_arn, .. }
            | Self::Unreachable { role_arn, .. }
            | Self::MissingCredentials { role_arn }
            | Self::Expired { role_arn, .. }
            | Self::Sdk { role_arn, .. } => role_arn,
        }
    }

    /// Check if this is an access-denied error
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

/// Region listing failed for one account
#[derive(Debug, Error)]
#[error("Failed to list regions for account {account_id}: {message}")]
pub struct RegionDiscoveryError {
    pub account_id: String,
    pub message: String,
}

/// An action failed for one account/region pair.
///
/// Never leaves the action: it is logged and folded into a failure record.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The provider accepted the call but reported the change as not applied
    #[error("{0} reported the change as not applied")]
    NotApplied(&'static str),

    /// The provider call failed
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// AWS error codes for access denied conditions
const DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "NoSuchEntity",
    "InvalidClientTokenId",
    "ExpiredToken",
];

/// AWS error codes that mean the service could not serve the request
const UNAVAILABLE_CODES: &[&str] = &[
    "ServiceUnavailable",
    "InternalFailure",
    "RegionDisabledException",
];

/// Classify an STS error using the error code.
pub fn classify_sts_error(
    role_arn: &str,
    code: Option<&str>,
    message: Option<&str>,
) -> AssumeRoleError {
    let role_arn = role_arn.to_string();
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if DENIED_CODES.contains(&c) => AssumeRoleError::Denied { role_arn, message },
        Some(c) if UNAVAILABLE_CODES.contains(&c) => {
            AssumeRoleError::Unreachable { role_arn, message }
        }
        _ => AssumeRoleError::Sdk {
            role_arn,
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}
