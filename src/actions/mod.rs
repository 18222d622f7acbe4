//! Pluggable per-account/region actions
//!
//! An [`Action`] applies one configuration change with a region-scoped
//! session. It never returns an error: provider failures are logged and
//! reported as [`FailureRecord`]s.

mod dry_run;
mod ebs;

pub use dry_run::DryRun;
pub use ebs::{Ec2EbsEncryption, EbsEncryptionOperations, EnableEbsDefaultEncryption};

#[cfg(test)]
pub use ebs::MockEbsEncryptionOperations;

use crate::accounts::AccountId;
use crate::aws::{Region, Session};
use crate::executor::FailureRecord;

/// One idempotent configuration change.
///
/// Applying an action to an already compliant account/region returns no
/// failures, however many times it runs.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
pub trait Action: Send + Sync {
    /// Label used in logs and the run report
    fn name(&self) -> &str;

    /// Prefix of the region-scoped role session name
    fn session_prefix(&self) -> &str;

    /// Apply the change for one account/region pair
    async fn apply(
        &self,
        session: &Session,
        account: &AccountId,
        region: &Region,
    ) -> Vec<FailureRecord>;
}
