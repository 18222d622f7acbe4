//! Dry-run wrapper: walk the fleet without changing anything

use super::Action;
use crate::accounts::AccountId;
use crate::aws::{Region, Session};
use crate::executor::FailureRecord;
use tracing::info;

/// Wraps an action and skips its provider calls.
///
/// Delegation and discovery still happen, so a dry run validates that the
/// role can be assumed everywhere the real action would run.
pub struct DryRun<A> {
    inner: A,
}

impl<A: Action> DryRun<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: Action> Action for DryRun<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn session_prefix(&self) -> &str {
        self.inner.session_prefix()
    }

    async fn apply(
        &self,
        session: &Session,
        account: &AccountId,
        region: &Region,
    ) -> Vec<FailureRecord> {
        info!(
            account_id = %account,
            region = %region,
            session_region = %session.region(),
            action = %self.inner.name(),
            "Dry run: would apply action"
        );
        Vec::new()
    }
}
