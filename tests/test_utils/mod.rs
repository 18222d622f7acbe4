//! Shared test utilities for integration tests
//!
//! Scripted stand-ins for the AWS-backed collaborators, plus a tracing layer
//! that captures log events so tests can assert on what was logged.

#![allow(dead_code)]

use anyhow::anyhow;
use chrono::{TimeDelta, Utc};
use fleet_sweep::accounts::{AccountId, AccountList, RoleName};
use fleet_sweep::actions::{Action, EbsEncryptionOperations};
use fleet_sweep::aws::{Credential, CredentialDelegator, Region, RegionEnumerator, Session};
use fleet_sweep::error::{AssumeRoleError, RegionDiscoveryError};
use fleet_sweep::executor::FailureRecord;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub const TEST_ROLE: &str = "ebs_default_encryptioner";

pub fn role() -> RoleName {
    RoleName::parse(TEST_ROLE).unwrap()
}

pub fn accounts(ids: &[&str]) -> AccountList {
    AccountList::new(ids.iter().map(|id| AccountId::parse(*id).unwrap()).collect())
}

pub fn valid_credential() -> Credential {
    Credential::new(
        "AKIATEST",
        "test-secret",
        "test-token",
        Utc::now() + TimeDelta::hours(1),
    )
}

/// One recorded `assume` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeCall {
    pub account: String,
    pub session_name: String,
    pub duration: Duration,
}

/// Delegator that hands out valid credentials unless told otherwise
#[derive(Default)]
pub struct ScriptedDelegator {
    /// Session names (per account) that are denied
    denied: HashSet<(String, String)>,
    /// Session names (per account) that return an already expired credential
    expired: HashSet<(String, String)>,
    calls: Mutex<Vec<AssumeCall>>,
}

impl ScriptedDelegator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(mut self, account: &str, session_name: &str) -> Self {
        self.denied
            .insert((account.to_string(), session_name.to_string()));
        self
    }

    pub fn expire(mut self, account: &str, session_name: &str) -> Self {
        self.expired
            .insert((account.to_string(), session_name.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<AssumeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, session_name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.session_name == session_name)
            .count()
    }
}

impl CredentialDelegator for ScriptedDelegator {
    async fn assume(
        &self,
        account: &AccountId,
        role: &RoleName,
        session_name: &str,
        duration: Duration,
    ) -> Result<Credential, AssumeRoleError> {
        self.calls.lock().unwrap().push(AssumeCall {
            account: account.to_string(),
            session_name: session_name.to_string(),
            duration,
        });

        let key = (account.to_string(), session_name.to_string());
        if self.denied.contains(&key) {
            return Err(AssumeRoleError::Denied {
                role_arn: format!("arn:aws:iam::{account}:role/{}", role.as_str()),
                message: "User is not authorized to perform: sts:AssumeRole".to_string(),
            });
        }
        if self.expired.contains(&key) {
            return Ok(Credential::new(
                "AKIATEST",
                "test-secret",
                "test-token",
                Utc::now() - TimeDelta::minutes(5),
            ));
        }
        Ok(valid_credential())
    }
}

/// Region enumerator answering from a per-account script
#[derive(Default)]
pub struct ScriptedRegions {
    regions: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, account: &str, regions: &[&str]) -> Self {
        self.regions.insert(
            account.to_string(),
            regions.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub fn failing(mut self, account: &str) -> Self {
        self.failing.insert(account.to_string());
        self
    }

    /// `(account, session region)` for every listing
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RegionEnumerator for ScriptedRegions {
    async fn list_regions(
        &self,
        account: &AccountId,
        session: &Session,
    ) -> Result<Vec<Region>, RegionDiscoveryError> {
        self.calls
            .lock()
            .unwrap()
            .push((account.to_string(), session.region().to_string()));

        if self.failing.contains(account.as_str()) {
            return Err(RegionDiscoveryError {
                account_id: account.to_string(),
                message: "UnauthorizedOperation".to_string(),
            });
        }
        Ok(self
            .regions
            .get(account.as_str())
            .map(|names| names.iter().map(|n| Region::parse(n.as_str()).unwrap()).collect())
            .unwrap_or_default())
    }
}

/// One recorded action invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub account: String,
    pub region: String,
    pub session_region: String,
}

/// Action failing on a fixed set of `account/region` pairs
#[derive(Default)]
pub struct ScriptedAction {
    failing: HashSet<String>,
    calls: Mutex<Vec<ActionCall>>,
}

impl ScriptedAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, pair: &str) -> Self {
        self.failing.insert(pair.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, account: &str) -> usize {
        self.calls().iter().filter(|c| c.account == account).count()
    }
}

impl Action for ScriptedAction {
    fn name(&self) -> &str {
        "scripted"
    }

    fn session_prefix(&self) -> &str {
        "scripted_change"
    }

    async fn apply(
        &self,
        session: &Session,
        account: &AccountId,
        region: &Region,
    ) -> Vec<FailureRecord> {
        self.calls.lock().unwrap().push(ActionCall {
            account: account.to_string(),
            region: region.to_string(),
            session_region: session.region().to_string(),
        });

        if self.failing.contains(&format!("{account}/{region}")) {
            vec![
                FailureRecord::new(account.clone(), region.clone())
                    .with_reason("scripted failure"),
            ]
        } else {
            Vec::new()
        }
    }
}

/// EBS encryption state per region, shared so tests can inspect it
#[derive(Clone, Default)]
pub struct FakeEbsEncryption {
    enabled: Arc<Mutex<HashSet<String>>>,
    rejecting: Arc<HashSet<String>>,
    enable_calls: Arc<Mutex<usize>>,
}

impl FakeEbsEncryption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled_in(self, region: &str) -> Self {
        self.enabled.lock().unwrap().insert(region.to_string());
        self
    }

    /// Enabling in `region` fails with an authorization error
    pub fn rejecting(regions: &[&str]) -> Self {
        Self {
            rejecting: Arc::new(regions.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn enable_calls(&self) -> usize {
        *self.enable_calls.lock().unwrap()
    }
}

impl EbsEncryptionOperations for FakeEbsEncryption {
    async fn is_enabled(&self, session: &Session) -> anyhow::Result<bool> {
        Ok(self
            .enabled
            .lock()
            .unwrap()
            .contains(session.region().as_str()))
    }

    async fn enable(&self, session: &Session) -> anyhow::Result<bool> {
        *self.enable_calls.lock().unwrap() += 1;
        let region = session.region().as_str();
        if self.rejecting.contains(region) {
            return Err(anyhow!(
                "UnauthorizedOperation: You are not authorized to perform this operation"
            ));
        }
        self.enabled.lock().unwrap().insert(region.to_string());
        Ok(true)
    }
}

/// A captured log event.
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: Level,
    pub message: String,
    /// Every non-message field rendered as `name=value`
    pub fields: String,
}

impl CapturedLog {
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle) || self.fields.contains(needle)
    }
}

/// Collects every event emitted while installed
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<CapturedLog>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install as the thread-default subscriber until the guard drops.
    ///
    /// Tests must run on the current-thread runtime (the `#[tokio::test]`
    /// default) for events to land here.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::prelude::*;
        let subscriber = tracing_subscriber::registry().with(LogCaptureLayer {
            capture: self.clone(),
        });
        tracing::subscriber::set_default(subscriber)
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedLog> {
        self.buffer
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.level == level)
            .cloned()
            .collect()
    }

    /// Error-level events mentioning `needle` in the message or any field
    pub fn errors_mentioning(&self, needle: &str) -> usize {
        self.at_level(Level::ERROR)
            .iter()
            .filter(|log| log.mentions(needle))
            .count()
    }
}

struct FieldVisitor {
    message: String,
    fields: String,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            write!(&mut self.message, "{value:?}").ok();
        } else {
            write!(&mut self.fields, "{}={value:?} ", field.name()).ok();
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            write!(&mut self.fields, "{}={value} ", field.name()).ok();
        }
    }
}

struct LogCaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: String::new(),
        };
        event.record(&mut visitor);

        self.capture.buffer.lock().unwrap().push(CapturedLog {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}
