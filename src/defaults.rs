//! Default configuration values
//!
//! These constants keep the CLI defaults and the library defaults in sync.

/// Region used for the discovery session of every account
pub const DEFAULT_ANCHOR_REGION: &str = "us-east-1";

/// AWS partition used to build role ARNs
pub const DEFAULT_PARTITION: &str = "aws";

/// Session name used when assuming the role for region discovery
pub const DISCOVERY_SESSION_NAME: &str = "get_all_regions";

/// Lifetime of the discovery credential in seconds (1 hour)
pub const DEFAULT_DISCOVERY_DURATION_SECS: u64 = 3600;

/// Lifetime of each region-scoped credential in seconds (STS minimum)
pub const DEFAULT_REGION_DURATION_SECS: u64 = 900;

/// Shortest lifetime STS accepts for AssumeRole
pub const MIN_SESSION_DURATION_SECS: u64 = 900;

/// Longest lifetime STS accepts for AssumeRole (role max session may be lower)
pub const MAX_SESSION_DURATION_SECS: u64 = 43_200;

/// Maximum length of an STS role session name
pub const MAX_SESSION_NAME_LEN: usize = 64;
