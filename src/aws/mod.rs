//! AWS client modules
//!
//! - context: caller configuration and per-session client construction
//! - credentials: STS role delegation and region-bound sessions
//! - regions: region discovery through EC2

pub mod context;
pub mod credentials;
pub mod regions;

pub use context::AwsContext;
pub use credentials::{
    Credential, CredentialDelegator, Session, StsDelegator, region_session_name,
    sanitize_session_name,
};
pub use regions::{Ec2RegionEnumerator, Region, RegionEnumerator};

#[cfg(test)]
pub use credentials::MockCredentialDelegator;
#[cfg(test)]
pub use regions::MockRegionEnumerator;
