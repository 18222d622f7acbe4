//! fleet-sweep - apply one change to every region of every account
//!
//! Reads a list of AWS accounts, assumes a delegated role in each of them,
//! discovers the regions the account can use and runs an [`actions::Action`]
//! once per account/region pair with a fresh, region-scoped credential.
//! Failures are collected into a [`executor::RunReport`] rather than aborting
//! the run.

pub mod accounts;
pub mod actions;
pub mod aws;
pub mod config;
pub mod defaults;
pub mod error;
pub mod executor;
