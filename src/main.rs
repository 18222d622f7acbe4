//! fleet-sweep: apply a change across every region of every listed AWS account

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fleet_sweep::accounts::{AccountId, RoleName};
use fleet_sweep::actions::{Action, DryRun, EnableEbsDefaultEncryption};
use fleet_sweep::aws::{
    AwsContext, CredentialDelegator, Ec2RegionEnumerator, Region, RegionEnumerator, Session,
    StsDelegator,
};
use fleet_sweep::config::{DelegationConfig, RuntimeFlags, SweepConfig};
use fleet_sweep::defaults::{
    DEFAULT_ANCHOR_REGION, DEFAULT_DISCOVERY_DURATION_SECS, DEFAULT_PARTITION,
    DEFAULT_REGION_DURATION_SECS, DISCOVERY_SESSION_NAME,
};
use fleet_sweep::executor::{FanOutExecutor, LogReporter, RunReport};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fleet-sweep")]
#[command(about = "Apply a change to every region of every listed AWS account")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Change applied to each account/region pair
#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionKind {
    /// Turn on EBS encryption by default
    EbsDefaultEncryption,
}

/// Arguments for the apply command
#[derive(clap::Args, Debug)]
struct ApplyArgs {
    /// JSON file of the form {"accounts": ["111111111111", ...]}
    #[arg(long)]
    accounts_file: PathBuf,

    /// Role to assume in every account
    #[arg(long)]
    role: String,

    /// Change to apply
    #[arg(long, value_enum, default_value = "ebs-default-encryption")]
    action: ActionKind,

    /// Region the discovery session is bound to
    #[arg(long, default_value = DEFAULT_ANCHOR_REGION)]
    anchor_region: String,

    /// AWS partition used to build role ARNs
    #[arg(long, default_value = DEFAULT_PARTITION)]
    partition: String,

    /// Lifetime of the discovery credential in seconds
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_DURATION_SECS)]
    discovery_duration: u64,

    /// Lifetime of each region-scoped credential in seconds
    #[arg(long, default_value_t = DEFAULT_REGION_DURATION_SECS)]
    region_duration: u64,

    /// Include regions the accounts have not opted into
    #[arg(long)]
    all_regions: bool,

    /// Assume roles and discover regions without applying the change
    #[arg(long)]
    dry_run: bool,

    /// Write the run report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exit with status 1 if any failure was recorded
    #[arg(long)]
    fail_on_errors: bool,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, env = "AWS_PROFILE")]
    aws_profile: Option<String>,
}

impl ApplyArgs {
    fn into_config(self) -> Result<(SweepConfig, ActionKind)> {
        let delegation = DelegationConfig::new(RoleName::parse(self.role)?)
            .with_partition(self.partition)
            .with_anchor_region(Region::parse(self.anchor_region)?)
            .with_durations(self.discovery_duration, self.region_duration)?;

        let config = SweepConfig {
            accounts_file: self.accounts_file,
            delegation,
            all_regions: self.all_regions,
            flags: RuntimeFlags {
                dry_run: self.dry_run,
                output: self.output,
                fail_on_errors: self.fail_on_errors,
                aws_profile: self.aws_profile,
            },
        };
        Ok((config, self.action))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a change to every region of every listed account
    Apply(Box<ApplyArgs>),

    /// List the regions one account can use
    Regions {
        /// Account to inspect
        #[arg(long)]
        account: String,

        /// Role to assume in the account
        #[arg(long)]
        role: String,

        /// Region the discovery session is bound to
        #[arg(long, default_value = DEFAULT_ANCHOR_REGION)]
        anchor_region: String,

        /// AWS partition used to build the role ARN
        #[arg(long, default_value = DEFAULT_PARTITION)]
        partition: String,

        /// Include regions the account has not opted into
        #[arg(long)]
        all_regions: bool,

        /// AWS profile to use (overrides AWS_PROFILE env var)
        #[arg(long, env = "AWS_PROFILE")]
        aws_profile: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            print_error(&e);
            std::process::exit(1);
        }
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

/// Returns `Ok(false)` when the run completed but should exit non-zero.
async fn run() -> Result<bool> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match args.command {
        Command::Apply(apply_args) => {
            let (config, action) = apply_args.into_config()?;
            handle_apply(config, action).await
        }
        Command::Regions {
            account,
            role,
            anchor_region,
            partition,
            all_regions,
            aws_profile,
        } => {
            let account = AccountId::parse(account)?;
            let delegation = DelegationConfig::new(RoleName::parse(role)?)
                .with_partition(partition)
                .with_anchor_region(Region::parse(anchor_region)?);
            handle_regions(account, delegation, all_regions, aws_profile).await?;
            Ok(true)
        }
    }
}

/// Handle the apply command
async fn handle_apply(config: SweepConfig, action: ActionKind) -> Result<bool> {
    if let Some(profile) = &config.flags.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::with_profile(
        config.delegation.anchor_region.as_str(),
        config.flags.aws_profile.as_deref(),
    )
    .await;

    let report = match action {
        ActionKind::EbsDefaultEncryption => {
            let action = EnableEbsDefaultEncryption::from_context(&aws);
            if config.flags.dry_run {
                sweep(&aws, &config, &DryRun::new(action)).await?
            } else {
                sweep(&aws, &config, &action).await?
            }
        }
    };

    report.print_summary();

    if let Some(path) = &config.flags.output {
        report.write_json(path)?;
    }

    Ok(report.is_success() || !config.flags.fail_on_errors)
}

async fn sweep<A: Action>(aws: &AwsContext, config: &SweepConfig, action: &A) -> Result<RunReport> {
    let executor = FanOutExecutor::new(
        config.delegation.clone(),
        StsDelegator::from_context(aws, config.delegation.partition.clone()),
        Ec2RegionEnumerator::from_context(aws).with_all_regions(config.all_regions),
        LogReporter::new(),
    );

    let report = executor
        .run_from_path(&config.accounts_file, action)
        .await
        .with_context(|| {
            format!(
                "Failed to load accounts from {}",
                config.accounts_file.display()
            )
        })?;
    Ok(report)
}

/// Handle the regions command
async fn handle_regions(
    account: AccountId,
    delegation: DelegationConfig,
    all_regions: bool,
    aws_profile: Option<String>,
) -> Result<()> {
    let aws =
        AwsContext::with_profile(delegation.anchor_region.as_str(), aws_profile.as_deref()).await;
    let delegator = StsDelegator::from_context(&aws, delegation.partition.clone());
    let enumerator = Ec2RegionEnumerator::from_context(&aws).with_all_regions(all_regions);

    let credential = delegator
        .assume(
            &account,
            &delegation.role,
            DISCOVERY_SESSION_NAME,
            delegation.discovery_duration,
        )
        .await?;
    let session = Session::bind(
        credential,
        delegation.anchor_region.clone(),
        &delegation.role_arn(&account),
    )?;
    let regions = enumerator.list_regions(&account, &session).await?;

    for region in &regions {
        println!("{region}");
    }
    println!("\nTotal: {} regions", regions.len());

    Ok(())
}
