//! Channel command - verify and repair the domain secure channel

use super::{merge_channel, shutdown_signal, ChannelArgs};
use crate::config::Config;
use crate::credential::CredentialRequest;
use crate::error::MendResult;
use crate::platform::PowerShell;
use crate::probe::{TrustProber, TrustState};
use crate::repair::{ChannelRepair, DryRun, ReconcileMode, Reconciler, RetryPolicy};
use crate::scheduler;
use crate::state::AppliedState;
use crate::util::time::secs_or_none;
use std::time::Duration;
use tracing::info;

/// Run the channel command
pub async fn run_channel(config: &Config, args: &ChannelArgs, dry_run: bool) -> MendResult<()> {
    let config = merge_channel(config, args)?;
    let channel = &config.channel;

    let request = CredentialRequest {
        source: channel.credential_source,
        username: channel.username.clone(),
        password: args.password.clone(),
        file: channel.credential_file.clone(),
    };

    let shell = PowerShell::new(config.platform.powershell.clone());
    let prober = TrustProber::new(shell.clone(), channel.target.clone());
    let repair = ChannelRepair::new(shell, channel.target.clone(), request);
    let every = secs_or_none(channel.interval_secs);

    info!(
        "Checking secure channel{} (retries={}, delay={}s)",
        channel
            .target
            .as_deref()
            .map(|t| format!(" against {}", t))
            .unwrap_or_default(),
        channel.retries,
        channel.retry_delay_secs
    );

    let applied = if dry_run {
        // a dry run cannot repair, so one look is enough
        let mut reconciler = Reconciler::new(
            prober,
            DryRun::new(repair),
            RetryPolicy::once(),
            ReconcileMode::Settle,
        );
        scheduler::run(&mut reconciler, every, shutdown_signal()).await?
    } else {
        let policy = RetryPolicy::new(
            channel.retries,
            Duration::from_secs(channel.retry_delay_secs),
        );
        let mut reconciler = Reconciler::new(prober, repair, policy, ReconcileMode::Settle);
        let applied = scheduler::run(&mut reconciler, every, shutdown_signal()).await?;
        info!("{} repair call(s) made", reconciler.actuator().repairs());
        applied
    };

    report(&applied);
    Ok(())
}

fn report(applied: &AppliedState<TrustState>) {
    match applied.current() {
        Some(state) => info!("Secure channel {}", state),
        None => info!("Secure channel not checked"),
    }
}
