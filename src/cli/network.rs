//! Network command - keep a configuration value in step with the network location

use super::{merge_network, shutdown_signal, NetworkArgs};
use crate::config::{Config, StoreKind};
use crate::error::{MendError, MendResult};
use crate::platform::{AnyStore, FileStore, PowerShell, RegistryStore};
use crate::probe::NetworkProber;
use crate::repair::{DryRun, ReconcileMode, Reconciler, RegistryActuator, RetryPolicy};
use crate::scheduler;
use crate::util::time::secs_or_none;
use regex::Regex;
use std::time::Duration;
use tracing::info;

/// Run the network command
pub async fn run_network(config: &Config, args: &NetworkArgs, dry_run: bool) -> MendResult<()> {
    let config = merge_network(config, args)?;
    let network = &config.network;

    let home_pattern = Regex::new(&network.home_pattern)
        .map_err(|e| MendError::InvalidArgument(format!("home pattern: {}", e)))?;
    let mapping = network
        .registry
        .mapping()
        .map_err(|e| MendError::InvalidArgument(format!("{:#}", e)))?;

    let store = match network.store {
        StoreKind::Registry => AnyStore::Registry(RegistryStore::new(config.platform.reg.clone())),
        StoreKind::File => AnyStore::File(FileStore::new(network.store_path.clone())),
    };

    info!(
        "Tracking network location into {}\\{} (home={}, away={})",
        mapping.key, mapping.name, mapping.home, mapping.away
    );

    let prober = NetworkProber::new(PowerShell::new(config.platform.powershell.clone()), home_pattern);
    let actuator = RegistryActuator::new(store, mapping);
    let policy = RetryPolicy::new(
        network.retries,
        Duration::from_secs(network.retry_delay_secs),
    );
    let every = secs_or_none(network.interval_secs);

    let applied = if dry_run {
        let mut reconciler =
            Reconciler::new(prober, DryRun::new(actuator), policy, ReconcileMode::Track);
        scheduler::run(&mut reconciler, every, shutdown_signal()).await?
    } else {
        let mut reconciler = Reconciler::new(prober, actuator, policy, ReconcileMode::Track);
        let applied = scheduler::run(&mut reconciler, every, shutdown_signal()).await?;
        info!("{} value write(s) issued", reconciler.actuator().writes());
        applied
    };

    if let Some(location) = applied.current() {
        info!("Network location {}", location);
    }
    Ok(())
}
