//! Main polling loop

use crate::error::MendResult;
use crate::repair::Action;
use crate::state::AppliedState;
use crate::util::time::format_duration;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// One probe-and-reconcile pass
#[allow(async_fn_in_trait)]
pub trait Cycle {
    type State;

    /// Run one cycle against the driver's applied state
    async fn cycle(&mut self, applied: &mut AppliedState<Self::State>)
        -> MendResult<Action<Self::State>>;
}

/// Run `cycle` once, or every `every` until `shutdown` resolves
///
/// With no interval (or a zero one) the cycle runs exactly once and its
/// error is returned. When polling, retryable failures are logged and the
/// next cycle runs on schedule; fatal failures stop the loop. `shutdown`
/// is only observed between cycles.
pub async fn run<C, F>(
    cycle: &mut C,
    every: Option<Duration>,
    shutdown: F,
) -> MendResult<AppliedState<C::State>>
where
    C: Cycle,
    C::State: std::fmt::Display,
    F: Future<Output = ()>,
{
    let mut applied = AppliedState::new();

    let period = match every {
        Some(period) if !period.is_zero() => period,
        _ => {
            report(cycle.cycle(&mut applied).await?);
            return Ok(applied);
        },
    };

    info!("Polling every {}", format_duration(period.as_secs()));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            () = &mut shutdown => {
                info!(
                    "Shutdown requested after {} application(s)",
                    applied.applications()
                );
                return Ok(applied);
            }
        }

        match cycle.cycle(&mut applied).await {
            Ok(action) => report(action),
            Err(e) if e.is_fatal() => {
                error!("Cycle failed: {}", e);
                return Err(e);
            },
            Err(e) => warn!("Cycle failed, will retry next interval: {}", e),
        }
    }
}

fn report<S: std::fmt::Display>(action: Action<S>) {
    match action {
        Action::NoOp => debug!("No change"),
        Action::Apply(state) => debug!("Reconciled to {}", state),
    }
}
