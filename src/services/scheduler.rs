//! Background timers driving the deactivation sweep and the daily quick match rotation.

use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    services::sweeps::{deactivate_expired_groups, rotate_quick_match},
    state::SharedState,
};

/// Handle over the two sweep tasks.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn both sweeps on the current runtime.
    pub fn start(state: SharedState) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(deactivation_loop(state.clone(), signal.clone())),
            tokio::spawn(rotation_loop(state, signal)),
        ];
        info!("scheduler started");
        Self { shutdown, tasks }
    }

    /// Signal both sweeps to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "scheduler task ended abnormally");
            }
        }
        info!("scheduler stopped");
    }
}

async fn deactivation_loop(state: SharedState, mut signal: watch::Receiver<bool>) {
    let mut ticker = interval(state.config().deactivation_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = signal.changed() => break,
        }
        match deactivate_expired_groups(&state, state.now()).await {
            Ok(report) if !report.deactivated.is_empty() || !report.failed.is_empty() => {
                debug!(
                    deactivated = report.deactivated.len(),
                    failed = report.failed.len(),
                    "deactivation sweep finished"
                );
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "deactivation sweep failed"),
        }
    }
}

async fn rotation_loop(state: SharedState, mut signal: watch::Receiver<bool>) {
    let offset = state.config().quick_match.utc_offset;

    loop {
        let now = state.now();
        let wait = until_next_midnight(now, offset);
        debug!(wait_secs = wait.as_secs(), "quick match rotation scheduled");
        tokio::select! {
            _ = sleep(wait) => {}
            _ = signal.changed() => break,
        }
        if let Err(err) = rotate_quick_match(&state, state.now()).await {
            warn!(error = %err, "quick match rotation failed");
        }
    }
}

/// Next midnight strictly after `now` in the timezone `offset`.
pub fn next_midnight(now: OffsetDateTime, offset: UtcOffset) -> OffsetDateTime {
    let local = now.to_offset(offset);
    local
        .date()
        .next_day()
        .map(|date| date.midnight().assume_offset(offset))
        .unwrap_or(local)
}

fn until_next_midnight(now: OffsetDateTime, offset: UtcOffset) -> Duration {
    Duration::try_from(next_midnight(now, offset) - now).unwrap_or(Duration::ZERO)
}
