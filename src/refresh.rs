//! Timer-driven dashboard refresh.
//!
//! Every tick starts an independent cycle tagged with a fresh generation.
//! Cycles may overlap; a finished cycle only commits if no newer cycle has
//! committed already, so a slow response never overwrites a later one.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{ProfileService, ScheduleScope, ScheduleService};
use crate::dashboard::{self, FetchError, RetryPolicy, Snapshot};

/// What readers see: the newest committed outcome.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    /// Generation of the last committed cycle, 0 before the first commit.
    pub generation: u64,
    /// Last successful snapshot. Kept when a later cycle fails.
    pub snapshot: Option<Arc<Snapshot>>,
    /// Message of the last committed failure, cleared by the next success.
    pub last_error: Option<String>,
}

pub struct Refresher {
    schedules: Arc<dyn ScheduleService>,
    profiles: Arc<dyn ProfileService>,
    scope: ScheduleScope,
    retry: RetryPolicy,
    interval: Duration,
    next_generation: AtomicU64,
    state: watch::Sender<RefreshState>,
}

impl Refresher {
    pub fn new(
        schedules: Arc<dyn ScheduleService>,
        profiles: Arc<dyn ProfileService>,
        scope: ScheduleScope,
        retry: RetryPolicy,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(RefreshState::default());
        Self {
            schedules,
            profiles,
            scope,
            retry,
            interval,
            next_generation: AtomicU64::new(1),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    fn allocate_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish a cycle's outcome unless a newer generation is already
    /// committed. Returns whether the outcome was published.
    pub fn commit(&self, generation: u64, outcome: Result<Snapshot, FetchError>) -> bool {
        self.state.send_if_modified(|state| {
            if generation <= state.generation {
                debug!(generation, committed = state.generation, "discarding stale cycle");
                return false;
            }
            state.generation = generation;
            match outcome {
                Ok(snapshot) => {
                    state.snapshot = Some(Arc::new(snapshot));
                    state.last_error = None;
                }
                Err(err) => {
                    state.last_error = Some(err.to_string());
                }
            }
            true
        })
    }

    /// Run one cycle to completion and try to commit it.
    pub async fn run_cycle(&self) -> bool {
        let generation = self.allocate_generation();
        self.cycle(generation, &CancellationToken::new()).await
    }

    #[instrument(skip(self, cancel))]
    async fn cycle(&self, generation: u64, cancel: &CancellationToken) -> bool {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cycle cancelled before completion");
                return false;
            }
            res = dashboard::load(
                self.schedules.as_ref(),
                self.profiles.as_ref(),
                self.scope,
                self.retry,
                generation,
            ) => res,
        };
        if cancel.is_cancelled() {
            return false;
        }
        if let Err(err) = &outcome {
            warn!(%err, "refresh cycle failed");
        }
        self.commit(generation, outcome)
    }

    /// Tick every `interval` until `cancel` fires. In-flight cycles are
    /// cancelled without committing when the loop stops.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = JoinSet::new();
        info!(interval_ms = self.interval.as_millis() as u64, "starting refresh loop");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let generation = self.allocate_generation();
                    let this = Arc::clone(&self);
                    let token = cancel.child_token();
                    cycles.spawn(async move { this.cycle(generation, &token).await });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(err) = joined {
                        error!(?err, "refresh cycle task failed");
                    }
                }
            }
        }

        while let Some(joined) = cycles.join_next().await {
            if let Err(err) = joined {
                error!(?err, "refresh cycle task failed");
            }
        }
        info!("refresh loop stopped");
    }
}
