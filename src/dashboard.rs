//! One fetch-join-aggregate cycle over the schedule and profile services.
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::client::{with_retry, ClientError, ProfileService, ScheduleScope, ScheduleService};
use crate::config::Config;
use crate::model::{CombinedRecord, Profile, WfhCountByDate};
use crate::pipeline::{self, RecordFilter, SortState, SortKey};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch schedules.")]
    Schedules(#[source] ClientError),
    #[error("No schedules found.")]
    NoSchedules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            attempts: cfg.retry.attempts,
            delay: cfg.retry.backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Derived state from one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<CombinedRecord>,
    pub wfh_counts: WfhCountByDate,
    /// Staff whose profile lookup failed this cycle.
    pub missing_profiles: Vec<i64>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Filtered then sorted copy of the records, ready for paging.
    pub fn select(&self, filter: &RecordFilter, sort: SortState<SortKey>) -> Vec<CombinedRecord> {
        let mut rows = pipeline::filter(&self.records, filter);
        pipeline::sort(&mut rows, sort.key, sort.direction);
        rows
    }
}

/// Fetch schedules for `scope`, look up every distinct owner's profile
/// concurrently, then join and count.
///
/// Schedule fetching is retried per `retry`. A failed profile lookup only
/// blanks that staff member's rows.
#[instrument(skip(schedules, profiles, retry))]
pub async fn load(
    schedules: &dyn ScheduleService,
    profiles: &dyn ProfileService,
    scope: ScheduleScope,
    retry: RetryPolicy,
    generation: u64,
) -> Result<Snapshot, FetchError> {
    let entries = with_retry("schedule fetch", retry.attempts, retry.delay, || {
        schedules.schedules(scope)
    })
    .await
    .map_err(FetchError::Schedules)?;

    if entries.is_empty() && matches!(scope, ScheduleScope::Staff(_)) {
        return Err(FetchError::NoSchedules);
    }

    let mut seen = HashSet::new();
    let staff_ids: Vec<i64> = entries
        .iter()
        .map(|e| e.staff_id)
        .filter(|id| seen.insert(*id))
        .collect();
    debug!(schedules = entries.len(), staff = staff_ids.len(), "looking up profiles");

    let lookups = join_all(staff_ids.iter().map(|id| profiles.profile(*id))).await;

    let mut found: Vec<Profile> = Vec::with_capacity(lookups.len());
    let mut missing_profiles = Vec::new();
    for (staff_id, lookup) in staff_ids.iter().zip(lookups) {
        match lookup {
            Ok(profile) => found.push(profile),
            Err(err) => {
                warn!(%err, staff_id, "profile lookup failed");
                missing_profiles.push(*staff_id);
            }
        }
    }

    let records = pipeline::join(&entries, &found);
    let wfh_counts = pipeline::aggregate(&records);
    info!(
        generation,
        records = records.len(),
        wfh_days = wfh_counts.len(),
        missing = missing_profiles.len(),
        "dashboard cycle complete"
    );

    Ok(Snapshot {
        generation,
        fetched_at: Utc::now(),
        records,
        wfh_counts,
        missing_profiles,
    })
}
