mod common;

use std::time::Duration;

use common::{entry, profile, RecordingProfiles, RecordingSchedules};
use reqwest::StatusCode;
use worknest::client::ScheduleScope;
use worknest::dashboard::{self, FetchError, RetryPolicy};
use worknest::model::{Status, WorkLocation};
use worknest::pipeline::{RecordFilter, SortDirection, SortKey, SortState};

const NO_WAIT: RetryPolicy = RetryPolicy {
    attempts: 3,
    delay: Duration::ZERO,
};

#[tokio::test]
async fn joins_profiles_and_counts_remote_days() {
    let schedules = RecordingSchedules::returning(vec![
        entry(1, "2024-09-20", Status::Approved, WorkLocation::Remote),
        entry(2, "2024-09-20", Status::Approved, WorkLocation::Remote),
        entry(1, "2024-09-21", Status::Pending, WorkLocation::Remote),
        entry(2, "2024-09-21", Status::Approved, WorkLocation::Office),
    ]);
    let profiles = RecordingProfiles::with(vec![
        profile(1, "Derek", "Tan", "Sales"),
        profile(2, "Susan", "Goh", "Finance"),
    ]);

    let snapshot = dashboard::load(&schedules, &profiles, ScheduleScope::Manager(9), NO_WAIT, 4)
        .await
        .unwrap();

    assert_eq!(snapshot.generation, 4);
    assert_eq!(snapshot.records.len(), 4);
    assert_eq!(snapshot.records[0].staff_fname, "Derek");
    assert_eq!(snapshot.records[1].department, "Finance");
    assert_eq!(snapshot.wfh_counts.get("2024-09-20"), Some(&2));
    assert_eq!(snapshot.wfh_counts.get("2024-09-21"), None);
    assert!(snapshot.missing_profiles.is_empty());
    assert_eq!(schedules.calls().await, vec![ScheduleScope::Manager(9)]);
}

#[tokio::test]
async fn looks_up_each_staff_member_once() {
    let schedules = RecordingSchedules::returning(vec![
        entry(3, "2024-09-16", Status::Approved, WorkLocation::Remote),
        entry(1, "2024-09-16", Status::Approved, WorkLocation::Office),
        entry(3, "2024-09-17", Status::Approved, WorkLocation::Remote),
        entry(1, "2024-09-17", Status::Approved, WorkLocation::Office),
    ]);
    let profiles = RecordingProfiles::with(vec![
        profile(1, "Derek", "Tan", "Sales"),
        profile(3, "Jack", "Sim", "CEO"),
    ]);

    dashboard::load(&schedules, &profiles, ScheduleScope::All, NO_WAIT, 1)
        .await
        .unwrap();

    let mut calls = profiles.calls().await;
    calls.sort_unstable();
    assert_eq!(calls, vec![1, 3]);
}

#[tokio::test]
async fn failed_profile_only_blanks_that_staff_member() {
    let schedules = RecordingSchedules::returning(vec![
        entry(1, "2024-09-20", Status::Approved, WorkLocation::Remote),
        entry(2, "2024-09-20", Status::Approved, WorkLocation::Remote),
    ]);
    let profiles = RecordingProfiles::with(vec![
        profile(1, "Derek", "Tan", "Sales"),
        profile(2, "Susan", "Goh", "Finance"),
    ])
    .failing_for(&[2]);

    let snapshot = dashboard::load(&schedules, &profiles, ScheduleScope::All, NO_WAIT, 1)
        .await
        .unwrap();

    assert_eq!(snapshot.missing_profiles, vec![2]);
    assert_eq!(snapshot.records[0].staff_fname, "Derek");
    let orphan = &snapshot.records[1];
    assert_eq!(orphan.staff_id, 2);
    assert_eq!(orphan.staff_fname, "");
    assert_eq!(orphan.department, "");
    assert_eq!(orphan.location, WorkLocation::Office);
    // the orphan is no longer remote, so only one WFH day is counted
    assert_eq!(snapshot.wfh_counts.get("2024-09-20"), Some(&1));
}

#[tokio::test]
async fn schedule_fetch_is_retried_until_success() {
    let schedules = RecordingSchedules::scripted(vec![
        (Duration::ZERO, Err(StatusCode::SERVICE_UNAVAILABLE)),
        (Duration::ZERO, Err(StatusCode::BAD_GATEWAY)),
        (
            Duration::ZERO,
            Ok(vec![entry(1, "2024-09-20", Status::Approved, WorkLocation::Remote)]),
        ),
    ]);
    let profiles = RecordingProfiles::with(vec![profile(1, "Derek", "Tan", "Sales")]);

    let snapshot = dashboard::load(&schedules, &profiles, ScheduleScope::All, NO_WAIT, 1)
        .await
        .unwrap();

    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(schedules.calls().await.len(), 3);
}

#[tokio::test]
async fn gives_up_after_configured_attempts() {
    let schedules = RecordingSchedules::scripted(vec![
        (Duration::ZERO, Err(StatusCode::INTERNAL_SERVER_ERROR)),
        (Duration::ZERO, Err(StatusCode::INTERNAL_SERVER_ERROR)),
        (Duration::ZERO, Err(StatusCode::INTERNAL_SERVER_ERROR)),
        (Duration::ZERO, Ok(vec![])),
    ]);
    let profiles = RecordingProfiles::default();

    let err = dashboard::load(&schedules, &profiles, ScheduleScope::All, NO_WAIT, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Schedules(_)));
    assert_eq!(err.to_string(), "Failed to fetch schedules.");
    assert_eq!(schedules.calls().await.len(), 3);
    assert!(profiles.calls().await.is_empty());
}

#[tokio::test]
async fn empty_personal_schedule_is_reported() {
    let schedules = RecordingSchedules::returning(vec![]);
    let profiles = RecordingProfiles::default();

    let err = dashboard::load(&schedules, &profiles, ScheduleScope::Staff(140002), NO_WAIT, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NoSchedules));
    assert_eq!(err.to_string(), "No schedules found.");

    let team = dashboard::load(&schedules, &profiles, ScheduleScope::Manager(140001), NO_WAIT, 2)
        .await
        .unwrap();
    assert!(team.is_empty());
    assert!(team.wfh_counts.is_empty());
}

#[tokio::test]
async fn snapshot_select_filters_then_sorts() {
    let schedules = RecordingSchedules::returning(vec![
        entry(1, "2024-09-20", Status::Approved, WorkLocation::Remote),
        entry(2, "2024-09-18", Status::Approved, WorkLocation::Remote),
        entry(3, "2024-09-19", Status::Approved, WorkLocation::Office),
    ]);
    let profiles = RecordingProfiles::with(vec![
        profile(1, "Derek", "Tan", "Sales"),
        profile(2, "Susan", "Goh", "Sales"),
        profile(3, "Jack", "Sim", "CEO"),
    ]);
    let snapshot = dashboard::load(&schedules, &profiles, ScheduleScope::All, NO_WAIT, 1)
        .await
        .unwrap();

    let filter = RecordFilter {
        department: Some("sales".into()),
        ..Default::default()
    };
    let rows = snapshot.select(
        &filter,
        SortState {
            key: SortKey::Date,
            direction: SortDirection::Desc,
        },
    );
    let ids: Vec<i64> = rows.iter().map(|r| r.staff_id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(snapshot.records.len(), 3);
}
