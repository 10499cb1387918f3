#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use worknest::client::{ClientError, ProfileService, RequestService, ScheduleScope, ScheduleService};
use worknest::context::RequestContext;
use worknest::model::{Profile, RequestAction, ScheduleEntry, Status, WfhRequest, WorkLocation};

pub fn status_error(service: &'static str, status: StatusCode, message: &str) -> ClientError {
    ClientError::Status {
        service,
        status,
        message: message.to_string(),
    }
}

pub fn entry(staff_id: i64, date: &str, status: Status, location: WorkLocation) -> ScheduleEntry {
    ScheduleEntry {
        staff_id,
        date: date.into(),
        status,
        location: Some(location),
    }
}

pub fn profile(staff_id: i64, fname: &str, lname: &str, department: &str) -> Profile {
    Profile {
        staff_id,
        staff_fname: fname.into(),
        staff_lname: lname.into(),
        position: "Account Manager".into(),
        department: department.into(),
        country: "Singapore".into(),
        location: None,
        email: None,
        reporting_manager_id: None,
        role: None,
    }
}

pub fn request(request_id: i64, status: Status) -> WfhRequest {
    WfhRequest {
        request_id,
        staff_id: 140002,
        department: "Sales".into(),
        start_date: "2024-10-01".into(),
        reason: "WFH".into(),
        duration: "full_day".into(),
        status,
        reporting_manager_id: Some(140001),
        reporting_manager_name: Some("Derek Tan".into()),
        reporting_manager_email: None,
        requester_email: None,
        day_id: None,
        recurring_days: None,
        approver_comment: None,
    }
}

/// Scripted schedule service. Each call pops one `(delay, outcome)`; once
/// the script runs out it answers `fallback` immediately.
#[derive(Clone, Default)]
pub struct RecordingSchedules {
    script: Arc<Mutex<VecDeque<(Duration, Result<Vec<ScheduleEntry>, StatusCode>)>>>,
    fallback: Vec<ScheduleEntry>,
    calls: Arc<Mutex<Vec<ScheduleScope>>>,
}

impl RecordingSchedules {
    pub fn returning(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            fallback: entries,
            ..Default::default()
        }
    }

    pub fn scripted(script: Vec<(Duration, Result<Vec<ScheduleEntry>, StatusCode>)>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<ScheduleScope> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ScheduleService for RecordingSchedules {
    async fn schedules(&self, scope: ScheduleScope) -> Result<Vec<ScheduleEntry>, ClientError> {
        self.calls.lock().await.push(scope);
        let next = self.script.lock().await.pop_front();
        match next {
            Some((delay, outcome)) => {
                tokio::time::sleep(delay).await;
                outcome.map_err(|status| status_error("schedule service", status, "unavailable"))
            }
            None => Ok(self.fallback.clone()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingProfiles {
    profiles: Arc<HashMap<i64, Profile>>,
    failing: Arc<HashSet<i64>>,
    calls: Arc<Mutex<Vec<i64>>>,
}

impl RecordingProfiles {
    pub fn with(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: Arc::new(profiles.into_iter().map(|p| (p.staff_id, p)).collect()),
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, ids: &[i64]) -> Self {
        self.failing = Arc::new(ids.iter().copied().collect());
        self
    }

    pub async fn calls(&self) -> Vec<i64> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ProfileService for RecordingProfiles {
    async fn profile(&self, staff_id: i64) -> Result<Profile, ClientError> {
        self.calls.lock().await.push(staff_id);
        if self.failing.contains(&staff_id) {
            return Err(status_error(
                "profile service",
                StatusCode::INTERNAL_SERVER_ERROR,
                "database unavailable",
            ));
        }
        self.profiles
            .get(&staff_id)
            .cloned()
            .ok_or_else(|| status_error("profile service", StatusCode::NOT_FOUND, "Profile not found."))
    }

    async fn profiles(&self) -> Result<Vec<Profile>, ClientError> {
        Ok(self.profiles.values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct RecordingRequests {
    responses: Arc<Mutex<VecDeque<Result<String, (StatusCode, String)>>>>,
    calls: Arc<Mutex<Vec<(i64, RequestAction, i64)>>>,
}

impl RecordingRequests {
    pub fn with_responses(responses: Vec<Result<String, (StatusCode, String)>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    /// `(request_id, action, caller staff id)` per call.
    pub async fn calls(&self) -> Vec<(i64, RequestAction, i64)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl RequestService for RecordingRequests {
    async fn transition_request(
        &self,
        ctx: &RequestContext,
        request_id: i64,
        action: RequestAction,
    ) -> Result<String, ClientError> {
        self.calls.lock().await.push((request_id, action, ctx.staff_id()));
        let next = self.responses.lock().await.pop_front();
        match next {
            Some(Ok(message)) => Ok(message),
            Some(Err((status, message))) => Err(status_error("request service", status, &message)),
            None => Ok("ok".into()),
        }
    }
}
