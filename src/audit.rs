//! Audit log browsing: department filter plus column sort.
use std::cmp::Ordering;
use std::str::FromStr;

use crate::model::AuditLogEntry;
use crate::pipeline::{contains_ignore_case, SortState, UnknownSortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditSortKey {
    LogId,
    RequestId,
    #[default]
    Action,
    ApproverId,
    ApproverEmail,
    ActionTimestamp,
    StartDate,
    Duration,
    Department,
}

impl AuditSortKey {
    fn compare(&self, a: &AuditLogEntry, b: &AuditLogEntry) -> Ordering {
        match self {
            AuditSortKey::LogId => a.log_id.cmp(&b.log_id),
            AuditSortKey::RequestId => a.request_id.cmp(&b.request_id),
            AuditSortKey::Action => a.action.cmp(&b.action),
            AuditSortKey::ApproverId => a.approver_id.cmp(&b.approver_id),
            AuditSortKey::ApproverEmail => a.approver_email.cmp(&b.approver_email),
            AuditSortKey::ActionTimestamp => a.action_timestamp.cmp(&b.action_timestamp),
            AuditSortKey::StartDate => a.start_date.cmp(&b.start_date),
            AuditSortKey::Duration => a.duration.cmp(&b.duration),
            AuditSortKey::Department => a.department.cmp(&b.department),
        }
    }
}

impl FromStr for AuditSortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log_id" => Ok(AuditSortKey::LogId),
            "request_id" => Ok(AuditSortKey::RequestId),
            "action" => Ok(AuditSortKey::Action),
            "approver_id" => Ok(AuditSortKey::ApproverId),
            "approver_email" => Ok(AuditSortKey::ApproverEmail),
            "action_timestamp" => Ok(AuditSortKey::ActionTimestamp),
            "start_date" => Ok(AuditSortKey::StartDate),
            "duration" => Ok(AuditSortKey::Duration),
            "department" => Ok(AuditSortKey::Department),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

/// Fetched audit entries plus the current department filter and sort.
#[derive(Debug, Clone, Default)]
pub struct AuditView {
    logs: Vec<AuditLogEntry>,
    department_filter: String,
    sort: SortState<AuditSortKey>,
}

impl AuditView {
    pub fn new(logs: Vec<AuditLogEntry>) -> Self {
        Self {
            logs,
            ..Default::default()
        }
    }

    pub fn set_department_filter(&mut self, value: impl Into<String>) {
        self.department_filter = value.into();
    }

    /// Header click: toggles direction on the active column.
    pub fn activate_sort(&mut self, key: AuditSortKey) {
        self.sort.activate(key);
    }

    pub fn set_sort(&mut self, sort: SortState<AuditSortKey>) {
        self.sort = sort;
    }

    pub fn sort_state(&self) -> SortState<AuditSortKey> {
        self.sort
    }

    /// Entries whose department contains the filter, in sort order.
    pub fn rows(&self) -> Vec<&AuditLogEntry> {
        let needle = self.department_filter.trim();
        let mut rows: Vec<&AuditLogEntry> = self
            .logs
            .iter()
            .filter(|log| needle.is_empty() || contains_ignore_case(&log.department, needle))
            .collect();
        let SortState { key, direction } = self.sort;
        rows.sort_by(|a, b| direction.apply(key.compare(a, b)));
        rows
    }
}
