use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Approval state shared by schedule entries and WFH requests.
///
/// The request service writes lowercase values for some transitions, so the
/// lowercase spellings are accepted on input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(alias = "rejected")]
    Rejected,
    #[serde(alias = "cancelled", alias = "Canceled", alias = "canceled")]
    Cancelled,
    #[serde(alias = "withdrawn")]
    Withdrawn,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
            Status::Cancelled => "Cancelled",
            Status::Withdrawn => "Withdrawn",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum WorkLocation {
    #[default]
    #[serde(rename = "OFFICE")]
    Office,
    #[serde(rename = "REMOTE", alias = "WFH")]
    Remote,
}

impl WorkLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkLocation::Office => "OFFICE",
            WorkLocation::Remote => "REMOTE",
        }
    }
}

impl fmt::Display for WorkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One day of one staff member as reported by the scheduling service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub staff_id: i64,
    pub date: String,
    pub status: Status,
    #[serde(default)]
    pub location: Option<WorkLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub staff_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub staff_fname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub staff_lname: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country: String,
    #[serde(default)]
    pub location: Option<WorkLocation>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reporting_manager_id: Option<i64>,
    #[serde(default)]
    pub role: Option<i64>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.staff_fname, self.staff_lname)
    }
}

/// A schedule entry joined with its owner's profile. Field order is the
/// column order of exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombinedRecord {
    pub staff_id: i64,
    pub date: String,
    pub status: Status,
    pub location: WorkLocation,
    pub staff_fname: String,
    pub staff_lname: String,
    pub position: String,
    pub department: String,
    pub country: String,
}

impl CombinedRecord {
    pub fn staff_name(&self) -> String {
        format!("{} {}", self.staff_fname, self.staff_lname)
    }

    pub fn is_wfh(&self) -> bool {
        self.status == Status::Approved && self.location == WorkLocation::Remote
    }
}

/// Approved remote records per ISO date. Dates without any are absent.
pub type WfhCountByDate = BTreeMap<String, u32>;

/// WFH request as stored by the request service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WfhRequest {
    pub request_id: i64,
    pub staff_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reason: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub duration: String,
    pub status: Status,
    #[serde(default)]
    pub reporting_manager_id: Option<i64>,
    #[serde(default)]
    pub reporting_manager_name: Option<String>,
    #[serde(default)]
    pub reporting_manager_email: Option<String>,
    #[serde(default)]
    pub requester_email: Option<String>,
    #[serde(default)]
    pub day_id: Option<i64>,
    #[serde(default)]
    pub recurring_days: Option<i64>,
    #[serde(default)]
    pub approver_comment: Option<String>,
}

/// Status transitions a requester or approver can trigger on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestAction {
    Withdraw,
    Cancel,
}

impl RequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestAction::Withdraw => "withdraw",
            RequestAction::Cancel => "cancel",
        }
    }

    /// Status the request must currently be in for the action to apply.
    pub fn required_status(&self) -> Status {
        match self {
            RequestAction::Withdraw => Status::Approved,
            RequestAction::Cancel => Status::Pending,
        }
    }

    pub fn target_status(&self) -> Status {
        match self {
            RequestAction::Withdraw => Status::Withdrawn,
            RequestAction::Cancel => Status::Cancelled,
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Body for submitting a new WFH request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWfhRequest {
    pub staff_id: i64,
    pub department: String,
    pub start_date: String,
    pub reason: String,
    pub duration: String,
    pub reporting_manager_id: i64,
    pub reporting_manager_name: String,
}

/// Body for `PUT request/update/{id}`. The service overwrites all three
/// text fields, so unchanged values are sent back as they were.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestUpdate {
    pub start_date: String,
    pub duration: String,
    pub reason: String,
    /// `Pending` when an approved request goes back for approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditLogEntry {
    pub log_id: i64,
    pub request_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    pub approver_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub approver_email: String,
    #[serde(default)]
    pub action_timestamp: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub start_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub duration: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub department: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub department: String,
    pub event_name: String,
    pub event_date: String,
}

/// Services send `null` for unset text columns; treat it like an empty string.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
