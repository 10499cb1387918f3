//! Withdraw/cancel flow for a staff member's requests.
//!
//! A change goes through an explicit confirmation step. Confirming applies
//! the new status locally first and puts the previous one back if the
//! request service refuses.
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::client::{ClientError, RequestService};
use crate::context::RequestContext;
use crate::model::{RequestAction, RequestUpdate, Status, WfhRequest};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("request {0} not found")]
    UnknownRequest(i64),
    #[error("cannot {action} request {request_id}: status is {status}, expected {required}")]
    NotEligible {
        request_id: i64,
        action: RequestAction,
        status: Status,
        required: Status,
    },
    #[error("cannot edit request {request_id}: status is {status}")]
    NotEditable { request_id: i64, status: Status },
    #[error("another action is awaiting confirmation")]
    AlreadyPending,
    #[error("nothing to confirm")]
    NothingPending,
    #[error("{message}")]
    Rejected {
        request_id: i64,
        message: String,
        #[source]
        source: ClientError,
    },
}

/// Action waiting for the user to confirm or decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub request_id: i64,
    pub action: RequestAction,
}

impl PendingConfirmation {
    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to {} request {}?",
            self.action, self.request_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied {
        request_id: i64,
        status: Status,
        message: String,
    },
    Declined {
        request_id: i64,
    },
}

/// Changes asked for on an existing request. Unset fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestEdit {
    pub start_date: Option<String>,
    pub duration: Option<String>,
    pub reason: Option<String>,
}

impl RequestEdit {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.duration.is_none() && self.reason.is_none()
    }
}

/// A staff member's requests plus at most one pending confirmation.
#[derive(Debug, Clone, Default)]
pub struct RequestBoard {
    rows: Vec<WfhRequest>,
    pending: Option<PendingConfirmation>,
}

impl RequestBoard {
    pub fn new(rows: Vec<WfhRequest>) -> Self {
        Self { rows, pending: None }
    }

    pub fn rows(&self) -> &[WfhRequest] {
        &self.rows
    }

    pub fn pending(&self) -> Option<PendingConfirmation> {
        self.pending
    }

    /// Actions offered for a row: cancel while pending, withdraw once approved.
    pub fn available_action(request: &WfhRequest) -> Option<RequestAction> {
        match request.status {
            Status::Pending => Some(RequestAction::Cancel),
            Status::Approved => Some(RequestAction::Withdraw),
            _ => None,
        }
    }

    fn position(&self, request_id: i64) -> Result<usize, ActionError> {
        self.rows
            .iter()
            .position(|r| r.request_id == request_id)
            .ok_or(ActionError::UnknownRequest(request_id))
    }

    /// Ask for `action` on `request_id`; nothing is sent until `confirm`.
    pub fn begin(
        &mut self,
        request_id: i64,
        action: RequestAction,
    ) -> Result<PendingConfirmation, ActionError> {
        if self.pending.is_some() {
            return Err(ActionError::AlreadyPending);
        }
        let idx = self.position(request_id)?;
        let status = self.rows[idx].status;
        if status != action.required_status() {
            return Err(ActionError::NotEligible {
                request_id,
                action,
                status,
                required: action.required_status(),
            });
        }
        let pending = PendingConfirmation { request_id, action };
        self.pending = Some(pending);
        Ok(pending)
    }

    pub fn decline(&mut self) -> Result<ActionOutcome, ActionError> {
        let pending = self.pending.take().ok_or(ActionError::NothingPending)?;
        Ok(ActionOutcome::Declined {
            request_id: pending.request_id,
        })
    }

    /// Send the pending action. The row shows the new status while the call
    /// is in flight and reverts if the service rejects it.
    #[instrument(skip(self, service, ctx))]
    pub async fn confirm(
        &mut self,
        service: &dyn RequestService,
        ctx: &RequestContext,
    ) -> Result<ActionOutcome, ActionError> {
        let pending = self.pending.take().ok_or(ActionError::NothingPending)?;
        let idx = self.position(pending.request_id)?;
        let previous = self.rows[idx].status;
        let target = pending.action.target_status();
        self.rows[idx].status = target;

        match service
            .transition_request(ctx, pending.request_id, pending.action)
            .await
        {
            Ok(message) => {
                info!(request_id = pending.request_id, action = %pending.action, "request updated");
                Ok(ActionOutcome::Applied {
                    request_id: pending.request_id,
                    status: target,
                    message,
                })
            }
            Err(source) => {
                self.rows[idx].status = previous;
                warn!(%source, request_id = pending.request_id, "request update rejected; reverted");
                Err(ActionError::Rejected {
                    request_id: pending.request_id,
                    message: source.user_message(),
                    source,
                })
            }
        }
    }

    pub fn get(&self, request_id: i64) -> Option<&WfhRequest> {
        self.rows.iter().find(|r| r.request_id == request_id)
    }

    /// Update body for `edit`, filled in from the current row. Only pending
    /// and approved requests can change; an approved one goes back to
    /// pending for re-approval.
    pub fn prepare_edit(&self, request_id: i64, edit: RequestEdit) -> Result<RequestUpdate, ActionError> {
        let row = &self.rows[self.position(request_id)?];
        let status = match row.status {
            Status::Pending => None,
            Status::Approved => Some(Status::Pending),
            status => return Err(ActionError::NotEditable { request_id, status }),
        };
        Ok(RequestUpdate {
            start_date: edit.start_date.unwrap_or_else(|| row.start_date.clone()),
            duration: edit.duration.unwrap_or_else(|| row.duration.clone()),
            reason: edit.reason.unwrap_or_else(|| row.reason.clone()),
            status,
        })
    }

    /// Replace a row with the service's updated copy.
    pub fn apply_update(&mut self, updated: WfhRequest) -> Result<(), ActionError> {
        let idx = self.position(updated.request_id)?;
        self.rows[idx] = updated;
        Ok(())
    }
}
