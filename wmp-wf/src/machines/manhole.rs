//! Manhole report lifecycle
//!
//! `pending → assigned → resolved → confirmed`, with the user able to send a
//! resolution back to `assigned`.

use std::fmt;
use wmp_common::db::ManholeStatus;

use super::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManholeAction {
    /// Admin hands a pending report to a company
    Assign,
    /// Company submits a fixed-verdict after image
    Resolve,
    /// User accepts the fix
    Confirm,
    /// User disputes the fix
    RejectResolution,
}

impl ManholeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManholeAction::Assign => "assign",
            ManholeAction::Resolve => "resolve",
            ManholeAction::Confirm => "confirm",
            ManholeAction::RejectResolution => "reject resolution",
        }
    }
}

impl fmt::Display for ManholeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status a new report starts in
pub fn initial(company_id: Option<i64>) -> ManholeStatus {
    match company_id {
        Some(_) => ManholeStatus::Assigned,
        None => ManholeStatus::Pending,
    }
}

pub fn apply(status: ManholeStatus, action: ManholeAction) -> Result<ManholeStatus, TransitionError> {
    use ManholeAction::*;
    use ManholeStatus::*;

    match (status, action) {
        (Pending, Assign) => Ok(Assigned),
        (Assigned, Resolve) => Ok(Resolved),
        (Resolved, Confirm) => Ok(Confirmed),
        (Resolved, RejectResolution) => Ok(Assigned),
        (state, action) => Err(TransitionError::invalid(state, action.as_str())),
    }
}
