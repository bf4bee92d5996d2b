//! Missed-pickup completion handshake
//!
//! ```text
//! pending ──company──► marked_completed_by_company ──user────► completed
//!    └─────user─────► marked_completed_by_user    ──company─► completed
//! ```

use std::fmt;
use wmp_common::db::MissedPickupStatus;

use super::TransitionError;

/// Party acknowledging completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    User,
    Company,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::User => "user",
            Side::Company => "company",
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::User => Side::Company,
            Side::Company => Side::User,
        }
    }

    fn marked(&self) -> MissedPickupStatus {
        match self {
            Side::User => MissedPickupStatus::MarkedCompletedByUser,
            Side::Company => MissedPickupStatus::MarkedCompletedByCompany,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How concurrent acknowledgements resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// `completed` needs one acknowledgement from each side
    #[default]
    BothSidesRequired,
}

/// Next status after `side` acknowledges
pub fn acknowledge(
    status: MissedPickupStatus,
    side: Side,
) -> Result<MissedPickupStatus, TransitionError> {
    acknowledge_with(CompletionPolicy::BothSidesRequired, status, side)
}

pub fn acknowledge_with(
    policy: CompletionPolicy,
    status: MissedPickupStatus,
    side: Side,
) -> Result<MissedPickupStatus, TransitionError> {
    match policy {
        CompletionPolicy::BothSidesRequired => match status {
            MissedPickupStatus::Pending => Ok(side.marked()),
            MissedPickupStatus::Completed => {
                Err(TransitionError::invalid(status, "acknowledge completion"))
            }
            marked if marked == side.marked() => {
                Err(TransitionError::AlreadyAcknowledged(side.as_str()))
            }
            _ => Ok(MissedPickupStatus::Completed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MissedPickupStatus::*;

    #[test]
    fn test_transition_table() {
        let table = [
            (Pending, Side::User, Ok(MarkedCompletedByUser)),
            (Pending, Side::Company, Ok(MarkedCompletedByCompany)),
            (MarkedCompletedByUser, Side::Company, Ok(Completed)),
            (MarkedCompletedByCompany, Side::User, Ok(Completed)),
            (
                MarkedCompletedByUser,
                Side::User,
                Err(TransitionError::AlreadyAcknowledged("user")),
            ),
            (
                MarkedCompletedByCompany,
                Side::Company,
                Err(TransitionError::AlreadyAcknowledged("company")),
            ),
        ];

        for (from, side, expected) in table {
            assert_eq!(acknowledge(from, side), expected, "{} by {}", from, side);
        }
    }

    #[test]
    fn test_completed_is_terminal() {
        for side in [Side::User, Side::Company] {
            assert!(matches!(
                acknowledge(Completed, side),
                Err(TransitionError::InvalidState { .. })
            ));
        }
    }

    #[test]
    fn test_completion_needs_both_sides() {
        let after_company = acknowledge(Pending, Side::Company).unwrap();
        assert_ne!(after_company, Completed);
        assert_eq!(acknowledge(after_company, Side::Company.other()).unwrap(), Completed);
    }
}
