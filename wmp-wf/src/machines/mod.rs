//! Entity state machines
//!
//! Pure transition functions, one module per entity. Nothing here touches
//! the database; the workflow layer loads the current status, asks the
//! machine for the next one, and applies it with a conditional update.

pub mod area_service;
pub mod manhole;
pub mod missed_pickup;
pub mod resign;
pub mod reward;

use thiserror::Error;

/// A transition not defined for the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while {state}")]
    InvalidState { state: String, action: &'static str },

    #[error("{0} already acknowledged completion")]
    AlreadyAcknowledged(&'static str),
}

impl TransitionError {
    pub(crate) fn invalid(state: impl ToString, action: &'static str) -> Self {
        TransitionError::InvalidState {
            state: state.to_string(),
            action,
        }
    }
}

impl From<TransitionError> for wmp_common::Error {
    fn from(err: TransitionError) -> Self {
        wmp_common::Error::Precondition(err.to_string())
    }
}
