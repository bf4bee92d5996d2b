//! Reward conversion lifecycle
//!
//! `Pending → Approved | Rejected`. Both outcomes are terminal; the only
//! later change is the one-shot `is_seen` flag.

use wmp_common::db::ConversionStatus;

use super::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }
}

pub fn decide(status: ConversionStatus, decision: Decision) -> Result<ConversionStatus, TransitionError> {
    match (status, decision) {
        (ConversionStatus::Pending, Decision::Approve) => Ok(ConversionStatus::Approved),
        (ConversionStatus::Pending, Decision::Reject) => Ok(ConversionStatus::Rejected),
        (state, decision) => Err(TransitionError::invalid(state, decision.as_str())),
    }
}

/// Only pending conversions may be withdrawn by their owner
pub fn check_cancel(status: ConversionStatus) -> Result<(), TransitionError> {
    match status {
        ConversionStatus::Pending => Ok(()),
        state => Err(TransitionError::invalid(state, "cancel")),
    }
}

pub fn check_mark_seen(status: ConversionStatus, is_seen: bool) -> Result<(), TransitionError> {
    match status {
        ConversionStatus::Pending => Err(TransitionError::invalid(status, "mark seen")),
        _ if is_seen => Err(TransitionError::invalid("already seen", "mark seen")),
        _ => Ok(()),
    }
}

/// Currency value of `points`, rounded to two decimals
pub fn equivalent_amount(points: i64, points_per_unit: i64) -> f64 {
    let raw = points as f64 / points_per_unit as f64;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversionStatus::*;

    #[test]
    fn test_decisions_only_from_pending() {
        assert_eq!(decide(Pending, Decision::Approve).unwrap(), Approved);
        assert_eq!(decide(Pending, Decision::Reject).unwrap(), Rejected);

        for terminal in [Approved, Rejected] {
            assert!(decide(terminal, Decision::Approve).is_err());
            assert!(decide(terminal, Decision::Reject).is_err());
        }
    }

    #[test]
    fn test_cancel_guard() {
        assert!(check_cancel(Pending).is_ok());
        assert!(check_cancel(Approved).is_err());
        assert!(check_cancel(Rejected).is_err());
    }

    #[test]
    fn test_mark_seen_guard() {
        assert!(check_mark_seen(Pending, false).is_err());
        assert!(check_mark_seen(Approved, false).is_ok());
        assert!(check_mark_seen(Rejected, false).is_ok());
        assert!(check_mark_seen(Approved, true).is_err());
    }

    #[test]
    fn test_equivalent_amount() {
        assert_eq!(equivalent_amount(100, 10), 10.0);
        assert_eq!(equivalent_amount(5, 10), 0.5);
        assert_eq!(equivalent_amount(1, 3), 0.33);
        assert_eq!(equivalent_amount(2, 3), 0.67);
    }
}
