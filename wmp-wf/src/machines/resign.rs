//! Resignation decision

use serde::Deserialize;
use std::str::FromStr;
use wmp_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResignDecision {
    Approved,
    Rejected,
}

impl ResignDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResignDecision::Approved => "approved",
            ResignDecision::Rejected => "rejected",
        }
    }
}

impl FromStr for ResignDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ResignDecision::Approved),
            "rejected" => Ok(ResignDecision::Rejected),
            other => Err(Error::Validation(format!(
                "Invalid decision '{}', expected approved or rejected",
                other
            ))),
        }
    }
}

/// Agreement kind recorded when a resignation is approved
pub const RESIGNATION_AGREEMENT: &str = "resignation";
