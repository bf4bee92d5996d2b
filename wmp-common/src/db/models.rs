//! Database models
//!
//! Row types for every workflow table. Status columns are stored as TEXT
//! and decoded into the enums below.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub resolved_manholes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Area {
    pub id: i64,
    pub name: String,
    /// Legacy primary waste-collection company
    pub company_id: Option<i64>,
}

/// Kind of service a company provides for an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ServiceType {
    WasteCollection,
    ManholeManagement,
    Recycling,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::WasteCollection => "waste_collection",
            ServiceType::ManholeManagement => "manhole_management",
            ServiceType::Recycling => "recycling",
        }
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waste_collection" => Ok(ServiceType::WasteCollection),
            "manhole_management" => Ok(ServiceType::ManholeManagement),
            "recycling" => Ok(ServiceType::Recycling),
            other => Err(Error::Validation(format!("Unknown service type: {}", other))),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pending request from a company to serve an area
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AreaServiceRequest {
    pub id: i64,
    pub area_id: i64,
    pub company_id: i64,
    pub service_type: ServiceType,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// Approved, persistent area/company/service link
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AreaServiceAssignment {
    pub id: i64,
    pub area_id: i64,
    pub company_id: i64,
    pub service_type: ServiceType,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MissedPickupStatus {
    Pending,
    MarkedCompletedByUser,
    MarkedCompletedByCompany,
    Completed,
}

impl MissedPickupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissedPickupStatus::Pending => "pending",
            MissedPickupStatus::MarkedCompletedByUser => "marked_completed_by_user",
            MissedPickupStatus::MarkedCompletedByCompany => "marked_completed_by_company",
            MissedPickupStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MissedPickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MissedPickupReport {
    pub id: i64,
    pub user_id: i64,
    pub area_id: i64,
    pub company_id: Option<i64>,
    pub status: MissedPickupStatus,
    pub unclean_image_ref: String,
    pub clean_image_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ManholeReportType {
    Lost,
    Open,
    Hidden,
    Damaged,
}

impl ManholeReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManholeReportType::Lost => "lost",
            ManholeReportType::Open => "open",
            ManholeReportType::Hidden => "hidden",
            ManholeReportType::Damaged => "damaged",
        }
    }
}

impl FromStr for ManholeReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ManholeReportType::Lost),
            "open" => Ok(ManholeReportType::Open),
            "hidden" => Ok(ManholeReportType::Hidden),
            "damaged" => Ok(ManholeReportType::Damaged),
            other => Err(Error::Validation(format!(
                "Invalid report type '{}', expected one of: lost, open, hidden, damaged",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ManholeStatus {
    Pending,
    Assigned,
    Resolved,
    Confirmed,
}

impl ManholeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManholeStatus::Pending => "pending",
            ManholeStatus::Assigned => "assigned",
            ManholeStatus::Resolved => "resolved",
            ManholeStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for ManholeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManholeReport {
    pub id: i64,
    pub user_id: i64,
    pub area_id: i64,
    pub company_id: Option<i64>,
    pub report_type: ManholeReportType,
    pub status: ManholeStatus,
    pub before_image_ref: String,
    pub after_image_ref: Option<String>,
    pub created_at: NaiveDateTime,
    pub assigned_at: Option<NaiveDateTime>,
    pub resolved_at: Option<NaiveDateTime>,
}

/// Stored capitalized, as the rest of the platform reads them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ConversionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Pending => "Pending",
            ConversionStatus::Approved => "Approved",
            ConversionStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RewardConversion {
    pub id: i64,
    pub user_id: i64,
    pub points_requested: i64,
    pub equivalent_amount: f64,
    pub status: ConversionStatus,
    pub is_seen: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResignRequest {
    pub id: i64,
    pub company_id: i64,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agreement {
    pub id: i64,
    pub company_id: i64,
    pub kind: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// Recipient of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Addressee {
    User(i64),
    Company(i64),
}

impl fmt::Display for Addressee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addressee::User(id) => write!(f, "user:{}", id),
            Addressee::Company(id) => write!(f, "company:{}", id),
        }
    }
}
