//! Workflow orchestrator
//!
//! Each public operation follows the same sequence:
//!
//! 1. validate input without touching the database
//! 2. run classifier checks and store images (negative verdicts stop here)
//! 3. open one [`UnitOfWork`], re-read state, apply the state machine with
//!    conditional updates, write notifications
//! 4. commit, then publish the committed events on the [`EventBus`]
//!
//! Any error between `begin` and `commit` drops the unit of work, which
//! rolls back every write of the operation.

mod area_service;
mod manhole;
mod missed_pickup;
mod notifications;
mod resign;
mod reward;

use chrono::Utc;
use sqlx::Sqlite;
use std::sync::Arc;
use wmp_common::config::RewardsConfig;
use wmp_common::db::{Area, ServiceType};
use wmp_common::events::{EntityKind, EventBus, WmpEvent};
use wmp_common::{Error, Result};

use crate::classifier::{ClassifierTask, Payload, Verdict, VerdictClassifier};
use crate::gateway::{Gateway, UnitOfWork};
use crate::images::{ImageStore, ImageUpload};
use crate::notify::{NotificationSink, SqlNotificationSink};

/// Tunables read from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub points_per_currency_unit: i64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&RewardsConfig::default())
    }
}

impl From<&RewardsConfig> for WorkflowSettings {
    fn from(config: &RewardsConfig) -> Self {
        Self {
            points_per_currency_unit: config.points_per_currency_unit,
        }
    }
}

/// Entry point for every state-changing operation
#[derive(Clone)]
pub struct Workflows {
    gateway: Gateway,
    sink: Arc<dyn NotificationSink>,
    classifier: Arc<dyn VerdictClassifier>,
    images: Arc<dyn ImageStore>,
    events: EventBus,
    settings: WorkflowSettings,
}

impl Workflows {
    pub fn new(
        gateway: Gateway,
        classifier: Arc<dyn VerdictClassifier>,
        images: Arc<dyn ImageStore>,
        events: EventBus,
    ) -> Self {
        Self {
            gateway,
            sink: Arc::new(SqlNotificationSink),
            classifier,
            images,
            events,
            settings: WorkflowSettings::default(),
        }
    }

    /// Replace the notification sink
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Commit and publish what the unit of work recorded
    async fn commit(&self, uow: UnitOfWork) -> Result<()> {
        let caller = uow.caller();
        let events = uow.commit().await?;

        let published = events.len();
        for event in events {
            self.events.emit_lossy(event);
        }
        tracing::debug!(caller = caller, events = published, "Published committed events");

        Ok(())
    }

    /// Ask the classifier about an image
    async fn classify_image(&self, task: ClassifierTask, image: &ImageUpload) -> Result<Verdict> {
        self.classifier
            .classify(task, Payload::Image(image.bytes().to_vec()))
            .await
            .map_err(|e| {
                tracing::error!(task = %task, error = %e, "Classifier call failed");
                Error::from(e)
            })
    }

    async fn load_area(&self, area_id: i64) -> Result<Area> {
        load_area(self.gateway.pool(), area_id).await
    }
}

/// Queue a status-change event on the unit of work
fn record_transition(
    uow: &mut UnitOfWork,
    entity: EntityKind,
    entity_id: i64,
    status: impl ToString,
) {
    uow.record(WmpEvent::EntityTransitioned {
        entity,
        entity_id,
        status: status.to_string(),
        timestamp: Utc::now(),
    });
}

/// Fail when a conditional update matched no row
fn ensure_updated(rows_affected: u64, what: &str) -> Result<()> {
    if rows_affected == 0 {
        Err(Error::Precondition(format!(
            "{} changed concurrently, please retry",
            what
        )))
    } else {
        Ok(())
    }
}

async fn load_area<'e, E>(executor: E, area_id: i64) -> Result<Area>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Area>("SELECT id, name, company_id FROM areas WHERE id = ?")
        .bind(area_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Area {} not found", area_id)))
}

/// Company holding an active assignment of `service_type` for the area
async fn service_company<'e, E>(
    executor: E,
    area_id: i64,
    service_type: ServiceType,
) -> Result<Option<i64>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let company_id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT company_id FROM area_services
        WHERE area_id = ? AND service_type = ? AND status = 'active'
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(area_id)
    .bind(service_type.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(company_id)
}

/// Reject a non-positive id before any lookup
fn validate_id(id: i64, what: &str) -> Result<()> {
    if id <= 0 {
        return Err(Error::Validation(format!("{} must be a positive integer", what)));
    }
    Ok(())
}
