//! Notification sink
//!
//! The single place where notifications are written. A notification row is
//! always inserted together with exactly one addressee row, on the unit of
//! work that carries the state change it describes.

use async_trait::async_trait;
use chrono::Utc;
use wmp_common::db::Addressee;
use wmp_common::events::WmpEvent;
use wmp_common::{Error, Result};

use crate::gateway::UnitOfWork;

/// Writes notifications inside a caller-owned unit of work
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Insert a notification for `addressee`, returning its id
    async fn notify(&self, uow: &mut UnitOfWork, addressee: Addressee, content: &str)
        -> Result<i64>;
}

/// SQL-backed sink writing `notifications` plus one addressee link row
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlNotificationSink;

#[async_trait]
impl NotificationSink for SqlNotificationSink {
    async fn notify(
        &self,
        uow: &mut UnitOfWork,
        addressee: Addressee,
        content: &str,
    ) -> Result<i64> {
        if content.trim().is_empty() {
            return Err(Error::Internal("Refusing to write an empty notification".to_string()));
        }

        let notification_id: i64 =
            sqlx::query_scalar("INSERT INTO notifications (content) VALUES (?) RETURNING id")
                .bind(content)
                .fetch_one(uow.conn()?)
                .await?;

        match addressee {
            Addressee::User(user_id) => {
                sqlx::query(
                    "INSERT INTO notification_user (notification_id, user_id) VALUES (?, ?)",
                )
                .bind(notification_id)
                .bind(user_id)
                .execute(uow.conn()?)
                .await?;
            }
            Addressee::Company(company_id) => {
                sqlx::query(
                    "INSERT INTO notification_company (notification_id, company_id) VALUES (?, ?)",
                )
                .bind(notification_id)
                .bind(company_id)
                .execute(uow.conn()?)
                .await?;
            }
        }

        tracing::debug!(
            caller = uow.caller(),
            notification_id = notification_id,
            addressee = %addressee,
            "Notification queued"
        );

        uow.record(WmpEvent::NotificationCreated {
            notification_id,
            addressee,
            content: content.to_string(),
            timestamp: Utc::now(),
        });

        Ok(notification_id)
    }
}
