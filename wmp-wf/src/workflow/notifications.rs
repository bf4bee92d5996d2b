use wmp_common::api::Actor;
use wmp_common::db::{Addressee, Notification};
use wmp_common::{Error, Result};

use super::{ensure_updated, validate_id, Workflows};

/// Join that restricts notifications to one addressee
fn inbox_join(addressee: Addressee) -> (&'static str, i64) {
    match addressee {
        Addressee::User(id) => (
            "JOIN notification_user link ON link.notification_id = n.id AND link.user_id = ?",
            id,
        ),
        Addressee::Company(id) => (
            "JOIN notification_company link ON link.notification_id = n.id AND link.company_id = ?",
            id,
        ),
    }
}

impl Workflows {
    /// The caller's notifications, newest first
    pub async fn list_notifications(&self, actor: &Actor) -> Result<Vec<Notification>> {
        let (join, owner_id) = inbox_join(actor.addressee()?);

        let sql = format!(
            "SELECT n.id, n.content, n.is_read, n.created_at FROM notifications n {} \
             ORDER BY n.created_at DESC, n.id DESC",
            join
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(owner_id)
            .fetch_all(self.gateway.pool())
            .await?;

        Ok(notifications)
    }

    /// Mark one of the caller's notifications as read
    ///
    /// Notifications addressed to someone else are reported as missing.
    pub async fn mark_notification_read(
        &self,
        actor: &Actor,
        notification_id: i64,
    ) -> Result<Notification> {
        let (join, owner_id) = inbox_join(actor.addressee()?);
        validate_id(notification_id, "notification id")?;

        let sql = format!(
            "SELECT n.id, n.content, n.is_read, n.created_at FROM notifications n {} WHERE n.id = ?",
            join
        );

        let mut uow = self.gateway.begin("mark_notification_read").await?;

        let notification = sqlx::query_as::<_, Notification>(&sql)
            .bind(owner_id)
            .bind(notification_id)
            .fetch_optional(uow.conn()?)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Notification {} not found", notification_id)))?;

        if !notification.is_read {
            let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
                .bind(notification_id)
                .execute(uow.conn()?)
                .await?;
            ensure_updated(result.rows_affected(), "Notification")?;
        }

        self.commit(uow).await?;

        Ok(Notification {
            is_read: true,
            ..notification
        })
    }
}
