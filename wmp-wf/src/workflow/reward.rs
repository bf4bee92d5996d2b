use sqlx::Sqlite;
use wmp_common::api::{Actor, Role};
use wmp_common::db::{Addressee, ConversionStatus, RewardConversion};
use wmp_common::events::EntityKind;
use wmp_common::{Error, Result};

use super::{ensure_updated, record_transition, validate_id, Workflows};
use crate::machines::reward::{check_cancel, check_mark_seen, decide, equivalent_amount, Decision};

const SELECT_CONVERSION: &str = r#"
    SELECT id, user_id, points_requested, equivalent_amount, status, is_seen, created_at
    FROM reward_conversions
"#;

async fn load_conversion<'e, E>(executor: E, conversion_id: i64) -> Result<RewardConversion>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RewardConversion>(&format!("{} WHERE id = ?", SELECT_CONVERSION))
        .bind(conversion_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Conversion {} not found", conversion_id)))
}

async fn user_points<'e, E>(executor: E, user_id: i64) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, i64>("SELECT points FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))
}

fn ensure_owner(conversion: &RewardConversion, user_id: i64) -> Result<()> {
    if conversion.user_id != user_id {
        return Err(Error::Authorization(format!(
            "Conversion {} belongs to another user",
            conversion.id
        )));
    }
    Ok(())
}

/// The partial unique index is the last line against a second pending row
fn insert_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Precondition("A pending conversion already exists".to_string());
        }
    }
    Error::Persistence(err)
}

impl Workflows {
    /// A user's conversions, newest first
    pub async fn list_conversions(&self, actor: &Actor) -> Result<Vec<RewardConversion>> {
        let user_id = actor.require(Role::User)?;

        let conversions = sqlx::query_as::<_, RewardConversion>(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            SELECT_CONVERSION
        ))
        .bind(user_id)
        .fetch_all(self.gateway.pool())
        .await?;

        Ok(conversions)
    }

    /// Request converting points to currency
    ///
    /// The balance is only checked here; it is debited on approval.
    pub async fn create_conversion(&self, actor: &Actor, points: i64) -> Result<RewardConversion> {
        let user_id = actor.require(Role::User)?;
        if points <= 0 {
            return Err(Error::Validation("points must be greater than zero".to_string()));
        }

        let mut uow = self.gateway.begin("create_conversion").await?;

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reward_conversions WHERE user_id = ? AND status = ?",
        )
        .bind(user_id)
        .bind(ConversionStatus::Pending.as_str())
        .fetch_one(uow.conn()?)
        .await?;
        if pending > 0 {
            tracing::warn!(user_id = user_id, "Conversion refused, one is already pending");
            return Err(Error::Precondition(
                "A pending conversion already exists".to_string(),
            ));
        }

        let balance = user_points(uow.conn()?, user_id).await?;
        if points > balance {
            tracing::warn!(user_id = user_id, points = points, balance = balance, "Conversion refused, insufficient points");
            return Err(Error::Precondition(format!(
                "Insufficient points: requested {}, available {}",
                points, balance
            )));
        }

        let amount = equivalent_amount(points, self.settings.points_per_currency_unit);

        let conversion_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reward_conversions (user_id, points_requested, equivalent_amount, status)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(points)
        .bind(amount)
        .bind(ConversionStatus::Pending.as_str())
        .fetch_one(uow.conn()?)
        .await
        .map_err(insert_error)?;

        record_transition(&mut uow, EntityKind::RewardConversion, conversion_id, ConversionStatus::Pending);

        let conversion = load_conversion(uow.conn()?, conversion_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            conversion_id = conversion_id,
            user_id = user_id,
            points = points,
            amount = amount,
            "Conversion requested"
        );
        Ok(conversion)
    }

    /// Approve a pending conversion and debit the user's balance
    pub async fn approve_conversion(&self, actor: &Actor, conversion_id: i64) -> Result<RewardConversion> {
        self.decide_conversion(actor, conversion_id, Decision::Approve).await
    }

    /// Reject a pending conversion; the balance is untouched
    pub async fn reject_conversion(&self, actor: &Actor, conversion_id: i64) -> Result<RewardConversion> {
        self.decide_conversion(actor, conversion_id, Decision::Reject).await
    }

    async fn decide_conversion(
        &self,
        actor: &Actor,
        conversion_id: i64,
        decision: Decision,
    ) -> Result<RewardConversion> {
        actor.require(Role::Admin)?;
        validate_id(conversion_id, "conversion id")?;

        let mut uow = self.gateway.begin("decide_conversion").await?;

        let conversion = load_conversion(uow.conn()?, conversion_id).await?;
        let next = decide(conversion.status, decision)?;

        if decision == Decision::Approve {
            let balance = user_points(uow.conn()?, conversion.user_id).await?;
            if balance < conversion.points_requested {
                tracing::warn!(
                    conversion_id = conversion_id,
                    balance = balance,
                    requested = conversion.points_requested,
                    "Approval refused, balance fell below request"
                );
                return Err(Error::Precondition(format!(
                    "User balance {} is below the requested {} points",
                    balance, conversion.points_requested
                )));
            }
        }

        let result = sqlx::query(
            "UPDATE reward_conversions SET status = ?, is_seen = 0 WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(conversion_id)
        .bind(conversion.status.as_str())
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Conversion")?;

        let content = match decision {
            Decision::Approve => {
                let debit = sqlx::query(
                    "UPDATE users SET points = points - ? WHERE id = ? AND points >= ?",
                )
                .bind(conversion.points_requested)
                .bind(conversion.user_id)
                .bind(conversion.points_requested)
                .execute(uow.conn()?)
                .await?;
                ensure_updated(debit.rows_affected(), "User balance")?;

                format!(
                    "Your conversion of {} points ({:.2}) has been approved",
                    conversion.points_requested, conversion.equivalent_amount
                )
            }
            Decision::Reject => format!(
                "Your conversion of {} points has been rejected",
                conversion.points_requested
            ),
        };

        self.sink
            .notify(&mut uow, Addressee::User(conversion.user_id), &content)
            .await?;
        record_transition(&mut uow, EntityKind::RewardConversion, conversion_id, next);

        let updated = load_conversion(uow.conn()?, conversion_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            conversion_id = conversion_id,
            user_id = conversion.user_id,
            status = %next,
            "Conversion decided"
        );
        Ok(updated)
    }

    /// Owner withdraws a pending conversion; the row is deleted
    pub async fn cancel_conversion(&self, actor: &Actor, conversion_id: i64) -> Result<()> {
        let user_id = actor.require(Role::User)?;
        validate_id(conversion_id, "conversion id")?;

        let mut uow = self.gateway.begin("cancel_conversion").await?;

        let conversion = load_conversion(uow.conn()?, conversion_id).await?;
        ensure_owner(&conversion, user_id)?;
        check_cancel(conversion.status)?;

        let result = sqlx::query("DELETE FROM reward_conversions WHERE id = ? AND status = ?")
            .bind(conversion_id)
            .bind(ConversionStatus::Pending.as_str())
            .execute(uow.conn()?)
            .await?;
        ensure_updated(result.rows_affected(), "Conversion")?;

        record_transition(&mut uow, EntityKind::RewardConversion, conversion_id, "deleted");
        self.commit(uow).await?;

        tracing::info!(conversion_id = conversion_id, user_id = user_id, "Conversion cancelled");
        Ok(())
    }

    /// Owner acknowledges a decided conversion, once
    pub async fn mark_conversion_seen(
        &self,
        actor: &Actor,
        conversion_id: i64,
    ) -> Result<RewardConversion> {
        let user_id = actor.require(Role::User)?;
        validate_id(conversion_id, "conversion id")?;

        let mut uow = self.gateway.begin("mark_conversion_seen").await?;

        let conversion = load_conversion(uow.conn()?, conversion_id).await?;
        ensure_owner(&conversion, user_id)?;
        check_mark_seen(conversion.status, conversion.is_seen)?;

        let result = sqlx::query(
            "UPDATE reward_conversions SET is_seen = 1 WHERE id = ? AND is_seen = 0 AND status = ?",
        )
        .bind(conversion_id)
        .bind(conversion.status.as_str())
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Conversion")?;

        let updated = load_conversion(uow.conn()?, conversion_id).await?;
        self.commit(uow).await?;

        tracing::debug!(conversion_id = conversion_id, "Conversion marked seen");
        Ok(updated)
    }
}
