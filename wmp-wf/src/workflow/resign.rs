use sqlx::Sqlite;
use wmp_common::api::{Actor, Role};
use wmp_common::db::{Addressee, ResignRequest};
use wmp_common::events::EntityKind;
use wmp_common::{Error, Result};

use super::{record_transition, validate_id, Workflows};
use crate::machines::resign::{ResignDecision, RESIGNATION_AGREEMENT};

async fn load_request<'e, E>(executor: E, request_id: i64) -> Result<ResignRequest>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ResignRequest>(
        "SELECT id, company_id, status, reason, created_at FROM resign_requests WHERE id = ?",
    )
    .bind(request_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Resign request {} not found", request_id)))
}

impl Workflows {
    /// Company asks to end its agreement
    pub async fn request_resign(&self, actor: &Actor, reason: Option<String>) -> Result<ResignRequest> {
        let company_id = actor.require(Role::Company)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let mut uow = self.gateway.begin("request_resign").await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE id = ?")
            .bind(company_id)
            .fetch_one(uow.conn()?)
            .await?;
        if known == 0 {
            return Err(Error::NotFound(format!("Company {} not found", company_id)));
        }

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resign_requests WHERE company_id = ? AND status = 'pending'",
        )
        .bind(company_id)
        .fetch_one(uow.conn()?)
        .await?;
        if pending > 0 {
            return Err(Error::Precondition(
                "A resign request is already pending".to_string(),
            ));
        }

        let request_id: i64 = sqlx::query_scalar(
            "INSERT INTO resign_requests (company_id, status, reason) VALUES (?, 'pending', ?) RETURNING id",
        )
        .bind(company_id)
        .bind(&reason)
        .fetch_one(uow.conn()?)
        .await?;

        record_transition(&mut uow, EntityKind::ResignRequest, request_id, "pending");

        let request = load_request(uow.conn()?, request_id).await?;
        self.commit(uow).await?;

        tracing::info!(request_id = request_id, company_id = company_id, "Resign request submitted");
        Ok(request)
    }

    /// Approve or reject a resign request
    ///
    /// Approval records a resignation agreement. Both outcomes notify the
    /// company and consume the request row.
    pub async fn decide_resign(
        &self,
        actor: &Actor,
        request_id: i64,
        decision: &str,
    ) -> Result<ResignDecision> {
        actor.require(Role::Admin)?;
        validate_id(request_id, "request id")?;
        let decision: ResignDecision = decision.parse()?;

        let mut uow = self.gateway.begin("decide_resign").await?;

        let request = load_request(uow.conn()?, request_id).await?;

        let content = match decision {
            ResignDecision::Approved => {
                sqlx::query("INSERT INTO agreements (company_id, kind) VALUES (?, ?)")
                    .bind(request.company_id)
                    .bind(RESIGNATION_AGREEMENT)
                    .execute(uow.conn()?)
                    .await?;
                "Your resignation request has been approved"
            }
            ResignDecision::Rejected => "Your resignation request has been rejected",
        };

        self.sink
            .notify(&mut uow, Addressee::Company(request.company_id), content)
            .await?;

        let result = sqlx::query("DELETE FROM resign_requests WHERE id = ?")
            .bind(request_id)
            .execute(uow.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Resign request {} not found", request_id)));
        }
        record_transition(&mut uow, EntityKind::ResignRequest, request_id, "deleted");

        self.commit(uow).await?;

        tracing::info!(
            request_id = request_id,
            company_id = request.company_id,
            decision = decision.as_str(),
            "Resign request decided"
        );
        Ok(decision)
    }
}
