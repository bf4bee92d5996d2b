use sqlx::Sqlite;
use wmp_common::api::{Actor, Role};
use wmp_common::db::{Addressee, AreaServiceAssignment, AreaServiceRequest, ServiceType};
use wmp_common::events::EntityKind;
use wmp_common::{Error, Result};

use super::{load_area, record_transition, validate_id, Workflows};
use crate::machines::area_service::{approval_message, updates_primary_company, withdrawal_message};

async fn load_request<'e, E>(executor: E, request_id: i64) -> Result<AreaServiceRequest>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, AreaServiceRequest>(
        r#"
        SELECT id, area_id, company_id, service_type, status, created_at
        FROM area_service_requests
        WHERE id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Area service request {} not found", request_id)))
}

async fn delete_request<'e, E>(executor: E, request_id: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM area_service_requests WHERE id = ?")
        .bind(request_id)
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Area service request {} not found",
            request_id
        )));
    }
    Ok(())
}

impl Workflows {
    /// Company asks to serve an area
    pub async fn request_area_service(
        &self,
        actor: &Actor,
        area_id: i64,
        service_type: ServiceType,
    ) -> Result<AreaServiceRequest> {
        let company_id = actor.require(Role::Company)?;
        validate_id(area_id, "area_id")?;

        let mut uow = self.gateway.begin("request_area_service").await?;

        load_area(uow.conn()?, area_id).await?;

        let assigned: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM area_services
            WHERE area_id = ? AND company_id = ? AND service_type = ?
            "#,
        )
        .bind(area_id)
        .bind(company_id)
        .bind(service_type.as_str())
        .fetch_one(uow.conn()?)
        .await?;
        if assigned > 0 {
            return Err(Error::Precondition(format!(
                "Company already provides {} in this area",
                service_type
            )));
        }

        let pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM area_service_requests
            WHERE area_id = ? AND company_id = ? AND service_type = ? AND status = 'pending'
            "#,
        )
        .bind(area_id)
        .bind(company_id)
        .bind(service_type.as_str())
        .fetch_one(uow.conn()?)
        .await?;
        if pending > 0 {
            return Err(Error::Precondition(
                "An identical request is already pending".to_string(),
            ));
        }

        let request_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO area_service_requests (area_id, company_id, service_type, status)
            VALUES (?, ?, ?, 'pending')
            RETURNING id
            "#,
        )
        .bind(area_id)
        .bind(company_id)
        .bind(service_type.as_str())
        .fetch_one(uow.conn()?)
        .await?;

        record_transition(&mut uow, EntityKind::AreaServiceRequest, request_id, "pending");

        let request = load_request(uow.conn()?, request_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            request_id = request_id,
            company_id = company_id,
            area_id = area_id,
            service_type = %service_type,
            "Area service requested"
        );
        Ok(request)
    }

    /// Turn a request into an active assignment
    ///
    /// Approving `waste_collection` also moves the area's primary company
    /// pointer. An assignment that already exists is left untouched.
    pub async fn approve_area_service_request(
        &self,
        actor: &Actor,
        request_id: i64,
    ) -> Result<AreaServiceAssignment> {
        actor.require(Role::Admin)?;
        validate_id(request_id, "request id")?;

        let mut uow = self.gateway.begin("approve_area_service_request").await?;

        let request = load_request(uow.conn()?, request_id).await?;
        let area = load_area(uow.conn()?, request.area_id).await?;

        delete_request(uow.conn()?, request_id).await?;

        sqlx::query(
            r#"
            INSERT INTO area_services (area_id, company_id, service_type, status)
            VALUES (?, ?, ?, 'active')
            ON CONFLICT (area_id, company_id, service_type) DO NOTHING
            "#,
        )
        .bind(request.area_id)
        .bind(request.company_id)
        .bind(request.service_type.as_str())
        .execute(uow.conn()?)
        .await?;

        if updates_primary_company(request.service_type) {
            sqlx::query("UPDATE areas SET company_id = ? WHERE id = ?")
                .bind(request.company_id)
                .bind(request.area_id)
                .execute(uow.conn()?)
                .await?;
        }

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(request.company_id),
                &approval_message(request.service_type, &area.name),
            )
            .await?;
        record_transition(&mut uow, EntityKind::AreaServiceRequest, request_id, "deleted");

        let assignment = sqlx::query_as::<_, AreaServiceAssignment>(
            r#"
            SELECT id, area_id, company_id, service_type, status, created_at
            FROM area_services
            WHERE area_id = ? AND company_id = ? AND service_type = ?
            "#,
        )
        .bind(request.area_id)
        .bind(request.company_id)
        .bind(request.service_type.as_str())
        .fetch_one(uow.conn()?)
        .await?;

        self.commit(uow).await?;

        tracing::info!(
            request_id = request_id,
            assignment_id = assignment.id,
            company_id = request.company_id,
            service_type = %request.service_type,
            "Area service approved"
        );
        Ok(assignment)
    }

    /// Drop a request without approving it
    pub async fn withdraw_area_service_request(&self, actor: &Actor, request_id: i64) -> Result<()> {
        actor.require(Role::Admin)?;
        validate_id(request_id, "request id")?;

        let mut uow = self.gateway.begin("withdraw_area_service_request").await?;

        let request = load_request(uow.conn()?, request_id).await?;
        let area = load_area(uow.conn()?, request.area_id).await?;

        delete_request(uow.conn()?, request_id).await?;

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(request.company_id),
                &withdrawal_message(request.service_type, &area.name),
            )
            .await?;
        record_transition(&mut uow, EntityKind::AreaServiceRequest, request_id, "deleted");

        self.commit(uow).await?;

        tracing::info!(request_id = request_id, company_id = request.company_id, "Area service request withdrawn");
        Ok(())
    }
}
