use sqlx::Sqlite;
use wmp_common::api::{Actor, Role};
use wmp_common::db::{Addressee, ManholeReport, ManholeReportType, ServiceType};
use wmp_common::events::EntityKind;
use wmp_common::{Error, Result};

use super::{ensure_updated, record_transition, service_company, validate_id, Workflows};
use crate::classifier::{ClassifierTask, Verdict};
use crate::images::ImageUpload;
use crate::machines::manhole::{apply, initial, ManholeAction};

async fn load_report<'e, E>(executor: E, report_id: i64) -> Result<ManholeReport>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ManholeReport>(
        r#"
        SELECT id, user_id, area_id, company_id, report_type, status,
               before_image_ref, after_image_ref, created_at, assigned_at, resolved_at
        FROM manhole_reports
        WHERE id = ?
        "#,
    )
    .bind(report_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Manhole report {} not found", report_id)))
}

fn ensure_reporter(report: &ManholeReport, user_id: i64) -> Result<()> {
    if report.user_id != user_id {
        return Err(Error::Authorization(format!(
            "Manhole report {} belongs to another user",
            report.id
        )));
    }
    Ok(())
}

/// Company a status change notifies; every report past `pending` has one
fn assigned_company(report: &ManholeReport) -> Result<i64> {
    report.company_id.ok_or_else(|| {
        Error::Internal(format!("Manhole report {} has no assigned company", report.id))
    })
}

impl Workflows {
    /// Report a manhole problem, gated on an issue verdict
    ///
    /// The report is assigned straight away when the area has a manhole
    /// management company, otherwise it waits as `pending` for an admin.
    pub async fn create_manhole_report(
        &self,
        actor: &Actor,
        area_id: i64,
        report_type: &str,
        image: ImageUpload,
    ) -> Result<ManholeReport> {
        let user_id = actor.require(Role::User)?;
        validate_id(area_id, "area_id")?;
        let report_type: ManholeReportType = report_type.parse()?;

        let area = self.load_area(area_id).await?;

        let verdict = self.classify_image(ClassifierTask::ManholeIssue, &image).await?;
        if verdict == Verdict::NO_ISSUE {
            tracing::warn!(user_id = user_id, area_id = area_id, "Manhole report rejected, no issue detected");
            return Err(Error::Precondition(
                "No manhole issue detected in the image".to_string(),
            ));
        }

        let company_id =
            service_company(self.gateway.pool(), area.id, ServiceType::ManholeManagement).await?;
        let status = initial(company_id);

        let image_ref = self.images.put(&image).await?;

        let mut uow = self.gateway.begin("create_manhole_report").await?;

        let report_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO manhole_reports
                (user_id, area_id, company_id, report_type, status, before_image_ref, assigned_at)
            VALUES (?, ?, ?, ?, ?, ?, CASE WHEN ? IS NULL THEN NULL ELSE CURRENT_TIMESTAMP END)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(area_id)
        .bind(company_id)
        .bind(report_type.as_str())
        .bind(status.as_str())
        .bind(&image_ref)
        .bind(company_id)
        .fetch_one(uow.conn()?)
        .await?;

        if let Some(company_id) = company_id {
            self.sink
                .notify(
                    &mut uow,
                    Addressee::Company(company_id),
                    &format!(
                        "New {} manhole reported in {} (report #{})",
                        report_type.as_str(),
                        area.name,
                        report_id
                    ),
                )
                .await?;
        }
        record_transition(&mut uow, EntityKind::ManholeReport, report_id, status);

        let report = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            report_id = report_id,
            user_id = user_id,
            status = %status,
            "Manhole report created"
        );
        Ok(report)
    }

    /// Hand a pending report to a company serving the area
    pub async fn assign_manhole_report(
        &self,
        actor: &Actor,
        report_id: i64,
        company_id: i64,
    ) -> Result<ManholeReport> {
        actor.require(Role::Admin)?;
        validate_id(report_id, "report id")?;
        validate_id(company_id, "company_id")?;

        let mut uow = self.gateway.begin("assign_manhole_report").await?;

        let report = load_report(uow.conn()?, report_id).await?;
        let next = apply(report.status, ManholeAction::Assign)?;

        let serves_area: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM area_services
            WHERE area_id = ? AND company_id = ? AND service_type = ? AND status = 'active'
            "#,
        )
        .bind(report.area_id)
        .bind(company_id)
        .bind(ServiceType::ManholeManagement.as_str())
        .fetch_one(uow.conn()?)
        .await?;
        if serves_area == 0 {
            tracing::warn!(report_id = report_id, company_id = company_id, "Company does not manage manholes in area");
            return Err(Error::Precondition(format!(
                "Company {} does not manage manholes in this area",
                company_id
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE manhole_reports
            SET status = ?, company_id = ?, assigned_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(company_id)
        .bind(report_id)
        .bind(report.status.as_str())
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Manhole report")?;

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(company_id),
                &format!("Manhole report #{} has been assigned to you", report_id),
            )
            .await?;
        record_transition(&mut uow, EntityKind::ManholeReport, report_id, next);

        let updated = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(report_id = report_id, company_id = company_id, "Manhole report assigned");
        Ok(updated)
    }

    /// Company submits proof of repair; only a fixed verdict is accepted
    pub async fn resolve_manhole_report(
        &self,
        actor: &Actor,
        report_id: i64,
        after_image: ImageUpload,
    ) -> Result<ManholeReport> {
        let company_id = actor.require(Role::Company)?;
        validate_id(report_id, "report id")?;

        let current = load_report(self.gateway.pool(), report_id).await?;
        if current.company_id != Some(company_id) {
            return Err(Error::Authorization(format!(
                "Manhole report {} is not assigned to company {}",
                report_id, company_id
            )));
        }
        apply(current.status, ManholeAction::Resolve)?;

        let verdict = self.classify_image(ClassifierTask::ManholeFixed, &after_image).await?;
        if verdict != Verdict::FIXED {
            tracing::warn!(report_id = report_id, verdict = verdict.0, "Resolution rejected, manhole not fixed");
            return Err(Error::Precondition(
                "The after image does not show a fixed manhole".to_string(),
            ));
        }

        let image_ref = self.images.put(&after_image).await?;

        let mut uow = self.gateway.begin("resolve_manhole_report").await?;

        let report = load_report(uow.conn()?, report_id).await?;
        let next = apply(report.status, ManholeAction::Resolve)?;

        let result = sqlx::query(
            r#"
            UPDATE manhole_reports
            SET status = ?, after_image_ref = ?, resolved_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = ? AND company_id = ?
            "#,
        )
        .bind(next.as_str())
        .bind(&image_ref)
        .bind(report_id)
        .bind(report.status.as_str())
        .bind(company_id)
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Manhole report")?;

        sqlx::query("UPDATE companies SET resolved_manholes = resolved_manholes + 1 WHERE id = ?")
            .bind(company_id)
            .execute(uow.conn()?)
            .await?;

        self.sink
            .notify(
                &mut uow,
                Addressee::User(report.user_id),
                &format!(
                    "Manhole report #{} has been resolved, please confirm the fix",
                    report_id
                ),
            )
            .await?;
        record_transition(&mut uow, EntityKind::ManholeReport, report_id, next);

        let updated = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(report_id = report_id, company_id = company_id, "Manhole report resolved");
        Ok(updated)
    }

    /// Reporter accepts the resolution
    pub async fn confirm_manhole_report(&self, actor: &Actor, report_id: i64) -> Result<ManholeReport> {
        let user_id = actor.require(Role::User)?;
        validate_id(report_id, "report id")?;

        let mut uow = self.gateway.begin("confirm_manhole_report").await?;

        let report = load_report(uow.conn()?, report_id).await?;
        ensure_reporter(&report, user_id)?;
        let next = apply(report.status, ManholeAction::Confirm)?;
        let company_id = assigned_company(&report)?;

        let result = sqlx::query("UPDATE manhole_reports SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(report_id)
            .bind(report.status.as_str())
            .execute(uow.conn()?)
            .await?;
        ensure_updated(result.rows_affected(), "Manhole report")?;

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(company_id),
                &format!("The reporter confirmed your fix for manhole report #{}", report_id),
            )
            .await?;
        record_transition(&mut uow, EntityKind::ManholeReport, report_id, next);

        let updated = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(report_id = report_id, "Manhole report confirmed");
        Ok(updated)
    }

    /// Reporter disputes the resolution, sending the report back to the company
    ///
    /// The company's resolved counter is left as is.
    pub async fn reject_manhole_resolution(
        &self,
        actor: &Actor,
        report_id: i64,
    ) -> Result<ManholeReport> {
        let user_id = actor.require(Role::User)?;
        validate_id(report_id, "report id")?;

        let mut uow = self.gateway.begin("reject_manhole_resolution").await?;

        let report = load_report(uow.conn()?, report_id).await?;
        ensure_reporter(&report, user_id)?;
        let next = apply(report.status, ManholeAction::RejectResolution)?;
        let company_id = assigned_company(&report)?;

        let result = sqlx::query(
            r#"
            UPDATE manhole_reports
            SET status = ?, after_image_ref = NULL, resolved_at = NULL
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(report_id)
        .bind(report.status.as_str())
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Manhole report")?;

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(company_id),
                &format!(
                    "The reporter rejected your fix for manhole report #{}, please revisit",
                    report_id
                ),
            )
            .await?;
        record_transition(&mut uow, EntityKind::ManholeReport, report_id, next);

        let updated = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(report_id = report_id, "Manhole resolution rejected");
        Ok(updated)
    }
}
