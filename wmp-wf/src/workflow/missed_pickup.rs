use sqlx::Sqlite;
use wmp_common::api::{Actor, Role};
use wmp_common::db::{Addressee, MissedPickupReport, MissedPickupStatus, ServiceType};
use wmp_common::events::EntityKind;
use wmp_common::{Error, Result};

use super::{ensure_updated, record_transition, service_company, validate_id, Workflows};
use crate::classifier::{ClassifierTask, Verdict};
use crate::images::ImageUpload;
use crate::machines::missed_pickup::{acknowledge, Side};

async fn load_report<'e, E>(executor: E, report_id: i64) -> Result<MissedPickupReport>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, MissedPickupReport>(
        r#"
        SELECT id, user_id, area_id, company_id, status, unclean_image_ref,
               clean_image_ref, created_at
        FROM missed_pickups
        WHERE id = ?
        "#,
    )
    .bind(report_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Missed pickup {} not found", report_id)))
}

/// Side the actor acknowledges for
///
/// A report the actor is not a party to is reported as missing.
fn side_for(actor: &Actor, report: &MissedPickupReport) -> Result<Side> {
    match actor.role {
        Role::User if actor.id == report.user_id => Ok(Side::User),
        Role::Company if Some(actor.id) == report.company_id => Ok(Side::Company),
        Role::Admin => Err(Error::Authorization(
            "Only the reporting user or the assigned company can acknowledge".to_string(),
        )),
        _ => Err(Error::NotFound(format!("Missed pickup {} not found", report.id))),
    }
}

impl Workflows {
    /// Report a missed pickup, gated on an unclean verdict
    pub async fn create_missed_pickup(
        &self,
        actor: &Actor,
        area_id: i64,
        image: ImageUpload,
    ) -> Result<MissedPickupReport> {
        let user_id = actor.require(Role::User)?;
        validate_id(area_id, "area_id")?;

        let area = self.load_area(area_id).await?;
        let company_id = match service_company(self.gateway.pool(), area.id, ServiceType::WasteCollection)
            .await?
            .or(area.company_id)
        {
            Some(company_id) => company_id,
            None => {
                tracing::warn!(area_id = area_id, "No waste collection company for area");
                return Err(Error::Precondition(format!(
                    "No company assigned for waste collection in area {}",
                    area.name
                )));
            }
        };

        match self.classify_image(ClassifierTask::Cleanliness, &image).await? {
            Verdict::UNCLEAN => {}
            Verdict::CLEAN => {
                tracing::warn!(user_id = user_id, area_id = area_id, "Missed pickup rejected, image is clean");
                return Err(Error::Precondition(
                    "Image does not show uncollected waste".to_string(),
                ));
            }
            other => {
                return Err(Error::ExternalService(format!(
                    "Unexpected cleanliness verdict {}",
                    other
                )))
            }
        }

        let image_ref = self.images.put(&image).await?;

        let mut uow = self.gateway.begin("create_missed_pickup").await?;

        let report_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO missed_pickups (user_id, area_id, company_id, status, unclean_image_ref)
            VALUES (?, ?, ?, 'pending', ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(area_id)
        .bind(company_id)
        .bind(&image_ref)
        .fetch_one(uow.conn()?)
        .await?;

        self.sink
            .notify(
                &mut uow,
                Addressee::Company(company_id),
                &format!("New missed pickup reported in {} (report #{})", area.name, report_id),
            )
            .await?;
        record_transition(&mut uow, EntityKind::MissedPickup, report_id, MissedPickupStatus::Pending);

        let report = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            report_id = report_id,
            user_id = user_id,
            company_id = company_id,
            "Missed pickup reported"
        );
        Ok(report)
    }

    /// Record one side's completion acknowledgement
    ///
    /// The company must supply an after image with a clean verdict; the
    /// user's acknowledgement takes none.
    pub async fn acknowledge_missed_pickup(
        &self,
        actor: &Actor,
        report_id: i64,
        after_image: Option<ImageUpload>,
    ) -> Result<MissedPickupReport> {
        validate_id(report_id, "report id")?;
        if actor.role == Role::Company && after_image.is_none() {
            return Err(Error::Validation(
                "An after image is required to mark the pickup completed".to_string(),
            ));
        }

        // Fail fast before the classifier is called
        let current = load_report(self.gateway.pool(), report_id).await?;
        let side = side_for(actor, &current)?;
        acknowledge(current.status, side)?;

        let clean_image_ref = match (side, after_image) {
            (Side::Company, Some(image)) => {
                match self.classify_image(ClassifierTask::Cleanliness, &image).await? {
                    Verdict::CLEAN => {}
                    Verdict::UNCLEAN => {
                        tracing::warn!(report_id = report_id, "Completion rejected, site still unclean");
                        return Err(Error::Precondition(
                            "After image still shows uncollected waste".to_string(),
                        ));
                    }
                    other => {
                        return Err(Error::ExternalService(format!(
                            "Unexpected cleanliness verdict {}",
                            other
                        )))
                    }
                }
                Some(self.images.put(&image).await?)
            }
            _ => None,
        };

        let mut uow = self.gateway.begin("acknowledge_missed_pickup").await?;

        let report = load_report(uow.conn()?, report_id).await?;
        let next = acknowledge(report.status, side)?;

        let result = sqlx::query(
            r#"
            UPDATE missed_pickups
            SET status = ?, clean_image_ref = COALESCE(?, clean_image_ref)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(&clean_image_ref)
        .bind(report_id)
        .bind(report.status.as_str())
        .execute(uow.conn()?)
        .await?;
        ensure_updated(result.rows_affected(), "Missed pickup")?;

        if next == MissedPickupStatus::Completed {
            let content = format!("Missed pickup #{} is completed", report_id);
            self.sink
                .notify(&mut uow, Addressee::User(report.user_id), &content)
                .await?;
            if let Some(company_id) = report.company_id {
                self.sink
                    .notify(&mut uow, Addressee::Company(company_id), &content)
                    .await?;
            }
        } else {
            match side {
                Side::Company => {
                    self.sink
                        .notify(
                            &mut uow,
                            Addressee::User(report.user_id),
                            &format!(
                                "The company marked missed pickup #{} as collected, please confirm",
                                report_id
                            ),
                        )
                        .await?;
                }
                Side::User => {
                    if let Some(company_id) = report.company_id {
                        self.sink
                            .notify(
                                &mut uow,
                                Addressee::Company(company_id),
                                &format!(
                                    "The user marked missed pickup #{} as collected",
                                    report_id
                                ),
                            )
                            .await?;
                    }
                }
            }
        }
        record_transition(&mut uow, EntityKind::MissedPickup, report_id, next);

        let updated = load_report(uow.conn()?, report_id).await?;
        self.commit(uow).await?;

        tracing::info!(
            report_id = report_id,
            side = %side,
            status = %next,
            "Missed pickup acknowledged"
        );
        Ok(updated)
    }
}
