use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::schedule::{ScheduleEvent, ScheduleEventRequest, ScheduleListQuery};
use crate::service::common::{ensure_owned_opt, Owned};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

const EVENT_COLUMNS: &str =
    "id, user_id, tournament_id, title, starts_at, ends_at, notes, created_at, updated_at";

#[derive(Clone)]
pub struct ScheduleService {
    pool: DbPool,
}

impl ScheduleService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, req: ScheduleEventRequest) -> Result<ScheduleEvent, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        let event = sqlx::query_as::<_, ScheduleEvent>(&format!(
            r#"
            INSERT INTO schedule_events (id, user_id, tournament_id, title, starts_at, ends_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.tournament_id)
        .bind(req.title.trim())
        .bind(req.starts_at)
        .bind(req.ends_at)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await?;

        info!(event_id = %event.id, starts_at = %event.starts_at, "Schedule event created");
        Ok(event)
    }

    /// Without an explicit range, lists events starting from now.
    pub async fn list(&self, user_id: Uuid, query: ScheduleListQuery) -> Result<Vec<ScheduleEvent>, ApiError> {
        let from = query.from.or_else(|| query.to.is_none().then(Utc::now));

        let events = sqlx::query_as::<_, ScheduleEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM schedule_events
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR starts_at >= $2)
              AND ($3::timestamptz IS NULL OR starts_at <= $3)
            ORDER BY starts_at
            LIMIT $4
            "#
        ))
        .bind(user_id)
        .bind(from)
        .bind(query.to)
        .bind(query.limit())
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<ScheduleEvent, ApiError> {
        sqlx::query_as::<_, ScheduleEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM schedule_events WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "schedule event"))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: ScheduleEventRequest,
    ) -> Result<ScheduleEvent, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        sqlx::query_as::<_, ScheduleEvent>(&format!(
            r#"
            UPDATE schedule_events
            SET tournament_id = $3, title = $4, starts_at = $5, ends_at = $6, notes = $7,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.tournament_id)
        .bind(req.title.trim())
        .bind(req.starts_at)
        .bind(req.ends_at)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "schedule event"))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM schedule_events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("schedule event"));
        }
        Ok(())
    }
}
