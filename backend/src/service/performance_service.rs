use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::pagination::Paginated;
use crate::models::performance::{
    PerformanceListQuery, PerformanceRequest, PerformanceResponse, TournamentPerformance,
};
use crate::service::common::{ensure_owned, Owned};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub(crate) const PERFORMANCE_COLUMNS: &str = "p.id, p.user_id, p.tournament_id, p.played_on, \
     p.buy_in_amount, p.rebuy_count, p.rebuy_amount, p.addon_amount, p.bounty_amount, \
     p.prize_amount, p.position, p.field_size, p.notes, p.import_fingerprint, \
     p.created_at, p.updated_at";

const LIST_FILTER: &str = r#"
    FROM tournament_performance p
    JOIN tournaments t ON t.id = p.tournament_id
    WHERE p.user_id = $1
      AND ($2::uuid IS NULL OR p.tournament_id = $2)
      AND ($3::uuid IS NULL OR t.club_id = $3)
      AND ($4::date IS NULL OR p.played_on >= $4)
      AND ($5::date IS NULL OR p.played_on <= $5)
      AND (NOT $6 OR p.prize_amount > 0)
"#;

#[derive(Clone)]
pub struct PerformanceService {
    pool: DbPool,
}

impl PerformanceService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        req: PerformanceRequest,
    ) -> Result<PerformanceResponse, ApiError> {
        req.validate()?;
        ensure_owned(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        let performance = sqlx::query_as::<_, TournamentPerformance>(&format!(
            r#"
            INSERT INTO tournament_performance AS p (
                id, user_id, tournament_id, played_on, buy_in_amount, rebuy_count,
                rebuy_amount, addon_amount, bounty_amount, prize_amount,
                position, field_size, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PERFORMANCE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.tournament_id)
        .bind(req.played_on)
        .bind(req.buy_in_amount)
        .bind(req.rebuy_count)
        .bind(req.rebuy_amount)
        .bind(req.addon_amount)
        .bind(req.bounty_amount)
        .bind(req.prize_amount)
        .bind(req.position)
        .bind(req.field_size)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await?;

        info!(
            performance_id = %performance.id,
            tournament_id = %performance.tournament_id,
            profit = %performance.profit(),
            "Tournament result recorded"
        );
        Ok(performance.into())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: PerformanceListQuery,
    ) -> Result<Paginated<PerformanceResponse>, ApiError> {
        let pagination = query.pagination();
        let itm_only = query.itm_only.unwrap_or(false);

        let rows = sqlx::query_as::<_, TournamentPerformance>(&format!(
            "SELECT {PERFORMANCE_COLUMNS} {LIST_FILTER} \
             ORDER BY p.played_on DESC, p.created_at DESC LIMIT $7 OFFSET $8"
        ))
        .bind(user_id)
        .bind(query.tournament_id)
        .bind(query.club_id)
        .bind(query.from)
        .bind(query.to)
        .bind(itm_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {LIST_FILTER}"))
            .bind(user_id)
            .bind(query.tournament_id)
            .bind(query.club_id)
            .bind(query.from)
            .bind(query.to)
            .bind(itm_only)
            .fetch_one(&self.pool)
            .await?;

        let items = rows.into_iter().map(PerformanceResponse::from).collect();
        Ok(Paginated::new(items, total, pagination))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<PerformanceResponse, ApiError> {
        sqlx::query_as::<_, TournamentPerformance>(&format!(
            "SELECT {PERFORMANCE_COLUMNS} FROM tournament_performance p WHERE p.id = $1 AND p.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map(PerformanceResponse::from)
        .map_err(|e| ApiError::from_fetch(e, "performance"))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: PerformanceRequest,
    ) -> Result<PerformanceResponse, ApiError> {
        req.validate()?;
        ensure_owned(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        sqlx::query_as::<_, TournamentPerformance>(&format!(
            r#"
            UPDATE tournament_performance AS p
            SET tournament_id = $3, played_on = $4, buy_in_amount = $5, rebuy_count = $6,
                rebuy_amount = $7, addon_amount = $8, bounty_amount = $9, prize_amount = $10,
                position = $11, field_size = $12, notes = $13, updated_at = NOW()
            WHERE p.id = $1 AND p.user_id = $2
            RETURNING {PERFORMANCE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.tournament_id)
        .bind(req.played_on)
        .bind(req.buy_in_amount)
        .bind(req.rebuy_count)
        .bind(req.rebuy_amount)
        .bind(req.addon_amount)
        .bind(req.bounty_amount)
        .bind(req.prize_amount)
        .bind(req.position)
        .bind(req.field_size)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .map(PerformanceResponse::from)
        .map_err(|e| ApiError::from_fetch(e, "performance"))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM tournament_performance WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("performance"));
        }
        info!(performance_id = %id, "Tournament result deleted");
        Ok(())
    }
}
