use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::pagination::Paginated;
use crate::models::tournament::{Tournament, TournamentListQuery, TournamentRequest};
use crate::service::common::{ensure_owned_opt, foreign_key_as_conflict, Owned};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub(crate) const TOURNAMENT_COLUMNS: &str = "id, user_id, club_id, name, game_variant, buy_in, \
     guaranteed_prize, starts_at, is_online, notes, created_at, updated_at";

const LIST_FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::uuid IS NULL OR club_id = $2)
      AND ($3::date IS NULL OR starts_at::date >= $3)
      AND ($4::date IS NULL OR starts_at::date <= $4)
"#;

#[derive(Clone)]
pub struct TournamentService {
    pool: DbPool,
}

impl TournamentService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, req: TournamentRequest) -> Result<Tournament, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Club, user_id, req.club_id).await?;

        let tournament = sqlx::query_as::<_, Tournament>(&format!(
            r#"
            INSERT INTO tournaments (
                id, user_id, club_id, name, game_variant, buy_in,
                guaranteed_prize, starts_at, is_online, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.club_id)
        .bind(req.name.trim())
        .bind(req.game_variant)
        .bind(req.buy_in)
        .bind(req.guaranteed_prize)
        .bind(req.starts_at)
        .bind(req.is_online)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await?;

        info!(
            tournament_id = %tournament.id,
            name = %tournament.name,
            buy_in = %tournament.buy_in,
            "Tournament created"
        );
        Ok(tournament)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: TournamentListQuery,
    ) -> Result<Paginated<Tournament>, ApiError> {
        let pagination = query.pagination();

        let items = sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments {LIST_FILTER} \
             ORDER BY starts_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(user_id)
        .bind(query.club_id)
        .bind(query.from)
        .bind(query.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tournaments {LIST_FILTER}"))
            .bind(user_id)
            .bind(query.club_id)
            .bind(query.from)
            .bind(query.to)
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated::new(items, total, pagination))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Tournament, ApiError> {
        sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "tournament"))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        req: TournamentRequest,
    ) -> Result<Tournament, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Club, user_id, req.club_id).await?;

        sqlx::query_as::<_, Tournament>(&format!(
            r#"
            UPDATE tournaments
            SET club_id = $3, name = $4, game_variant = $5, buy_in = $6,
                guaranteed_prize = $7, starts_at = $8, is_online = $9, notes = $10,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.club_id)
        .bind(req.name.trim())
        .bind(req.game_variant)
        .bind(req.buy_in)
        .bind(req.guaranteed_prize)
        .bind(req.starts_at)
        .bind(req.is_online)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "tournament"))
    }

    /// Performances go with the tournament; a tournament with backing offers cannot be deleted.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM tournaments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| foreign_key_as_conflict(e, "tournament has backing offers"))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("tournament"));
        }
        info!(tournament_id = %id, "Tournament deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrated_test_pool;
    use crate::models::backing::CreateOfferRequest;
    use crate::models::tournament::GameVariant;
    use crate::service::BackingService;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_tournament_with_offer_cannot_be_deleted() {
        let pool = migrated_test_pool().await;
        let tournaments = TournamentService::new(pool.clone());
        let backing = BackingService::new(pool);
        let user_id = Uuid::new_v4();

        let tournament = tournaments
            .create(
                user_id,
                TournamentRequest {
                    club_id: None,
                    name: "Main Event".to_string(),
                    game_variant: GameVariant::Nlh,
                    buy_in: dec!(1100),
                    guaranteed_prize: Some(dec!(100000)),
                    starts_at: Utc::now(),
                    is_online: false,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let offer = backing
            .create_offer(
                user_id,
                CreateOfferRequest {
                    tournament_id: tournament.id,
                    buy_in_amount: None,
                    percentage_offered: dec!(40),
                    markup: dec!(1.2),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let blocked = tournaments.delete(user_id, tournament.id).await;
        assert!(matches!(blocked, Err(ApiError::Conflict(_))));

        backing.delete_offer(user_id, offer.offer.id).await.unwrap();
        tournaments.delete(user_id, tournament.id).await.unwrap();
        assert!(matches!(tournaments.delete(user_id, tournament.id).await, Err(ApiError::NotFound(_))));
    }
}
