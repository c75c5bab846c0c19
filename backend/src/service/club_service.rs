use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::club::{Club, ClubListQuery, ClubRequest};
use crate::models::pagination::Paginated;
use crate::service::common::unique_violation_as_conflict;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const CLUB_COLUMNS: &str = "id, user_id, name, city, website, notes, created_at, updated_at";

#[derive(Clone)]
pub struct ClubService {
    pool: DbPool,
}

impl ClubService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, req: ClubRequest) -> Result<Club, ApiError> {
        req.validate()?;

        let club = sqlx::query_as::<_, Club>(&format!(
            r#"
            INSERT INTO clubs (id, user_id, name, city, website, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CLUB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.name.trim())
        .bind(&req.city)
        .bind(&req.website)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation_as_conflict(e, "a club with this name already exists"))?;

        info!(club_id = %club.id, name = %club.name, "Club created");
        Ok(club)
    }

    pub async fn list(&self, user_id: Uuid, query: ClubListQuery) -> Result<Paginated<Club>, ApiError> {
        let pagination = query.pagination();
        let search = query.search.as_deref().map(|s| format!("%{}%", s.trim()));

        let items = sqlx::query_as::<_, Club>(&format!(
            r#"
            SELECT {CLUB_COLUMNS}
            FROM clubs
            WHERE user_id = $1 AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY name
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clubs WHERE user_id = $1 AND ($2::text IS NULL OR name ILIKE $2)",
        )
        .bind(user_id)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        Ok(Paginated::new(items, total, pagination))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Club, ApiError> {
        sqlx::query_as::<_, Club>(&format!(
            "SELECT {CLUB_COLUMNS} FROM clubs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "club"))
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, req: ClubRequest) -> Result<Club, ApiError> {
        req.validate()?;

        sqlx::query_as::<_, Club>(&format!(
            r#"
            UPDATE clubs
            SET name = $3, city = $4, website = $5, notes = $6, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CLUB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.name.trim())
        .bind(&req.city)
        .bind(&req.website)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => ApiError::not_found("club"),
            other => unique_violation_as_conflict(other, "a club with this name already exists"),
        })
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tournaments WHERE club_id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if in_use {
            warn!(club_id = %id, "Refusing to delete club with tournaments");
            return Err(ApiError::conflict("club still has tournaments"));
        }

        let result = sqlx::query("DELETE FROM clubs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("club"));
        }
        info!(club_id = %id, "Club deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrated_test_pool;

    fn club(name: &str) -> ClubRequest {
        ClubRequest {
            name: name.to_string(),
            city: Some("São Paulo".to_string()),
            website: None,
            notes: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_club_with_tournaments_cannot_be_deleted() {
        let pool = migrated_test_pool().await;
        let service = ClubService::new(pool.clone());
        let user_id = Uuid::new_v4();

        let h2 = service.create(user_id, club("H2 Club")).await.unwrap();
        let duplicate = service.create(user_id, club("H2 Club")).await;
        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

        sqlx::query(
            "INSERT INTO tournaments (id, user_id, club_id, name, buy_in, starts_at) \
             VALUES ($1, $2, $3, 'Daily Turbo', 55, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(h2.id)
        .execute(&pool)
        .await
        .unwrap();

        let blocked = service.delete(user_id, h2.id).await;
        assert!(matches!(blocked, Err(ApiError::Conflict(_))));

        let empty = service.create(user_id, club("Empty Room")).await.unwrap();
        service.delete(user_id, empty.id).await.unwrap();
        assert!(matches!(service.get(user_id, empty.id).await, Err(ApiError::NotFound(_))));
    }
}
