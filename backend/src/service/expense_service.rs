use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::expense::{Expense, ExpenseListQuery, ExpenseRequest};
use crate::models::pagination::Paginated;
use crate::service::common::{ensure_owned_opt, Owned};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

const EXPENSE_COLUMNS: &str =
    "id, user_id, category, amount, description, spent_on, tournament_id, created_at, updated_at";

const LIST_FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::expense_category IS NULL OR category = $2)
      AND ($3::date IS NULL OR spent_on >= $3)
      AND ($4::date IS NULL OR spent_on <= $4)
"#;

#[derive(Clone)]
pub struct ExpenseService {
    pool: DbPool,
}

impl ExpenseService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, req: ExpenseRequest) -> Result<Expense, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (id, user_id, category, amount, description, spent_on, tournament_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.category)
        .bind(req.amount)
        .bind(req.description.trim())
        .bind(req.spent_on)
        .bind(req.tournament_id)
        .fetch_one(&self.pool)
        .await?;

        info!(expense_id = %expense.id, category = %expense.category, amount = %expense.amount, "Expense recorded");
        Ok(expense)
    }

    pub async fn list(&self, user_id: Uuid, query: ExpenseListQuery) -> Result<Paginated<Expense>, ApiError> {
        let pagination = query.pagination();

        let items = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses {LIST_FILTER} \
             ORDER BY spent_on DESC, created_at DESC LIMIT $5 OFFSET $6"
        ))
        .bind(user_id)
        .bind(query.category)
        .bind(query.from)
        .bind(query.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM expenses {LIST_FILTER}"))
            .bind(user_id)
            .bind(query.category)
            .bind(query.from)
            .bind(query.to)
            .fetch_one(&self.pool)
            .await?;

        Ok(Paginated::new(items, total, pagination))
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Expense, ApiError> {
        sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "expense"))
    }

    pub async fn update(&self, user_id: Uuid, id: Uuid, req: ExpenseRequest) -> Result<Expense, ApiError> {
        req.validate()?;
        ensure_owned_opt(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
            SET category = $3, amount = $4, description = $5, spent_on = $6,
                tournament_id = $7, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(req.category)
        .bind(req.amount)
        .bind(req.description.trim())
        .bind(req.spent_on)
        .bind(req.tournament_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "expense"))
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("expense"));
        }
        Ok(())
    }
}
