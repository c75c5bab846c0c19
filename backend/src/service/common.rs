//! Error mapping and ownership checks shared by the CRUD services.

use crate::api_error::ApiError;
use crate::db::DbPool;
use uuid::Uuid;

/// Tables whose rows can be referenced from another row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owned {
    Club,
    Tournament,
    BackingOffer,
}

impl Owned {
    fn table(&self) -> &'static str {
        match self {
            Owned::Club => "clubs",
            Owned::Tournament => "tournaments",
            Owned::BackingOffer => "backing_offers",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Owned::Club => "club",
            Owned::Tournament => "tournament",
            Owned::BackingOffer => "backing offer",
        }
    }
}

/// A referenced row must exist and belong to the caller; otherwise the request is a 400.
pub async fn ensure_owned(pool: &DbPool, kind: Owned, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND user_id = $2)",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(ApiError::bad_request(format!("referenced {} does not exist", kind.label())));
    }
    Ok(())
}

pub async fn ensure_owned_opt(
    pool: &DbPool,
    kind: Owned,
    user_id: Uuid,
    id: Option<Uuid>,
) -> Result<(), ApiError> {
    match id {
        Some(id) => ensure_owned(pool, kind, user_id, id).await,
        None => Ok(()),
    }
}

/// Postgres `unique_violation` (23505) becomes a 409.
pub fn unique_violation_as_conflict(err: sqlx::Error, message: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => ApiError::conflict(message),
        _ => ApiError::DatabaseError(err),
    }
}

/// Postgres `foreign_key_violation` (23503) becomes a 409: something still points at the row.
pub fn foreign_key_as_conflict(err: sqlx::Error, message: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => ApiError::conflict(message),
        _ => ApiError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = unique_violation_as_conflict(sqlx::Error::PoolTimedOut, "dup");
        assert!(matches!(err, ApiError::DatabaseError(_)));
        let err = foreign_key_as_conflict(sqlx::Error::PoolClosed, "in use");
        assert!(matches!(err, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Owned::Club.table(), "clubs");
        assert_eq!(Owned::BackingOffer.label(), "backing offer");
    }
}
