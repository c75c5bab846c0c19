use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::pagination::{PageParams, Pagination};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Club {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for both create and full update (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClubRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 120))]
    pub city: Option<String>,
    #[validate(length(max = 255))]
    pub website: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubListQuery {
    /// Case-insensitive substring match on the name.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ClubListQuery {
    pub fn pagination(&self) -> Pagination {
        PageParams { page: self.page, per_page: self.per_page }.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        let req = ClubRequest {
            name: String::new(),
            city: None,
            website: None,
            notes: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_valid_club() {
        let req: ClubRequest =
            serde_json::from_str(r#"{"name":"H2 Club","city":"São Paulo"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.city.as_deref(), Some("São Paulo"));
    }
}
