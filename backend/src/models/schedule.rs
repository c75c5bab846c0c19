use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduleEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tournament_id: Option<Uuid>,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "ends_after_start"))]
pub struct ScheduleEventRequest {
    pub tournament_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn ends_after_start(req: &ScheduleEventRequest) -> Result<(), ValidationError> {
    match req.ends_at {
        Some(ends_at) if ends_at < req.starts_at => Err(ValidationError::new("ends_before_start")),
        _ => Ok(()),
    }
}

/// Without a range only upcoming events are listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleListQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl ScheduleListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_before_start_rejected() {
        let req: ScheduleEventRequest = serde_json::from_str(
            r#"{"title":"BSOP Day 1","starts_at":"2025-05-01T18:00:00Z","ends_at":"2025-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_open_ended_event() {
        let req: ScheduleEventRequest =
            serde_json::from_str(r#"{"title":"BSOP Day 1","starts_at":"2025-05-01T18:00:00Z"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(ScheduleListQuery::default().limit(), 50);
    }
}
