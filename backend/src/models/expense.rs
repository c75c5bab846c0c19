use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::pagination::{PageParams, Pagination};
use super::tournament::positive_amount;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub description: String,
    pub spent_on: NaiveDate,
    pub tournament_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sqlx(type_name = "expense_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Travel,
    Lodging,
    Food,
    Coaching,
    Software,
    Fees,
    Other,
}

impl std::fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpenseCategory::Travel => write!(f, "travel"),
            ExpenseCategory::Lodging => write!(f, "lodging"),
            ExpenseCategory::Food => write!(f, "food"),
            ExpenseCategory::Coaching => write!(f, "coaching"),
            ExpenseCategory::Software => write!(f, "software"),
            ExpenseCategory::Fees => write!(f, "fees"),
            ExpenseCategory::Other => write!(f, "other"),
        }
    }
}

/// Body for both create and full update (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseRequest {
    pub category: ExpenseCategory,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub spent_on: NaiveDate,
    pub tournament_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseListQuery {
    pub category: Option<ExpenseCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ExpenseListQuery {
    pub fn pagination(&self) -> Pagination {
        PageParams { page: self.page, per_page: self.per_page }.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_amount_rejected() {
        let req: ExpenseRequest = serde_json::from_str(
            r#"{"category":"travel","amount":"0","description":"Uber","spent_on":"2025-01-10"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_category_fails_to_parse() {
        let result: Result<ExpenseRequest, _> = serde_json::from_str(
            r#"{"category":"casino","amount":"10","description":"x","spent_on":"2025-01-10"}"#,
        );
        assert!(result.is_err());
    }
}
