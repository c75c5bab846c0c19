use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::pagination::{PageParams, Pagination};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Option<Uuid>,
    pub name: String,
    pub game_variant: GameVariant,
    pub buy_in: Decimal,
    pub guaranteed_prize: Option<Decimal>,
    pub starts_at: DateTime<Utc>,
    pub is_online: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "game_variant", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    #[default]
    Nlh,
    Plo,
    Mixed,
    Other,
}

impl std::fmt::Display for GameVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameVariant::Nlh => write!(f, "nlh"),
            GameVariant::Plo => write!(f, "plo"),
            GameVariant::Mixed => write!(f, "mixed"),
            GameVariant::Other => write!(f, "other"),
        }
    }
}

/// Body for both create and full update (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TournamentRequest {
    pub club_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub game_variant: GameVariant,
    #[validate(custom(function = "non_negative_amount"))]
    pub buy_in: Decimal,
    #[validate(custom(function = "non_negative_amount"))]
    pub guaranteed_prize: Option<Decimal>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub is_online: bool,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TournamentListQuery {
    pub club_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl TournamentListQuery {
    pub fn pagination(&self) -> Pagination {
        PageParams { page: self.page, per_page: self.per_page }.normalize()
    }
}

/// Largest value a `NUMERIC(14, 2)` money column holds: 999 999 999 999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    within_max_amount(value)
}

pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("non_positive_amount"));
    }
    within_max_amount(value)
}

fn within_max_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_variant_defaults_to_nlh() {
        let req: TournamentRequest = serde_json::from_str(
            r#"{"name":"Main Event","buy_in":"1100","starts_at":"2025-03-01T19:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(req.game_variant, GameVariant::Nlh);
        assert!(!req.is_online);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_negative_buy_in_rejected() {
        let req: TournamentRequest = serde_json::from_str(
            r#"{"name":"Turbo","buy_in":"-10","starts_at":"2025-03-01T19:00:00Z","game_variant":"plo"}"#,
        )
        .unwrap();
        assert_eq!(req.game_variant, GameVariant::Plo);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_amount_upper_bound() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");
        assert!(non_negative_amount(&MAX_AMOUNT).is_ok());
        assert!(positive_amount(&MAX_AMOUNT).is_ok());

        let too_large = MAX_AMOUNT + Decimal::new(1, 2);
        assert_eq!(non_negative_amount(&too_large).unwrap_err().code, "amount_too_large");
        assert_eq!(positive_amount(&too_large).unwrap_err().code, "amount_too_large");

        let req: TournamentRequest = serde_json::from_str(
            r#"{"name":"High Roller","buy_in":"10000000000000","starts_at":"2025-03-01T19:00:00Z"}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(GameVariant::Mixed.to_string(), "mixed");
    }
}
