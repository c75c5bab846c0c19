use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::pagination::{PageParams, Pagination};
use super::tournament::non_negative_amount;

/// One played entry in a tournament.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TournamentPerformance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tournament_id: Uuid,
    pub played_on: NaiveDate,
    pub buy_in_amount: Decimal,
    pub rebuy_count: i32,
    pub rebuy_amount: Decimal,
    pub addon_amount: Decimal,
    pub bounty_amount: Decimal,
    pub prize_amount: Decimal,
    pub position: Option<i32>,
    pub field_size: Option<i32>,
    pub notes: Option<String>,
    pub import_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TournamentPerformance {
    pub fn total_cost(&self) -> Decimal {
        self.buy_in_amount + Decimal::from(self.rebuy_count) * self.rebuy_amount + self.addon_amount
    }

    pub fn total_return(&self) -> Decimal {
        self.prize_amount + self.bounty_amount
    }

    pub fn profit(&self) -> Decimal {
        self.total_return() - self.total_cost()
    }

    pub fn itm(&self) -> bool {
        self.prize_amount > Decimal::ZERO
    }
}

/// Performance row as served to clients, with the derived money columns filled in.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceResponse {
    #[serde(flatten)]
    pub performance: TournamentPerformance,
    pub total_cost: Decimal,
    pub total_return: Decimal,
    pub profit: Decimal,
    pub itm: bool,
}

impl From<TournamentPerformance> for PerformanceResponse {
    fn from(performance: TournamentPerformance) -> Self {
        Self {
            total_cost: performance.total_cost(),
            total_return: performance.total_return(),
            profit: performance.profit(),
            itm: performance.itm(),
            performance,
        }
    }
}

/// Body for both create and full update (PUT).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "position_within_field"))]
pub struct PerformanceRequest {
    pub tournament_id: Uuid,
    pub played_on: NaiveDate,
    #[validate(custom(function = "non_negative_amount"))]
    pub buy_in_amount: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub rebuy_count: i32,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub rebuy_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub addon_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub bounty_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub prize_amount: Decimal,
    #[validate(range(min = 1))]
    pub position: Option<i32>,
    #[validate(range(min = 1))]
    pub field_size: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn position_within_field(req: &PerformanceRequest) -> Result<(), ValidationError> {
    if let (Some(position), Some(field_size)) = (req.position, req.field_size) {
        if position > field_size {
            return Err(ValidationError::new("position_exceeds_field_size"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceListQuery {
    pub tournament_id: Option<Uuid>,
    pub club_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub itm_only: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PerformanceListQuery {
    pub fn pagination(&self) -> Pagination {
        PageParams { page: self.page, per_page: self.per_page }.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn performance() -> TournamentPerformance {
        TournamentPerformance {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
            played_on: NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
            buy_in_amount: dec!(500),
            rebuy_count: 2,
            rebuy_amount: dec!(250),
            addon_amount: dec!(100),
            bounty_amount: dec!(150),
            prize_amount: dec!(2000),
            position: Some(7),
            field_size: Some(210),
            notes: None,
            import_fingerprint: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_derived_money() {
        let p = performance();
        assert_eq!(p.total_cost(), dec!(1100));
        assert_eq!(p.total_return(), dec!(2150));
        assert_eq!(p.profit(), dec!(1050));
        assert!(p.itm());
    }

    #[test]
    fn test_bounty_alone_is_not_itm() {
        let mut p = performance();
        p.prize_amount = Decimal::ZERO;
        assert!(!p.itm());
        assert_eq!(p.profit(), dec!(-950));
    }

    #[test]
    fn test_position_must_fit_field() {
        let req: PerformanceRequest = serde_json::from_value(serde_json::json!({
            "tournament_id": Uuid::new_v4(),
            "played_on": "2025-02-14",
            "buy_in_amount": "500",
            "position": 12,
            "field_size": 10
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_minimal_request_defaults() {
        let req: PerformanceRequest = serde_json::from_value(serde_json::json!({
            "tournament_id": Uuid::new_v4(),
            "played_on": "2025-02-14",
            "buy_in_amount": 500
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.rebuy_count, 0);
        assert_eq!(req.prize_amount, Decimal::ZERO);
    }
}
