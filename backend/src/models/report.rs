use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::ExpenseCategory;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub club_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DreQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// One point of the monthly results chart. `month` is `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyPoint {
    pub month: String,
    pub cost: Decimal,
    pub total_return: Decimal,
    pub profit: Decimal,
    pub cumulative_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClubBreakdown {
    pub club_id: Option<Uuid>,
    pub club_name: String,
    pub tournaments_played: i64,
    pub total_cost: Decimal,
    pub total_return: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub tournaments_played: i64,
    pub total_cost: Decimal,
    pub total_return: Decimal,
    pub profit: Decimal,
    /// Percent, zero when nothing was spent.
    pub roi: Decimal,
    pub itm_count: i64,
    pub itm_rate: Decimal,
    pub average_buy_in: Decimal,
    pub biggest_prize: Decimal,
    pub average_position: Option<Decimal>,
    pub monthly: Vec<MonthlyPoint>,
    pub by_club: Vec<ClubBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseLine {
    pub category: ExpenseCategory,
    pub amount: Decimal,
}

/// Income statement for a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DreReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub gross_prizes: Decimal,
    pub tournament_costs: Decimal,
    pub gross_result: Decimal,
    pub backing_capital: Decimal,
    pub backer_payouts: Decimal,
    pub operating_expenses: Decimal,
    pub expenses_by_category: Vec<ExpenseLine>,
    pub net_result: Decimal,
    pub markup_income: Decimal,
    pub net_margin: Decimal,
}
