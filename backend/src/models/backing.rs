use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::tournament::non_negative_amount;

/// Lifecycle of a backing offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "backing_offer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Open,
    Closed,
    Settled,
    Cancelled,
}

impl OfferStatus {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, to: &OfferStatus) -> bool {
        match (self, to) {
            // Same state is allowed (idempotency)
            (a, b) if a == b => true,
            (a, _) if a.is_terminal() => false,
            (OfferStatus::Open, OfferStatus::Closed) => true,
            (OfferStatus::Closed, OfferStatus::Open) => true,
            (OfferStatus::Open | OfferStatus::Closed, OfferStatus::Settled) => true,
            (OfferStatus::Open | OfferStatus::Closed, OfferStatus::Cancelled) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Settled | OfferStatus::Cancelled)
    }

    pub fn accepts_investments(&self) -> bool {
        matches!(self, OfferStatus::Open)
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferStatus::Open => write!(f, "open"),
            OfferStatus::Closed => write!(f, "closed"),
            OfferStatus::Settled => write!(f, "settled"),
            OfferStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payout_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Pending => write!(f, "pending"),
            PayoutStatus::Paid => write!(f, "paid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BackingOffer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tournament_id: Uuid,
    pub buy_in_amount: Decimal,
    pub percentage_offered: Decimal,
    pub markup: Decimal,
    pub status: OfferStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BackingInvestment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub backer_name: String,
    pub backer_contact: Option<String>,
    pub percentage_bought: Decimal,
    pub amount_paid: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BackingResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub prize_amount: Decimal,
    pub sold_fraction: Decimal,
    pub net_prize: Decimal,
    pub backer_share: Decimal,
    pub player_share: Decimal,
    pub recorded_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BackerPayout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub result_id: Uuid,
    pub investment_id: Uuid,
    pub backer_name: String,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Range checks on percentages and markup live in backing_calculations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOfferRequest {
    pub tournament_id: Uuid,
    /// Defaults to the tournament's buy-in.
    pub buy_in_amount: Option<Decimal>,
    pub percentage_offered: Decimal,
    pub markup: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOfferStatusRequest {
    pub status: OfferStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvestmentRequest {
    #[validate(length(min = 1, max = 120))]
    pub backer_name: String,
    #[validate(length(max = 255))]
    pub backer_contact: Option<String>,
    pub percentage_bought: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordResultRequest {
    #[validate(custom(function = "non_negative_amount"))]
    pub prize_amount: Decimal,
    /// Defaults to today.
    pub recorded_on: Option<NaiveDate>,
}

/// Preview of the arithmetic without touching the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackingQuoteRequest {
    pub buy_in_amount: Decimal,
    pub percentage_sold: Decimal,
    pub markup: Decimal,
    pub prize_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackingQuote {
    pub amount_paid: Decimal,
    pub markup_premium: Decimal,
    pub net_prize: Option<Decimal>,
    pub backer_share: Option<Decimal>,
    pub player_share: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSummary {
    #[serde(flatten)]
    pub offer: BackingOffer,
    pub percentage_sold: Decimal,
    pub percentage_remaining: Decimal,
    pub capital_raised: Decimal,
    pub markup_premium: Decimal,
    pub investor_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultWithPayouts {
    #[serde(flatten)]
    pub result: BackingResult,
    pub payouts: Vec<BackerPayout>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferListQuery {
    pub status: Option<OfferStatus>,
    pub tournament_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayoutListQuery {
    pub status: Option<PayoutStatus>,
    pub offer_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_transitions() {
        assert!(OfferStatus::Open.can_transition_to(&OfferStatus::Closed));
        assert!(OfferStatus::Closed.can_transition_to(&OfferStatus::Open));
        assert!(OfferStatus::Closed.can_transition_to(&OfferStatus::Settled));
        assert!(OfferStatus::Open.can_transition_to(&OfferStatus::Cancelled));
        assert!(OfferStatus::Settled.can_transition_to(&OfferStatus::Settled));

        assert!(!OfferStatus::Settled.can_transition_to(&OfferStatus::Open));
        assert!(!OfferStatus::Cancelled.can_transition_to(&OfferStatus::Closed));
        assert!(!OfferStatus::Settled.can_transition_to(&OfferStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(OfferStatus::Settled.is_terminal());
        assert!(OfferStatus::Cancelled.is_terminal());
        assert!(!OfferStatus::Closed.is_terminal());

        let all = [OfferStatus::Open, OfferStatus::Closed, OfferStatus::Settled, OfferStatus::Cancelled];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all.iter().filter(|to| *to != from) {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }

        assert!(OfferStatus::Open.accepts_investments());
        assert!(!OfferStatus::Closed.accepts_investments());
    }

    #[test]
    fn test_status_serde() {
        let req: UpdateOfferStatusRequest = serde_json::from_str(r#"{"status":"closed"}"#).unwrap();
        assert_eq!(req.status, OfferStatus::Closed);
        assert_eq!(serde_json::to_string(&PayoutStatus::Paid).unwrap(), r#""paid""#);
    }
}
