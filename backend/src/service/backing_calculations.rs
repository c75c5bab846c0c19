//! Backing (staking) arithmetic.
//!
//! A player sells a percentage of their tournament action at a markup. Backers
//! pay `buy_in × pct × markup` up front; after the tournament the prize, net of
//! what backers paid, is split by the fraction sold.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use uuid::Uuid;

use crate::api_error::ApiError;
use crate::models::tournament::MAX_AMOUNT;

pub const MIN_MARKUP: Decimal = Decimal::ONE;
pub const MAX_MARKUP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Error, PartialEq)]
pub enum BackingError {
    #[error("buy-in must be greater than zero")]
    NonPositiveBuyIn,

    #[error("amount exceeds the maximum of 999999999999.99")]
    AmountTooLarge,

    #[error("percentage must be greater than 0 and at most 100, got {0}")]
    PercentageOutOfRange(Decimal),

    #[error("markup must be between 1 and 5, got {0}")]
    MarkupOutOfRange(Decimal),

    #[error("prize amount cannot be negative")]
    NegativePrize,

    #[error("only {available}% of the action is still available, requested {requested}%")]
    Oversold { available: Decimal, requested: Decimal },
}

impl From<BackingError> for ApiError {
    fn from(err: BackingError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Rounds a monetary value to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentages and markups are stored with three decimals.
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

pub fn validate_buy_in(buy_in_amount: Decimal) -> Result<(), BackingError> {
    if buy_in_amount <= Decimal::ZERO {
        return Err(BackingError::NonPositiveBuyIn);
    }
    if buy_in_amount > MAX_AMOUNT {
        return Err(BackingError::AmountTooLarge);
    }
    Ok(())
}

pub fn validate_percentage(percentage: Decimal) -> Result<(), BackingError> {
    if percentage <= Decimal::ZERO || percentage > HUNDRED {
        return Err(BackingError::PercentageOutOfRange(percentage));
    }
    Ok(())
}

pub fn validate_markup(markup: Decimal) -> Result<(), BackingError> {
    if markup < MIN_MARKUP || markup > MAX_MARKUP {
        return Err(BackingError::MarkupOutOfRange(markup));
    }
    Ok(())
}

/// What a backer pays for `percentage_bought` percent of the action.
pub fn amount_paid(
    buy_in_amount: Decimal,
    percentage_bought: Decimal,
    markup: Decimal,
) -> Result<Decimal, BackingError> {
    validate_buy_in(buy_in_amount)?;
    validate_percentage(percentage_bought)?;
    validate_markup(markup)?;
    Ok(round_money(buy_in_amount * (percentage_bought / HUNDRED) * markup))
}

/// Sum of sold percentages expressed as a fraction in [0, 1].
pub fn sold_fraction<I>(percentages: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    percentages.into_iter().sum::<Decimal>() / HUNDRED
}

/// Checks that `requested` more percent fits in the offer next to what is already sold.
pub fn ensure_available(
    percentage_offered: Decimal,
    already_sold: Decimal,
    requested: Decimal,
) -> Result<(), BackingError> {
    validate_percentage(requested)?;
    let available = (percentage_offered - already_sold).max(Decimal::ZERO);
    if requested > available {
        return Err(BackingError::Oversold { available, requested });
    }
    Ok(())
}

/// Prize left after refunding what backers paid (can be negative on a short cash).
pub fn net_prize(
    prize_amount: Decimal,
    buy_in_amount: Decimal,
    sold_fraction: Decimal,
    markup: Decimal,
) -> Result<Decimal, BackingError> {
    if prize_amount < Decimal::ZERO {
        return Err(BackingError::NegativePrize);
    }
    Ok(round_money(prize_amount - buy_in_amount * sold_fraction * markup))
}

/// Markup income: what backers paid above face value.
pub fn markup_premium(buy_in_amount: Decimal, sold_fraction: Decimal, markup: Decimal) -> Decimal {
    round_money(buy_in_amount * sold_fraction * (markup - Decimal::ONE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeSplit {
    pub backer_share: Decimal,
    pub player_share: Decimal,
}

/// Splits the net prize by the sold fraction. The two shares always add up to `net_prize`.
pub fn split_net_prize(net_prize: Decimal, sold_fraction: Decimal) -> PrizeSplit {
    let backer_share = round_money(net_prize * sold_fraction);
    PrizeSplit {
        backer_share,
        player_share: net_prize - backer_share,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvestmentStake {
    pub investment_id: Uuid,
    pub percentage_bought: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutLine {
    pub investment_id: Uuid,
    pub amount: Decimal,
}

/// Per-backer payouts. A negative net prize pays nothing; backers never owe money back.
pub fn distribute_payouts(net_prize: Decimal, stakes: &[InvestmentStake]) -> Vec<PayoutLine> {
    let payable = net_prize.max(Decimal::ZERO);
    stakes
        .iter()
        .map(|stake| PayoutLine {
            investment_id: stake.investment_id,
            amount: round_money(payable * stake.percentage_bought / HUNDRED),
        })
        .collect()
}
