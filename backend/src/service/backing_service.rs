use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::backing::*;
use crate::service::backing_calculations::{self as calc, InvestmentStake, HUNDRED};
use crate::service::common::{ensure_owned, Owned};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const OFFER_COLUMNS: &str = "o.id, o.user_id, o.tournament_id, o.buy_in_amount, o.percentage_offered, \
     o.markup, o.status, o.notes, o.created_at, o.updated_at";

const INVESTMENT_COLUMNS: &str =
    "id, user_id, offer_id, backer_name, backer_contact, percentage_bought, amount_paid, created_at";

const RESULT_COLUMNS: &str = "id, user_id, offer_id, prize_amount, sold_fraction, net_prize, \
     backer_share, player_share, recorded_on, created_at";

const PAYOUT_COLUMNS: &str = "p.id, p.user_id, p.result_id, p.investment_id, p.backer_name, p.amount, \
     p.status, p.paid_at, p.created_at";

#[derive(Debug, FromRow)]
struct OfferAggregateRow {
    #[sqlx(flatten)]
    offer: BackingOffer,
    percentage_sold: Decimal,
    capital_raised: Decimal,
    investor_count: i64,
}

impl From<OfferAggregateRow> for OfferSummary {
    fn from(row: OfferAggregateRow) -> Self {
        summarize_offer(row.offer, row.percentage_sold, row.capital_raised, row.investor_count)
    }
}

pub fn summarize_offer(
    offer: BackingOffer,
    percentage_sold: Decimal,
    capital_raised: Decimal,
    investor_count: i64,
) -> OfferSummary {
    let percentage_remaining = (offer.percentage_offered - percentage_sold).max(Decimal::ZERO);
    let markup_premium = calc::markup_premium(offer.buy_in_amount, percentage_sold / HUNDRED, offer.markup);
    OfferSummary {
        offer,
        percentage_sold,
        percentage_remaining,
        capital_raised,
        markup_premium,
        investor_count,
    }
}

/// Pure preview of what an arrangement costs and pays.
pub fn quote(req: &BackingQuoteRequest) -> Result<BackingQuote, calc::BackingError> {
    let amount_paid = calc::amount_paid(req.buy_in_amount, req.percentage_sold, req.markup)?;
    let sold = req.percentage_sold / HUNDRED;
    let markup_premium = calc::markup_premium(req.buy_in_amount, sold, req.markup);

    let (net_prize, backer_share, player_share) = match req.prize_amount {
        Some(prize) => {
            let net = calc::net_prize(prize, req.buy_in_amount, sold, req.markup)?;
            let split = calc::split_net_prize(net, sold);
            (Some(net), Some(split.backer_share), Some(split.player_share))
        }
        None => (None, None, None),
    };

    Ok(BackingQuote {
        amount_paid,
        markup_premium,
        net_prize,
        backer_share,
        player_share,
    })
}

#[derive(Clone)]
pub struct BackingService {
    pool: DbPool,
}

impl BackingService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // =============================================================================
    // OFFERS
    // =============================================================================

    pub async fn create_offer(&self, user_id: Uuid, req: CreateOfferRequest) -> Result<OfferSummary, ApiError> {
        req.validate()?;
        let percentage_offered = calc::round_ratio(req.percentage_offered);
        let markup = calc::round_ratio(req.markup);
        calc::validate_percentage(percentage_offered)?;
        calc::validate_markup(markup)?;
        ensure_owned(&self.pool, Owned::Tournament, user_id, req.tournament_id).await?;

        let buy_in_amount = match req.buy_in_amount {
            Some(amount) => amount,
            None => {
                sqlx::query_scalar::<_, Decimal>("SELECT buy_in FROM tournaments WHERE id = $1 AND user_id = $2")
                    .bind(req.tournament_id)
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        calc::validate_buy_in(buy_in_amount)?;

        let offer = sqlx::query_as::<_, BackingOffer>(&format!(
            r#"
            INSERT INTO backing_offers AS o (
                id, user_id, tournament_id, buy_in_amount, percentage_offered, markup, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'open', $7)
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.tournament_id)
        .bind(calc::round_money(buy_in_amount))
        .bind(percentage_offered)
        .bind(markup)
        .bind(&req.notes)
        .fetch_one(&self.pool)
        .await?;

        info!(
            offer_id = %offer.id,
            tournament_id = %offer.tournament_id,
            percentage_offered = %offer.percentage_offered,
            markup = %offer.markup,
            "Backing offer created"
        );

        Ok(summarize_offer(offer, Decimal::ZERO, Decimal::ZERO, 0))
    }

    pub async fn list_offers(&self, user_id: Uuid, query: OfferListQuery) -> Result<Vec<OfferSummary>, ApiError> {
        let rows = sqlx::query_as::<_, OfferAggregateRow>(&format!(
            r#"
            SELECT {OFFER_COLUMNS},
                   COALESCE(SUM(i.percentage_bought), 0) AS percentage_sold,
                   COALESCE(SUM(i.amount_paid), 0) AS capital_raised,
                   COUNT(i.id) AS investor_count
            FROM backing_offers o
            LEFT JOIN backing_investments i ON i.offer_id = o.id
            WHERE o.user_id = $1
              AND ($2::backing_offer_status IS NULL OR o.status = $2)
              AND ($3::uuid IS NULL OR o.tournament_id = $3)
            GROUP BY o.id
            ORDER BY o.created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(query.status)
        .bind(query.tournament_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OfferSummary::from).collect())
    }

    pub async fn get_offer(&self, user_id: Uuid, offer_id: Uuid) -> Result<OfferSummary, ApiError> {
        sqlx::query_as::<_, OfferAggregateRow>(&format!(
            r#"
            SELECT {OFFER_COLUMNS},
                   COALESCE(SUM(i.percentage_bought), 0) AS percentage_sold,
                   COALESCE(SUM(i.amount_paid), 0) AS capital_raised,
                   COUNT(i.id) AS investor_count
            FROM backing_offers o
            LEFT JOIN backing_investments i ON i.offer_id = o.id
            WHERE o.id = $1 AND o.user_id = $2
            GROUP BY o.id
            "#
        ))
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map(OfferSummary::from)
        .map_err(|e| ApiError::from_fetch(e, "backing offer"))
    }

    /// Moves an offer between open, closed and cancelled. Settling happens only through `record_result`.
    pub async fn update_status(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        req: UpdateOfferStatusRequest,
    ) -> Result<OfferSummary, ApiError> {
        if req.status == OfferStatus::Settled {
            return Err(ApiError::bad_request("offers are settled by recording a result"));
        }

        let mut tx = self.pool.begin().await?;
        let current = lock_offer_status(&mut tx, user_id, offer_id).await?;
        validate_transition(&current, &req.status)?;

        sqlx::query("UPDATE backing_offers SET status = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2")
            .bind(offer_id)
            .bind(user_id)
            .bind(req.status)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(offer_id = %offer_id, from = %current, to = %req.status, "Backing offer status changed");
        self.get_offer(user_id, offer_id).await
    }

    pub async fn delete_offer(&self, user_id: Uuid, offer_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let status = lock_offer_status(&mut tx, user_id, offer_id).await?;
        if status == OfferStatus::Settled {
            warn!(offer_id = %offer_id, "Refusing to delete settled offer");
            return Err(ApiError::conflict("settled offers cannot be deleted"));
        }

        sqlx::query("DELETE FROM backing_offers WHERE id = $1 AND user_id = $2")
            .bind(offer_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(offer_id = %offer_id, "Backing offer deleted");
        Ok(())
    }

    // =============================================================================
    // INVESTMENTS
    // =============================================================================

    /// Sells part of an open offer. The offer row is locked so concurrent sales cannot oversell.
    pub async fn add_investment(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        req: CreateInvestmentRequest,
    ) -> Result<BackingInvestment, ApiError> {
        req.validate()?;
        let percentage_bought = calc::round_ratio(req.percentage_bought);
        calc::validate_percentage(percentage_bought)?;

        let mut tx = self.pool.begin().await?;

        let offer = sqlx::query_as::<_, BackingOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM backing_offers o WHERE o.id = $1 AND o.user_id = $2 FOR UPDATE"
        ))
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::from_fetch(e, "backing offer"))?;

        if !offer.status.accepts_investments() {
            warn!(offer_id = %offer_id, status = %offer.status, "Investment rejected: offer not open");
            return Err(ApiError::conflict(format!("offer is {}", offer.status)));
        }

        let already_sold: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(percentage_bought), 0) FROM backing_investments WHERE offer_id = $1",
        )
        .bind(offer_id)
        .fetch_one(&mut *tx)
        .await?;

        calc::ensure_available(offer.percentage_offered, already_sold, percentage_bought)?;
        let amount_paid = calc::amount_paid(offer.buy_in_amount, percentage_bought, offer.markup)?;

        let investment = sqlx::query_as::<_, BackingInvestment>(&format!(
            r#"
            INSERT INTO backing_investments (
                id, user_id, offer_id, backer_name, backer_contact, percentage_bought, amount_paid
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INVESTMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(offer_id)
        .bind(req.backer_name.trim())
        .bind(&req.backer_contact)
        .bind(percentage_bought)
        .bind(amount_paid)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            offer_id = %offer_id,
            investment_id = %investment.id,
            percentage = %investment.percentage_bought,
            amount_paid = %investment.amount_paid,
            "Backing investment recorded"
        );
        Ok(investment)
    }

    pub async fn list_investments(&self, user_id: Uuid, offer_id: Uuid) -> Result<Vec<BackingInvestment>, ApiError> {
        ensure_owned(&self.pool, Owned::BackingOffer, user_id, offer_id).await?;

        let investments = sqlx::query_as::<_, BackingInvestment>(&format!(
            "SELECT {INVESTMENT_COLUMNS} FROM backing_investments \
             WHERE offer_id = $1 AND user_id = $2 ORDER BY created_at"
        ))
        .bind(offer_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(investments)
    }

    /// Locks the parent offer so a removal cannot slip in while a result is being recorded.
    pub async fn delete_investment(&self, user_id: Uuid, investment_id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let status = sqlx::query_scalar::<_, OfferStatus>(
            r#"
            SELECT o.status
            FROM backing_investments i
            JOIN backing_offers o ON o.id = i.offer_id
            WHERE i.id = $1 AND i.user_id = $2
            FOR UPDATE OF o
            "#,
        )
        .bind(investment_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::from_fetch(e, "backing investment"))?;

        if status == OfferStatus::Settled {
            return Err(ApiError::conflict("investments of a settled offer cannot be removed"));
        }

        sqlx::query("DELETE FROM backing_investments WHERE id = $1 AND user_id = $2")
            .bind(investment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(investment_id = %investment_id, "Backing investment removed");
        Ok(())
    }

    // =============================================================================
    // RESULTS & PAYOUTS
    // =============================================================================

    /// Records the tournament outcome for an offer: stores the split, creates one
    /// payout per investment and settles the offer, all in one transaction.
    /// Zero payouts (a bust) are stored as already paid.
    pub async fn record_result(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        req: RecordResultRequest,
    ) -> Result<ResultWithPayouts, ApiError> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;

        let offer = sqlx::query_as::<_, BackingOffer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM backing_offers o WHERE o.id = $1 AND o.user_id = $2 FOR UPDATE"
        ))
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::from_fetch(e, "backing offer"))?;

        match offer.status {
            OfferStatus::Settled => return Err(ApiError::conflict("result already recorded")),
            OfferStatus::Cancelled => return Err(ApiError::conflict("offer was cancelled")),
            OfferStatus::Open | OfferStatus::Closed => {}
        }

        let investments = sqlx::query_as::<_, BackingInvestment>(&format!(
            "SELECT {INVESTMENT_COLUMNS} FROM backing_investments WHERE offer_id = $1 ORDER BY created_at"
        ))
        .bind(offer_id)
        .fetch_all(&mut *tx)
        .await?;

        let settlement = compute_settlement(&offer, &investments, req.prize_amount)?;
        let recorded_on = req.recorded_on.unwrap_or_else(|| Utc::now().date_naive());

        let result = sqlx::query_as::<_, BackingResult>(&format!(
            r#"
            INSERT INTO backing_results (
                id, user_id, offer_id, prize_amount, sold_fraction, net_prize,
                backer_share, player_share, recorded_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RESULT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(offer_id)
        .bind(req.prize_amount)
        .bind(settlement.sold_fraction)
        .bind(settlement.net_prize)
        .bind(settlement.backer_share)
        .bind(settlement.player_share)
        .bind(recorded_on)
        .fetch_one(&mut *tx)
        .await?;

        let mut payouts = Vec::with_capacity(settlement.payouts.len());
        for (investment, line) in investments.iter().zip(settlement.payouts.iter()) {
            let payout = sqlx::query_as::<_, BackerPayout>(&format!(
                r#"
                INSERT INTO backer_payouts AS p (
                    id, user_id, result_id, investment_id, backer_name, amount, status, paid_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 = 'paid'::payout_status THEN NOW() END)
                RETURNING {PAYOUT_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(result.id)
            .bind(line.investment_id)
            .bind(&investment.backer_name)
            .bind(line.amount)
            .bind(initial_payout_status(line.amount))
            .fetch_one(&mut *tx)
            .await?;
            payouts.push(payout);
        }

        sqlx::query("UPDATE backing_offers SET status = 'settled', updated_at = NOW() WHERE id = $1")
            .bind(offer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            offer_id = %offer_id,
            prize = %result.prize_amount,
            net_prize = %result.net_prize,
            backer_share = %result.backer_share,
            payouts = payouts.len(),
            "Backing result recorded"
        );

        Ok(ResultWithPayouts { result, payouts })
    }

    pub async fn get_result(&self, user_id: Uuid, offer_id: Uuid) -> Result<ResultWithPayouts, ApiError> {
        let result = sqlx::query_as::<_, BackingResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM backing_results WHERE offer_id = $1 AND user_id = $2"
        ))
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "backing result"))?;

        let payouts = sqlx::query_as::<_, BackerPayout>(&format!(
            "SELECT {PAYOUT_COLUMNS} FROM backer_payouts p WHERE p.result_id = $1 ORDER BY p.created_at"
        ))
        .bind(result.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ResultWithPayouts { result, payouts })
    }

    pub async fn list_payouts(&self, user_id: Uuid, query: PayoutListQuery) -> Result<Vec<BackerPayout>, ApiError> {
        let payouts = sqlx::query_as::<_, BackerPayout>(&format!(
            r#"
            SELECT {PAYOUT_COLUMNS}
            FROM backer_payouts p
            JOIN backing_results r ON r.id = p.result_id
            WHERE p.user_id = $1
              AND ($2::payout_status IS NULL OR p.status = $2)
              AND ($3::uuid IS NULL OR r.offer_id = $3)
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(query.status)
        .bind(query.offer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payouts)
    }

    /// Idempotent: paying an already paid payout keeps the original `paid_at`.
    pub async fn mark_payout_paid(&self, user_id: Uuid, payout_id: Uuid) -> Result<BackerPayout, ApiError> {
        let payout = sqlx::query_as::<_, BackerPayout>(&format!(
            r#"
            UPDATE backer_payouts AS p
            SET status = 'paid', paid_at = COALESCE(p.paid_at, NOW())
            WHERE p.id = $1 AND p.user_id = $2
            RETURNING {PAYOUT_COLUMNS}
            "#
        ))
        .bind(payout_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::from_fetch(e, "payout"))?;

        info!(payout_id = %payout.id, backer = %payout.backer_name, amount = %payout.amount, "Payout marked paid");
        Ok(payout)
    }
}

/// Reads the offer status and holds the row lock until `tx` ends.
async fn lock_offer_status(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    offer_id: Uuid,
) -> Result<OfferStatus, ApiError> {
    sqlx::query_scalar::<_, OfferStatus>(
        "SELECT status FROM backing_offers WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(offer_id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| ApiError::from_fetch(e, "backing offer"))
}

fn initial_payout_status(amount: Decimal) -> PayoutStatus {
    if amount.is_zero() {
        PayoutStatus::Paid
    } else {
        PayoutStatus::Pending
    }
}

fn validate_transition(from: &OfferStatus, to: &OfferStatus) -> Result<(), ApiError> {
    if !from.can_transition_to(to) {
        warn!(from = %from, to = %to, "Invalid offer status transition");
        return Err(ApiError::conflict(format!("cannot move offer from {from} to {to}")));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub sold_fraction: Decimal,
    pub net_prize: Decimal,
    pub backer_share: Decimal,
    pub player_share: Decimal,
    pub payouts: Vec<calc::PayoutLine>,
}

/// Arithmetic behind `record_result`, separated from the transaction.
pub fn compute_settlement(
    offer: &BackingOffer,
    investments: &[BackingInvestment],
    prize_amount: Decimal,
) -> Result<Settlement, calc::BackingError> {
    let sold_fraction = calc::sold_fraction(investments.iter().map(|i| i.percentage_bought));
    let net_prize = calc::net_prize(prize_amount, offer.buy_in_amount, sold_fraction, offer.markup)?;
    let split = calc::split_net_prize(net_prize, sold_fraction);
    let stakes: Vec<InvestmentStake> = investments
        .iter()
        .map(|i| InvestmentStake {
            investment_id: i.id,
            percentage_bought: i.percentage_bought,
        })
        .collect();

    Ok(Settlement {
        sold_fraction,
        net_prize,
        backer_share: split.backer_share,
        player_share: split.player_share,
        payouts: calc::distribute_payouts(net_prize, &stakes),
    })
}
