//! Dashboard statistics and the income statement (DRE).
//!
//! Both reports are built by pure functions over rows fetched for the caller,
//! so the arithmetic is testable without a database.

use crate::api_error::ApiError;
use crate::db::DbPool;
use crate::models::expense::ExpenseCategory;
use crate::models::performance::TournamentPerformance;
use crate::models::report::*;
use crate::service::backing_calculations::{round_money, HUNDRED};
use crate::service::performance_service::PERFORMANCE_COLUMNS;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

const NO_CLUB: &str = "No club";

/// A performance with the club it was played at.
#[derive(Debug, Clone, FromRow)]
pub struct PerformanceRow {
    #[sqlx(flatten)]
    pub performance: TournamentPerformance,
    pub club_id: Option<Uuid>,
    pub club_name: Option<String>,
}

/// Aggregates the DRE needs from outside the performance table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DreTotals {
    pub gross_prizes: Decimal,
    pub tournament_costs: Decimal,
    pub backing_capital: Decimal,
    pub backer_payouts: Decimal,
    pub markup_income: Decimal,
    pub expenses: Vec<ExpenseLine>,
}

/// `part / whole × 100` rounded to cents, zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round_money(part / whole * HUNDRED)
}

#[derive(Default)]
struct ClubAccumulator {
    name: String,
    played: i64,
    cost: Decimal,
    total_return: Decimal,
}

pub fn build_dashboard(rows: &[PerformanceRow]) -> DashboardStats {
    let mut total_cost = Decimal::ZERO;
    let mut total_return = Decimal::ZERO;
    let mut buy_ins = Decimal::ZERO;
    let mut biggest_prize = Decimal::ZERO;
    let mut itm_count = 0i64;
    let mut positions = Vec::new();
    let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    let mut clubs: HashMap<Option<Uuid>, ClubAccumulator> = HashMap::new();

    for row in rows {
        let p = &row.performance;
        let cost = p.total_cost();
        let ret = p.total_return();

        total_cost += cost;
        total_return += ret;
        buy_ins += p.buy_in_amount;
        biggest_prize = biggest_prize.max(p.prize_amount);
        if p.itm() {
            itm_count += 1;
        }
        if let Some(position) = p.position {
            positions.push(Decimal::from(position));
        }

        let month = months.entry(p.played_on.format("%Y-%m").to_string()).or_default();
        month.0 += cost;
        month.1 += ret;

        let club = clubs.entry(row.club_id).or_insert_with(|| ClubAccumulator {
            name: row.club_name.clone().unwrap_or_else(|| NO_CLUB.to_string()),
            ..Default::default()
        });
        club.played += 1;
        club.cost += cost;
        club.total_return += ret;
    }

    let played = rows.len() as i64;
    let profit = total_return - total_cost;

    let mut cumulative = Decimal::ZERO;
    let monthly = months
        .into_iter()
        .map(|(month, (cost, ret))| {
            let profit = ret - cost;
            cumulative += profit;
            MonthlyPoint {
                month,
                cost,
                total_return: ret,
                profit,
                cumulative_profit: cumulative,
            }
        })
        .collect();

    let mut by_club: Vec<ClubBreakdown> = clubs
        .into_iter()
        .map(|(club_id, acc)| {
            let profit = acc.total_return - acc.cost;
            ClubBreakdown {
                club_id,
                club_name: acc.name,
                tournaments_played: acc.played,
                total_cost: acc.cost,
                total_return: acc.total_return,
                profit,
                roi: percentage(profit, acc.cost),
            }
        })
        .collect();
    by_club.sort_by(|a, b| b.profit.cmp(&a.profit).then_with(|| a.club_name.cmp(&b.club_name)));

    let average_position = (!positions.is_empty()).then(|| {
        let sum: Decimal = positions.iter().sum();
        round_money(sum / Decimal::from(positions.len()))
    });

    DashboardStats {
        tournaments_played: played,
        total_cost,
        total_return,
        profit,
        roi: percentage(profit, total_cost),
        itm_count,
        itm_rate: percentage(Decimal::from(itm_count), Decimal::from(played)),
        average_buy_in: if played == 0 {
            Decimal::ZERO
        } else {
            round_money(buy_ins / Decimal::from(played))
        },
        biggest_prize,
        average_position,
        monthly,
        by_club,
    }
}

pub fn build_dre(from: Option<NaiveDate>, to: Option<NaiveDate>, totals: DreTotals) -> DreReport {
    let gross_result = totals.gross_prizes - totals.tournament_costs;
    let backer_payouts = totals.backer_payouts.max(Decimal::ZERO);
    let operating_expenses: Decimal = totals.expenses.iter().map(|line| line.amount).sum();
    let net_result = gross_result + totals.backing_capital - backer_payouts - operating_expenses;

    let mut expenses_by_category = totals.expenses;
    expenses_by_category.sort_by_key(|line| line.category);

    DreReport {
        from,
        to,
        gross_prizes: totals.gross_prizes,
        tournament_costs: totals.tournament_costs,
        gross_result,
        backing_capital: totals.backing_capital,
        backer_payouts,
        operating_expenses,
        expenses_by_category,
        net_result,
        markup_income: totals.markup_income,
        net_margin: percentage(net_result, totals.gross_prizes + totals.backing_capital),
    }
}

#[derive(Clone)]
pub struct ReportService {
    pool: DbPool,
}

impl ReportService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_performances(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        club_id: Option<Uuid>,
    ) -> Result<Vec<PerformanceRow>, ApiError> {
        let rows = sqlx::query_as::<_, PerformanceRow>(&format!(
            r#"
            SELECT {PERFORMANCE_COLUMNS}, t.club_id, c.name AS club_name
            FROM tournament_performance p
            JOIN tournaments t ON t.id = p.tournament_id
            LEFT JOIN clubs c ON c.id = t.club_id
            WHERE p.user_id = $1
              AND ($2::date IS NULL OR p.played_on >= $2)
              AND ($3::date IS NULL OR p.played_on <= $3)
              AND ($4::uuid IS NULL OR t.club_id = $4)
            ORDER BY p.played_on
            "#
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(user_id = %user_id, rows = rows.len(), "Loaded performances for report");
        Ok(rows)
    }

    pub async fn dashboard(&self, user_id: Uuid, query: DashboardQuery) -> Result<DashboardStats, ApiError> {
        validate_range(query.from, query.to)?;
        let rows = self.fetch_performances(user_id, query.from, query.to, query.club_id).await?;
        Ok(build_dashboard(&rows))
    }

    pub async fn dre(&self, user_id: Uuid, query: DreQuery) -> Result<DreReport, ApiError> {
        validate_range(query.from, query.to)?;

        let performances = self.fetch_performances(user_id, query.from, query.to, None).await?;
        let gross_prizes: Decimal = performances.iter().map(|r| r.performance.total_return()).sum();
        let tournament_costs: Decimal = performances.iter().map(|r| r.performance.total_cost()).sum();

        // Capital raised belongs to the period of the tournament it funded.
        let (backing_capital, markup_income): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(i.amount_paid), 0),
                   COALESCE(SUM(i.amount_paid - o.buy_in_amount * i.percentage_bought / 100), 0)
            FROM backing_investments i
            JOIN backing_offers o ON o.id = i.offer_id
            JOIN tournaments t ON t.id = o.tournament_id
            WHERE i.user_id = $1
              AND o.status <> 'cancelled'
              AND ($2::date IS NULL OR t.starts_at::date >= $2)
              AND ($3::date IS NULL OR t.starts_at::date <= $3)
            "#,
        )
        .bind(user_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .await?;

        let backer_payouts: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(GREATEST(backer_share, 0)), 0)
            FROM backing_results
            WHERE user_id = $1
              AND ($2::date IS NULL OR recorded_on >= $2)
              AND ($3::date IS NULL OR recorded_on <= $3)
            "#,
        )
        .bind(user_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .await?;

        let expenses = sqlx::query_as::<_, (ExpenseCategory, Decimal)>(
            r#"
            SELECT category, SUM(amount)
            FROM expenses
            WHERE user_id = $1
              AND ($2::date IS NULL OR spent_on >= $2)
              AND ($3::date IS NULL OR spent_on <= $3)
            GROUP BY category
            "#,
        )
        .bind(user_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(category, amount)| ExpenseLine { category, amount })
        .collect();

        let report = build_dre(
            query.from,
            query.to,
            DreTotals {
                gross_prizes,
                tournament_costs,
                backing_capital,
                backer_payouts,
                markup_income: round_money(markup_income),
                expenses,
            },
        );

        info!(user_id = %user_id, net_result = %report.net_result, "DRE generated");
        Ok(report)
    }
}

fn validate_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), ApiError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ApiError::bad_request("`from` must not be after `to`")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn row(
        played_on: &str,
        club: Option<(Uuid, &str)>,
        buy_in: Decimal,
        prize: Decimal,
        position: Option<i32>,
    ) -> PerformanceRow {
        PerformanceRow {
            performance: TournamentPerformance {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                tournament_id: Uuid::new_v4(),
                played_on: NaiveDate::parse_from_str(played_on, "%Y-%m-%d").unwrap(),
                buy_in_amount: buy_in,
                rebuy_count: 0,
                rebuy_amount: Decimal::ZERO,
                addon_amount: Decimal::ZERO,
                bounty_amount: Decimal::ZERO,
                prize_amount: prize,
                position,
                field_size: Some(100),
                notes: None,
                import_fingerprint: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            club_id: club.map(|(id, _)| id),
            club_name: club.map(|(_, name)| name.to_string()),
        }
    }

    #[test]
    fn test_percentage_handles_zero() {
        assert_eq!(percentage(dec!(50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
    }

    #[test]
    fn test_empty_dashboard() {
        let stats = build_dashboard(&[]);
        assert_eq!(stats.tournaments_played, 0);
        assert_eq!(stats.roi, Decimal::ZERO);
        assert_eq!(stats.itm_rate, Decimal::ZERO);
        assert_eq!(stats.average_buy_in, Decimal::ZERO);
        assert!(stats.average_position.is_none());
        assert!(stats.monthly.is_empty());
    }

    #[test]
    fn test_dashboard_totals() {
        let club = Uuid::new_v4();
        let rows = vec![
            row("2024-01-10", Some((club, "H2")), dec!(100), dec!(0), Some(40)),
            row("2024-01-20", Some((club, "H2")), dec!(200), dec!(800), Some(2)),
            row("2024-02-05", None, dec!(300), dec!(0), None),
        ];

        let stats = build_dashboard(&rows);
        assert_eq!(stats.tournaments_played, 3);
        assert_eq!(stats.total_cost, dec!(600));
        assert_eq!(stats.total_return, dec!(800));
        assert_eq!(stats.profit, dec!(200));
        assert_eq!(stats.roi, dec!(33.33));
        assert_eq!(stats.itm_count, 1);
        assert_eq!(stats.itm_rate, dec!(33.33));
        assert_eq!(stats.average_buy_in, dec!(200));
        assert_eq!(stats.biggest_prize, dec!(800));
        assert_eq!(stats.average_position, Some(dec!(21)));
    }

    #[test]
    fn test_dashboard_monthly_series_is_cumulative() {
        let rows = vec![
            row("2024-02-05", None, dec!(300), dec!(0), None),
            row("2024-01-10", None, dec!(100), dec!(0), None),
            row("2024-01-20", None, dec!(200), dec!(800), None),
        ];

        let stats = build_dashboard(&rows);
        assert_eq!(stats.monthly.len(), 2);
        assert_eq!(stats.monthly[0].month, "2024-01");
        assert_eq!(stats.monthly[0].profit, dec!(500));
        assert_eq!(stats.monthly[0].cumulative_profit, dec!(500));
        assert_eq!(stats.monthly[1].month, "2024-02");
        assert_eq!(stats.monthly[1].profit, dec!(-300));
        assert_eq!(stats.monthly[1].cumulative_profit, dec!(200));
    }

    #[test]
    fn test_dashboard_club_breakdown() {
        let club = Uuid::new_v4();
        let rows = vec![
            row("2024-01-10", Some((club, "H2")), dec!(100), dec!(500), None),
            row("2024-01-11", None, dec!(50), dec!(0), None),
        ];

        let stats = build_dashboard(&rows);
        assert_eq!(stats.by_club.len(), 2);
        assert_eq!(stats.by_club[0].club_name, "H2");
        assert_eq!(stats.by_club[0].roi, dec!(400));
        assert_eq!(stats.by_club[1].club_name, NO_CLUB);
        assert_eq!(stats.by_club[1].club_id, None);
        assert_eq!(stats.by_club[1].profit, dec!(-50));
    }

    #[test]
    fn test_build_dre() {
        let report = build_dre(
            None,
            None,
            DreTotals {
                gross_prizes: dec!(10000),
                tournament_costs: dec!(4000),
                backing_capital: dec!(1500),
                backer_payouts: dec!(2000),
                markup_income: dec!(500),
                expenses: vec![
                    ExpenseLine { category: ExpenseCategory::Travel, amount: dec!(700) },
                    ExpenseLine { category: ExpenseCategory::Coaching, amount: dec!(300) },
                ],
            },
        );

        assert_eq!(report.gross_result, dec!(6000));
        assert_eq!(report.operating_expenses, dec!(1000));
        assert_eq!(report.net_result, dec!(4500));
        // 4500 / 11500
        assert_eq!(report.net_margin, dec!(39.13));
        assert_eq!(report.expenses_by_category[0].category, ExpenseCategory::Travel);
    }

    #[test]
    fn test_build_dre_empty_period() {
        let report = build_dre(None, None, DreTotals::default());
        assert_eq!(report.net_result, Decimal::ZERO);
        assert_eq!(report.net_margin, Decimal::ZERO);
    }

    #[test]
    fn test_dre_floors_negative_backer_payouts() {
        let report = build_dre(
            None,
            None,
            DreTotals {
                gross_prizes: dec!(100),
                backer_payouts: dec!(-50),
                ..Default::default()
            },
        );
        assert_eq!(report.backer_payouts, Decimal::ZERO);
        assert_eq!(report.net_result, dec!(100));
    }

    #[test]
    fn test_validate_range() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1);
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert!(validate_range(jan, feb).is_ok());
        assert!(validate_range(None, feb).is_ok());
        assert!(matches!(validate_range(feb, jan), Err(ApiError::BadRequest(_))));
    }
}
