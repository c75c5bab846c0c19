//! Bulk import of tournament results from spreadsheet exports.
//!
//! Parsing is pure and line-oriented: the header picks the delimiter and the
//! column layout, every following line becomes either a [`ParsedRow`] or an
//! [`ImportLineError`]. Valid rows are then upserted in one transaction.

use crate::api_error::ApiError;
use crate::config::ImportConfig;
use crate::db::DbPool;
use crate::models::import::{ImportLineError, ImportSummary};
use crate::models::tournament::MAX_AMOUNT;
use crate::service::backing_calculations::round_money;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvImportError {
    #[error("the file is empty")]
    Empty,

    #[error("the file exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("the file is not valid UTF-8")]
    InvalidEncoding,

    #[error("missing required columns: {0}")]
    MissingColumns(String),

    #[error("header line: {0}")]
    MalformedHeader(String),
}

impl From<CsvImportError> for ApiError {
    fn from(err: CsvImportError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Date,
    Tournament,
    Club,
    BuyIn,
    Rebuys,
    RebuyAmount,
    Addon,
    Bounty,
    Position,
    FieldSize,
    Prize,
    Notes,
}

const REQUIRED: [(Column, &str); 3] = [
    (Column::Date, "date"),
    (Column::Tournament, "tournament"),
    (Column::BuyIn, "buy_in"),
];

impl Column {
    /// Matches a header cell, ignoring case, accents, spaces, `_` and `-`.
    pub fn from_header(raw: &str) -> Option<Column> {
        let key = normalize_header(raw);
        let column = match key.as_str() {
            "date" | "data" | "playedon" | "dia" => Column::Date,
            "tournament" | "torneio" | "name" | "nome" | "evento" | "event" => Column::Tournament,
            "club" | "clube" | "site" | "sala" | "venue" => Column::Club,
            "buyin" | "entrada" | "valorbuyin" => Column::BuyIn,
            "rebuys" | "rebuy" | "rebuycount" | "recompras" | "qtdrebuy" => Column::Rebuys,
            "rebuyamount" | "valorrebuy" | "valorrecompra" => Column::RebuyAmount,
            "addon" | "addons" | "addonamount" => Column::Addon,
            "bounty" | "bounties" | "recompensa" | "ko" => Column::Bounty,
            "position" | "posicao" | "colocacao" | "pos" | "finish" => Column::Position,
            "fieldsize" | "field" | "players" | "entries" | "jogadores" | "inscritos" => Column::FieldSize,
            "prize" | "premio" | "premiacao" | "prizeamount" | "winnings" => Column::Prize,
            "notes" | "notas" | "obs" | "observacoes" => Column::Notes,
            _ => return None,
        };
        Some(column)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ã' | 'â' | 'ä' => 'a',
            'é' | 'ê' | 'è' => 'e',
            'í' | 'î' => 'i',
            'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// `;` wins when the header has more semicolons than commas outside quotes.
pub fn detect_delimiter(header: &str) -> char {
    let mut in_quotes = false;
    let (mut commas, mut semicolons) = (0usize, 0usize);
    for c in header.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => commas += 1,
            ';' if !in_quotes => semicolons += 1,
            _ => {}
        }
    }
    if semicolons > commas {
        ';'
    } else {
        ','
    }
}

/// Splits one record. Quoted fields may hold the delimiter; `""` inside quotes is a literal quote.
pub fn split_record(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

fn is_thousands_group(value: &str, separator: char) -> bool {
    match value.split_once(separator) {
        Some((head, tail)) => {
            let head = head.trim_start_matches('-');
            tail.len() == 3
                && tail.chars().all(|c| c.is_ascii_digit())
                && !head.is_empty()
                && head.len() <= 3
                && head != "0"
        }
        None => false,
    }
}

/// Accepts `1234.56`, `1,234.56`, `1.234,56`, `1234,56` and an optional `R$` prefix.
/// A lone separator followed by exactly three digits is read as a thousands separator.
pub fn parse_money(raw: &str) -> Result<Option<Decimal>, String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();
    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) if commas > 1 || is_thousands_group(&cleaned, ',') => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        (Some(_), None) if dots > 1 || is_thousands_group(&cleaned, '.') => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(&normalized)
        .map(|value| Some(round_money(value)))
        .map_err(|_| format!("invalid amount '{}'", raw.trim()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let value = raw.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD or DD/MM/YYYY"))
}

fn parse_count(raw: &str, label: &str) -> Result<i32, String> {
    raw.trim()
        .trim_end_matches(['º', '°', 'o', 'ª'])
        .parse::<i32>()
        .map_err(|_| format!("invalid {label} '{}'", raw.trim()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub line: usize,
    pub played_on: NaiveDate,
    pub tournament: String,
    pub club: Option<String>,
    pub buy_in: Decimal,
    pub rebuy_count: i32,
    pub rebuy_amount: Decimal,
    pub addon: Decimal,
    pub bounty: Decimal,
    pub prize: Decimal,
    pub position: Option<i32>,
    pub field_size: Option<i32>,
    pub notes: Option<String>,
    /// Earlier rows in the same file with the same identity; tells re-entries apart.
    pub entry: usize,
}

impl ParsedRow {
    /// Same day, club, tournament and buy-in, ignoring case and decimal scale.
    fn identity(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.played_on,
            self.club.as_deref().unwrap_or_default().to_lowercase(),
            self.tournament.to_lowercase(),
            self.buy_in.normalize(),
        )
    }

    /// Re-importing the same file maps every line to the row it created before.
    pub fn fingerprint(&self) -> String {
        let key = format!("{}#{}", self.identity(), self.entry);
        hex::encode(Sha256::digest(key.as_bytes()))
    }
}

#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<ImportLineError>,
}

pub fn parse_csv(text: &str) -> Result<ParsedCsv, CsvImportError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or(CsvImportError::Empty)?;
    let delimiter = detect_delimiter(header);
    let header_cells = split_record(header, delimiter).map_err(CsvImportError::MalformedHeader)?;

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (index, cell) in header_cells.iter().enumerate() {
        if let Some(column) = Column::from_header(cell) {
            columns.entry(column).or_insert(index);
        }
    }

    let missing: Vec<&str> = REQUIRED
        .iter()
        .filter(|(column, _)| !columns.contains_key(column))
        .map(|(_, name)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(CsvImportError::MissingColumns(missing.join(", ")));
    }

    let mut parsed = ParsedCsv::default();
    let mut entries: HashMap<String, usize> = HashMap::new();
    for (line, content) in lines {
        let outcome = split_record(content, delimiter).and_then(|fields| {
            if fields.len() > header_cells.len() {
                return Err(format!(
                    "expected at most {} fields, found {}",
                    header_cells.len(),
                    fields.len()
                ));
            }
            parse_row(line, &fields, &columns)
        });
        match outcome {
            Ok(mut row) => {
                let seen = entries.entry(row.identity()).or_insert(0);
                row.entry = *seen;
                *seen += 1;
                parsed.rows.push(row);
            }
            Err(message) => parsed.errors.push(ImportLineError { line, message }),
        }
    }
    Ok(parsed)
}

fn parse_row(line: usize, fields: &[String], columns: &HashMap<Column, usize>) -> Result<ParsedRow, String> {
    let get = |column: Column| {
        columns
            .get(&column)
            .and_then(|&index| fields.get(index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };
    let money = |column: Column, label: &str| -> Result<Decimal, String> {
        let value = match get(column) {
            Some(raw) => parse_money(raw)?.unwrap_or_default(),
            None => Decimal::ZERO,
        };
        if value < Decimal::ZERO {
            return Err(format!("{label} cannot be negative"));
        }
        if value > MAX_AMOUNT {
            return Err(format!("{label} exceeds {MAX_AMOUNT}"));
        }
        Ok(value)
    };

    let played_on = parse_date(get(Column::Date).ok_or("missing date")?)?;
    let tournament = get(Column::Tournament).ok_or("missing tournament")?.to_string();
    if get(Column::BuyIn).is_none() {
        return Err("missing buy_in".to_string());
    }
    let buy_in = money(Column::BuyIn, "buy_in")?;

    let rebuy_count = get(Column::Rebuys).map(|v| parse_count(v, "rebuys")).transpose()?.unwrap_or(0);
    if rebuy_count < 0 {
        return Err("rebuys cannot be negative".to_string());
    }
    let position = get(Column::Position).map(|v| parse_count(v, "position")).transpose()?;
    let field_size = get(Column::FieldSize).map(|v| parse_count(v, "field size")).transpose()?;
    if position.is_some_and(|p| p < 1) || field_size.is_some_and(|f| f < 1) {
        return Err("position and field size must be at least 1".to_string());
    }
    if let (Some(p), Some(f)) = (position, field_size) {
        if p > f {
            return Err(format!("position {p} is beyond field size {f}"));
        }
    }

    Ok(ParsedRow {
        line,
        played_on,
        tournament,
        club: get(Column::Club).map(str::to_string),
        buy_in,
        rebuy_count,
        rebuy_amount: money(Column::RebuyAmount, "rebuy amount")?,
        addon: money(Column::Addon, "addon")?,
        bounty: money(Column::Bounty, "bounty")?,
        prize: money(Column::Prize, "prize")?,
        position,
        field_size,
        notes: get(Column::Notes).map(str::to_string),
        entry: 0,
    })
}

#[derive(Clone)]
pub struct CsvImportService {
    pool: DbPool,
    max_bytes: usize,
    currency: String,
}

impl CsvImportService {
    pub fn new(pool: DbPool, config: &ImportConfig) -> Self {
        Self {
            pool,
            max_bytes: config.max_csv_bytes,
            currency: config.default_currency.clone(),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks size and encoding before anything touches the database.
    pub fn decode<'a>(&self, body: &'a [u8]) -> Result<&'a str, CsvImportError> {
        if body.len() > self.max_bytes {
            return Err(CsvImportError::TooLarge { limit: self.max_bytes });
        }
        std::str::from_utf8(body).map_err(|_| CsvImportError::InvalidEncoding)
    }

    pub async fn import_performances(&self, user_id: Uuid, body: &[u8]) -> Result<ImportSummary, ApiError> {
        let parsed = parse_csv(self.decode(body)?)?;
        for error in &parsed.errors {
            warn!(line = error.line, message = %error.message, "Skipping CSV line");
        }

        let mut summary = ImportSummary {
            currency: self.currency.clone(),
            errors: parsed.errors,
            ..Default::default()
        };

        let mut tx = self.pool.begin().await?;
        let mut clubs: HashMap<String, Uuid> = HashMap::new();
        let mut tournaments: HashMap<(Option<Uuid>, String, NaiveDate), Uuid> = HashMap::new();

        for row in &parsed.rows {
            let club_id = match &row.club {
                Some(name) => {
                    let key = name.to_lowercase();
                    match clubs.get(&key) {
                        Some(id) => Some(*id),
                        None => {
                            let id = upsert_club(&mut tx, user_id, name).await?;
                            clubs.insert(key, id);
                            Some(id)
                        }
                    }
                }
                None => None,
            };

            let key = (club_id, row.tournament.to_lowercase(), row.played_on);
            let tournament_id = match tournaments.get(&key) {
                Some(id) => *id,
                None => {
                    let id = find_or_create_tournament(&mut tx, user_id, club_id, row).await?;
                    tournaments.insert(key, id);
                    id
                }
            };

            match upsert_performance(&mut tx, user_id, tournament_id, row).await? {
                Some(true) => summary.inserted += 1,
                Some(false) => summary.updated += 1,
                None => summary.skipped += 1,
            }
        }

        tx.commit().await?;

        info!(
            user_id = %user_id,
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "CSV import finished"
        );
        Ok(summary)
    }
}

async fn upsert_club(tx: &mut Transaction<'_, Postgres>, user_id: Uuid, name: &str) -> Result<Uuid, ApiError> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM clubs WHERE user_id = $1 AND LOWER(name) = LOWER($2) LIMIT 1")
            .bind(user_id)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query_scalar(
        r#"
        INSERT INTO clubs (id, user_id, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

async fn find_or_create_tournament(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    club_id: Option<Uuid>,
    row: &ParsedRow,
) -> Result<Uuid, ApiError> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM tournaments
        WHERE user_id = $1
          AND club_id IS NOT DISTINCT FROM $2
          AND LOWER(name) = LOWER($3)
          AND (starts_at AT TIME ZONE 'UTC')::date = $4
        ORDER BY created_at
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(club_id)
    .bind(&row.tournament)
    .bind(row.played_on)
    .fetch_optional(&mut **tx)
    .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query_scalar(
        "INSERT INTO tournaments (id, user_id, club_id, name, buy_in, starts_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(club_id)
    .bind(&row.tournament)
    .bind(row.buy_in)
    .bind(row.played_on.and_time(NaiveTime::MIN).and_utc())
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// `Some(true)` inserted, `Some(false)` updated, `None` unchanged.
async fn upsert_performance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    tournament_id: Uuid,
    row: &ParsedRow,
) -> Result<Option<bool>, ApiError> {
    let outcome = sqlx::query_scalar(
        r#"
        INSERT INTO tournament_performance (
            id, user_id, tournament_id, played_on, buy_in_amount, rebuy_count,
            rebuy_amount, addon_amount, bounty_amount, prize_amount,
            position, field_size, notes, import_fingerprint
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (user_id, import_fingerprint) DO UPDATE
        SET tournament_id = EXCLUDED.tournament_id,
            rebuy_count = EXCLUDED.rebuy_count,
            rebuy_amount = EXCLUDED.rebuy_amount,
            addon_amount = EXCLUDED.addon_amount,
            bounty_amount = EXCLUDED.bounty_amount,
            prize_amount = EXCLUDED.prize_amount,
            position = EXCLUDED.position,
            field_size = EXCLUDED.field_size,
            notes = EXCLUDED.notes,
            updated_at = NOW()
        WHERE (tournament_performance.rebuy_count, tournament_performance.rebuy_amount,
               tournament_performance.addon_amount, tournament_performance.bounty_amount,
               tournament_performance.prize_amount, tournament_performance.position,
               tournament_performance.field_size, tournament_performance.notes)
          IS DISTINCT FROM
              (EXCLUDED.rebuy_count, EXCLUDED.rebuy_amount, EXCLUDED.addon_amount,
               EXCLUDED.bounty_amount, EXCLUDED.prize_amount, EXCLUDED.position,
               EXCLUDED.field_size, EXCLUDED.notes)
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(tournament_id)
    .bind(row.played_on)
    .bind(row.buy_in)
    .bind(row.rebuy_count)
    .bind(row.rebuy_amount)
    .bind(row.addon)
    .bind(row.bounty)
    .bind(row.prize)
    .bind(row.position)
    .bind(row.field_size)
    .bind(&row.notes)
    .bind(row.fingerprint())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(outcome)
}
