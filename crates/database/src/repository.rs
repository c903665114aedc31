use crate::DbError;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{ChallengeState, Direction, EntryQuality, PropFirmChallenge, Session, Trade};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

const TRADE_COLUMNS: &str = "id, trade_date, pair, direction, entry_price, exit_price, lot_size, \
     pnl, session, entry_quality, ict_concepts, user_notes, broker_order_id, prop_firm_id, created_at";

const CHALLENGE_COLUMNS: &str = "id, firm_name, challenge_type, account_size, profit_target, \
     daily_loss_limit, max_loss_limit, status, start_date, end_date, created_at";

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A row of the `trades` table. Enum columns are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct DbTrade {
    pub id: Uuid,
    pub trade_date: DateTime<Utc>,
    pub pair: String,
    pub direction: String,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub lot_size: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub session: Option<String>,
    pub entry_quality: Option<String>,
    pub ict_concepts: Option<Vec<String>>,
    pub user_notes: Option<String>,
    pub broker_order_id: Option<i64>,
    pub prop_firm_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbTrade> for Trade {
    type Error = DbError;

    fn try_from(row: DbTrade) -> Result<Self, Self::Error> {
        Ok(Trade {
            id: row.id,
            trade_date: row.trade_date,
            pair: row.pair,
            direction: row.direction.parse::<Direction>()?,
            entry_price: row.entry_price,
            exit_price: row.exit_price,
            lot_size: row.lot_size,
            pnl: row.pnl,
            session: row.session.as_deref().map(str::parse::<Session>).transpose()?,
            entry_quality: row
                .entry_quality
                .as_deref()
                .map(str::parse::<EntryQuality>)
                .transpose()?,
            ict_concepts: row.ict_concepts.unwrap_or_default(),
            user_notes: row.user_notes,
            broker_order_id: row.broker_order_id,
            prop_firm_id: row.prop_firm_id,
            created_at: Some(row.created_at),
        })
    }
}

/// A row of the `prop_firm_challenges` table.
#[derive(Debug, Clone, FromRow)]
pub struct DbChallenge {
    pub id: Uuid,
    pub firm_name: String,
    pub challenge_type: String,
    pub account_size: Decimal,
    pub profit_target: Decimal,
    pub daily_loss_limit: Decimal,
    pub max_loss_limit: Decimal,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbChallenge> for PropFirmChallenge {
    type Error = DbError;

    fn try_from(row: DbChallenge) -> Result<Self, Self::Error> {
        Ok(PropFirmChallenge {
            id: row.id,
            firm_name: row.firm_name,
            challenge_type: row.challenge_type,
            account_size: row.account_size,
            profit_target: row.profit_target,
            daily_loss_limit: row.daily_loss_limit,
            max_loss_limit: row.max_loss_limit,
            status: row.status.parse::<ChallengeState>()?,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: Some(row.created_at),
        })
    }
}

/// Maps an empty `fetch_one` to `DbError::NotFound`.
fn not_found_if_missing(err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::RowNotFound => DbError::NotFound,
        other => other.into(),
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches every trade of one user, oldest first.
    pub async fn get_trades_for_user(&self, user_id: Uuid) -> Result<Vec<Trade>, DbError> {
        let rows = sqlx::query_as::<_, DbTrade>(&format!(
            "SELECT {} FROM trades WHERE user_id = $1 ORDER BY trade_date ASC",
            TRADE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(%user_id, rows = rows.len(), "Fetched trades.");
        rows.into_iter().map(Trade::try_from).collect()
    }

    /// Fetches a single trade, scoped to its owner.
    pub async fn get_trade(&self, user_id: Uuid, trade_id: Uuid) -> Result<Trade, DbError> {
        let row = sqlx::query_as::<_, DbTrade>(&format!(
            "SELECT {} FROM trades WHERE user_id = $1 AND id = $2",
            TRADE_COLUMNS
        ))
        .bind(user_id)
        .bind(trade_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_if_missing)?;

        Trade::try_from(row)
    }

    /// Saves a manually journaled trade.
    pub async fn insert_trade(&self, user_id: Uuid, trade: &Trade) -> Result<Uuid, DbError> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, user_id, trade_date, pair, direction, entry_price, exit_price, lot_size,
                pnl, session, entry_quality, ict_concepts, user_notes, broker_order_id,
                prop_firm_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(trade.id)
        .bind(user_id)
        .bind(trade.trade_date)
        .bind(&trade.pair)
        .bind(trade.direction.as_str())
        .bind(trade.entry_price)
        .bind(trade.exit_price)
        .bind(trade.lot_size)
        .bind(trade.pnl)
        .bind(trade.session.map(|s| s.key()))
        .bind(trade.entry_quality.map(|q| q.as_str()))
        .bind(&trade.ict_concepts)
        .bind(&trade.user_notes)
        .bind(trade.broker_order_id)
        .bind(trade.prop_firm_id)
        .execute(&self.pool)
        .await?;

        Ok(trade.id)
    }

    /// Inserts or refreshes a trade synced from a broker order.
    ///
    /// Rows are matched on `(user_id, broker_order_id)`. On a match, the price,
    /// size and P&L columns are overwritten; journal annotations (session tag,
    /// entry quality, concepts, notes) are left as the user set them.
    pub async fn upsert_broker_trade(
        &self,
        user_id: Uuid,
        trade: &Trade,
    ) -> Result<UpsertOutcome, DbError> {
        let order_id = trade.broker_order_id.ok_or_else(|| {
            DbError::InvalidData("broker trade without a broker_order_id".to_string())
        })?;

        // `xmax = 0` only holds for a freshly inserted tuple.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO trades (
                id, user_id, trade_date, pair, direction, entry_price, exit_price, lot_size,
                pnl, session, broker_order_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, broker_order_id) WHERE broker_order_id IS NOT NULL
            DO UPDATE SET
                trade_date  = EXCLUDED.trade_date,
                pair        = EXCLUDED.pair,
                direction   = EXCLUDED.direction,
                entry_price = EXCLUDED.entry_price,
                exit_price  = EXCLUDED.exit_price,
                lot_size    = EXCLUDED.lot_size,
                pnl         = EXCLUDED.pnl,
                updated_at  = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(trade.id)
        .bind(user_id)
        .bind(trade.trade_date)
        .bind(&trade.pair)
        .bind(trade.direction.as_str())
        .bind(trade.entry_price)
        .bind(trade.exit_price)
        .bind(trade.lot_size)
        .bind(trade.pnl)
        .bind(trade.session.map(|s| s.key()))
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted { UpsertOutcome::Inserted } else { UpsertOutcome::Updated })
    }

    /// Deletes one trade. Returns `NotFound` if the user owns no such trade.
    pub async fn delete_trade(&self, user_id: Uuid, trade_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM trades WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(trade_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // --- Prop-firm challenges ---

    /// Fetches every challenge of one user, most recently started first.
    pub async fn get_challenges_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PropFirmChallenge>, DbError> {
        let rows = sqlx::query_as::<_, DbChallenge>(&format!(
            "SELECT {} FROM prop_firm_challenges WHERE user_id = $1 \
             ORDER BY start_date DESC, created_at DESC",
            CHALLENGE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PropFirmChallenge::try_from).collect()
    }

    pub async fn get_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<PropFirmChallenge, DbError> {
        let row = sqlx::query_as::<_, DbChallenge>(&format!(
            "SELECT {} FROM prop_firm_challenges WHERE user_id = $1 AND id = $2",
            CHALLENGE_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_if_missing)?;

        PropFirmChallenge::try_from(row)
    }

    /// Fetches the trades linked to one challenge, oldest first.
    pub async fn get_trades_for_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Vec<Trade>, DbError> {
        let rows = sqlx::query_as::<_, DbTrade>(&format!(
            "SELECT {} FROM trades WHERE user_id = $1 AND prop_firm_id = $2 \
             ORDER BY trade_date ASC",
            TRADE_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Trade::try_from).collect()
    }

    pub async fn insert_challenge(
        &self,
        user_id: Uuid,
        challenge: &PropFirmChallenge,
    ) -> Result<Uuid, DbError> {
        sqlx::query(
            r#"
            INSERT INTO prop_firm_challenges (
                id, user_id, firm_name, challenge_type, account_size, profit_target,
                daily_loss_limit, max_loss_limit, status, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(challenge.id)
        .bind(user_id)
        .bind(&challenge.firm_name)
        .bind(&challenge.challenge_type)
        .bind(challenge.account_size)
        .bind(challenge.profit_target)
        .bind(challenge.daily_loss_limit)
        .bind(challenge.max_loss_limit)
        .bind(challenge.status.as_str())
        .bind(challenge.start_date)
        .bind(challenge.end_date)
        .execute(&self.pool)
        .await?;

        Ok(challenge.id)
    }

    /// Moves a challenge to `status`. Closing states record `end_date`;
    /// reopening clears it.
    pub async fn update_challenge_status(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        status: ChallengeState,
        end_date: Option<NaiveDate>,
    ) -> Result<(), DbError> {
        let end_date = if status.is_closed() { end_date } else { None };
        let result = sqlx::query(
            "UPDATE prop_firm_challenges SET status = $3, end_date = $4 \
             WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(challenge_id)
        .bind(status.as_str())
        .bind(end_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Deletes a challenge. Its trades stay in the journal, unlinked.
    pub async fn delete_challenge(&self, user_id: Uuid, challenge_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM prop_firm_challenges WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(challenge_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> DbTrade {
        DbTrade {
            id: Uuid::new_v4(),
            trade_date: Utc::now(),
            pair: "EURUSD".to_string(),
            direction: "short".to_string(),
            entry_price: Some(dec!(1.0850)),
            exit_price: Some(dec!(1.0820)),
            lot_size: Some(dec!(1)),
            pnl: Some(dec!(300)),
            session: Some("newyork".to_string()),
            entry_quality: Some("High Probability".to_string()),
            ict_concepts: None,
            user_notes: None,
            broker_order_id: None,
            prop_firm_id: None,
            created_at: Utc::now(),
        }
    }

    fn challenge_row() -> DbChallenge {
        DbChallenge {
            id: Uuid::new_v4(),
            firm_name: "Topstep".to_string(),
            challenge_type: "Evaluation".to_string(),
            account_size: dec!(50000),
            profit_target: dec!(3000),
            daily_loss_limit: dec!(1000),
            max_loss_limit: dec!(2000),
            status: "breached".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn decodes_text_columns_into_enums() {
        let trade = Trade::try_from(row()).unwrap();
        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.session, Some(Session::NewYork));
        assert_eq!(trade.entry_quality, Some(EntryQuality::HighProbability));
        assert!(trade.ict_concepts.is_empty());
    }

    #[test]
    fn null_session_stays_untagged() {
        let mut raw = row();
        raw.session = None;
        raw.entry_quality = None;
        let trade = Trade::try_from(raw).unwrap();
        assert_eq!(trade.session, None);
        assert_eq!(trade.entry_quality, None);
    }

    #[test]
    fn unknown_enum_text_is_a_decode_error() {
        let mut raw = row();
        raw.session = Some("sydney".to_string());
        assert!(matches!(Trade::try_from(raw), Err(DbError::Decode(_))));
    }

    #[test]
    fn decodes_challenge_status() {
        let challenge = PropFirmChallenge::try_from(challenge_row()).unwrap();
        assert_eq!(challenge.status, ChallengeState::Breached);
        assert_eq!(challenge.max_loss_limit, dec!(2000));
        assert_eq!(challenge.end_date, NaiveDate::from_ymd_opt(2024, 6, 10));
    }

    #[test]
    fn unknown_challenge_status_is_a_decode_error() {
        let mut raw = challenge_row();
        raw.status = "paused".to_string();
        assert!(matches!(PropFirmChallenge::try_from(raw), Err(DbError::Decode(_))));
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        assert!(matches!(not_found_if_missing(sqlx::Error::RowNotFound), DbError::NotFound));
        assert!(matches!(
            not_found_if_missing(sqlx::Error::PoolTimedOut),
            DbError::ConnectionError(_)
        ));
    }
}
