use crate::enums::{ChallengeState, Direction, EntryQuality, FillAction, Outcome, Session};
use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A single journaled trade.
///
/// Trades are owned by the persistence layer; everything downstream reads them.
/// Numeric fields are optional because manual entries are frequently partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(deserialize_with = "deserialize_trade_date")]
    pub trade_date: DateTime<Utc>,
    pub pair: String,
    pub direction: Direction,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub lot_size: Option<Decimal>,
    #[serde(default)]
    pub pnl: Option<Decimal>,
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub entry_quality: Option<EntryQuality>,
    /// Concepts tagged on the chart. Not deduplicated.
    #[serde(default, deserialize_with = "deserialize_concepts")]
    pub ict_concepts: Vec<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    /// Broker order the trade was synced from, if any.
    #[serde(default)]
    pub broker_order_id: Option<i64>,
    /// Prop-firm challenge the trade counts toward, if any.
    #[serde(default)]
    pub prop_firm_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Creates a bare trade with no prices, P&L or tags.
    pub fn new(trade_date: DateTime<Utc>, pair: impl Into<String>, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            trade_date,
            pair: pair.into(),
            direction,
            entry_price: None,
            exit_price: None,
            lot_size: None,
            pnl: None,
            session: None,
            entry_quality: None,
            ict_concepts: Vec::new(),
            user_notes: None,
            broker_order_id: None,
            prop_firm_id: None,
            created_at: None,
        }
    }

    /// P&L with a missing value treated as zero, for summation.
    pub fn pnl_or_zero(&self) -> Decimal {
        self.pnl.unwrap_or(Decimal::ZERO)
    }

    pub fn outcome(&self) -> Outcome {
        match self.pnl {
            Some(pnl) if pnl > Decimal::ZERO => Outcome::Win,
            Some(pnl) if pnl < Decimal::ZERO => Outcome::Loss,
            _ => Outcome::Flat,
        }
    }

    pub fn is_win(&self) -> bool {
        self.outcome() == Outcome::Win
    }
}

/// A single broker execution. Several fills of the same order form one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub id: i64,
    pub order_id: i64,
    pub contract_id: i64,
    pub timestamp: DateTime<Utc>,
    pub trade_date: NaiveDate,
    pub action: FillAction,
    pub qty: Decimal,
    pub price: Decimal,
}

/// A funded-account evaluation run at a prop firm, with its risk rules.
///
/// Limits are positive amounts in account currency. Progress against them is
/// derived from the trades linked through `Trade::prop_firm_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropFirmChallenge {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub firm_name: String,
    pub challenge_type: String,
    pub account_size: Decimal,
    pub profit_target: Decimal,
    pub daily_loss_limit: Decimal,
    pub max_loss_limit: Decimal,
    #[serde(default)]
    pub status: ChallengeState,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PropFirmChallenge {
    /// Profit target as a share of the account size (8%).
    pub const DEFAULT_PROFIT_TARGET: Decimal = Decimal::from_parts(8, 0, 0, false, 2);
    /// Daily loss limit as a share of the account size (5%).
    pub const DEFAULT_DAILY_LOSS: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
    /// Overall loss limit as a share of the account size (10%).
    pub const DEFAULT_MAX_LOSS: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

    /// Creates an active challenge with the common 8% / 5% / 10% rules.
    pub fn new(
        firm_name: impl Into<String>,
        challenge_type: impl Into<String>,
        account_size: Decimal,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            firm_name: firm_name.into(),
            challenge_type: challenge_type.into(),
            account_size,
            profit_target: account_size.saturating_mul(Self::DEFAULT_PROFIT_TARGET),
            daily_loss_limit: account_size.saturating_mul(Self::DEFAULT_DAILY_LOSS),
            max_loss_limit: account_size.saturating_mul(Self::DEFAULT_MAX_LOSS),
            status: ChallengeState::Active,
            start_date,
            end_date: None,
            created_at: None,
        }
    }

    /// Rejects challenges whose rules cannot be evaluated.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.firm_name.trim().is_empty() {
            return Err(CoreError::InvalidInput("firm_name".to_string(), "empty".to_string()));
        }
        let amounts = [
            ("account_size", self.account_size),
            ("profit_target", self.profit_target),
            ("daily_loss_limit", self.daily_loss_limit),
            ("max_loss_limit", self.max_loss_limit),
        ];
        for (field, value) in amounts {
            if value <= Decimal::ZERO {
                return Err(CoreError::InvalidInput(field.to_string(), value.to_string()));
            }
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(CoreError::InvalidInput("end_date".to_string(), end.to_string()));
            }
        }
        Ok(())
    }
}

fn deserialize_trade_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_trade_date(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_concepts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_trade_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid trade_date '{}'", raw))
}
