use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything the analytics dashboard renders for one user.
///
/// This struct is the output of the `AnalyticsEngine`. It is rebuilt from scratch
/// on every call and never persisted. Field names follow the dashboard's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    // I. Overview
    pub total_trades: usize,
    /// Trades with `pnl > 0`.
    pub winning_trades: usize,
    /// Trades with `pnl < 0`. Zero and missing P&L count in neither.
    pub losing_trades: usize,
    pub win_rate: Decimal,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    pub avg_win: Decimal,
    /// Positive magnitude.
    pub avg_loss: Decimal,
    pub profit_factor: Decimal,
    #[serde(rename = "avgRR")]
    pub avg_rr: Decimal,
    pub best_trade: Decimal,
    pub worst_trade: Decimal,

    // II. Chart data
    pub pnl_over_time: Vec<PnlPoint>,
    pub session_stats: Vec<BreakdownStat>,
    pub concept_stats: Vec<BreakdownStat>,
    pub entry_quality_stats: Vec<BreakdownStat>,
    pub daily_stats: Vec<BreakdownStat>,
    pub pair_stats: Vec<BreakdownStat>,
}

impl AnalyticsSnapshot {
    /// Creates a zeroed-out snapshot, which is also the result for no trades.
    pub fn new() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            avg_rr: Decimal::ZERO,
            best_trade: Decimal::ZERO,
            worst_trade: Decimal::ZERO,
            pnl_over_time: Vec::new(),
            session_stats: Vec::new(),
            concept_stats: Vec::new(),
            entry_quality_stats: Vec::new(),
            daily_stats: Vec::new(),
            pair_stats: Vec::new(),
        }
    }
}

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// One point of the cumulative P&L curve. There is one point per trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    /// Short label such as `Mar 4`, in the engine's time zone.
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub pnl: Decimal,
    pub cumulative: Decimal,
}

/// A row of one of the breakdown tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownStat {
    /// The raw grouping key (`newyork`, `High Probability`, `Mon`, `EURUSD`, ...).
    pub key: String,
    /// Display label. Only differs from `key` for sessions.
    pub label: String,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: Decimal,
    pub pnl: Decimal,
}
