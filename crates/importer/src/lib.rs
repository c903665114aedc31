//! # Tradelog Broker Importer
//!
//! Turns broker fills into journal trades. Fills are grouped per order, each
//! complete order becomes one trade, and the trade is upserted so re-importing
//! the same window refreshes rows instead of duplicating them.
//!
//! Fetching fills from the broker is not this crate's job; callers hand over
//! the fills and a `ContractResolver` for instrument names.

use async_trait::async_trait;
use core_types::{Fill, Trade};
use database::{DbError, DbRepository, UpsertOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub mod error;
pub mod grouping;

pub use error::ImportError;
pub use grouping::{build_trade, group_fills, OrderFills};

/// Maps a broker contract id to the instrument name stored as the trade's pair.
pub trait ContractResolver {
    fn contract_name(&self, contract_id: i64) -> Option<String>;
}

impl ContractResolver for HashMap<i64, String> {
    fn contract_name(&self, contract_id: i64) -> Option<String> {
        self.get(&contract_id).cloned()
    }
}

/// Where imported trades are written.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn upsert_broker_trade(&self, user_id: Uuid, trade: &Trade) -> Result<UpsertOutcome, DbError>;
}

#[async_trait]
impl TradeStore for DbRepository {
    async fn upsert_broker_trade(&self, user_id: Uuid, trade: &Trade) -> Result<UpsertOutcome, DbError> {
        DbRepository::upsert_broker_trade(self, user_id, trade).await
    }
}

/// The on-disk import format: contract names plus the raw fills.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportFile {
    #[serde(default)]
    pub contracts: HashMap<i64, String>,
    pub fills: Vec<Fill>,
}

impl ImportFile {
    pub fn from_json(raw: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub new_trades: usize,
    pub updated_trades: usize,
    /// One message per order that could not be imported.
    pub errors: Vec<String>,
}

/// Imports fills for one user through a `TradeStore`.
pub struct Importer<S> {
    store: S,
}

impl<S: TradeStore> Importer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Groups `fills` into trades and upserts each one.
    ///
    /// A failing order is recorded in `errors` and does not stop the others.
    pub async fn run<R>(&self, user_id: Uuid, fills: Vec<Fill>, resolver: &R) -> SyncReport
    where
        R: ContractResolver + Sync + ?Sized,
    {
        let mut report = SyncReport::default();
        let orders = group_fills(fills);
        tracing::info!(%user_id, orders = orders.len(), "Importing broker orders.");

        for order in &orders {
            let trade = match build_trade(order, resolver) {
                Ok(Some(trade)) => trade,
                Ok(None) => {
                    tracing::debug!(order_id = order.order_id, "Skipping incomplete order.");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(order_id = order.order_id, error = %e, "Failed to build trade.");
                    report.errors.push(format!("Error processing order {}: {}", order.order_id, e));
                    continue;
                }
            };

            match self.store.upsert_broker_trade(user_id, &trade).await {
                Ok(UpsertOutcome::Inserted) => report.new_trades += 1,
                Ok(UpsertOutcome::Updated) => report.updated_trades += 1,
                Err(e) => {
                    tracing::error!(order_id = order.order_id, error = ?e, "Failed to save trade.");
                    report.errors.push(format!("Failed to save trade {}: {}", order.order_id, e));
                }
            }
        }

        report.success = report.errors.is_empty();
        tracing::info!(
            new = report.new_trades,
            updated = report.updated_trades,
            errors = report.errors.len(),
            "Import finished."
        );
        report
    }
}
