//! # Tradelog Analytics Engine
//!
//! This crate turns a user's journaled trades into the numbers behind the
//! analytics dashboard: overview statistics, the cumulative P&L curve and the
//! per-session, per-concept, per-entry-quality, per-weekday and per-pair tables.
//! It also tracks prop-firm challenges against their profit target and loss
//! limits.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** This crate has no knowledge of external systems. It depends
//!   only on `core-types`. The caller supplies the already access-scoped trades.
//! - **Stateless Calculation:** The `AnalyticsEngine` keeps no state between
//!   calls. Every call recomputes the whole `AnalyticsSnapshot` from its input,
//!   so it is safe to share one engine across threads.
//! - **Total:** Calculation never fails. Missing P&L counts as zero in sums and
//!   as neither a win nor a loss. Sums saturate at the `Decimal` bounds and
//!   ratios that do not fit report `Decimal::MAX`.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: The calculator.
//! - `AnalyticsSnapshot`: Everything the dashboard renders.
//! - `BreakdownStat`, `PnlPoint`: The rows of the breakdown tables and the P&L curve.
//! - `ChallengeProgress`: A prop-firm challenge measured against its rules.

// Declare the modules that constitute this crate.
mod breakdown;
pub mod challenge;
pub mod engine;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use challenge::{ChallengeProgress, LOSS_WARNING_PCT};
pub use engine::{AnalyticsEngine, PROFIT_FACTOR_NO_LOSSES};
pub use report::{AnalyticsSnapshot, BreakdownStat, PnlPoint};
