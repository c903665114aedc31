//! # Tradelog Database Crate
//!
//! This crate is the journal's persistence layer: it stores trades in PostgreSQL
//! and hands a user's trades to the analytics engine.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application sees `Trade`
//!   values from `core-types`, never rows.
//! - **Access-scoped reads:** Every query is filtered by `user_id`. Downstream code
//!   trusts that the trades it receives belong to one user.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a shared `PgPool`.
//!
//! ## Public API
//!
//! - `connect`, `run_migrations`: Pool construction and schema setup.
//! - `DbRepository`: Trade reads, inserts and broker upserts, and prop-firm
//!   challenge bookkeeping.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::{DbChallenge, DbRepository, DbTrade, UpsertOutcome};
