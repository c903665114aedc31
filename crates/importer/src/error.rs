use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("Unknown contract {contract_id} for order {order_id}")]
    UnknownContract { order_id: i64, contract_id: i64 },

    #[error("P&L of order {order_id} does not fit in a decimal")]
    PnlOverflow { order_id: i64 },

    #[error("Failed to parse import file: {0}")]
    Parse(#[from] serde_json::Error),
}
