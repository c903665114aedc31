use crate::{error::AppError, AppState};
use analytics::{AnalyticsSnapshot, ChallengeProgress};
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};
use chrono::{NaiveDate, Utc};
use core_types::{ChallengeState, PropFirmChallenge, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: Uuid,
}

/// A challenge together with its progress as of the request.
#[derive(Debug, Serialize)]
pub struct ChallengeOverview {
    pub challenge: PropFirmChallenge,
    pub progress: ChallengeProgress,
}

/// Body of `POST /api/users/:user_id/challenges`.
///
/// Omitted rules default to 8% / 5% / 10% of the account size and an omitted
/// start date to today.
#[derive(Debug, Deserialize)]
pub struct NewChallenge {
    pub firm_name: String,
    pub challenge_type: String,
    pub account_size: Decimal,
    #[serde(default)]
    pub profit_target: Option<Decimal>,
    #[serde(default)]
    pub daily_loss_limit: Option<Decimal>,
    #[serde(default)]
    pub max_loss_limit: Option<Decimal>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl NewChallenge {
    pub fn into_challenge(self, today: NaiveDate) -> PropFirmChallenge {
        let start_date = self.start_date.unwrap_or(today);
        let mut challenge =
            PropFirmChallenge::new(self.firm_name, self.challenge_type, self.account_size, start_date);
        if let Some(target) = self.profit_target {
            challenge.profit_target = target;
        }
        if let Some(limit) = self.daily_loss_limit {
            challenge.daily_loss_limit = limit;
        }
        if let Some(limit) = self.max_loss_limit {
            challenge.max_loss_limit = limit;
        }
        challenge
    }
}

/// Body of `PATCH /api/users/:user_id/challenges/:challenge_id`.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ChallengeState,
}

/// # GET /api/users/:user_id/analytics
/// Computes the analytics snapshot over every trade of the user.
pub async fn get_user_analytics(
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsSnapshot>, AppError> {
    let trades = state.db_repo.get_trades_for_user(user_id).await?;
    Ok(Json(state.engine.calculate(&trades)))
}

/// # GET /api/users/:user_id/trades
pub async fn get_user_trades(
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Trade>>, AppError> {
    let trades = state.db_repo.get_trades_for_user(user_id).await?;
    Ok(Json(trades))
}

/// # GET /api/users/:user_id/trades/:trade_id
pub async fn get_trade(
    Path((user_id, trade_id)): Path<(Uuid, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Trade>, AppError> {
    Ok(Json(state.db_repo.get_trade(user_id, trade_id).await?))
}

/// # POST /api/users/:user_id/trades
/// A trade may only be linked to a challenge of the same user.
pub async fn create_trade(
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(trade): Json<Trade>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    if let Some(challenge_id) = trade.prop_firm_id {
        state.db_repo.get_challenge(user_id, challenge_id).await?;
    }
    let id = state.db_repo.insert_trade(user_id, &trade).await?;
    tracing::info!(%user_id, trade_id = %id, "Trade journaled.");
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// # DELETE /api/users/:user_id/trades/:trade_id
pub async fn delete_trade(
    Path((user_id, trade_id)): Path<(Uuid, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.db_repo.delete_trade(user_id, trade_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # POST /api/analytics/preview
/// Computes a snapshot for the posted trades without touching the database.
pub async fn preview_analytics(
    State(state): State<Arc<AppState>>,
    Json(trades): Json<Vec<Trade>>,
) -> Json<AnalyticsSnapshot> {
    Json(state.engine.calculate(&trades))
}

/// # GET /api/users/:user_id/challenges
/// Every challenge of the user with its progress, most recent first.
pub async fn get_user_challenges(
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChallengeOverview>>, AppError> {
    let challenges = state.db_repo.get_challenges_for_user(user_id).await?;
    let trades = state.db_repo.get_trades_for_user(user_id).await?;
    let now = Utc::now();

    let overviews = challenges
        .into_iter()
        .map(|challenge| {
            let progress = state.engine.challenge_progress(&challenge, &trades, now);
            ChallengeOverview { challenge, progress }
        })
        .collect();
    Ok(Json(overviews))
}

/// # POST /api/users/:user_id/challenges
pub async fn create_challenge(
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewChallenge>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let challenge = request.into_challenge(Utc::now().date_naive());
    challenge.validate()?;
    let id = state.db_repo.insert_challenge(user_id, &challenge).await?;
    tracing::info!(%user_id, challenge_id = %id, firm = %challenge.firm_name, "Challenge created.");
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// # GET /api/users/:user_id/challenges/:challenge_id
pub async fn get_challenge(
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChallengeOverview>, AppError> {
    let challenge = state.db_repo.get_challenge(user_id, challenge_id).await?;
    let trades = state.db_repo.get_trades_for_challenge(user_id, challenge_id).await?;
    let progress = state.engine.challenge_progress(&challenge, &trades, Utc::now());
    Ok(Json(ChallengeOverview { challenge, progress }))
}

/// # PATCH /api/users/:user_id/challenges/:challenge_id
/// Marks a challenge passed, failed or breached (ending it today), or reopens it.
pub async fn update_challenge_status(
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
    State(state): State<Arc<AppState>>,
    Json(change): Json<StatusChange>,
) -> Result<StatusCode, AppError> {
    let today = Utc::now().date_naive();
    state
        .db_repo
        .update_challenge_status(user_id, challenge_id, change.status, Some(today))
        .await?;
    tracing::info!(%user_id, %challenge_id, status = %change.status, "Challenge status changed.");
    Ok(StatusCode::NO_CONTENT)
}

/// # DELETE /api/users/:user_id/challenges/:challenge_id
pub async fn delete_challenge(
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    state.db_repo.delete_challenge(user_id, challenge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_challenge_fills_in_default_rules() {
        let request: NewChallenge = serde_json::from_str(
            r#"{"firm_name": "Apex", "challenge_type": "Evaluation", "account_size": 50000,
                "max_loss_limit": 2500}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let challenge = request.into_challenge(today);

        assert_eq!(challenge.profit_target, dec!(4000));
        assert_eq!(challenge.daily_loss_limit, dec!(2500));
        assert_eq!(challenge.max_loss_limit, dec!(2500));
        assert_eq!(challenge.start_date, today);
        assert_eq!(challenge.status, ChallengeState::Active);
    }

    #[test]
    fn status_change_uses_lowercase_states() {
        let change: StatusChange = serde_json::from_str(r#"{"status": "passed"}"#).unwrap();
        assert_eq!(change.status, ChallengeState::Passed);
        assert!(serde_json::from_str::<StatusChange>(r#"{"status": "Passed"}"#).is_err());
    }
}
