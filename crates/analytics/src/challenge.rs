use crate::engine::{round_money, round_rate, saturating_sum, AnalyticsEngine};
use chrono::{DateTime, Utc};
use core_types::{PropFirmChallenge, Trade};
use rust_decimal::Decimal;
use serde::Serialize;

/// Share of a loss limit, in percent, at which a rule is flagged as close to breach.
pub const LOSS_WARNING_PCT: Decimal = Decimal::from_parts(70, 0, 0, false, 0);

/// Where a prop-firm challenge stands against its rules.
///
/// Progress values are percentages capped to `0..=100`. Money values are
/// rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeProgress {
    pub trade_count: usize,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    #[serde(rename = "todayPnL")]
    pub today_pnl: Decimal,
    pub current_balance: Decimal,

    pub profit_progress: Decimal,
    pub profit_remaining: Decimal,
    pub profit_target_reached: bool,

    /// Today's loss, as a positive amount.
    pub daily_loss_used: Decimal,
    pub daily_loss_progress: Decimal,
    pub daily_loss_remaining: Decimal,
    pub daily_loss_warning: bool,
    pub daily_loss_breached: bool,

    /// Overall loss, as a positive amount.
    pub max_loss_used: Decimal,
    pub max_loss_progress: Decimal,
    pub max_loss_remaining: Decimal,
    pub max_loss_warning: bool,
    pub max_loss_breached: bool,

    /// Calendar days since the start date, counting the start day as day 1.
    pub days_trading: i64,
}

impl ChallengeProgress {
    /// True when either loss limit has been hit.
    pub fn rule_breached(&self) -> bool {
        self.daily_loss_breached || self.max_loss_breached
    }
}

/// Progress against one limit: the unrounded share in percent and the flags.
struct LimitUsage {
    used: Decimal,
    pct: Decimal,
    remaining: Decimal,
    warning: bool,
    breached: bool,
}

impl LimitUsage {
    fn of_loss(pnl: Decimal, limit: Decimal) -> Self {
        let used = pnl.min(Decimal::ZERO).abs();
        let pct = progress_pct(used, limit);
        Self {
            used,
            pct,
            remaining: limit.saturating_sub(used).max(Decimal::ZERO),
            warning: pct >= LOSS_WARNING_PCT,
            breached: used >= limit,
        }
    }
}

impl AnalyticsEngine {
    /// Evaluates `challenge` against the trades linked to it at instant `now`.
    ///
    /// Trades whose `prop_firm_id` is not the challenge's id are ignored, so a
    /// user's whole journal can be passed in. "Today" is the calendar day of
    /// `now` in the engine's offset.
    pub fn challenge_progress(
        &self,
        challenge: &PropFirmChallenge,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> ChallengeProgress {
        let today = now.with_timezone(&self.offset).date_naive();
        let linked: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.prop_firm_id == Some(challenge.id))
            .collect();

        let total_pnl = saturating_sum(linked.iter().map(|t| t.pnl_or_zero()));
        let today_pnl = saturating_sum(
            linked
                .iter()
                .filter(|t| t.trade_date.with_timezone(&self.offset).date_naive() == today)
                .map(|t| t.pnl_or_zero()),
        );

        let profit = total_pnl.max(Decimal::ZERO);
        let daily = LimitUsage::of_loss(today_pnl, challenge.daily_loss_limit);
        let overall = LimitUsage::of_loss(total_pnl, challenge.max_loss_limit);

        // A closed challenge stops counting days at its end date.
        let last_day = match challenge.end_date {
            Some(end) if challenge.status.is_closed() => end.min(today),
            _ => today,
        };
        let days_trading = ((last_day - challenge.start_date).num_days() + 1).max(0);

        tracing::debug!(
            firm = %challenge.firm_name,
            trades = linked.len(),
            "Evaluated challenge progress."
        );

        ChallengeProgress {
            trade_count: linked.len(),
            total_pnl: round_money(total_pnl),
            today_pnl: round_money(today_pnl),
            current_balance: round_money(challenge.account_size.saturating_add(total_pnl)),

            profit_progress: round_rate(progress_pct(profit, challenge.profit_target)),
            profit_remaining: round_money(
                challenge.profit_target.saturating_sub(profit).max(Decimal::ZERO),
            ),
            profit_target_reached: total_pnl >= challenge.profit_target,

            daily_loss_used: round_money(daily.used),
            daily_loss_progress: round_rate(daily.pct),
            daily_loss_remaining: round_money(daily.remaining),
            daily_loss_warning: daily.warning,
            daily_loss_breached: daily.breached,

            max_loss_used: round_money(overall.used),
            max_loss_progress: round_rate(overall.pct),
            max_loss_remaining: round_money(overall.remaining),
            max_loss_warning: overall.warning,
            max_loss_breached: overall.breached,

            days_trading,
        }
    }
}

/// `amount / limit * 100`, capped to `0..=100`. Unrounded.
fn progress_pct(amount: Decimal, limit: Decimal) -> Decimal {
    if limit <= Decimal::ZERO {
        return if amount > Decimal::ZERO { Decimal::ONE_HUNDRED } else { Decimal::ZERO };
    }
    amount
        .checked_div(limit)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ONE_HUNDRED)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use core_types::{ChallengeState, Direction};
    use rust_decimal_macros::dec;

    fn challenge() -> PropFirmChallenge {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        PropFirmChallenge::new("FTMO", "Phase 1", dec!(100000), start)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 7, 15, 0, 0).unwrap()
    }

    fn linked(challenge: &PropFirmChallenge, day: u32, hour: u32, pnl: Decimal) -> Trade {
        let date = Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap();
        let mut trade = Trade::new(date, "NQ", Direction::Long);
        trade.pnl = Some(pnl);
        trade.prop_firm_id = Some(challenge.id);
        trade
    }

    #[test]
    fn fresh_challenge_starts_at_account_size() {
        let challenge = challenge();
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &[], now());
        assert_eq!(progress.trade_count, 0);
        assert_eq!(progress.current_balance, dec!(100000));
        assert_eq!(progress.profit_progress, Decimal::ZERO);
        assert_eq!(progress.profit_remaining, dec!(8000));
        assert_eq!(progress.daily_loss_remaining, dec!(5000));
        assert_eq!(progress.days_trading, 5);
        assert!(!progress.rule_breached());
    }

    #[test]
    fn daily_loss_warns_at_seventy_percent() {
        let challenge = challenge();
        let engine = AnalyticsEngine::new();

        let at_threshold = [linked(&challenge, 7, 9, dec!(-3500))];
        let progress = engine.challenge_progress(&challenge, &at_threshold, now());
        assert_eq!(progress.daily_loss_progress, dec!(70.0));
        assert!(progress.daily_loss_warning);
        assert!(!progress.daily_loss_breached);

        // 69.98% reports as 70.0 but stays below the warning line.
        let just_below = [linked(&challenge, 7, 9, dec!(-3499))];
        let progress = engine.challenge_progress(&challenge, &just_below, now());
        assert_eq!(progress.daily_loss_progress, dec!(70.0));
        assert!(!progress.daily_loss_warning);
    }

    #[test]
    fn daily_loss_breach_caps_progress() {
        let challenge = challenge();
        let engine = AnalyticsEngine::new();

        let at_limit = [linked(&challenge, 7, 9, dec!(-5000))];
        let progress = engine.challenge_progress(&challenge, &at_limit, now());
        assert!(progress.daily_loss_breached);
        assert_eq!(progress.daily_loss_progress, dec!(100));
        assert_eq!(progress.daily_loss_remaining, Decimal::ZERO);

        let past_limit = [linked(&challenge, 7, 9, dec!(-4000)), linked(&challenge, 7, 11, dec!(-2000))];
        let progress = engine.challenge_progress(&challenge, &past_limit, now());
        assert_eq!(progress.daily_loss_used, dec!(6000));
        assert_eq!(progress.daily_loss_progress, dec!(100));
        assert!(progress.rule_breached());
    }

    #[test]
    fn earlier_losses_count_toward_max_loss_only() {
        let challenge = challenge();
        let trades = [linked(&challenge, 4, 9, dec!(-6000)), linked(&challenge, 7, 9, dec!(-1500))];
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());

        assert_eq!(progress.today_pnl, dec!(-1500));
        assert_eq!(progress.daily_loss_progress, dec!(30.0));
        assert!(!progress.daily_loss_warning);

        assert_eq!(progress.max_loss_used, dec!(7500));
        assert_eq!(progress.max_loss_progress, dec!(75.0));
        assert!(progress.max_loss_warning);
        assert!(!progress.max_loss_breached);
        assert_eq!(progress.current_balance, dec!(92500));
    }

    #[test]
    fn max_loss_breach_is_flagged() {
        let challenge = challenge();
        let trades = [linked(&challenge, 5, 9, dec!(-10000))];
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());
        assert!(progress.max_loss_breached);
        assert!(!progress.daily_loss_breached);
        assert!(progress.rule_breached());
    }

    #[test]
    fn profit_target_reached_caps_at_hundred() {
        let challenge = challenge();
        let trades = [linked(&challenge, 4, 9, dec!(5000)), linked(&challenge, 6, 9, dec!(4000))];
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());
        assert!(progress.profit_target_reached);
        assert_eq!(progress.profit_progress, dec!(100));
        assert_eq!(progress.profit_remaining, Decimal::ZERO);
        assert_eq!(progress.current_balance, dec!(109000));
    }

    #[test]
    fn unlinked_trades_are_ignored() {
        let challenge = challenge();
        let mut other = linked(&challenge, 7, 9, dec!(-4900));
        other.prop_firm_id = None;
        let trades = [other, linked(&challenge, 7, 10, dec!(250))];

        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());
        assert_eq!(progress.trade_count, 1);
        assert_eq!(progress.total_pnl, dec!(250));
        assert!(!progress.daily_loss_warning);
    }

    #[test]
    fn today_follows_the_engine_offset() {
        let challenge = challenge();
        // 02:00 UTC on June 7 is still June 6 in New York.
        let trades = [linked(&challenge, 7, 2, dec!(-4000))];
        let ny = FixedOffset::west_opt(4 * 3600).unwrap();

        let utc = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());
        assert_eq!(utc.today_pnl, dec!(-4000));

        let local = AnalyticsEngine::with_offset(ny).challenge_progress(&challenge, &trades, now());
        assert_eq!(local.today_pnl, Decimal::ZERO);
        assert_eq!(local.total_pnl, dec!(-4000));
    }

    #[test]
    fn closed_challenge_stops_counting_days() {
        let mut challenge = challenge();
        challenge.status = ChallengeState::Passed;
        challenge.end_date = NaiveDate::from_ymd_opt(2024, 6, 4);
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &[], now());
        assert_eq!(progress.days_trading, 2);
    }

    #[test]
    fn tiny_limit_does_not_overflow() {
        let mut challenge = challenge();
        challenge.max_loss_limit = dec!(0.00000000000000000001);
        let trades = [linked(&challenge, 5, 9, dec!(-10000000000))];
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &trades, now());
        assert_eq!(progress.max_loss_progress, dec!(100));
        assert!(progress.max_loss_breached);
    }
}
