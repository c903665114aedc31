use crate::breakdown;
use crate::report::{AnalyticsSnapshot, PnlPoint};
use chrono::{Datelike, FixedOffset, Offset, Utc, Weekday};
use core_types::{EntryQuality, Outcome, Session, Trade};
use rust_decimal::{Decimal, RoundingStrategy};

/// Reported profit factor when there are winning trades but no losing ones.
pub const PROFIT_FACTOR_NO_LOSSES: Decimal = Decimal::from_parts(999, 0, 0, false, 0);

/// Weekdays in the order the daily table lists them.
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A stateless calculator for deriving dashboard analytics from journaled trades.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    /// Zone used for weekday grouping, date labels and "today".
    pub(crate) offset: FixedOffset,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl AnalyticsEngine {
    /// Creates an engine that reads dates in UTC.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that reads dates in the given fixed offset.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The main entry point for calculating the dashboard analytics.
    ///
    /// # Arguments
    ///
    /// * `trades` - Every trade of one user, in any order.
    ///
    /// # Returns
    ///
    /// A freshly built `AnalyticsSnapshot`. An empty slice yields the zeroed snapshot.
    pub fn calculate(&self, trades: &[Trade]) -> AnalyticsSnapshot {
        tracing::debug!(
            trades = trades.len(),
            utc_offset = %self.offset,
            "Calculating analytics snapshot."
        );

        let mut report = AnalyticsSnapshot::new();
        if trades.is_empty() {
            return report;
        }

        self.calculate_overview(trades, &mut report);
        report.pnl_over_time = self.pnl_over_time(trades);

        report.session_stats = breakdown::by_fixed_keys(
            trades,
            &Session::ALL,
            |t, session| t.session == Some(*session),
            |session| session.key().to_string(),
            |session| session.label().to_string(),
        );
        report.concept_stats =
            breakdown::by_open_keys(trades, |t| t.ict_concepts.iter().map(String::as_str));
        report.entry_quality_stats = breakdown::by_fixed_keys(
            trades,
            &EntryQuality::ALL,
            |t, quality| t.entry_quality == Some(*quality),
            |quality| quality.as_str().to_string(),
            |quality| quality.as_str().to_string(),
        );
        report.daily_stats = breakdown::by_fixed_keys(
            trades,
            &WEEKDAYS,
            |t, day| t.trade_date.with_timezone(&self.offset).weekday() == *day,
            |day| day.to_string(),
            |day| day.to_string(),
        );
        report.pair_stats = breakdown::by_open_keys(trades, |t| std::iter::once(t.pair.as_str()));

        report
    }

    /// Calculates the overview scalars.
    fn calculate_overview(&self, trades: &[Trade], report: &mut AnalyticsSnapshot) {
        report.total_trades = trades.len();

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut total_pnl = Decimal::ZERO;

        for trade in trades {
            let pnl = trade.pnl_or_zero();
            total_pnl = total_pnl.saturating_add(pnl);

            match trade.outcome() {
                Outcome::Win => {
                    gross_profit = gross_profit.saturating_add(pnl);
                    report.winning_trades += 1;
                }
                Outcome::Loss => {
                    gross_loss = gross_loss.saturating_add(pnl.abs());
                    report.losing_trades += 1;
                }
                Outcome::Flat => {}
            }
        }

        let average_win = average(gross_profit, report.winning_trades);
        let average_loss = average(gross_loss, report.losing_trades);

        let profit_factor = if gross_loss > Decimal::ZERO {
            ratio(gross_profit, gross_loss)
        } else if gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_NO_LOSSES
        } else {
            Decimal::ZERO
        };

        let avg_rr = if average_loss > Decimal::ZERO {
            ratio(average_win, average_loss)
        } else {
            Decimal::ZERO
        };

        // Non-empty here, so the extremes always exist.
        let best = trades.iter().map(Trade::pnl_or_zero).max().unwrap_or_default();
        let worst = trades.iter().map(Trade::pnl_or_zero).min().unwrap_or_default();

        report.win_rate = rate_pct(report.winning_trades, report.total_trades);
        report.total_pnl = round_money(total_pnl);
        report.avg_win = round_money(average_win);
        report.avg_loss = round_money(average_loss);
        report.profit_factor = round_money(profit_factor);
        report.avg_rr = round_money(avg_rr);
        report.best_trade = round_money(best);
        report.worst_trade = round_money(worst);
    }

    /// Builds the cumulative P&L curve, one point per trade in date order.
    fn pnl_over_time(&self, trades: &[Trade]) -> Vec<PnlPoint> {
        let mut sorted: Vec<&Trade> = trades.iter().collect();
        // `sort_by_key` is stable: same-instant trades keep input order.
        sorted.sort_by_key(|t| t.trade_date);

        let mut cumulative = Decimal::ZERO;
        sorted
            .into_iter()
            .map(|trade| {
                let pnl = trade.pnl_or_zero();
                cumulative = round_money(cumulative.saturating_add(pnl));
                PnlPoint {
                    date: trade
                        .trade_date
                        .with_timezone(&self.offset)
                        .format("%b %-d")
                        .to_string(),
                    timestamp: trade.trade_date,
                    pnl,
                    cumulative,
                }
            })
            .collect()
    }
}

/// `numerator / denominator` for a positive denominator, saturating at
/// `Decimal::MAX` when the quotient does not fit.
fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::MAX)
}

/// Sums P&L values, saturating at the `Decimal` bounds.
pub(crate) fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count > 0 {
        total / Decimal::from(count)
    } else {
        Decimal::ZERO
    }
}

/// Rounds a monetary value or ratio to 2 decimals.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, rounded to 1 decimal. Zero when `whole` is zero.
pub(crate) fn rate_pct(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    round_rate(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// Rounds a percentage to 1 decimal.
pub(crate) fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::Direction;
    use rust_decimal_macros::dec;

    fn trade_on(day: u32, hour: u32, pnl: Option<Decimal>) -> Trade {
        let date = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        let mut trade = Trade::new(date, "EURUSD", Direction::Long);
        trade.pnl = pnl;
        trade
    }

    #[test]
    fn test_empty_input_yields_zeroed_snapshot() {
        let report = AnalyticsEngine::new().calculate(&[]);
        assert_eq!(report, AnalyticsSnapshot::new());
    }

    #[test]
    fn test_rates_round_to_one_decimal() {
        assert_eq!(rate_pct(2, 3), dec!(66.7));
        assert_eq!(rate_pct(1, 8), dec!(12.5));
        assert_eq!(rate_pct(1, 16), dec!(6.3));
        assert_eq!(rate_pct(0, 0), Decimal::ZERO);
    }

    #[test]
    fn test_money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_money(dec!(3.14159)), dec!(3.14));
    }

    #[test]
    fn test_profit_factor_sentinel_when_no_losses() {
        let trades = vec![trade_on(4, 9, Some(dec!(10))), trade_on(5, 9, Some(dec!(5)))];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.profit_factor, dec!(999));
        assert_eq!(report.avg_rr, Decimal::ZERO);
        assert_eq!(report.avg_loss, Decimal::ZERO);
    }

    #[test]
    fn test_profit_factor_zero_when_all_flat() {
        let trades = vec![trade_on(4, 9, None), trade_on(5, 9, Some(Decimal::ZERO))];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.profit_factor, Decimal::ZERO);
        assert_eq!(report.winning_trades + report.losing_trades, 0);
        assert_eq!(report.best_trade, Decimal::ZERO);
        assert_eq!(report.worst_trade, Decimal::ZERO);
    }

    #[test]
    fn test_avg_rr_uses_unrounded_averages() {
        let trades = vec![
            trade_on(4, 9, Some(dec!(10))),
            trade_on(4, 10, Some(dec!(-3))),
            trade_on(4, 11, Some(dec!(-3))),
            trade_on(4, 12, Some(dec!(-3))),
        ];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.avg_loss, dec!(3.00));
        assert_eq!(report.avg_rr, dec!(3.33));
        assert_eq!(report.profit_factor, dec!(1.11));
    }

    #[test]
    fn test_tiny_loss_saturates_ratios() {
        let trades = vec![
            trade_on(4, 9, Some(dec!(10000000000))),
            trade_on(4, 10, Some(dec!(-0.00000000000000000001))),
        ];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.profit_factor, Decimal::MAX);
        assert_eq!(report.avg_rr, Decimal::MAX);
        assert_eq!(report.avg_loss, Decimal::ZERO);
        assert_eq!(report.total_pnl, dec!(10000000000.00));
    }

    #[test]
    fn test_huge_pnl_sums_saturate() {
        let huge = dec!(70000000000000000000000000000);
        let trades = vec![trade_on(4, 9, Some(huge)), trade_on(5, 9, Some(huge))];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.total_pnl, Decimal::MAX);
        assert_eq!(report.best_trade, huge);
        assert_eq!(report.pnl_over_time[1].cumulative, Decimal::MAX);
        assert_eq!(report.pair_stats[0].pnl, Decimal::MAX);
        assert_eq!(report.daily_stats.len(), 2);
    }

    #[test]
    fn test_huge_losses_saturate_downward() {
        let huge_loss = dec!(-70000000000000000000000000000);
        let trades = vec![trade_on(4, 9, Some(huge_loss)), trade_on(5, 9, Some(huge_loss))];
        let report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(report.total_pnl, Decimal::MIN);
        assert_eq!(report.pnl_over_time[1].cumulative, Decimal::MIN);
        assert_eq!(report.profit_factor, Decimal::ZERO);
    }

    #[test]
    fn test_pnl_curve_is_sorted_and_stable_on_ties() {
        let mut first = trade_on(5, 9, Some(dec!(1)));
        first.pair = "FIRST".into();
        let mut second = trade_on(5, 9, Some(dec!(2)));
        second.pair = "SECOND".into();
        let earlier = trade_on(4, 9, Some(dec!(-4)));

        let report = AnalyticsEngine::new().calculate(&[first, second, earlier]);
        let pnls: Vec<Decimal> = report.pnl_over_time.iter().map(|p| p.pnl).collect();
        assert_eq!(pnls, vec![dec!(-4), dec!(1), dec!(2)]);
        let cumulative: Vec<Decimal> = report.pnl_over_time.iter().map(|p| p.cumulative).collect();
        assert_eq!(cumulative, vec![dec!(-4), dec!(-3), dec!(-1)]);
        assert_eq!(report.pnl_over_time[0].date, "Mar 4");
    }

    #[test]
    fn test_offset_moves_weekday_and_label() {
        // Monday 2024-03-04 02:00 UTC is still Sunday in New York (UTC-5).
        let trades = vec![trade_on(4, 2, Some(dec!(1)))];

        let utc_report = AnalyticsEngine::new().calculate(&trades);
        assert_eq!(utc_report.daily_stats[0].key, "Mon");

        let ny = FixedOffset::west_opt(5 * 3600).unwrap();
        let ny_report = AnalyticsEngine::with_offset(ny).calculate(&trades);
        assert_eq!(ny_report.daily_stats[0].key, "Sun");
        assert_eq!(ny_report.pnl_over_time[0].date, "Mar 3");
    }

    #[test]
    fn test_unknown_session_and_quality_are_left_out() {
        let mut tagged = trade_on(4, 9, Some(dec!(5)));
        tagged.session = Some(Session::Asia);
        tagged.entry_quality = Some(EntryQuality::Aggressive);
        let untagged = trade_on(4, 10, Some(dec!(7)));

        let report = AnalyticsEngine::new().calculate(&[tagged, untagged]);
        assert_eq!(report.session_stats.len(), 1);
        assert_eq!(report.session_stats[0].key, "asia");
        assert_eq!(report.session_stats[0].label, "Asia");
        assert_eq!(report.entry_quality_stats.len(), 1);
        assert_eq!(report.entry_quality_stats[0].key, "Aggressive");
        assert_eq!(report.total_pnl, dec!(12));
    }
}
