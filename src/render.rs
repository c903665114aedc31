use analytics::{AnalyticsSnapshot, BreakdownStat, ChallengeProgress};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use core_types::PropFirmChallenge;

/// Renders the overview and every non-empty breakdown as terminal tables.
pub fn render_snapshot(snapshot: &AnalyticsSnapshot) -> String {
    let mut sections = vec![render_overview(snapshot).to_string()];

    let breakdowns = [
        ("Session", &snapshot.session_stats),
        ("ICT Concept", &snapshot.concept_stats),
        ("Entry Quality", &snapshot.entry_quality_stats),
        ("Weekday", &snapshot.daily_stats),
        ("Pair", &snapshot.pair_stats),
    ];
    for (title, stats) in breakdowns {
        if !stats.is_empty() {
            sections.push(render_breakdown(title, stats).to_string());
        }
    }

    sections.join("\n\n")
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table
}

fn render_overview(snapshot: &AnalyticsSnapshot) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);

    let rows = [
        ("Total Trades", snapshot.total_trades.to_string()),
        ("Winning Trades", snapshot.winning_trades.to_string()),
        ("Losing Trades", snapshot.losing_trades.to_string()),
        ("Win Rate", format!("{:.1}%", snapshot.win_rate)),
        ("Total P&L", format!("{:.2}", snapshot.total_pnl)),
        ("Avg Win", format!("{:.2}", snapshot.avg_win)),
        ("Avg Loss", format!("{:.2}", snapshot.avg_loss)),
        ("Profit Factor", format!("{:.2}", snapshot.profit_factor)),
        ("Avg R:R", format!("{:.2}", snapshot.avg_rr)),
        ("Best Trade", format!("{:.2}", snapshot.best_trade)),
        ("Worst Trade", format!("{:.2}", snapshot.worst_trade)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value).set_alignment(CellAlignment::Right)]);
    }
    table
}

fn render_breakdown(title: &str, stats: &[BreakdownStat]) -> Table {
    let mut table = new_table();
    table.set_header(vec![title, "Trades", "Wins", "Win Rate", "P&L"]);
    for stat in stats {
        table.add_row(vec![
            Cell::new(&stat.label),
            Cell::new(stat.trades).set_alignment(CellAlignment::Right),
            Cell::new(stat.wins).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", stat.win_rate)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", stat.pnl)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Renders one row per challenge with its progress against the rules.
pub fn render_challenges(rows: &[(PropFirmChallenge, ChallengeProgress)]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Firm", "Type", "Status", "Balance", "P&L", "Today", "Target", "Daily Loss", "Max Loss", "Day",
    ]);
    for (challenge, progress) in rows {
        table.add_row(vec![
            Cell::new(&challenge.firm_name),
            Cell::new(&challenge.challenge_type),
            Cell::new(challenge.status),
            money_cell(progress.current_balance),
            money_cell(progress.total_pnl),
            money_cell(progress.today_pnl),
            progress_cell(progress.profit_progress, false, progress.profit_target_reached),
            progress_cell(progress.daily_loss_progress, progress.daily_loss_warning, progress.daily_loss_breached),
            progress_cell(progress.max_loss_progress, progress.max_loss_warning, progress.max_loss_breached),
            Cell::new(progress.days_trading).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

fn money_cell(value: rust_decimal::Decimal) -> Cell {
    Cell::new(format!("{:.2}", value)).set_alignment(CellAlignment::Right)
}

/// `hit` marks a reached target or a breached limit.
fn progress_cell(pct: rust_decimal::Decimal, warning: bool, hit: bool) -> Cell {
    let cell = Cell::new(format!("{:.1}%", pct)).set_alignment(CellAlignment::Right);
    match (warning, hit) {
        (_, true) => cell.fg(Color::Red),
        (true, false) => cell.fg(Color::Yellow),
        _ => cell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::AnalyticsEngine;
    use chrono::{TimeZone, Utc};
    use core_types::{Direction, Session, Trade};
    use rust_decimal_macros::dec;

    #[test]
    fn empty_snapshot_renders_only_the_overview() {
        let rendered = render_snapshot(&AnalyticsSnapshot::new());
        assert!(rendered.contains("Total Trades"));
        assert!(!rendered.contains("Session"));
    }

    #[test]
    fn breakdowns_use_display_labels() {
        let mut trade = Trade::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap(),
            "NAS100",
            Direction::Short,
        );
        trade.pnl = Some(dec!(42.5));
        trade.session = Some(Session::NewYork);

        let rendered = render_snapshot(&AnalyticsEngine::new().calculate(&[trade]));
        assert!(rendered.contains("New York"));
        assert!(rendered.contains("NAS100"));
        assert!(rendered.contains("Mon"));
        assert!(rendered.contains("100.0%"));
    }

    #[test]
    fn challenge_rows_show_progress() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let challenge = PropFirmChallenge::new("FTMO", "Phase 1", dec!(100000), start);
        let mut trade = Trade::new(
            Utc.with_ymd_and_hms(2024, 6, 4, 15, 0, 0).unwrap(),
            "NQ",
            Direction::Long,
        );
        trade.pnl = Some(dec!(-7500));
        trade.prop_firm_id = Some(challenge.id);

        let now = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();
        let progress = AnalyticsEngine::new().challenge_progress(&challenge, &[trade], now);
        let rendered = render_challenges(&[(challenge, progress)]);
        assert!(rendered.contains("FTMO"));
        assert!(rendered.contains("active"));
        assert!(rendered.contains("92500.00"));
        assert!(rendered.contains("75.0%"));
    }
}
