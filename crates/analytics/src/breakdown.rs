use crate::engine::{rate_pct, round_money, saturating_sum};
use crate::report::BreakdownStat;
use core_types::Trade;
use std::collections::HashMap;

/// Summarizes one group of trades into a table row.
pub(crate) fn summarize(key: &str, label: &str, trades: &[&Trade]) -> BreakdownStat {
    let wins = trades.iter().filter(|t| t.is_win()).count();
    let pnl = saturating_sum(trades.iter().map(|t| t.pnl_or_zero()));

    BreakdownStat {
        key: key.to_string(),
        label: label.to_string(),
        trades: trades.len(),
        wins,
        win_rate: rate_pct(wins, trades.len()),
        pnl: round_money(pnl),
    }
}

/// Builds one row per key of a fixed enumeration, in enumeration order, then
/// drops the rows that matched no trade.
pub(crate) fn by_fixed_keys<K, F>(
    trades: &[Trade],
    keys: &[K],
    matches: F,
    key_str: impl Fn(&K) -> String,
    label: impl Fn(&K) -> String,
) -> Vec<BreakdownStat>
where
    F: Fn(&Trade, &K) -> bool,
{
    keys.iter()
        .map(|key| {
            let group: Vec<&Trade> = trades.iter().filter(|t| matches(t, key)).collect();
            summarize(&key_str(key), &label(key), &group)
        })
        .filter(|stat| stat.trades > 0)
        .collect()
}

/// Groups trades under every key `keys_of` yields for them, then sorts the rows
/// by trade count, descending. Ties keep first-seen order.
///
/// A trade yielding the same key twice is counted twice in that group.
pub(crate) fn by_open_keys<'a, F, I>(trades: &'a [Trade], keys_of: F) -> Vec<BreakdownStat>
where
    F: Fn(&'a Trade) -> I,
    I: IntoIterator<Item = &'a str>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<&'a Trade>)> = Vec::new();

    for trade in trades {
        for key in keys_of(trade) {
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(trade);
        }
    }

    let mut stats: Vec<BreakdownStat> = groups
        .iter()
        .map(|(key, group)| summarize(key, key, group))
        .collect();
    stats.sort_by(|a, b| b.trades.cmp(&a.trades));
    stats
}
