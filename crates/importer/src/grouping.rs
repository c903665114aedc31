use crate::error::ImportError;
use crate::ContractResolver;
use chrono::NaiveTime;
use core_types::{Direction, Fill, Session, Trade};
use std::collections::HashMap;

/// All fills of one broker order, sorted by execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFills {
    pub order_id: i64,
    pub fills: Vec<Fill>,
}

/// Groups fills by order id, keeping orders in first-seen order.
pub fn group_fills(fills: Vec<Fill>) -> Vec<OrderFills> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut orders: Vec<OrderFills> = Vec::new();

    for fill in fills {
        let slot = *index.entry(fill.order_id).or_insert_with(|| {
            orders.push(OrderFills { order_id: fill.order_id, fills: Vec::new() });
            orders.len() - 1
        });
        orders[slot].fills.push(fill);
    }

    for order in &mut orders {
        order.fills.sort_by_key(|f| f.timestamp);
    }
    orders
}

/// Turns one order's fills into a journal trade.
///
/// The first fill is the entry and the last the exit. Returns `Ok(None)` when the
/// order has a single fill, which is not a round trip yet.
pub fn build_trade<R>(order: &OrderFills, resolver: &R) -> Result<Option<Trade>, ImportError>
where
    R: ContractResolver + ?Sized,
{
    let (Some(entry), Some(exit)) = (order.fills.first(), order.fills.last()) else {
        return Ok(None);
    };
    if entry.id == exit.id {
        return Ok(None);
    }

    let pair = resolver.contract_name(entry.contract_id).ok_or(ImportError::UnknownContract {
        order_id: order.order_id,
        contract_id: entry.contract_id,
    })?;

    let direction = entry.action.direction();
    let qty = entry.qty;
    let price_move = match direction {
        Direction::Long => exit.price.checked_sub(entry.price),
        Direction::Short => entry.price.checked_sub(exit.price),
    };
    let pnl = price_move
        .and_then(|delta| delta.checked_mul(qty))
        .ok_or(ImportError::PnlOverflow { order_id: order.order_id })?;

    let mut trade = Trade::new(entry.trade_date.and_time(NaiveTime::MIN).and_utc(), pair, direction);
    trade.entry_price = Some(entry.price);
    trade.exit_price = Some(exit.price);
    trade.lot_size = Some(qty);
    trade.pnl = Some(pnl);
    trade.session = Some(Session::Other);
    trade.broker_order_id = Some(order.order_id);
    Ok(Some(trade))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_types::FillAction;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn fill(id: i64, order_id: i64, minute: u32, action: FillAction, qty: Decimal, price: Decimal) -> Fill {
        Fill {
            id,
            order_id,
            contract_id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 14, minute, 0).unwrap(),
            trade_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            action,
            qty,
            price,
        }
    }

    fn resolver() -> HashMap<i64, String> {
        HashMap::from([(1, "MESM4".to_string())])
    }

    #[test]
    fn groups_by_order_and_sorts_by_time() {
        let orders = group_fills(vec![
            fill(3, 20, 30, FillAction::Sell, dec!(1), dec!(10)),
            fill(1, 10, 5, FillAction::Buy, dec!(1), dec!(10)),
            fill(2, 20, 10, FillAction::Sell, dec!(1), dec!(11)),
        ]);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, 20);
        let ids: Vec<i64> = orders[0].fills.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(orders[1].order_id, 10);
    }

    #[test]
    fn long_round_trip_pnl() {
        let order = OrderFills {
            order_id: 7,
            fills: vec![
                fill(1, 7, 0, FillAction::Buy, dec!(2), dec!(5300.25)),
                fill(2, 7, 9, FillAction::Sell, dec!(2), dec!(5305.75)),
            ],
        };
        let trade = build_trade(&order, &resolver()).unwrap().unwrap();
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.pair, "MESM4");
        assert_eq!(trade.pnl, Some(dec!(11.00)));
        assert_eq!(trade.lot_size, Some(dec!(2)));
        assert_eq!(trade.session, Some(Session::Other));
        assert_eq!(trade.broker_order_id, Some(7));
        assert_eq!(trade.trade_date, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn short_round_trip_pnl() {
        let order = OrderFills {
            order_id: 8,
            fills: vec![
                fill(1, 8, 0, FillAction::Sell, dec!(1), dec!(100)),
                fill(2, 8, 1, FillAction::Buy, dec!(1), dec!(104)),
            ],
        };
        let trade = build_trade(&order, &resolver()).unwrap().unwrap();
        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.pnl, Some(dec!(-4)));
    }

    #[test]
    fn overflowing_pnl_is_an_error() {
        let order = OrderFills {
            order_id: 12,
            fills: vec![
                fill(1, 12, 0, FillAction::Buy, dec!(1000), Decimal::ONE),
                fill(2, 12, 1, FillAction::Sell, dec!(1000), Decimal::MAX),
            ],
        };
        assert!(matches!(
            build_trade(&order, &resolver()),
            Err(ImportError::PnlOverflow { order_id: 12 })
        ));

        let short = OrderFills {
            order_id: 13,
            fills: vec![
                fill(1, 13, 0, FillAction::Sell, dec!(1), Decimal::MAX),
                fill(2, 13, 1, FillAction::Buy, dec!(1), Decimal::MIN),
            ],
        };
        assert!(matches!(
            build_trade(&short, &resolver()),
            Err(ImportError::PnlOverflow { order_id: 13 })
        ));
    }

    #[test]
    fn single_fill_is_skipped() {
        let order = OrderFills {
            order_id: 9,
            fills: vec![fill(1, 9, 0, FillAction::Buy, dec!(1), dec!(100))],
        };
        assert!(build_trade(&order, &resolver()).unwrap().is_none());
    }

    #[test]
    fn unknown_contract_is_an_error() {
        let order = OrderFills {
            order_id: 11,
            fills: vec![
                fill(1, 11, 0, FillAction::Buy, dec!(1), dec!(1)),
                fill(2, 11, 1, FillAction::Sell, dec!(1), dec!(2)),
            ],
        };
        let empty: HashMap<i64, String> = HashMap::new();
        assert!(matches!(
            build_trade(&order, &empty),
            Err(ImportError::UnknownContract { order_id: 11, contract_id: 1 })
        ));
    }
}
