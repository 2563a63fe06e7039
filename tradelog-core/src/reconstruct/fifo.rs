//! FIFO-queue reconstruction: one trade per entry-side fill.
//!
//! Exit fills are matched against the oldest open trade first; one exit
//! fill may close a trade outright and spill its remainder into the next.
//! Per-exit-fill cost is O(open trades for the symbol), which is fine at
//! journal scale (tens of fills per session, not thousands).

use std::collections::VecDeque;

use chrono::NaiveDate;

use crate::classify::{is_entry_side, session_direction};
use crate::domain::{ExitPortion, FifoTrade, Fill};

/// Run the FIFO matcher over one symbol's chronological fills.
///
/// Returns the trades in completion order (closed trades as they close,
/// then any still-open trades) plus reconciliation warnings. Trades left
/// open at session end are retained and flagged, never dropped.
pub fn reconstruct_fifo(
    symbol: &str,
    date: NaiveDate,
    fills: &[Fill],
) -> (Vec<FifoTrade>, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let direction = match session_direction(fills) {
        Some(d) => d,
        None => return (Vec::new(), warnings),
    };

    let mut open_queue: VecDeque<FifoTrade> = VecDeque::new();
    let mut completed: Vec<FifoTrade> = Vec::new();
    let mut trade_seq: u32 = 0;

    for fill in fills {
        if is_entry_side(direction, fill) {
            trade_seq += 1;
            open_queue.push_back(FifoTrade {
                trade_seq,
                symbol: symbol.to_string(),
                date,
                direction,
                account: fill.account.clone(),
                entry_price: fill.price,
                entry_qty: fill.qty,
                entry_time: fill.time,
                exit_portions: Vec::new(),
                remaining_qty: fill.qty,
            });
            continue;
        }

        // Exit-side fill: consume the oldest open trades first.
        let mut exit_remaining = fill.qty;
        while exit_remaining > 0 {
            let Some(oldest) = open_queue.front_mut() else {
                break;
            };
            let close_qty = exit_remaining.min(oldest.remaining_qty);
            oldest.exit_portions.push(ExitPortion {
                price: fill.price,
                qty: close_qty,
                time: fill.time,
            });
            oldest.remaining_qty -= close_qty;
            exit_remaining -= close_qty;

            if oldest.remaining_qty == 0 {
                completed.push(open_queue.pop_front().expect("front checked above"));
            }
        }

        if exit_remaining > 0 {
            warnings.push(format!(
                "{symbol}: orphan exit of {exit_remaining} shares at {} -- no open trades to match",
                fill.time.format("%H:%M:%S"),
            ));
        }
    }

    // Still-open trades at session end are retained with a warning.
    for trade in open_queue {
        warnings.push(format!(
            "{symbol}: trade #{} still open ({} shares remaining)",
            trade.trade_seq, trade.remaining_qty,
        ));
        completed.push(trade);
    }

    (completed, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, FillSide};
    use crate::testutil::{fill, session_date};

    #[test]
    fn scenario_c_exit_spans_two_trades() {
        // BUY 100@10:00, BUY 100@10:05, SELL 150@10:10.
        let fills = vec![
            fill(10, 0, FillSide::Buy, 10.0, 100),
            fill(10, 5, FillSide::Buy, 10.2, 100),
            fill(10, 10, FillSide::Sell, 10.5, 150),
        ];
        let (trades, warnings) = reconstruct_fifo("MU", session_date(), &fills);

        assert_eq!(trades.len(), 2);
        // Trade #1 fully closed by 100 of the sell.
        let first = trades.iter().find(|t| t.trade_seq == 1).unwrap();
        assert!(first.is_closed());
        assert_eq!(first.exit_qty(), 100);
        // Trade #2 partially closed by the remaining 50.
        let second = trades.iter().find(|t| t.trade_seq == 2).unwrap();
        assert!(!second.is_closed());
        assert_eq!(second.remaining_qty, 50);
        assert_eq!(second.exit_qty(), 50);
        // One open-trade warning, no orphans.
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("still open"));
    }

    #[test]
    fn exit_vwap_over_multiple_portions() {
        let fills = vec![
            fill(9, 30, FillSide::Buy, 100.0, 100),
            fill(9, 40, FillSide::Sell, 101.0, 60),
            fill(9, 50, FillSide::Sell, 102.0, 40),
        ];
        let (trades, warnings) = reconstruct_fifo("MU", session_date(), &fills);
        assert!(warnings.is_empty());
        assert_eq!(trades.len(), 1);
        assert!((trades[0].exit_price().unwrap() - 101.4).abs() < 1e-10);
        assert!(trades[0].is_closed());
    }

    #[test]
    fn orphan_exit_is_warned_and_discarded() {
        let fills = vec![
            fill(9, 30, FillSide::Buy, 100.0, 100),
            fill(9, 40, FillSide::Sell, 101.0, 150),
        ];
        let (trades, warnings) = reconstruct_fifo("MU", session_date(), &fills);
        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_closed());
        assert_eq!(trades[0].exit_qty(), 100);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("orphan exit of 50 shares"));
    }

    #[test]
    fn short_session_fifo() {
        let fills = vec![
            fill(9, 30, FillSide::ShortSell, 50.0, 200),
            fill(9, 45, FillSide::Buy, 49.0, 200),
        ];
        let (trades, warnings) = reconstruct_fifo("MU", session_date(), &fills);
        assert!(warnings.is_empty());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].direction, Direction::Short);
        assert!((trades[0].pnl_total().unwrap() - 200.0).abs() < 1e-10);
    }

    #[test]
    fn conservation_exits_never_exceed_entries() {
        let fills = vec![
            fill(9, 30, FillSide::Buy, 100.0, 100),
            fill(9, 31, FillSide::Sell, 100.5, 80),
            fill(9, 32, FillSide::Buy, 100.2, 50),
            fill(9, 33, FillSide::Sell, 100.8, 120),
        ];
        let (trades, warnings) = reconstruct_fifo("MU", session_date(), &fills);
        let entered: u32 = trades.iter().map(|t| t.entry_qty).sum();
        let exited: u32 = trades.iter().map(|t| t.exit_qty()).sum();
        assert!(exited <= entered);
        // 150 entered, 200 sold: 50 orphan shares.
        assert_eq!(exited, 150);
        assert!(warnings.iter().any(|w| w.contains("orphan exit of 50")));
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let fills = vec![
            fill(9, 30, FillSide::Buy, 100.0, 100),
            fill(9, 35, FillSide::Buy, 100.4, 100),
            fill(9, 40, FillSide::Sell, 101.0, 150),
        ];
        let (a, wa) = reconstruct_fifo("MU", session_date(), &fills);
        let (b, wb) = reconstruct_fifo("MU", session_date(), &fills);
        assert_eq!(wa, wb);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.trade_seq, y.trade_seq);
            assert_eq!(x.remaining_qty, y.remaining_qty);
            assert_eq!(x.exit_portions, y.exit_portions);
        }
    }
}
