//! Position reconstruction: one evolving position per symbol/session.
//!
//! No matching needed — every fill becomes a typed event (ENTRY, ADD,
//! EXIT) with the running position size recorded after it executes. Exit
//! quantity beyond the current position is warned about and not applied.

use chrono::NaiveDate;

use crate::classify::{classify_fills, session_direction};
use crate::domain::{Fill, FillKind, PositionEvent, PositionTrade};

/// Run the position state machine over one symbol's chronological fills.
pub fn reconstruct_position(
    symbol: &str,
    date: NaiveDate,
    fills: &[Fill],
) -> (Option<PositionTrade>, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let direction = match session_direction(fills) {
        Some(d) => d,
        None => return (None, warnings),
    };

    let kinds = classify_fills(direction, fills);
    let mut events: Vec<PositionEvent> = Vec::with_capacity(fills.len());
    let mut current_size: u32 = 0;

    for (fill, kind) in fills.iter().zip(kinds) {
        match kind {
            FillKind::Entry | FillKind::Add => {
                current_size += fill.qty;
                events.push(PositionEvent {
                    side: fill.side,
                    kind,
                    price: fill.price,
                    qty: fill.qty,
                    time: fill.time,
                    position_after: current_size,
                });
            }
            FillKind::Exit => {
                let exit_qty = fill.qty.min(current_size);
                if exit_qty == 0 {
                    warnings.push(format!(
                        "{symbol}: orphan exit of {} shares at {} -- no open position to match",
                        fill.qty,
                        fill.time.format("%H:%M:%S"),
                    ));
                    continue;
                }
                current_size -= exit_qty;
                events.push(PositionEvent {
                    side: fill.side,
                    kind,
                    price: fill.price,
                    qty: exit_qty,
                    time: fill.time,
                    position_after: current_size,
                });
                if fill.qty > exit_qty {
                    warnings.push(format!(
                        "{symbol}: exit fill at {} had {} excess shares beyond position size",
                        fill.time.format("%H:%M:%S"),
                        fill.qty - exit_qty,
                    ));
                }
            }
        }
    }

    if current_size > 0 {
        warnings.push(format!(
            "{symbol}: position still open with {current_size} shares remaining",
        ));
    }

    let trade = PositionTrade {
        symbol: symbol.to_string(),
        date,
        direction,
        account: fills[0].account.clone(),
        events,
    };

    (Some(trade), warnings)
}
