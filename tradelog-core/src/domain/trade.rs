//! Logical trades reconstructed from raw fills.
//!
//! Two shapes of the same conceptual entity:
//! - `FifoTrade` — one trade per entry-side fill, closed by FIFO-matched
//!   exit portions (the FIFO reconstruction policy).
//! - `PositionTrade` — one trade per symbol per session, all fills kept as
//!   a typed event log with running position size (the position policy).
//!
//! Both convert into `TradeSummary`, the policy-agnostic field contract
//! consumed downstream.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::fill::{Direction, FillKind, FillSide};

/// A slice of an exit fill allocated to one FIFO trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitPortion {
    pub price: f64,
    pub qty: u32,
    pub time: NaiveTime,
}

/// One entry-side fill and every exit portion matched against it.
///
/// Spawned by each entry-side fill under the FIFO policy. `remaining_qty`
/// counts down as exit portions are allocated; the trade is closed once it
/// reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FifoTrade {
    /// 1-based sequence number within the symbol/session.
    pub trade_seq: u32,
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub account: String,
    pub entry_price: f64,
    pub entry_qty: u32,
    pub entry_time: NaiveTime,
    pub exit_portions: Vec<ExitPortion>,
    pub remaining_qty: u32,
}

impl FifoTrade {
    /// Total shares exited so far.
    pub fn exit_qty(&self) -> u32 {
        self.exit_portions.iter().map(|p| p.qty).sum()
    }

    /// Volume-weighted average price of all exit portions.
    pub fn exit_price(&self) -> Option<f64> {
        let qty: u32 = self.exit_qty();
        if qty == 0 {
            return None;
        }
        let notional: f64 = self
            .exit_portions
            .iter()
            .map(|p| p.price * f64::from(p.qty))
            .sum();
        Some(notional / f64::from(qty))
    }

    /// Time of the last exit portion.
    pub fn last_exit_time(&self) -> Option<NaiveTime> {
        self.exit_portions.iter().map(|p| p.time).max()
    }

    pub fn is_closed(&self) -> bool {
        self.remaining_qty == 0 && !self.exit_portions.is_empty()
    }

    /// Realized dollar P&L over the allocated exit portions.
    pub fn pnl_total(&self) -> Option<f64> {
        if self.exit_portions.is_empty() {
            return None;
        }
        let pnl = self
            .exit_portions
            .iter()
            .map(|p| match self.direction {
                Direction::Long => (p.price - self.entry_price) * f64::from(p.qty),
                Direction::Short => (self.entry_price - p.price) * f64::from(p.qty),
            })
            .sum();
        Some(pnl)
    }

    /// Per-share P&L over the entry quantity.
    pub fn pnl_per_share(&self) -> Option<f64> {
        if self.entry_qty == 0 {
            return None;
        }
        self.pnl_total().map(|pnl| pnl / f64::from(self.entry_qty))
    }

    pub fn to_summary(&self) -> TradeSummary {
        let mut fills = vec![TradeFill {
            kind: FillKind::Entry,
            price: self.entry_price,
            qty: self.entry_qty,
            time: self.entry_time,
        }];
        fills.extend(self.exit_portions.iter().map(|p| TradeFill {
            kind: FillKind::Exit,
            price: p.price,
            qty: p.qty,
            time: p.time,
        }));
        TradeSummary {
            symbol: self.symbol.clone(),
            date: self.date,
            direction: self.direction,
            account: self.account.clone(),
            entry_price: self.entry_price,
            entry_time: self.entry_time,
            entry_qty: self.entry_qty,
            exit_price: self.exit_price(),
            exit_time: self.last_exit_time(),
            exit_qty: self.exit_qty(),
            pnl_total: self.pnl_total(),
            pnl_per_share: self.pnl_per_share(),
            closed: self.is_closed(),
            fills,
        }
    }
}

/// One fill event within a position lifecycle.
///
/// `position_after` is the running share count after the event executes,
/// which is what chart rendering needs to place markers at every fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEvent {
    pub side: FillSide,
    pub kind: FillKind,
    pub price: f64,
    pub qty: u32,
    pub time: NaiveTime,
    pub position_after: u32,
}

/// All fills for a symbol/session collapsed into one evolving position.
///
/// Entries, adds, partial exits, and the final exit are events within the
/// position; every price/quantity field below is derived from the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionTrade {
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub account: String,
    pub events: Vec<PositionEvent>,
}

impl PositionTrade {
    fn entry_events(&self) -> impl Iterator<Item = &PositionEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, FillKind::Entry | FillKind::Add))
    }

    fn exit_events(&self) -> impl Iterator<Item = &PositionEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, FillKind::Exit))
    }

    /// First fill price. Stop/target planning keys off this, not the VWAP.
    pub fn initial_entry_price(&self) -> Option<f64> {
        self.events.first().map(|e| e.price)
    }

    pub fn initial_entry_time(&self) -> Option<NaiveTime> {
        self.events.first().map(|e| e.time)
    }

    /// Volume-weighted average price of all entry-side events.
    pub fn avg_entry_price(&self) -> Option<f64> {
        let qty = self.total_entry_qty();
        if qty == 0 {
            return None;
        }
        let notional: f64 = self
            .entry_events()
            .map(|e| e.price * f64::from(e.qty))
            .sum();
        Some(notional / f64::from(qty))
    }

    /// Volume-weighted average price of all exit-side events.
    pub fn avg_exit_price(&self) -> Option<f64> {
        let qty = self.total_exit_qty();
        if qty == 0 {
            return None;
        }
        let notional: f64 = self.exit_events().map(|e| e.price * f64::from(e.qty)).sum();
        Some(notional / f64::from(qty))
    }

    pub fn total_entry_qty(&self) -> u32 {
        self.entry_events().map(|e| e.qty).sum()
    }

    pub fn total_exit_qty(&self) -> u32 {
        self.exit_events().map(|e| e.qty).sum()
    }

    /// Peak shares held during the position lifecycle.
    pub fn max_position_size(&self) -> u32 {
        self.events.iter().map(|e| e.position_after).max().unwrap_or(0)
    }

    pub fn last_exit_time(&self) -> Option<NaiveTime> {
        self.exit_events().map(|e| e.time).max()
    }

    /// Flat and actually traded out: exits cover entries.
    pub fn is_closed(&self) -> bool {
        let exits = self.total_exit_qty();
        exits >= self.total_entry_qty() && exits > 0
    }

    /// Realized dollar P&L as net cash flow: sell notional minus buy notional.
    ///
    /// The sign convention is direction-agnostic — a profitable SHORT (sell
    /// high, buy low) and a profitable LONG (buy low, sell high) both come
    /// out positive.
    pub fn pnl_total(&self) -> Option<f64> {
        if self.total_exit_qty() == 0 {
            return None;
        }
        let sell_cash: f64 = self
            .events
            .iter()
            .filter(|e| e.side.is_sell_side())
            .map(|e| e.price * f64::from(e.qty))
            .sum();
        let buy_cash: f64 = self
            .events
            .iter()
            .filter(|e| e.side.is_buy_side())
            .map(|e| e.price * f64::from(e.qty))
            .sum();
        Some(sell_cash - buy_cash)
    }

    pub fn pnl_per_share(&self) -> Option<f64> {
        let entry_qty = self.total_entry_qty();
        if entry_qty == 0 {
            return None;
        }
        self.pnl_total().map(|pnl| pnl / f64::from(entry_qty))
    }

    pub fn to_summary(&self) -> TradeSummary {
        let fills = self
            .events
            .iter()
            .map(|e| TradeFill {
                kind: e.kind,
                price: e.price,
                qty: e.qty,
                time: e.time,
            })
            .collect();
        TradeSummary {
            symbol: self.symbol.clone(),
            date: self.date,
            direction: self.direction,
            account: self.account.clone(),
            entry_price: self.initial_entry_price().unwrap_or(0.0),
            entry_time: self
                .initial_entry_time()
                .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
            entry_qty: self.total_entry_qty(),
            exit_price: self.avg_exit_price(),
            exit_time: self.last_exit_time(),
            exit_qty: self.total_exit_qty(),
            pnl_total: self.pnl_total(),
            pnl_per_share: self.pnl_per_share(),
            closed: self.is_closed(),
            fills,
        }
    }
}

/// One classified fill in a trade's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeFill {
    pub kind: FillKind,
    pub price: f64,
    pub qty: u32,
    pub time: NaiveTime,
}

/// Policy-agnostic trade contract.
///
/// Both reconstruction policies emit this shape, so downstream consumers
/// (planning, simulation, persistence) never branch on the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSummary {
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub account: String,
    pub entry_price: f64,
    pub entry_time: NaiveTime,
    pub entry_qty: u32,
    pub exit_price: Option<f64>,
    pub exit_time: Option<NaiveTime>,
    pub exit_qty: u32,
    pub pnl_total: Option<f64>,
    pub pnl_per_share: Option<f64>,
    pub closed: bool,
    pub fills: Vec<TradeFill>,
}

impl TradeSummary {
    /// Stable identifier: {SYMBOL}_{MMDDYY}_{HHMM}_{SEQ}.
    pub fn trade_id(&self, seq: u32) -> String {
        format!(
            "{}_{}_{}_{seq}",
            self.symbol,
            self.date.format("%m%d%y"),
            self.entry_time.format("%H%M"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn sample_fifo_trade() -> FifoTrade {
        FifoTrade {
            trade_seq: 1,
            symbol: "MU".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            direction: Direction::Long,
            account: "ACCT1".into(),
            entry_price: 100.0,
            entry_qty: 100,
            entry_time: t(9, 30),
            exit_portions: vec![
                ExitPortion { price: 101.0, qty: 60, time: t(9, 40) },
                ExitPortion { price: 102.0, qty: 40, time: t(9, 50) },
            ],
            remaining_qty: 0,
        }
    }

    #[test]
    fn fifo_exit_vwap() {
        let trade = sample_fifo_trade();
        // (101*60 + 102*40) / 100 = 101.4
        assert!((trade.exit_price().unwrap() - 101.4).abs() < 1e-10);
        assert_eq!(trade.exit_qty(), 100);
        assert!(trade.is_closed());
    }

    #[test]
    fn fifo_pnl_long() {
        let trade = sample_fifo_trade();
        // 60*1.0 + 40*2.0 = 140
        assert!((trade.pnl_total().unwrap() - 140.0).abs() < 1e-10);
        assert!((trade.pnl_per_share().unwrap() - 1.4).abs() < 1e-10);
    }

    #[test]
    fn fifo_pnl_short_sign() {
        let mut trade = sample_fifo_trade();
        trade.direction = Direction::Short;
        // Short that covered higher loses: 60*(-1.0) + 40*(-2.0) = -140
        assert!((trade.pnl_total().unwrap() + 140.0).abs() < 1e-10);
    }

    #[test]
    fn fifo_open_trade_has_no_exit_price() {
        let trade = FifoTrade {
            exit_portions: vec![],
            remaining_qty: 100,
            ..sample_fifo_trade()
        };
        assert_eq!(trade.exit_price(), None);
        assert_eq!(trade.pnl_total(), None);
        assert!(!trade.is_closed());
        let summary = trade.to_summary();
        assert!(!summary.closed);
        assert_eq!(summary.exit_qty, 0);
    }

    fn sample_position_trade() -> PositionTrade {
        PositionTrade {
            symbol: "MU".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
            direction: Direction::Short,
            account: "ACCT1".into(),
            events: vec![
                PositionEvent {
                    side: FillSide::ShortSell,
                    kind: FillKind::Entry,
                    price: 50.0,
                    qty: 100,
                    time: t(9, 30),
                    position_after: 100,
                },
                PositionEvent {
                    side: FillSide::ShortSell,
                    kind: FillKind::Add,
                    price: 50.5,
                    qty: 100,
                    time: t(9, 35),
                    position_after: 200,
                },
                PositionEvent {
                    side: FillSide::Buy,
                    kind: FillKind::Exit,
                    price: 49.5,
                    qty: 200,
                    time: t(9, 45),
                    position_after: 0,
                },
            ],
        }
    }

    #[test]
    fn position_vwaps_and_quantities() {
        let trade = sample_position_trade();
        assert!((trade.avg_entry_price().unwrap() - 50.25).abs() < 1e-10);
        assert!((trade.avg_exit_price().unwrap() - 49.5).abs() < 1e-10);
        assert_eq!(trade.total_entry_qty(), 200);
        assert_eq!(trade.total_exit_qty(), 200);
        assert_eq!(trade.max_position_size(), 200);
        assert!(trade.is_closed());
    }

    #[test]
    fn position_pnl_is_net_cash_flow() {
        let trade = sample_position_trade();
        // Sold 50*100 + 50.5*100 = 10050, bought 49.5*200 = 9900 → +150
        assert!((trade.pnl_total().unwrap() - 150.0).abs() < 1e-10);
        assert!((trade.pnl_per_share().unwrap() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn position_summary_uses_first_fill_entry_price() {
        let summary = sample_position_trade().to_summary();
        assert!((summary.entry_price - 50.0).abs() < 1e-10);
        assert_eq!(summary.entry_time, t(9, 30));
        assert_eq!(summary.fills.len(), 3);
    }

    #[test]
    fn trade_id_format() {
        let summary = sample_position_trade().to_summary();
        assert_eq!(summary.trade_id(1), "MU_021326_0930_1");
    }
}
