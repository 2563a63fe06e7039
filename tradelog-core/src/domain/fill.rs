//! Fill — one broker execution, plus the closed enums that classify it.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Broker-reported side of a fill.
///
/// Short-sell is a distinct side on the wire but counts as sell side for
/// direction and classification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillSide {
    Buy,
    Sell,
    ShortSell,
}

impl FillSide {
    pub fn is_buy_side(&self) -> bool {
        matches!(self, FillSide::Buy)
    }

    pub fn is_sell_side(&self) -> bool {
        matches!(self, FillSide::Sell | FillSide::ShortSell)
    }
}

/// Trade direction, fixed by the session's first fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

/// Role of a fill within a position lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FillKind {
    /// First same-direction fill (opens the position).
    Entry,
    /// Subsequent same-direction fill (scales in).
    Add,
    /// Opposite-direction fill (reduces the position).
    Exit,
}

/// A single raw execution as reported by the broker.
///
/// Fills arrive pre-sorted chronologically per symbol from the external
/// parser. Account and route are session metadata, passed through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub time: NaiveTime,
    pub symbol: String,
    pub side: FillSide,
    pub price: f64,
    pub qty: u32,
    pub account: String,
    pub route: String,
}

impl Fill {
    /// Cash notional of this fill (price x quantity).
    pub fn notional(&self) -> f64 {
        self.price * f64::from(self.qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sell_is_sell_side() {
        assert!(FillSide::ShortSell.is_sell_side());
        assert!(FillSide::Sell.is_sell_side());
        assert!(!FillSide::Buy.is_sell_side());
        assert!(FillSide::Buy.is_buy_side());
        assert!(!FillSide::ShortSell.is_buy_side());
    }

    #[test]
    fn fill_notional() {
        let fill = Fill {
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            symbol: "MU".into(),
            side: FillSide::Buy,
            price: 10.5,
            qty: 100,
            account: "ACCT1".into(),
            route: "ARCA".into(),
        };
        assert!((fill.notional() - 1050.0).abs() < 1e-10);
    }

    #[test]
    fn side_serialization() {
        let json = serde_json::to_string(&FillSide::ShortSell).unwrap();
        assert_eq!(json, "\"SHORT_SELL\"");
    }
}
