//! Volatility measure: True Range and its simple moving average.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! The stop-sizing measure is the arithmetic mean of the last N True Range
//! values ending at a reference bar (SMA, not Wilder smoothing). Needs
//! N + 1 bars: N for the window plus one predecessor close for the first
//! True Range.

use chrono::NaiveDateTime;

use crate::domain::Bar;

/// Default lookback for the volatility measure.
pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Compute the True Range series from bars.
///
/// TR[0] is NaN — the first bar has no predecessor close, so it has no
/// True Range. TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|,
/// |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Volatility measure at a reference bar: SMA of the last `period` True
/// Range values ending at `upto` (inclusive).
///
/// Returns `None` when fewer than `period` True Range values exist up to
/// the reference bar, or when any value in the window is NaN. This is a
/// normal outcome near session open, not an error — never zero, never a
/// partial average.
pub fn atr_at(bars: &[Bar], period: usize, upto: usize) -> Option<f64> {
    if period == 0 || upto >= bars.len() {
        return None;
    }
    // TR[0] is NaN, so `period` values require indices 1..=upto with
    // upto >= period, i.e. period + 1 bars.
    if upto < period {
        return None;
    }

    let tr = true_range(&bars[..=upto]);
    let window = &tr[upto + 1 - period..=upto];
    if window.iter().any(|v| v.is_nan()) {
        return None;
    }
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Volatility measure at a reference timestamp: computed over all bars
/// with `timestamp <= at`, typically the trade's entry time.
pub fn atr_at_time(bars: &[Bar], period: usize, at: NaiveDateTime) -> Option<f64> {
    let count = bars.iter().take_while(|b| b.timestamp <= at).count();
    if count == 0 {
        return None;
    }
    atr_at(bars, period, count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, make_minute_bars, make_ohlc_bars};

    #[test]
    fn true_range_first_bar_has_no_value() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 8.0);
        assert_approx(tr[2], 9.0);
    }

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 115-108
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 15.0);
    }

    #[test]
    fn true_range_at_least_bar_range() {
        let bars = make_minute_bars(&[100.0, 101.0, 99.5, 102.0, 101.5]);
        let tr = true_range(&bars);
        for (i, bar) in bars.iter().enumerate().skip(1) {
            assert!(tr[i] >= bar.high - bar.low);
            assert!(tr[i] >= 0.0);
        }
    }

    #[test]
    fn atr_requires_period_plus_one_bars() {
        let bars = make_minute_bars(&[100.0, 101.0, 102.0]);
        // period 3 needs 4 bars
        assert_eq!(atr_at(&bars, 3, 2), None);
        // period 2 needs 3 bars: TR[1], TR[2] available
        assert!(atr_at(&bars, 2, 2).is_some());
    }

    #[test]
    fn atr_is_mean_of_window() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        assert_approx(atr_at(&bars, 3, 3).unwrap(), 23.0 / 3.0);
        // Shorter window ending at the same bar
        assert_approx(atr_at(&bars, 2, 3).unwrap(), 7.5);
    }

    #[test]
    fn atr_none_on_empty_or_zero_period() {
        let bars = make_minute_bars(&[100.0, 101.0, 102.0]);
        assert_eq!(atr_at(&[], 14, 0), None);
        assert_eq!(atr_at(&bars, 0, 2), None);
        assert_eq!(atr_at(&bars, 2, 5), None); // out of bounds
    }

    #[test]
    fn atr_at_time_filters_to_reference() {
        let bars = make_minute_bars(&[100.0, 101.0, 99.5, 102.0, 101.5, 103.0]);
        let at = bars[4].timestamp;
        let by_time = atr_at_time(&bars, 3, at).unwrap();
        let by_index = atr_at(&bars, 3, 4).unwrap();
        assert_approx(by_time, by_index);
        // Before the first bar: nothing to measure
        let early = bars[0].timestamp - chrono::Duration::minutes(5);
        assert_eq!(atr_at_time(&bars, 3, early), None);
    }
}
