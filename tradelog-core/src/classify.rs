//! Fill classification: session direction and per-fill roles.
//!
//! The first fill of a symbol's session fixes the direction for every
//! fill after it — sell-side opens a SHORT session, buy-side a LONG one.
//! Both reconstruction policies consume the same classification.

use crate::domain::{Direction, Fill, FillKind};

/// Direction implied by the session's first fill.
///
/// Returns `None` for an empty fill list.
pub fn session_direction(fills: &[Fill]) -> Option<Direction> {
    let first = fills.first()?;
    if first.side.is_sell_side() {
        Some(Direction::Short)
    } else {
        Some(Direction::Long)
    }
}

/// Whether a fill is on the entry side of the session.
pub fn is_entry_side(direction: Direction, fill: &Fill) -> bool {
    match direction {
        Direction::Short => fill.side.is_sell_side(),
        Direction::Long => fill.side.is_buy_side(),
    }
}

/// Label each fill: first entry-side fill is ENTRY, later ones ADD,
/// opposite-direction fills EXIT.
pub fn classify_fills(direction: Direction, fills: &[Fill]) -> Vec<FillKind> {
    let mut seen_entry = false;
    fills
        .iter()
        .map(|fill| {
            if is_entry_side(direction, fill) {
                if seen_entry {
                    FillKind::Add
                } else {
                    seen_entry = true;
                    FillKind::Entry
                }
            } else {
                FillKind::Exit
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FillSide;
    use crate::testutil::fill;

    #[test]
    fn first_fill_fixes_direction() {
        let fills = vec![fill(9, 30, FillSide::ShortSell, 50.0, 100)];
        assert_eq!(session_direction(&fills), Some(Direction::Short));

        let fills = vec![fill(9, 30, FillSide::Buy, 50.0, 100)];
        assert_eq!(session_direction(&fills), Some(Direction::Long));

        assert_eq!(session_direction(&[]), None);
    }

    #[test]
    fn plain_sell_first_also_opens_short() {
        let fills = vec![fill(9, 30, FillSide::Sell, 50.0, 100)];
        assert_eq!(session_direction(&fills), Some(Direction::Short));
    }

    #[test]
    fn long_session_classification() {
        let fills = vec![
            fill(9, 30, FillSide::Buy, 100.0, 100),
            fill(9, 35, FillSide::Buy, 100.5, 50),
            fill(9, 40, FillSide::Sell, 101.0, 150),
            fill(9, 45, FillSide::Buy, 100.2, 100),
        ];
        let kinds = classify_fills(Direction::Long, &fills);
        assert_eq!(
            kinds,
            vec![FillKind::Entry, FillKind::Add, FillKind::Exit, FillKind::Add]
        );
    }

    #[test]
    fn short_session_classification() {
        let fills = vec![
            fill(9, 30, FillSide::ShortSell, 50.0, 100),
            fill(9, 32, FillSide::Sell, 50.2, 100),
            fill(9, 40, FillSide::Buy, 49.5, 200),
        ];
        let kinds = classify_fills(Direction::Short, &fills);
        assert_eq!(kinds, vec![FillKind::Entry, FillKind::Add, FillKind::Exit]);
    }

    #[test]
    fn exit_before_any_entry_is_still_exit() {
        // Direction imposed externally; a leading opposite-side fill is an
        // exit with nothing to match, which the reconstructors warn about.
        let fills = vec![
            fill(9, 30, FillSide::Sell, 100.0, 50),
            fill(9, 31, FillSide::Buy, 100.0, 100),
        ];
        let kinds = classify_fills(Direction::Long, &fills);
        assert_eq!(kinds, vec![FillKind::Exit, FillKind::Entry]);
    }
}
