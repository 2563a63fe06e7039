//! Domain types for the trade journal engine.

pub mod bar;
pub mod fill;
pub mod trade;

pub use bar::Bar;
pub use fill::{Direction, Fill, FillKind, FillSide};
pub use trade::{
    ExitPortion, FifoTrade, PositionEvent, PositionTrade, TradeFill, TradeSummary,
};
