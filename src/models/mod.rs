//! Value types shared by entities, services and handlers.

pub mod lot;
pub mod lot_key;
pub mod order_month;

pub use lot::{parse_committed_lot, LotQuantity};
pub use lot_key::LotKey;
pub use order_month::{OrderMonth, OrderMonthError, YearMonth};
