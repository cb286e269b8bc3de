/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - dtos                                                 |
/// +----------------------------------------------------------+

/// Trade-intent records and their translation into engine orders.
pub mod dtos;

pub use dtos::{TradeInput, Transformer};
