/// Output records for orders emitted by the engine.
pub mod dtos;

pub use dtos::{OrderOutput, TransactionOutput};
