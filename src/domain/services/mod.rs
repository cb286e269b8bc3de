pub mod orderbook;
pub mod matching_engine;
