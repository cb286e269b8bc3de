/// Domain models (orders, transactions, investors, assets).
pub mod models;

/// Domain services (priority queues, matching engine, settlement).
pub mod services;
