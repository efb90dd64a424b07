pub mod cache;
pub mod market_service;
