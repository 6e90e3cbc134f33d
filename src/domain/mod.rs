//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod strategy;
pub mod backtest;
pub mod market;
pub mod universe;
pub mod analyzer;
pub mod report;
pub mod lab;
pub mod session;
pub mod pool;
pub mod scanner;
pub mod history;
pub mod stats;
pub mod quotes;
pub mod favorites;
pub mod config_validation;
pub mod error;
