//! Core domain types and logic.

pub mod backtest;
pub mod candle;
pub mod condition;
pub mod condition_parser;
pub mod config_validation;
pub mod error;
pub mod frame;
pub mod indicator;
pub mod metrics;
pub mod position;
pub mod signal;
pub mod simulation;
pub mod strategy;
