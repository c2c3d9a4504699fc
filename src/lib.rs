//! tradereplay: single-instrument strategy backtester.
//!
//! Hexagonal architecture: the replay engine lives in [`domain`], port traits
//! in [`ports`], file-backed implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
