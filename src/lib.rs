//! # Draft Tracker
//!
//! Pairing and standings engine for small cube drafts.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, tournaments, rounds, matches)
//! - **calculate**: Per-draft standings and lifetime rankings
//! - **pairing**: Round 1 seating bracket and Swiss pairing
//! - **lifecycle**: Tournament and round state machine
//! - **service**: Use cases over a repository, one lock per draft
//! - **storage**: Repository trait with JSONL and in-memory backends
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod pairing;
pub mod service;
pub mod storage;

pub use error::{DraftError, Result};
pub use models::*;
