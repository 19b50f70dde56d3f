//! # Interview Coach Common Library
//!
//! Shared code for the interview coach backend:
//! - Session, question and chunk feedback models
//! - Score estimation (clarity from filler density, confidence from emotions)
//! - Session aggregation and recommendations
//! - Session store contract with in-memory and SQLite backends
//! - Configuration loading

pub mod aggregation;
pub mod config;
pub mod error;
pub mod models;
pub mod scoring;
pub mod store;

pub use aggregation::{aggregate_session, complete_session, Recommendation, Thresholds};
pub use error::{Error, Result};
pub use store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
