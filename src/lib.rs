//! enrollment-pulse: live aggregate statistics over a stream of synthetic
//! identity-enrollment events, with per-event anomaly flagging by an
//! offline-trained classifier.
//!
//! ```text
//!   EventSimulator ──► Classifier (encoder + model) ──► StateStore ◄── StatsService ◄── GET /api/stats
//!        └──────────── IngestionLoop (one thread, 1 tick/s) ─┘
//! ```

pub mod api;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod query;
pub mod simulator;
pub mod store;

pub use classifier::{Classifier, Verdict};
pub use error::{ModelError, PulseError};
pub use ingest::{IngestionHandle, IngestionLoop, TickReport};
pub use query::{StatsService, StatsView};
pub use store::{AggregateState, AnomalyRecord, StateStore};
