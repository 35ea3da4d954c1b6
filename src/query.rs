//! Snapshot Query Service
//!
//! Read side of the store: copies a snapshot out under the read lock and
//! shapes it for the dashboard.

use crate::metrics::SNAPSHOTS_TOTAL;
use crate::store::{AggregateState, AnomalyRecord, StateStore, StatusDistribution};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: u64,
    /// Percent of records with status Success, two decimals
    pub success_rate: f64,
    /// Local wall-clock time of the snapshot, `HH:MM:SS`
    pub last_updated: String,
}

/// Body of `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub summary: Summary,
    pub status_distribution: StatusDistribution,
    pub request_type_distribution: BTreeMap<String, u64>,
    pub monthly_trends: BTreeMap<String, u64>,
    pub state_wise_enrollment: BTreeMap<String, u64>,
    pub anomalies: VecDeque<AnomalyRecord>,
}

impl StatsView {
    pub fn from_state(state: AggregateState, now: DateTime<Local>) -> Self {
        Self {
            summary: Summary {
                total_records: state.total_records,
                success_rate: success_rate(state.success_count(), state.total_records),
                last_updated: now.format("%H:%M:%S").to_string(),
            },
            status_distribution: state.status_distribution,
            request_type_distribution: state.request_type_distribution,
            monthly_trends: state.monthly_trends,
            state_wise_enrollment: state.state_enrollment,
            anomalies: state.anomalies,
        }
    }
}

/// `success / total * 100`, rounded to two decimals. Zero when there are
/// no records.
pub fn success_rate(success: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = success as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<StateStore>,
}

impl StatsService {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn get_stats(&self) -> StatsView {
        SNAPSHOTS_TOTAL.inc();
        StatsView::from_state(self.store.snapshot(), Local::now())
    }
}
