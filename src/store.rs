//! Aggregate State Store
//!
//! Holds every running counter behind a single `RwLock`. The ingestion loop
//! is the only writer and commits a whole batch under one write guard, so a
//! snapshot either sees all of a batch's effects or none of them. Readers
//! take a deep copy and release the lock before doing anything else.

use crate::catalog;
use crate::classifier::Verdict;
use crate::simulator::EnrollmentEvent;
use chrono::{Months, NaiveDate};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::{PoisonError, RwLock};

/// Maximum number of entries kept in the live anomaly feed.
pub const ANOMALY_FEED_CAPACITY: usize = 10;

/// Marks a feed entry as detected live (as opposed to batch analytics).
pub const LIVE_MARKER: &str = "LIVE DETECTED";
pub const ALERT_SOURCE: &str = "ML ALERTS";

/// Status split applied to every committed batch, in percent.
/// Pending takes the remainder so the split is exact.
const SUCCESS_PCT: u64 = 85;
const REJECTED_PCT: u64 = 10;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    #[serde(rename = "Success")]
    pub success: u64,
    #[serde(rename = "Rejected")]
    pub rejected: u64,
    #[serde(rename = "Pending")]
    pub pending: u64,
}

impl StatusDistribution {
    /// Split `n` new records 85/10/5 with the remainder going to pending.
    pub fn split(n: u64) -> Self {
        let success = n * SUCCESS_PCT / 100;
        let rejected = n * REJECTED_PCT / 100;
        Self {
            success,
            rejected,
            pending: n - success - rejected,
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.rejected + self.pending
    }

    fn add(&mut self, other: StatusDistribution) {
        self.success += other.success;
        self.rejected += other.rejected;
        self.pending += other.pending;
    }
}

/// Entry of the live anomaly feed. Serialized in the shape the dashboard
/// table already renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyRecord {
    #[serde(rename = "State")]
    pub region: String,
    #[serde(rename = "District")]
    pub district: String,
    #[serde(rename = "total")]
    pub marker: String,
    #[serde(rename = "rejected")]
    pub source: String,
    /// Placeholder confidence in [0, 100]
    #[serde(rename = "rejection_rate")]
    pub confidence: u8,
}

impl AnomalyRecord {
    pub fn live(region: &str, district: &str, confidence: u8) -> Self {
        Self {
            region: region.to_string(),
            district: district.to_string(),
            marker: LIVE_MARKER.to_string(),
            source: ALERT_SOURCE.to_string(),
            confidence: confidence.min(100),
        }
    }

    fn same_location(&self, region: &str, district: &str) -> bool {
        self.region == region && self.district == district
    }
}

/// All running statistics. Lazily keyed maps only ever gain keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateState {
    pub total_records: u64,
    pub status_distribution: StatusDistribution,
    pub request_type_distribution: BTreeMap<String, u64>,
    /// `YYYY-MM` keys; lexicographic order is chronological
    pub monthly_trends: BTreeMap<String, u64>,
    pub state_enrollment: BTreeMap<String, u64>,
    /// Most recent first
    pub anomalies: VecDeque<AnomalyRecord>,
}

/// One generated event with the verdict computed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub event: EnrollmentEvent,
    pub verdict: Verdict,
}

/// What a commit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total_records: u64,
    pub anomalies_recorded: usize,
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

impl AggregateState {
    /// Pure bookkeeping for one batch. Infallible, so a batch is never
    /// left half-applied.
    pub fn apply(&mut self, batch: &[ClassifiedEvent], month: &str) -> usize {
        let n = batch.len() as u64;
        self.total_records += n;
        self.status_distribution.add(StatusDistribution::split(n));

        // The current month is created even for an empty batch so readers
        // always see it once a tick has run.
        *self.monthly_trends.entry(month.to_string()).or_insert(0) += n;

        let mut recorded = 0;
        for item in batch {
            let e = &item.event;
            *self
                .request_type_distribution
                .entry(e.request_type.to_string())
                .or_insert(0) += 1;
            *self.state_enrollment.entry(e.region.to_string()).or_insert(0) += 1;

            if let Verdict::Anomaly { confidence } = item.verdict {
                if self.record_anomaly(AnomalyRecord::live(e.region, e.district, confidence)) {
                    recorded += 1;
                }
            }
        }
        recorded
    }

    /// Push `record` to the front of the feed unless its (region, district)
    /// is already present. Returns whether it was inserted.
    pub fn record_anomaly(&mut self, record: AnomalyRecord) -> bool {
        if self
            .anomalies
            .iter()
            .any(|a| a.same_location(&record.region, &record.district))
        {
            return false;
        }
        self.anomalies.push_front(record);
        self.anomalies.truncate(ANOMALY_FEED_CAPACITY);
        true
    }

    pub fn success_count(&self) -> u64 {
        self.status_distribution.success
    }
}

// ============================================================================
// BASELINE
// ============================================================================

/// Synthetic starting totals so early snapshots are not empty.
#[derive(Debug, Clone)]
pub struct BaselineConfig {
    pub total_records: u64,
    /// Starting enrollment per region
    pub per_region: RangeInclusive<u64>,
    /// Starting volume per month
    pub per_month: RangeInclusive<u64>,
    /// Number of calendar months ending with the current one
    pub months: u32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            total_records: 12_500_000,
            per_region: 10_000..=50_000,
            per_month: 5_000..=15_000,
            months: 12,
        }
    }
}

impl AggregateState {
    pub fn seeded<R: Rng>(config: &BaselineConfig, today: NaiveDate, rng: &mut R) -> Self {
        let total = config.total_records;
        let mut state = AggregateState {
            total_records: total,
            status_distribution: StatusDistribution {
                success: total * 80 / 100,
                rejected: total * 15 / 100,
                pending: total * 5 / 100,
            },
            ..Default::default()
        };

        for (request_type, pct) in catalog::REQUEST_TYPES.iter().zip([30, 40, 30]) {
            state
                .request_type_distribution
                .insert(request_type.to_string(), total * pct / 100);
        }

        for region in catalog::region_names() {
            state
                .state_enrollment
                .insert(region.to_string(), rng.random_range(config.per_region.clone()));
        }

        for back in (0..config.months).rev() {
            if let Some(date) = today.checked_sub_months(Months::new(back)) {
                state
                    .monthly_trends
                    .insert(month_key(date), rng.random_range(config.per_month.clone()));
            }
        }

        state
    }
}

// ============================================================================
// STORE
// ============================================================================

pub struct StateStore {
    state: RwLock<AggregateState>,
}

impl StateStore {
    pub fn new(initial: AggregateState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Commit a batch against the local calendar month.
    pub fn apply_batch(&self, batch: &[ClassifiedEvent]) -> BatchOutcome {
        self.apply_batch_on(batch, chrono::Local::now().date_naive())
    }

    pub fn apply_batch_on(&self, batch: &[ClassifiedEvent], date: NaiveDate) -> BatchOutcome {
        let month = month_key(date);
        // A poisoned lock cannot hold a torn batch: `apply` has no
        // panicking or fallible step between its first and last write.
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let anomalies_recorded = state.apply(batch, &month);
        BatchOutcome {
            total_records: state.total_records,
            anomalies_recorded,
        }
    }

    /// Structurally independent copy of the current state.
    pub fn snapshot(&self) -> AggregateState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(AggregateState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{EventSimulator, SimulatorConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn event(region: &'static str, district: &'static str) -> EnrollmentEvent {
        EnrollmentEvent {
            region,
            district,
            request_type: "New Enrollment",
            gender: "Male",
            age: 30,
        }
    }

    fn normal(e: EnrollmentEvent) -> ClassifiedEvent {
        ClassifiedEvent {
            event: e,
            verdict: Verdict::Normal,
        }
    }

    fn flagged(e: EnrollmentEvent) -> ClassifiedEvent {
        ClassifiedEvent {
            event: e,
            verdict: Verdict::Anomaly { confidence: 90 },
        }
    }

    fn simulated(n: usize, seed: u64) -> Vec<ClassifiedEvent> {
        let mut sim = EventSimulator::new(SimulatorConfig {
            batch_min: n,
            batch_max: n,
            seed: Some(seed),
        });
        sim.generate_batch().into_iter().map(normal).collect()
    }

    #[test]
    fn test_split_is_exact() {
        for n in 0..=1000 {
            let s = StatusDistribution::split(n);
            assert_eq!(s.total(), n);
        }
        assert_eq!(
            StatusDistribution::split(50),
            StatusDistribution {
                success: 42,
                rejected: 5,
                pending: 3
            }
        );
    }

    #[test]
    fn test_batch_of_fifty_with_classifier_disabled() {
        let store = StateStore::default();
        let outcome = store.apply_batch_on(&simulated(50, 3), date());
        assert_eq!(outcome.total_records, 50);
        assert_eq!(outcome.anomalies_recorded, 0);

        let snap = store.snapshot();
        assert_eq!(snap.total_records, 50);
        assert_eq!(snap.status_distribution.total(), 50);
        assert!(snap.anomalies.is_empty());
        assert_eq!(snap.monthly_trends.get("2026-03"), Some(&50));
        assert_eq!(snap.request_type_distribution.values().sum::<u64>(), 50);
        assert_eq!(snap.state_enrollment.values().sum::<u64>(), 50);
    }

    #[test]
    fn test_empty_batch_still_touches_month() {
        let store = StateStore::default();
        store.apply_batch_on(&[], date());
        let snap = store.snapshot();
        assert_eq!(snap.total_records, 0);
        assert_eq!(snap.status_distribution.total(), 0);
        assert_eq!(snap.monthly_trends.get("2026-03"), Some(&0));
    }

    #[test]
    fn test_dedup_across_batches() {
        let store = StateStore::default();
        let batch: Vec<_> = (0..30).map(|_| flagged(event("Bihar", "Gaya"))).collect();
        let first = store.apply_batch_on(&batch, date());
        let second = store.apply_batch_on(&batch, date());
        assert_eq!(first.anomalies_recorded, 1);
        assert_eq!(second.anomalies_recorded, 0);

        let snap = store.snapshot();
        assert_eq!(snap.total_records, 60);
        assert_eq!(snap.anomalies.len(), 1);
        assert_eq!(snap.anomalies[0].region, "Bihar");
        assert_eq!(snap.anomalies[0].district, "Gaya");
        assert_eq!(snap.anomalies[0].marker, LIVE_MARKER);
    }

    #[test]
    fn test_feed_keeps_ten_most_recent() {
        let pairs: Vec<(&'static str, &'static str)> = catalog::REGIONS
            .iter()
            .flat_map(|(r, ds)| ds.iter().map(move |d| (*r, *d)))
            .take(11)
            .collect();
        assert_eq!(pairs.len(), 11);

        let store = StateStore::default();
        for &(region, district) in &pairs {
            store.apply_batch_on(&[flagged(event(region, district))], date());
        }

        let snap = store.snapshot();
        assert_eq!(snap.anomalies.len(), ANOMALY_FEED_CAPACITY);
        // Newest first, oldest evicted
        assert_eq!(snap.anomalies[0].district, pairs[10].1);
        assert_eq!(snap.anomalies[9].district, pairs[1].1);
        assert!(!snap.anomalies.iter().any(|a| a.district == pairs[0].1));
    }

    #[test]
    fn test_evicted_pair_can_return() {
        let mut state = AggregateState::default();
        let pairs: Vec<_> = catalog::REGIONS
            .iter()
            .flat_map(|(r, ds)| ds.iter().map(move |d| (*r, *d)))
            .take(11)
            .collect();
        for (r, d) in &pairs {
            assert!(state.record_anomaly(AnomalyRecord::live(r, d, 90)));
        }
        // pairs[0] fell off the window, so it is accepted again
        assert!(state.record_anomaly(AnomalyRecord::live(pairs[0].0, pairs[0].1, 88)));
        // pairs[10] is still present
        assert!(!state.record_anomaly(AnomalyRecord::live(pairs[10].0, pairs[10].1, 88)));
    }

    #[test]
    fn test_lazy_keys_persist() {
        let store = StateStore::default();
        store.apply_batch_on(&[normal(event("Delhi", "New Delhi"))], date());
        let next_month = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        store.apply_batch_on(&[normal(event("Bihar", "Patna"))], next_month);

        let snap = store.snapshot();
        assert_eq!(snap.state_enrollment.get("Delhi"), Some(&1));
        assert_eq!(snap.state_enrollment.get("Bihar"), Some(&1));
        let months: Vec<_> = snap.monthly_trends.keys().cloned().collect();
        assert_eq!(months, vec!["2026-03", "2026-04"]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = StateStore::default();
        store.apply_batch_on(&simulated(10, 1), date());
        let mut snap = store.snapshot();
        snap.total_records = 999;
        snap.monthly_trends.clear();
        let fresh = store.snapshot();
        assert_eq!(fresh.total_records, 10);
        assert_eq!(fresh.monthly_trends.get("2026-03"), Some(&10));
    }

    #[test]
    fn test_seeded_baseline() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = BaselineConfig::default();
        let state = AggregateState::seeded(&config, date(), &mut rng);

        assert_eq!(state.total_records, 12_500_000);
        assert!(state.status_distribution.total() <= state.total_records);
        assert_eq!(state.status_distribution.success, 10_000_000);
        assert_eq!(state.request_type_distribution.len(), 3);
        assert_eq!(state.state_enrollment.len(), 7);
        assert!(state
            .state_enrollment
            .values()
            .all(|v| config.per_region.contains(v)));

        let months: Vec<_> = state.monthly_trends.keys().cloned().collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months.first().map(String::as_str), Some("2025-04"));
        assert_eq!(months.last().map(String::as_str), Some("2026-03"));
        assert!(state.anomalies.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_fixed_status_keys() {
        let json = serde_json::to_value(AggregateState::default()).unwrap();
        let status = &json["status_distribution"];
        assert_eq!(status["Success"], 0);
        assert_eq!(status["Rejected"], 0);
        assert_eq!(status["Pending"], 0);
    }

    #[test]
    fn test_anomaly_record_shape() {
        let json = serde_json::to_value(AnomalyRecord::live("Delhi", "South Delhi", 93)).unwrap();
        assert_eq!(json["State"], "Delhi");
        assert_eq!(json["District"], "South Delhi");
        assert_eq!(json["total"], "LIVE DETECTED");
        assert_eq!(json["rejected"], "ML ALERTS");
        assert_eq!(json["rejection_rate"], 93);
    }
}
