//! Ingestion Loop
//!
//! Single producer that, once per period, generates a batch, classifies it
//! and commits it. Verdicts are computed before the store lock is taken, so
//! the write guard only covers bookkeeping.
//!
//! Tick lifecycle: `Idle -> Generating -> Classifying -> Committing -> Idle`.

use crate::classifier::Classifier;
use crate::error::PulseError;
use crate::metrics::{ANOMALIES_TOTAL, EVENTS_TOTAL, TICK_DURATION};
use crate::simulator::EventSimulator;
use crate::store::{ClassifiedEvent, StateStore};
use chrono::NaiveDate;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, select, tick};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    Classifying,
    Committing,
}

/// Summary of one completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub batch_size: usize,
    /// Events the classifier called anomalous
    pub anomalies_flagged: usize,
    /// Of those, how many entered the feed (the rest were duplicates)
    pub anomalies_recorded: usize,
    pub total_records: u64,
}

pub struct IngestionLoop {
    store: Arc<StateStore>,
    classifier: Arc<Classifier>,
    simulator: EventSimulator,
    phase: Phase,
    ticks: u64,
}

impl IngestionLoop {
    pub fn new(
        store: Arc<StateStore>,
        classifier: Arc<Classifier>,
        simulator: EventSimulator,
    ) -> Self {
        Self {
            store,
            classifier,
            simulator,
            phase: Phase::Idle,
            ticks: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick_on(chrono::Local::now().date_naive())
    }

    /// Run one tick, attributing the batch to the month of `date`.
    pub fn tick_on(&mut self, date: NaiveDate) -> TickReport {
        let timer = TICK_DURATION.start_timer();

        self.phase = Phase::Generating;
        let events = self.simulator.generate_batch();

        self.phase = Phase::Classifying;
        let batch: Vec<ClassifiedEvent> = events
            .into_iter()
            .map(|event| ClassifiedEvent {
                verdict: self.classifier.evaluate(&event, self.simulator.rng()),
                event,
            })
            .collect();
        let flagged = batch.iter().filter(|c| c.verdict.is_anomaly()).count();

        self.phase = Phase::Committing;
        let outcome = self.store.apply_batch_on(&batch, date);

        self.phase = Phase::Idle;
        self.ticks += 1;
        EVENTS_TOTAL.inc_by(batch.len() as f64);
        ANOMALIES_TOTAL.inc_by(flagged as f64);
        timer.observe_duration();

        for c in batch.iter().filter(|c| c.verdict.is_anomaly()) {
            debug!(
                region = c.event.region,
                district = c.event.district,
                age = c.event.age,
                "Anomalous enrollment"
            );
        }
        if outcome.anomalies_recorded > 0 {
            info!(
                tick = self.ticks,
                recorded = outcome.anomalies_recorded,
                "New anomalies in live feed"
            );
        }

        let report = TickReport {
            tick: self.ticks,
            batch_size: batch.len(),
            anomalies_flagged: flagged,
            anomalies_recorded: outcome.anomalies_recorded,
            total_records: outcome.total_records,
        };
        debug!(?report, "Tick committed");
        report
    }

    /// Move the loop onto its own thread, ticking every `period`.
    pub fn spawn(self, period: Duration) -> Result<IngestionHandle, PulseError> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("pulse-ingest".into())
            .spawn(move || self.run(period, shutdown_rx))
            .map_err(PulseError::Spawn)?;
        Ok(IngestionHandle {
            shutdown_tx,
            thread,
        })
    }

    fn run(mut self, period: Duration, shutdown: Receiver<()>) -> u64 {
        info!(
            period_ms = period.as_millis() as u64,
            classifier = self.classifier.is_available(),
            "Ingestion loop active."
        );

        let ticker = tick(period);
        // Shutdown is only observed between ticks; a batch in flight
        // always commits.
        while !shutdown_requested(&shutdown) {
            self.tick();
            select! {
                recv(shutdown) -> _ => break,
                recv(ticker) -> _ => {}
            }
        }

        info!(ticks = self.ticks, "Ingestion loop stopped.");
        self.ticks
    }
}

fn shutdown_requested(rx: &Receiver<()>) -> bool {
    !matches!(rx.try_recv(), Err(TryRecvError::Empty))
}

/// Owner of the background ingestion thread.
pub struct IngestionHandle {
    shutdown_tx: Sender<()>,
    thread: thread::JoinHandle<u64>,
}

impl IngestionHandle {
    /// Stop after the current tick and wait for the thread. Returns the
    /// number of completed ticks.
    pub fn shutdown(self) -> u64 {
        let _ = self.shutdown_tx.try_send(());
        drop(self.shutdown_tx);
        match self.thread.join() {
            Ok(ticks) => ticks,
            Err(_) => {
                error!("Ingestion thread panicked.");
                0
            }
        }
    }
}
