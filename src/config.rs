//! Server configuration: command-line flags with `PULSE_*` environment
//! fallbacks.

use crate::error::PulseError;
use crate::simulator::SimulatorConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "pulse-server")]
#[command(about = "Live enrollment statistics with ML anomaly flagging")]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "PULSE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PULSE_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Ingestion period in milliseconds
    #[arg(long, env = "PULSE_TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// Smallest batch generated per tick
    #[arg(long, env = "PULSE_BATCH_MIN", default_value_t = 20)]
    pub batch_min: usize,

    /// Largest batch generated per tick
    #[arg(long, env = "PULSE_BATCH_MAX", default_value_t = 100)]
    pub batch_max: usize,

    /// Model artifact (encoders + forest). Missing file = degraded mode
    #[arg(long, env = "PULSE_MODEL", default_value = "artifacts/model.json")]
    pub model: PathBuf,

    /// Seed for reproducible event streams
    #[arg(long, env = "PULSE_SEED")]
    pub seed: Option<u64>,

    /// Start from empty counters instead of the synthetic baseline
    #[arg(long, env = "PULSE_NO_BASELINE")]
    pub no_baseline: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            tick_ms: 1000,
            batch_min: 20,
            batch_max: 100,
            model: PathBuf::from("artifacts/model.json"),
            seed: None,
            no_baseline: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), PulseError> {
        if self.tick_ms == 0 {
            return Err(PulseError::Config("tick_ms must be positive".into()));
        }
        if self.batch_min > self.batch_max {
            return Err(PulseError::Config(format!(
                "batch_min ({}) exceeds batch_max ({})",
                self.batch_min, self.batch_max
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            batch_min: self.batch_min,
            batch_max: self.batch_max,
            seed: self.seed,
        }
    }
}
