//! Host CPU and memory sampling

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{CpuExt, System, SystemExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::MetricsRecorder;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One host resource reading
#[derive(Debug, Clone, Serialize)]
pub struct SystemSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_used_gb: f64,
    pub memory_available_gb: f64,
}

impl SystemSample {
    pub fn new(
        cpu_percent: f32,
        memory_used: u64,
        memory_available: u64,
        memory_total: u64,
    ) -> Self {
        let memory_percent = if memory_total == 0 {
            0.0
        } else {
            (memory_used as f64 / memory_total as f64 * 100.0) as f32
        };
        Self {
            timestamp: Utc::now(),
            cpu_percent,
            memory_percent,
            memory_used_gb: memory_used as f64 / BYTES_PER_GB,
            memory_available_gb: memory_available as f64 / BYTES_PER_GB,
        }
    }
}

/// Wraps a `sysinfo::System` that keeps CPU counters between reads
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta, the first refresh only sets the baseline
        system.refresh_cpu();
        Self { system }
    }

    pub fn sample(&mut self) -> SystemSample {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        SystemSample::new(
            self.system.global_cpu_info().cpu_usage(),
            self.system.used_memory(),
            self.system.available_memory(),
            self.system.total_memory(),
        )
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed `recorder` with a host reading every `interval`
pub fn spawn_system_sampler(recorder: Arc<MetricsRecorder>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Starting system sampler");
    tokio::spawn(async move {
        let mut sampler = SystemSampler::new();
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately, skip it so the CPU delta has a real span
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sample = sampler.sample();
            debug!(
                cpu_percent = sample.cpu_percent,
                memory_percent = sample.memory_percent,
                "Sampled host resources"
            );
            recorder.record_system(sample);
        }
    })
}
