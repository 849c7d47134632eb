//! Bounded in-memory log of API calls and the statistics derived from it

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::MetricsConfig;
use crate::generation::UseCase;
use crate::metrics::csv::{self, CsvSink};
use crate::metrics::system::SystemSample;

/// Number of most recent calls used for the slow-response alert
const RECENT_WINDOW: usize = 5;

const SLOW_WARNING_MS: f64 = 5_000.0;
const SLOW_ERROR_MS: f64 = 10_000.0;
const ERROR_RATE_WARNING: f64 = 10.0;
const ERROR_RATE_ERROR: f64 = 20.0;
const SUCCESS_RATE_TARGET: f64 = 90.0;
const CPU_WARNING: f32 = 70.0;
const CPU_ERROR: f32 = 90.0;
const MEMORY_WARNING: f32 = 70.0;
const MEMORY_ERROR: f32 = 90.0;

/// Host load above which a recommendation is made
const RESOURCE_ADVICE: f32 = 80.0;
/// Samples needed before the average response time drives a recommendation
const ADVICE_MIN_SAMPLES: usize = 10;

/// Extra facts a handler attaches to its response for the timing layer
#[derive(Debug, Clone, Copy, Default)]
pub struct CallAnnotation {
    pub use_case: Option<UseCase>,
    pub images: usize,
}

/// One timed API call
#[derive(Debug, Clone, Serialize)]
pub struct ApiCallSample {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub use_case: Option<UseCase>,
    pub status: u16,
    pub success: bool,
    pub response_time_ms: f64,
    pub request_size: u64,
    pub response_size: u64,
    pub images: usize,
    pub error: Option<String>,
}

impl ApiCallSample {
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status: u16,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            endpoint: endpoint.into(),
            method: method.into(),
            use_case: None,
            status,
            success: (200..300).contains(&status),
            response_time_ms: elapsed.as_secs_f64() * 1000.0,
            request_size: 0,
            response_size: 0,
            images: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointStats {
    pub requests: u64,
    pub failures: u64,
    pub avg_response_time_ms: f64,
    pub max_response_time_ms: f64,
    #[serde(skip)]
    total_response_time_ms: f64,
}

impl EndpointStats {
    fn observe(&mut self, sample: &ApiCallSample) {
        self.requests += 1;
        if !sample.success {
            self.failures += 1;
        }
        self.total_response_time_ms += sample.response_time_ms;
        self.avg_response_time_ms = self.total_response_time_ms / self.requests as f64;
        self.max_response_time_ms = self.max_response_time_ms.max(sample.response_time_ms);
    }
}

#[derive(Debug, Default)]
struct Totals {
    requests: u64,
    successful: u64,
    failed: u64,
    images: u64,
}

#[derive(Debug)]
struct State {
    samples: VecDeque<ApiCallSample>,
    errors: VecDeque<ApiCallSample>,
    totals: Totals,
    system: VecDeque<SystemSample>,
    peak_cpu_percent: f32,
    peak_memory_percent: f32,
}

/// Aggregate view served at `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_images: u64,
    pub success_rate: f64,
    pub avg_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub throughput_per_minute: f64,
    pub error_rate: f64,
    pub window_minutes: u64,
    pub history_len: usize,
    pub started_at: DateTime<Utc>,
    pub endpoints: BTreeMap<String, EndpointStats>,
    /// Latest host reading, absent until the sampler has run once
    pub system: Option<SystemSample>,
    pub peak_cpu_percent: f32,
    pub peak_memory_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

/// Performance recorder shared by the timing layer and the metrics routes
pub struct MetricsRecorder {
    state: Mutex<State>,
    endpoints: DashMap<String, EndpointStats>,
    max_history: usize,
    max_errors: usize,
    window: ChronoDuration,
    window_minutes: u64,
    started_at: Mutex<DateTime<Utc>>,
    csv: Option<CsvSink>,
}

impl MetricsRecorder {
    /// In-memory recorder without a CSV mirror
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            state: Mutex::new(State {
                samples: VecDeque::with_capacity(config.max_history.min(4096)),
                errors: VecDeque::new(),
                totals: Totals::default(),
                system: VecDeque::new(),
                peak_cpu_percent: 0.0,
                peak_memory_percent: 0.0,
            }),
            endpoints: DashMap::new(),
            max_history: config.max_history.max(1),
            max_errors: config.max_errors,
            window: ChronoDuration::minutes(config.window_minutes.max(1) as i64),
            window_minutes: config.window_minutes.max(1),
            started_at: Mutex::new(Utc::now()),
            csv: None,
        }
    }

    /// Recorder that also appends every sample to `config.csv_path`.
    /// Must be called from within a Tokio runtime when a path is set.
    pub fn with_csv(config: &MetricsConfig) -> Self {
        let mut recorder = Self::new(config);
        recorder.csv = config.csv_path.as_ref().map(CsvSink::spawn);
        recorder
    }

    pub fn record(&self, sample: ApiCallSample) {
        self.endpoints
            .entry(sample.endpoint.clone())
            .or_default()
            .observe(&sample);

        if let Some(csv) = &self.csv {
            csv.append(&sample);
        }

        debug!(
            endpoint = %sample.endpoint,
            status = sample.status,
            response_time_ms = sample.response_time_ms,
            "Recorded API call"
        );

        let mut state = self.state.lock();
        state.totals.requests += 1;
        state.totals.images += sample.images as u64;
        if sample.success {
            state.totals.successful += 1;
        } else {
            state.totals.failed += 1;
            if self.max_errors > 0 {
                if state.errors.len() == self.max_errors {
                    state.errors.pop_front();
                }
                state.errors.push_back(sample.clone());
            }
        }

        if state.samples.len() == self.max_history {
            state.samples.pop_front();
        }
        state.samples.push_back(sample);
    }

    pub fn record_system(&self, sample: SystemSample) {
        let mut state = self.state.lock();
        state.peak_cpu_percent = state.peak_cpu_percent.max(sample.cpu_percent);
        state.peak_memory_percent = state.peak_memory_percent.max(sample.memory_percent);
        if state.system.len() == self.max_history {
            state.system.pop_front();
        }
        state.system.push_back(sample);
    }

    pub fn summary(&self) -> MetricsSummary {
        self.summary_at(Utc::now())
    }

    /// Summary with the rolling window ending at `now`
    pub fn summary_at(&self, now: DateTime<Utc>) -> MetricsSummary {
        let state = self.state.lock();
        let totals = &state.totals;

        let times: Vec<f64> = state.samples.iter().map(|s| s.response_time_ms).collect();
        let avg = if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<f64>() / times.len() as f64
        };

        let cutoff = now - self.window;
        let recent: Vec<&ApiCallSample> = state
            .samples
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .collect();
        let recent_failed = recent.iter().filter(|s| !s.success).count();
        let error_rate = if recent.is_empty() {
            0.0
        } else {
            recent_failed as f64 / recent.len() as f64 * 100.0
        };

        let success_rate = if totals.requests == 0 {
            0.0
        } else {
            totals.successful as f64 / totals.requests as f64 * 100.0
        };

        MetricsSummary {
            total_requests: totals.requests,
            successful_requests: totals.successful,
            failed_requests: totals.failed,
            total_images: totals.images,
            success_rate,
            avg_response_time_ms: avg,
            p95_response_time_ms: percentile(&times, 95.0),
            throughput_per_minute: recent.len() as f64 / self.window_minutes as f64,
            error_rate,
            window_minutes: self.window_minutes,
            history_len: state.samples.len(),
            started_at: *self.started_at.lock(),
            endpoints: self
                .endpoints
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            system: state.system.back().cloned(),
            peak_cpu_percent: state.peak_cpu_percent,
            peak_memory_percent: state.peak_memory_percent,
        }
    }

    /// Most recent samples, newest first
    pub fn recent(&self, limit: usize) -> Vec<ApiCallSample> {
        self.state.lock().samples.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent failed calls, newest first
    pub fn errors(&self, limit: usize) -> Vec<ApiCallSample> {
        self.state.lock().errors.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent host readings, newest first
    pub fn system_history(&self, limit: usize) -> Vec<SystemSample> {
        self.state.lock().system.iter().rev().take(limit).cloned().collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts_at(Utc::now())
    }

    pub fn alerts_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let summary = self.summary_at(now);

        if let Some(system) = &summary.system {
            if system.cpu_percent > CPU_ERROR {
                alerts.push(Alert {
                    level: AlertLevel::Error,
                    message: format!("High CPU usage: {:.1}%", system.cpu_percent),
                });
            } else if system.cpu_percent > CPU_WARNING {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    message: format!("Elevated CPU usage: {:.1}%", system.cpu_percent),
                });
            }

            if system.memory_percent > MEMORY_ERROR {
                alerts.push(Alert {
                    level: AlertLevel::Error,
                    message: format!("High memory usage: {:.1}%", system.memory_percent),
                });
            } else if system.memory_percent > MEMORY_WARNING {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    message: format!("Elevated memory usage: {:.1}%", system.memory_percent),
                });
            }
        }

        {
            let state = self.state.lock();
            if state.samples.len() > RECENT_WINDOW {
                let recent_avg = state
                    .samples
                    .iter()
                    .rev()
                    .take(RECENT_WINDOW)
                    .map(|s| s.response_time_ms)
                    .sum::<f64>()
                    / RECENT_WINDOW as f64;
                let seconds = recent_avg / 1000.0;
                if recent_avg > SLOW_ERROR_MS {
                    alerts.push(Alert {
                        level: AlertLevel::Error,
                        message: format!("Slow API responses: {:.2}s average", seconds),
                    });
                } else if recent_avg > SLOW_WARNING_MS {
                    alerts.push(Alert {
                        level: AlertLevel::Warning,
                        message: format!("Slower API responses: {:.2}s average", seconds),
                    });
                }
            }
        }

        if summary.error_rate > ERROR_RATE_ERROR {
            alerts.push(Alert {
                level: AlertLevel::Error,
                message: format!("High error rate: {:.1}%", summary.error_rate),
            });
        } else if summary.error_rate > ERROR_RATE_WARNING {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                message: format!("Elevated error rate: {:.1}%", summary.error_rate),
            });
        }

        if summary.total_requests > 0 && summary.success_rate < SUCCESS_RATE_TARGET {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                message: format!(
                    "Success rate is {:.1}%, below {:.0}%. \
                     Check the API key and upstream connectivity",
                    summary.success_rate, SUCCESS_RATE_TARGET
                ),
            });
        }

        alerts
    }

    /// Tuning advice derived from the latest host reading and the call history
    pub fn recommendations(&self) -> Vec<String> {
        let summary = self.summary();
        let mut advice = Vec::new();

        if let Some(system) = &summary.system {
            if system.cpu_percent > RESOURCE_ADVICE {
                advice.push(
                    "Consider reducing concurrent operations or optimizing CPU-intensive tasks"
                        .to_string(),
                );
            }
            if system.memory_percent > RESOURCE_ADVICE {
                advice.push(
                    "Consider reducing memory usage by processing smaller batches".to_string(),
                );
            }
        }

        if summary.history_len > ADVICE_MIN_SAMPLES
            && summary.avg_response_time_ms > SLOW_WARNING_MS
        {
            advice.push(
                "API responses are slow. Consider simpler prompts or smaller output sizes"
                    .to_string(),
            );
        }

        if summary.total_requests > 0 && summary.success_rate < SUCCESS_RATE_TARGET {
            advice.push(format!(
                "Success rate is below {:.0}%. Check API configuration and network connectivity",
                SUCCESS_RATE_TARGET
            ));
        }

        advice
    }

    /// Whole in-memory history as CSV, oldest first
    pub fn to_csv(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from(csv::HEADER);
        out.push('\n');
        for sample in &state.samples {
            out.push_str(&csv::row(sample));
            out.push('\n');
        }
        out
    }

    /// Drop history, error log, totals, host readings and endpoint stats
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.samples.clear();
        state.errors.clear();
        state.totals = Totals::default();
        state.system.clear();
        state.peak_cpu_percent = 0.0;
        state.peak_memory_percent = 0.0;
        self.endpoints.clear();
        *self.started_at.lock() = Utc::now();
    }
}

/// Nearest-rank percentile
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
