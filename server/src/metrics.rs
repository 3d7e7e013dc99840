// Metrics collection and tracking

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latency samples kept per endpoint for percentiles.
const MAX_LATENCY_SAMPLES: usize = 1000;

/// Per-endpoint metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
    total_latency_ms: Arc<AtomicU64>,
    min_latency_ms: Arc<AtomicU64>,
    max_latency_ms: Arc<AtomicU64>,
    latency_samples: Arc<Mutex<VecDeque<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            min_latency_ms: Arc::new(AtomicU64::new(u64::MAX)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LATENCY_SAMPLES))),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.min_latency_ms.fetch_min(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            if samples.len() == MAX_LATENCY_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(latency_ms);
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count();
        if count == 0 {
            return 0.0;
        }
        self.total_latency_ms.load(Ordering::Relaxed) as f64 / count as f64
    }

    fn percentile(&self, p: u8) -> u64 {
        let Ok(samples) = self.latency_samples.lock() else {
            return 0;
        };
        if samples.is_empty() {
            return 0;
        }
        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();
        let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
        sorted[index]
    }

    pub fn stats(&self) -> EndpointStats {
        let min = self.min_latency_ms.load(Ordering::Relaxed);
        EndpointStats {
            request_count: self.request_count(),
            error_count: self.error_count(),
            avg_latency_ms: self.avg_latency_ms(),
            min_latency_ms: if min == u64::MAX { 0 } else { min },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
            p99_latency_ms: self.percentile(99),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Audio-pipeline counters
#[derive(Debug, Clone, Default)]
pub struct AudioMetrics {
    mixed_exports: Arc<AtomicU64>,
    speech_only_exports: Arc<AtomicU64>,
    rendered_bytes: Arc<AtomicU64>,
    ambient_sessions: Arc<AtomicU64>,
}

impl AudioMetrics {
    pub fn record_export(&self, mixed: bool, wav_bytes: usize) {
        if mixed {
            self.mixed_exports.fetch_add(1, Ordering::Relaxed);
        } else {
            self.speech_only_exports.fetch_add(1, Ordering::Relaxed);
        }
        self.rendered_bytes
            .fetch_add(wav_bytes as u64, Ordering::Relaxed);
    }

    pub fn record_ambient_session(&self) {
        self.ambient_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AudioStats {
        let mixed = self.mixed_exports.load(Ordering::Relaxed);
        let fallback = self.speech_only_exports.load(Ordering::Relaxed);
        let total = mixed + fallback;
        AudioStats {
            mixed_exports: mixed,
            speech_only_exports: fallback,
            mix_success_rate: if total == 0 {
                0.0
            } else {
                mixed as f64 / total as f64 * 100.0
            },
            exported_bytes: self.rendered_bytes.load(Ordering::Relaxed),
            ambient_sessions: self.ambient_sessions.load(Ordering::Relaxed),
        }
    }
}

/// All metrics the server keeps
#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub lesson: EndpointMetrics,
    pub speech: EndpointMetrics,
    pub export: EndpointMetrics,
    pub ambient: EndpointMetrics,
    pub audio: AudioMetrics,
    started: Instant,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            lesson: EndpointMetrics::new(),
            speech: EndpointMetrics::new(),
            export: EndpointMetrics::new(),
            ambient: EndpointMetrics::new(),
            audio: AudioMetrics::default(),
            started: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> MetricsResponse {
        MetricsResponse {
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs(),
            endpoints: EndpointMetricsResponse {
                lesson: self.lesson.stats(),
                speech: self.speech.stats(),
                export: self.export.stats(),
                ambient: self.ambient.stats(),
            },
            audio: self.audio.stats(),
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub endpoints: EndpointMetricsResponse,
    pub audio: AudioStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointMetricsResponse {
    pub lesson: EndpointStats,
    pub speech: EndpointStats,
    pub export: EndpointStats,
    pub ambient: EndpointStats,
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct AudioStats {
    pub mixed_exports: u64,
    pub speech_only_exports: u64,
    pub mix_success_rate: f64,
    pub exported_bytes: u64,
    pub ambient_sessions: u64,
}
