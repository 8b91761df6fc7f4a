//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Counters for RPC transports.
//!
//! Counters are kept in process as atomics and, when the `observability`
//! feature is enabled, mirrored to the `metrics` facade under the
//! `fabricrpc.transport.*` names so any installed recorder can export them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for one RPC transport.
///
/// All counters are relaxed atomics; a snapshot taken while traffic is
/// flowing may be slightly inconsistent across fields.
///
/// # Examples
///
/// ```rust
/// use fabricrpc::observability::TransportMetrics;
/// use std::time::Duration;
///
/// let metrics = TransportMetrics::new();
/// metrics.record_call_issued();
/// metrics.record_response_received(Duration::from_micros(40));
///
/// assert_eq!(metrics.calls_issued(), 1);
/// assert_eq!(metrics.responses_received(), 1);
/// assert_eq!(metrics.in_flight(), 0);
/// ```
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Calls handed to the control path
    calls_issued: AtomicU64,
    /// Responses matched to an outstanding call
    responses_received: AtomicU64,
    /// Outstanding calls resolved as closed during teardown
    calls_drained: AtomicU64,
    /// Requests answered by a worker
    requests_served: AtomicU64,
    /// Frame bytes handed to the backend
    bytes_sent: AtomicU64,
    /// Frame bytes delivered by the backend
    bytes_received: AtomicU64,
    /// Times a caller or worker found the pool empty
    pool_exhausted: AtomicU64,
    /// Sum of call round-trip times in nanoseconds
    total_latency_ns: AtomicU64,
}

impl TransportMetrics {
    /// Creates a zeroed set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call being sent.
    pub fn record_call_issued(&self) {
        self.calls_issued.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("fabricrpc.transport.calls.issued").increment(1);
            metrics::gauge!("fabricrpc.transport.calls.outstanding").increment(1.0);
        }
    }

    /// Records a response matched to its call, with the round-trip time.
    pub fn record_response_received(&self, latency: Duration) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("fabricrpc.transport.responses.received").increment(1);
            metrics::gauge!("fabricrpc.transport.calls.outstanding").decrement(1.0);
            metrics::histogram!("fabricrpc.transport.latency.us")
                .record(latency.as_secs_f64() * 1_000_000.0);
        }
    }

    /// Records outstanding calls resolved as closed.
    pub fn record_calls_drained(&self, count: usize) {
        self.calls_drained
            .fetch_add(count as u64, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("fabricrpc.transport.calls.drained").increment(count as u64);
            metrics::gauge!("fabricrpc.transport.calls.outstanding").decrement(count as f64);
        }
    }

    /// Records a request answered by a worker.
    pub fn record_request_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("fabricrpc.transport.requests.served").increment(1);
    }

    /// Records bytes handed to the backend.
    pub fn record_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("fabricrpc.transport.bytes.sent").increment(bytes);
    }

    /// Records bytes delivered by the backend.
    pub fn record_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("fabricrpc.transport.bytes.received").increment(bytes);
    }

    /// Records an attempt to lease from an empty pool.
    pub fn record_pool_exhausted(&self) {
        self.pool_exhausted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("fabricrpc.transport.pool.exhausted").increment(1);
    }

    /// Calls sent so far.
    #[must_use]
    pub fn calls_issued(&self) -> u64 {
        self.calls_issued.load(Ordering::Relaxed)
    }

    /// Responses matched to their call.
    #[must_use]
    pub fn responses_received(&self) -> u64 {
        self.responses_received.load(Ordering::Relaxed)
    }

    /// Calls resolved as closed instead of answered.
    #[must_use]
    pub fn calls_drained(&self) -> u64 {
        self.calls_drained.load(Ordering::Relaxed)
    }

    /// Requests answered by serve workers.
    #[must_use]
    pub fn requests_served(&self) -> u64 {
        self.requests_served.load(Ordering::Relaxed)
    }

    /// Frame bytes handed to the backend.
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Frame bytes delivered by the backend.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Times a caller or worker had to wait for a free buffer piece.
    #[must_use]
    pub fn pool_exhausted(&self) -> u64 {
        self.pool_exhausted.load(Ordering::Relaxed)
    }

    /// Returns the number of calls neither answered nor drained.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.calls_issued()
            .saturating_sub(self.responses_received())
            .saturating_sub(self.calls_drained())
    }

    /// Returns the mean round-trip time of answered calls.
    #[must_use]
    pub fn average_latency(&self) -> Option<Duration> {
        let responses = self.responses_received();
        if responses == 0 {
            return None;
        }
        Some(Duration::from_nanos(
            self.total_latency_ns.load(Ordering::Relaxed) / responses,
        ))
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.calls_issued.store(0, Ordering::Relaxed);
        self.responses_received.store(0, Ordering::Relaxed);
        self.calls_drained.store(0, Ordering::Relaxed);
        self.requests_served.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.pool_exhausted.store(0, Ordering::Relaxed);
        self.total_latency_ns.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_metrics_new() {
        let metrics = TransportMetrics::new();
        assert_eq!(metrics.calls_issued(), 0);
        assert_eq!(metrics.in_flight(), 0);
        assert_eq!(metrics.average_latency(), None);
    }

    #[test]
    fn test_transport_metrics_in_flight() {
        let metrics = TransportMetrics::new();
        for _ in 0..3 {
            metrics.record_call_issued();
        }
        metrics.record_response_received(Duration::from_micros(10));
        metrics.record_calls_drained(1);
        assert_eq!(metrics.in_flight(), 1);
    }

    #[test]
    fn test_transport_metrics_latency() {
        let metrics = TransportMetrics::new();
        metrics.record_response_received(Duration::from_micros(10));
        metrics.record_response_received(Duration::from_micros(30));
        assert_eq!(metrics.average_latency(), Some(Duration::from_micros(20)));
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_recording_without_installed_recorder() {
        let metrics = TransportMetrics::new();
        metrics.record_call_issued();
        metrics.record_bytes_sent(64);
        metrics.record_response_received(Duration::from_micros(5));
        metrics.record_calls_drained(0);
        assert_eq!(metrics.calls_issued(), 1);
        assert_eq!(metrics.bytes_sent(), 64);
        assert_eq!(metrics.in_flight(), 0);
    }

    #[test]
    fn test_transport_metrics_reset() {
        let metrics = TransportMetrics::new();
        metrics.record_bytes_sent(10);
        metrics.record_bytes_received(20);
        metrics.record_pool_exhausted();
        metrics.record_request_served();
        metrics.reset();
        assert_eq!(metrics.bytes_sent(), 0);
        assert_eq!(metrics.bytes_received(), 0);
        assert_eq!(metrics.pool_exhausted(), 0);
        assert_eq!(metrics.requests_served(), 0);
    }
}
