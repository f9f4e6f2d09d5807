//! Prometheus metrics for relayed requests and conversation memory.

use std::sync::Mutex;
use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::memory::MemoryStats;

pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    latency: HistogramVec,
    conversations: IntGauge,
    turns: IntGauge,
    evicted_turns: IntCounter,
    max_window_size: IntGauge,
    /// Serializes scrapes so the eviction counter is advanced once per delta.
    refresh: Mutex<()>,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("prompt_relay".to_string()), None)?;

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "Remote model calls by backend and outcome"),
            &["backend", "outcome"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Remote model call latency")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["backend"],
        )?;
        let conversations = IntGauge::new("memory_conversations", "Conversations held in memory")?;
        let turns = IntGauge::new("memory_turns", "Turns held across all conversations")?;
        let evicted_turns =
            IntCounter::new("memory_evicted_turns_total", "Turns evicted since start")?;
        let max_window_size = IntGauge::new("memory_max_window_size", "Current window bound")?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(conversations.clone()))?;
        registry.register(Box::new(turns.clone()))?;
        registry.register(Box::new(evicted_turns.clone()))?;
        registry.register(Box::new(max_window_size.clone()))?;

        Ok(Self {
            registry,
            requests,
            latency,
            conversations,
            turns,
            evicted_turns,
            max_window_size,
            refresh: Mutex::new(()),
        })
    }

    /// Record one finished remote call.
    pub fn observe(&self, backend: &str, outcome: &str, elapsed: Duration) {
        self.requests.with_label_values(&[backend, outcome]).inc();
        self.latency
            .with_label_values(&[backend])
            .observe(elapsed.as_secs_f64());
    }

    /// Refresh memory gauges from `stats` and encode everything in the text
    /// exposition format.
    pub fn render(&self, stats: &MemoryStats) -> Result<String, prometheus::Error> {
        {
            let _guard = self
                .refresh
                .lock()
                .map_err(|e| prometheus::Error::Msg(e.to_string()))?;
            self.conversations.set(stats.conversations as i64);
            self.turns.set(stats.turns as i64);
            self.max_window_size.set(stats.max_window_size as i64);
            let delta = stats.evicted_turns.saturating_sub(self.evicted_turns.get());
            self.evicted_turns.inc_by(delta);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters_and_gauges() {
        let metrics = Metrics::new().unwrap();
        metrics.observe("Ollama", "ok", Duration::from_millis(120));

        let text = metrics
            .render(&MemoryStats {
                conversations: 2,
                turns: 7,
                evicted_turns: 1,
                max_window_size: 20,
            })
            .unwrap();
        assert!(text.contains(r#"prompt_relay_requests_total{backend="Ollama",outcome="ok"} 1"#));
        assert!(text.contains("prompt_relay_memory_turns 7"));
        assert!(text.contains("prompt_relay_memory_max_window_size 20"));
        assert!(text.contains("# TYPE prompt_relay_memory_evicted_turns_total counter"));
        assert!(text.contains("prompt_relay_memory_evicted_turns_total 1"));
    }

    #[test]
    fn test_evicted_turns_counter_follows_stats() {
        let metrics = Metrics::new().unwrap();
        let stats = |evicted_turns| MemoryStats {
            conversations: 1,
            turns: 2,
            evicted_turns,
            max_window_size: 2,
        };

        metrics.render(&stats(3)).unwrap();
        let text = metrics.render(&stats(3)).unwrap();
        assert!(text.contains("prompt_relay_memory_evicted_turns_total 3"));

        // A stale snapshot never moves the counter backwards.
        metrics.render(&stats(1)).unwrap();
        let text = metrics.render(&stats(5)).unwrap();
        assert!(text.contains("prompt_relay_memory_evicted_turns_total 5"));
    }
}
