//! Per-route request counters.
//!
//! One monotonically increasing count per `(route, method)` pair, created
//! lazily on first observation and never reset. The registry is owned by
//! the gateway state rather than the process, so every server (and every
//! test) counts independently.

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

const FAMILY: &str = "counters_page_requests_request_count";
const HELP: &str = "Number of requests received";

#[derive(Clone)]
pub struct CounterRegistry {
    registry: Registry,
    requests: IntCounterVec,
}

impl CounterRegistry {
    /// Create a registry holding the request counter family.
    ///
    /// # Errors
    ///
    /// Returns an error if the family cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(Opts::new(FAMILY, HELP), &["Route", "Method"])?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { registry, requests })
    }

    pub fn increment(&self, route: &str, method: &str) {
        self.requests.with_label_values(&[route, method]).inc();
    }

    /// Current count for a pair, without creating it.
    pub fn get(&self, route: &str, method: &str) -> u64 {
        self.requests
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let labels = metric.get_label();
                let value = |name: &str| {
                    labels
                        .iter()
                        .find(|pair| pair.get_name() == name)
                        .map(|pair| pair.get_value())
                };
                value("Route") == Some(route) && value("Method") == Some(method)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    /// Prometheus text exposition of every counter.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for CounterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterRegistry").field("family", &FAMILY).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_per_route_and_method() {
        let registry = CounterRegistry::new().unwrap();
        registry.increment("/a", "GET");
        registry.increment("/a", "GET");
        registry.increment("/a", "POST");

        assert_eq!(registry.get("/a", "GET"), 2);
        assert_eq!(registry.get("/a", "POST"), 1);
        assert_eq!(registry.get("/b", "GET"), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let registry = Arc::new(CounterRegistry::new().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        registry.increment("/hot", "GET");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.get("/hot", "GET"), 8000);
    }

    #[test]
    fn test_render_exposes_family_with_escaped_labels() {
        let registry = CounterRegistry::new().unwrap();
        registry.increment("/z", "GET");
        registry.increment("/a\"b", "GET");

        let text = registry.render().unwrap();
        assert!(text.contains("# HELP counters_page_requests_request_count Number of requests received"));
        assert!(text.contains("# TYPE counters_page_requests_request_count counter"));
        assert!(text.contains(r#"counters_page_requests_request_count{Method="GET",Route="/a\"b"} 1"#));
        assert!(text.contains(r#"counters_page_requests_request_count{Method="GET",Route="/z"} 1"#));
    }

    #[test]
    fn test_lookup_does_not_create_series() {
        let registry = CounterRegistry::new().unwrap();
        registry.increment("/seen", "GET");
        assert_eq!(registry.get("/unseen", "GET"), 0);

        let text = registry.render().unwrap();
        assert!(!text.contains("/unseen"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = CounterRegistry::new().unwrap();
        let b = CounterRegistry::new().unwrap();
        a.increment("/x", "GET");
        assert_eq!(a.get("/x", "GET"), 1);
        assert_eq!(b.get("/x", "GET"), 0);
    }
}
