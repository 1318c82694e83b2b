use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Process counters, exported on the status API's `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub polls: IntCounter,
    pub poll_failures: IntCounter,
    pub orders_submitted: IntCounter,
    pub orders_rejected: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("copytrade".to_string()), None)?;

        let polls = IntCounter::new("polls_total", "Balance/position refreshes started")?;
        let poll_failures = IntCounter::new("poll_failures_total", "Refreshes that hit a venue error")?;
        let orders_submitted = IntCounter::new("orders_submitted_total", "Orders signed and submitted")?;
        let orders_rejected = IntCounter::new("orders_rejected_total", "Orders rejected before submission")?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(poll_failures.clone()))?;
        registry.register(Box::new(orders_submitted.clone()))?;
        registry.register(Box::new(orders_rejected.clone()))?;

        Ok(Self {
            registry,
            polls,
            poll_failures,
            orders_submitted,
            orders_rejected,
        })
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefixed_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.polls.inc();
        metrics.orders_rejected.inc_by(2);

        let text = metrics.render();
        assert!(text.contains("copytrade_polls_total 1"));
        assert!(text.contains("copytrade_orders_rejected_total 2"));
    }
}
