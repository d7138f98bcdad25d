use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct HarvestSnapshot {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub retry_count: usize,
    pub retry_reasons: HashMap<String, usize>,
    pub elements_seen: usize,
    pub elements_skipped: usize,
    pub postings_emitted: usize,
    pub stop_reason: Option<String>,
    pub average_fetch_time: f64, // in milliseconds
}

/// Shared counters for one harvest run. Clones point at the same counters.
#[derive(Debug, Clone)]
pub struct HarvestStats {
    stats: Arc<RwLock<HarvestSnapshot>>,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(HarvestSnapshot {
                start_time: Utc::now(),
                end_time: None,
                pages_fetched: 0,
                fetch_failures: 0,
                retry_count: 0,
                retry_reasons: HashMap::new(),
                elements_seen: 0,
                elements_skipped: 0,
                postings_emitted: 0,
                stop_reason: None,
                average_fetch_time: 0.0,
            })),
        }
    }

    pub fn record_fetch(&self, elapsed: Duration) {
        let mut stats = self.stats.write();
        stats.pages_fetched += 1;

        let current_total = stats.average_fetch_time * (stats.pages_fetched - 1) as f64;
        let new_duration = elapsed.as_secs_f64() * 1000.0;
        stats.average_fetch_time = (current_total + new_duration) / stats.pages_fetched as f64;
    }

    pub fn record_fetch_failure(&self) {
        self.stats.write().fetch_failures += 1;
    }

    pub fn record_retry(&self, category: String) {
        let mut stats = self.stats.write();
        stats.retry_count += 1;
        *stats.retry_reasons.entry(category).or_insert(0) += 1;
    }

    pub fn record_elements(&self, seen: usize) {
        self.stats.write().elements_seen += seen;
    }

    pub fn record_skip(&self) {
        self.stats.write().elements_skipped += 1;
    }

    pub fn record_emit(&self) {
        self.stats.write().postings_emitted += 1;
    }

    pub fn record_stop(&self, reason: impl Into<String>) {
        self.stats.write().stop_reason = Some(reason.into());
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> HarvestSnapshot {
        self.stats.read().clone()
    }

    pub fn print_summary(&self) {
        self.get_stats().print_summary();
    }
}

impl HarvestSnapshot {
    pub fn summary(&self) -> String {
        let duration = self
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.start_time);

        let mut lines = vec![
            "Harvest Statistics:".to_string(),
            "===================".to_string(),
            format!("Duration: {} seconds", duration.num_seconds()),
            format!("Pages Fetched: {}", self.pages_fetched),
            format!("Fetch Failures: {}", self.fetch_failures),
            format!("Retry Count: {}", self.retry_count),
            format!("Elements Seen: {}", self.elements_seen),
            format!("Elements Skipped: {}", self.elements_skipped),
            format!("Postings Emitted: {}", self.postings_emitted),
        ];
        if let Some(reason) = &self.stop_reason {
            lines.push(format!("Stopped Because: {}", reason));
        }
        lines.push(format!("Average Fetch Time: {:.2}ms", self.average_fetch_time));

        if !self.retry_reasons.is_empty() {
            lines.push(String::new());
            lines.push("Retry Reasons:".to_string());
            for (reason, count) in &self.retry_reasons {
                lines.push(format!("  {}: {}", reason, count));
            }
        }
        lines.join("\n")
    }

    pub fn print_summary(&self) {
        println!("\n{}", self.summary());
    }
}

impl Default for HarvestStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let stats = HarvestStats::new();
        let other = stats.clone();

        other.record_fetch(Duration::from_millis(100));
        other.record_fetch(Duration::from_millis(300));
        stats.record_retry("NavigationTimeout".to_string());
        stats.record_retry("NavigationTimeout".to_string());
        stats.record_elements(5);
        stats.record_skip();
        stats.record_emit();

        let snapshot = stats.get_stats();
        assert_eq!(snapshot.pages_fetched, 2);
        assert!((snapshot.average_fetch_time - 200.0).abs() < 1e-6);
        assert_eq!(snapshot.retry_count, 2);
        assert_eq!(snapshot.retry_reasons["NavigationTimeout"], 2);
        assert_eq!(snapshot.elements_seen, 5);
        assert_eq!(snapshot.elements_skipped, 1);
        assert_eq!(snapshot.postings_emitted, 1);
        assert!(snapshot.end_time.is_none());

        stats.finish();
        assert!(other.get_stats().end_time.is_some());
    }

    #[test]
    fn test_summary_reports_counters() {
        let stats = HarvestStats::new();
        stats.record_fetch(Duration::from_millis(50));
        stats.record_retry("DriverFault".to_string());
        stats.record_stop("short page");

        let running = stats.get_stats().summary();
        assert!(running.contains("Pages Fetched: 1"));
        assert!(running.contains("Stopped Because: short page"));
        assert!(running.contains("  DriverFault: 1"));

        stats.finish();
        assert!(stats.get_stats().summary().starts_with("Harvest Statistics:"));
        stats.print_summary();
    }
}
