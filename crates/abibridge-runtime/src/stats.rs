use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

/// CPU time samples per `contract::action`, collected when benchmarking.
#[derive(Debug, Default)]
pub struct ActionStats {
    samples: Mutex<BTreeMap<String, Vec<u64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub action: String,
    pub samples: usize,
    pub median_us: f64,
    pub average_us: f64,
}

impl ActionStats {
    pub fn new() -> Self {
        ActionStats::default()
    }

    pub fn log_action(&self, action: impl Into<String>, cpu_usage_us: u64) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.entry(action.into()).or_default().push(cpu_usage_us);
    }

    pub fn median(&self, action: &str) -> f64 {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.get(action).map_or(0.0, |times| median(times))
    }

    pub fn average(&self, action: &str) -> f64 {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.get(action).map_or(0.0, |times| average(times))
    }

    /// Sorted by action name.
    pub fn summary(&self) -> Vec<ActionSummary> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples
            .iter()
            .map(|(action, times)| ActionSummary {
                action: action.clone(),
                samples: times.len(),
                median_us: median(times),
                average_us: average(times),
            })
            .collect()
    }

    pub fn summary_string(&self) -> String {
        let mut out = String::from("Stats:\n");
        for s in self.summary() {
            out.push_str(&format!(
                "{:<26} median: {} µs average: {} µs\n",
                s.action, s.median_us, s.average_us
            ));
        }
        out
    }
}

fn median(times: &[u64]) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    let mut sorted = times.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

fn average(times: &[u64]) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    times.iter().sum::<u64>() as f64 / times.len() as f64
}
