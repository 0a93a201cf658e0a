use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one processed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Updated { attempts: u32 },
    Failed { attempts: u32, error: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Updated { .. })
    }
}

/// Reported after every processed target of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProgress {
    /// 1-based position among the targets
    pub index: usize,
    pub total: usize,
    pub rating_key: String,
    pub outcome: ItemOutcome,
}

impl ItemProgress {
    /// Percentage of targets processed, not of attempts.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.index * 100 / self.total).min(100) as u8
    }
}

/// Periodic log lines and a final summary for a batch run.
pub struct ProgressTracker {
    total: usize,
    updated: usize,
    failed: usize,
    start_time: Instant,
    progress_interval: usize,
    last_progress_log: usize,
    error_counts: HashMap<String, usize>,
}

impl ProgressTracker {
    /// `progress_interval`: log a progress line every N items.
    pub fn new(total: usize, progress_interval: usize) -> Self {
        if total > 10 || progress_interval < total {
            info!("Starting batch: {} items to update", total);
        }
        Self {
            total,
            updated: 0,
            failed: 0,
            start_time: Instant::now(),
            progress_interval: progress_interval.max(1),
            last_progress_log: 0,
            error_counts: HashMap::new(),
        }
    }

    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Failed { error, .. } => {
                self.failed += 1;
                *self.error_counts.entry(error_category(error)).or_insert(0) += 1;
            }
        }
    }

    /// `current` is 1-based.
    pub fn log_progress(&mut self, current: usize) {
        if current - self.last_progress_log < self.progress_interval && current != self.total {
            return;
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 { current as f64 / elapsed } else { 0.0 };
        info!(
            "Progress: {}/{} ({:.1} items/sec) | Updated: {} | Failed: {}",
            current, self.total, rate, self.updated, self.failed
        );
        self.last_progress_log = current;
    }

    pub fn log_summary(&self, operation_name: &str) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if self.failed > 0 {
            warn!(
                "{} completed: {} total in {:.1}s | Updated: {} | Failed: {}",
                operation_name, self.total, elapsed, self.updated, self.failed
            );
            let mut entries: Vec<_> = self.error_counts.iter().collect();
            entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            let breakdown: Vec<String> = entries
                .iter()
                .map(|(category, count)| format!("{}: {}", category, count))
                .collect();
            info!("Error breakdown: {}", breakdown.join(", "));
        } else {
            info!(
                "{} completed: {} total in {:.1}s | Updated: {}",
                operation_name, self.total, elapsed, self.updated
            );
        }
    }
}

/// Bucket an error message for the summary breakdown.
fn error_category(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("too many requests") {
        "rate limited".to_string()
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "timeout".to_string()
    } else if lower.contains("401") || lower.contains("403") {
        "unauthorized".to_string()
    } else if lower.contains("404") {
        "not found".to_string()
    } else if lower.contains("http 5") || lower.contains("status 5") {
        "server error".to_string()
    } else {
        "other".to_string()
    }
}
