use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One planned write: set `rating_key`'s added date to `added_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateJob {
    pub rating_key: String,
    pub added_at: i64,
    pub lock: bool,
}

/// An item whose every attempt failed, with the last error seen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFailure {
    pub rating_key: String,
    pub error: String,
}

/// Result of one batch run.
///
/// `succeeded + failures.len() == attempted`. Targets never reached (max-items
/// stop, cancellation) appear nowhere in the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
    /// Ids that were written successfully, in processing order
    #[serde(default)]
    pub succeeded_ids: Vec<String>,
}

impl OutcomeReport {
    pub fn record_success(&mut self, rating_key: &str) {
        self.attempted += 1;
        self.succeeded += 1;
        self.succeeded_ids.push(rating_key.to_string());
    }

    pub fn record_failure(&mut self, rating_key: &str, error: impl Into<String>) {
        self.attempted += 1;
        self.failures.push(ItemFailure {
            rating_key: rating_key.to_string(),
            error: error.into(),
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Throughput limits for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateBudget {
    /// 0 means unlimited; fractional caps such as 0.5 are allowed
    pub max_per_minute: f64,
    pub fixed_delay: Duration,
}

impl RateBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn per_minute(max_per_minute: f64) -> Self {
        Self {
            max_per_minute,
            fixed_delay: Duration::ZERO,
        }
    }

    pub fn with_fixed_delay(mut self, fixed_delay: Duration) -> Self {
        self.fixed_delay = fixed_delay;
        self
    }

    /// Delay applied after every item, whatever its outcome.
    pub fn effective_delay(&self) -> Duration {
        if self.max_per_minute.is_finite() && self.max_per_minute > 0.0 {
            let rate_delay = Duration::from_secs_f64(60.0 / self.max_per_minute);
            self.fixed_delay.max(rate_delay)
        } else {
            self.fixed_delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_delay_unlimited_uses_fixed_delay() {
        assert_eq!(RateBudget::unlimited().effective_delay(), Duration::ZERO);
        let budget = RateBudget::unlimited().with_fixed_delay(Duration::from_millis(250));
        assert_eq!(budget.effective_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_effective_delay_takes_larger_of_rate_and_fixed() {
        assert_eq!(RateBudget::per_minute(30.0).effective_delay(), Duration::from_secs(2));

        let budget = RateBudget::per_minute(120.0).with_fixed_delay(Duration::from_secs(1));
        assert_eq!(budget.effective_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_fractional_rate_cap() {
        assert_eq!(RateBudget::per_minute(0.5).effective_delay(), Duration::from_secs(120));
        assert_eq!(RateBudget::per_minute(0.0).effective_delay(), Duration::ZERO);
        assert_eq!(RateBudget::per_minute(-3.0).effective_delay(), Duration::ZERO);
        assert_eq!(RateBudget::per_minute(f64::NAN).effective_delay(), Duration::ZERO);
    }

    #[test]
    fn test_report_counts() {
        let mut report = OutcomeReport::default();
        report.record_success("1");
        report.record_failure("2", "boom");
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded_ids, vec!["1".to_string()]);
        assert!(!report.is_clean());
    }
}
