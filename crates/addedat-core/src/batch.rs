use addedat_models::{ItemType, OutcomeReport, RateBudget, UpdateJob};
use addedat_sources::CatalogClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::progress::{ItemOutcome, ItemProgress, ProgressTracker};

/// Per-item retry schedule for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt `attempt` (1-based): `min(max, base * 2^(attempt-1))`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }
}

/// Knobs for one `apply` run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Unix seconds written as the new added date
    pub added_at: i64,
    pub lock: bool,
    pub budget: RateBudget,
    /// Stop once this many writes have succeeded
    pub max_items: Option<usize>,
}

impl BatchOptions {
    pub fn new(added_at: i64) -> Self {
        Self {
            added_at,
            lock: true,
            budget: RateBudget::unlimited(),
            max_items: None,
        }
    }

    pub fn with_lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items.filter(|m| *m > 0);
        self
    }
}

/// Turn target ids into jobs, rejecting blank ids before anything is written.
pub fn plan_jobs(targets: &[String], added_at: i64, lock: bool) -> Result<Vec<UpdateJob>> {
    targets
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let rating_key = id.trim();
            if rating_key.is_empty() {
                return Err(CoreError::InvalidTarget {
                    index,
                    reason: "blank rating key".to_string(),
                });
            }
            Ok(UpdateJob {
                rating_key: rating_key.to_string(),
                added_at,
                lock,
            })
        })
        .collect()
}

/// Applies one added date to many items, one write at a time.
pub struct BatchUpdater<'a, C: CatalogClient + ?Sized> {
    client: &'a C,
    section_id: String,
    item_type: ItemType,
    retry: RetryPolicy,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, C: CatalogClient + ?Sized> BatchUpdater<'a, C> {
    pub fn new(client: &'a C, section_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            client,
            section_id: section_id.into(),
            item_type,
            retry: RetryPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checked before each item. Setting it never interrupts a write in flight.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Write one job, retrying on error with backoff.
    pub async fn apply_one(&self, job: &UpdateJob) -> ItemOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .client
                .update_added_date(&self.section_id, &job.rating_key, self.item_type, job.added_at, job.lock)
                .await
            {
                Ok(()) => {
                    debug!("Updated id={} (attempt {})", job.rating_key, attempts);
                    return ItemOutcome::Updated { attempts };
                }
                Err(e) => {
                    let pause = self.retry.backoff(attempts);
                    warn!(
                        "Update of id={} failed (attempt {}/{}): {}",
                        job.rating_key, attempts, self.retry.max_attempts, e
                    );
                    tokio::time::sleep(pause).await;
                    if attempts >= self.retry.max_attempts {
                        return ItemOutcome::Failed {
                            attempts,
                            error: e.to_string(),
                        };
                    }
                }
            }
        }
    }

    /// Update every target in order and report what happened.
    ///
    /// Fails only on malformed input, before any remote call. Per-item
    /// failures are collected in the report and never abort the batch.
    pub async fn apply<F>(&self, targets: &[String], options: &BatchOptions, mut on_progress: F) -> Result<OutcomeReport>
    where
        F: FnMut(&ItemProgress),
    {
        let jobs = plan_jobs(targets, options.added_at, options.lock)?;
        let mut report = OutcomeReport::default();
        if jobs.is_empty() {
            debug!("Batch has no targets, nothing to do");
            return Ok(report);
        }

        let total = jobs.len();
        let delay = options.budget.effective_delay();
        info!(
            "Updating {} {} item(s) in section {} (delay {:.2}s, lock={})",
            total,
            self.item_type,
            self.section_id,
            delay.as_secs_f64(),
            options.lock
        );
        let mut tracker = ProgressTracker::new(total, 25);

        for (idx, job) in jobs.iter().enumerate() {
            if let Some(max) = options.max_items {
                if report.succeeded >= max {
                    info!("Reached max items ({}), stopping", max);
                    break;
                }
            }
            if self.is_cancelled() {
                warn!("Batch cancelled after {} of {} item(s)", idx, total);
                break;
            }

            let outcome = self.apply_one(job).await;
            match &outcome {
                ItemOutcome::Updated { .. } => report.record_success(&job.rating_key),
                ItemOutcome::Failed { error, .. } => {
                    warn!("Failed id={}: {}", job.rating_key, error);
                    report.record_failure(&job.rating_key, error.clone());
                }
            }
            tracker.record(&outcome);
            tracker.log_progress(idx + 1);
            on_progress(&ItemProgress {
                index: idx + 1,
                total,
                rating_key: job.rating_key.clone(),
                outcome,
            });

            if idx + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        tracker.log_summary("Added-date update");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCatalog;
    use tokio::time::Instant;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<f64> = (1..=6).map(|n| policy.backoff(n).as_secs_f64()).collect();
        assert_eq!(delays, vec![0.5, 1.0, 2.0, 4.0, 8.0, 8.0]);
    }

    #[test]
    fn test_plan_rejects_blank_ids() {
        let jobs = plan_jobs(&ids(&["1", " 2 "]), 100, false).unwrap();
        assert_eq!(jobs[1].rating_key, "2");
        assert!(!jobs[1].lock);

        let err = plan_jobs(&ids(&["1", "  "]), 100, true).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTarget { index: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_targets_succeed() {
        let catalog = FakeCatalog::default();
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let mut percents = Vec::new();

        let report = updater
            .apply(&ids(&["A", "B", "C"]), &BatchOptions::new(1_705_276_800), |p| {
                percents.push(p.percent())
            })
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 3);
        assert!(report.is_clean());
        assert_eq!(percents, vec![33, 66, 100]);

        let writes = catalog.writes();
        let order: Vec<&str> = writes.iter().map(|w| w.rating_key.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert!(writes.iter().all(|w| w.added_at == 1_705_276_800 && w.lock));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_is_reported_once() {
        let catalog = FakeCatalog::default().failing("B");
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);

        let report = updater
            .apply(&ids(&["A", "B", "C"]), &BatchOptions::new(0), |_| {})
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].rating_key, "B");
        assert!(report.failures[0].error.contains("503"));
        assert_eq!(report.succeeded_ids, vec!["A", "C"]);
        assert_eq!(catalog.writes_for("B").len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delays_follow_backoff() {
        let catalog = FakeCatalog::default().failing("X");
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Show);

        let started = Instant::now();
        let report = updater
            .apply(&ids(&["X"]), &BatchOptions::new(0), |_| {})
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(report.failed(), 1);
        let writes = catalog.writes_for("X");
        assert_eq!(writes.len(), 4);
        let gaps: Vec<Duration> = writes.windows(2).map(|w| w[1].at - w[0].at).collect();
        assert_eq!(
            gaps,
            vec![Duration::from_millis(500), Duration::from_secs(1), Duration::from_secs(2)]
        );
        // The pause after the last attempt is still taken
        assert!(elapsed >= Duration::from_millis(7500));
        assert!(elapsed < Duration::from_millis(7600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let catalog = FakeCatalog::default().flaky("7", 2);
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let job = UpdateJob {
            rating_key: "7".to_string(),
            added_at: 42,
            lock: true,
        };

        assert_eq!(updater.apply_one(&job).await, ItemOutcome::Updated { attempts: 3 });
        assert_eq!(catalog.writes_for("7").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_budget_spaces_writes() {
        let catalog = FakeCatalog::default();
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let options = BatchOptions::new(0).with_budget(RateBudget::per_minute(30.0));

        let started = Instant::now();
        updater.apply(&ids(&["1", "2", "3"]), &options, |_| {}).await.unwrap();

        let writes = catalog.writes();
        for pair in writes.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_secs(2));
        }
        // No pause after the final item
        assert!(started.elapsed() < Duration::from_millis(4100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_budget_applies_after_failed_item() {
        let catalog = FakeCatalog::default().failing("2");
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let options = BatchOptions::new(0).with_budget(RateBudget::per_minute(30.0));

        let report = updater.apply(&ids(&["1", "2", "3"]), &options, |_| {}).await.unwrap();
        assert_eq!((report.succeeded, report.failed()), (2, 1));

        let first = catalog.writes_for("1");
        let failed = catalog.writes_for("2");
        let last = catalog.writes_for("3");
        assert_eq!(failed.len(), 4);
        assert!(failed[0].at - first[0].at >= Duration::from_secs(2));

        // 4s backoff after the final attempt, then the 2s item spacing
        let gap = last[0].at - failed[3].at;
        assert!(gap >= Duration::from_secs(6), "gap was {:?}", gap);
        assert!(gap < Duration::from_millis(6100), "gap was {:?}", gap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_targets_make_no_calls() {
        let catalog = FakeCatalog::default();
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let report = updater.apply(&[], &BatchOptions::new(0), |_| {}).await.unwrap();
        assert_eq!(report, OutcomeReport::default());
        assert!(catalog.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_target_fails_before_writing() {
        let catalog = FakeCatalog::default();
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let result = updater.apply(&ids(&["1", "", "3"]), &BatchOptions::new(0), |_| {}).await;
        assert!(matches!(result, Err(CoreError::InvalidTarget { index: 1, .. })));
        assert!(catalog.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_items_counts_successes_only() {
        let catalog = FakeCatalog::default().failing("bad");
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie);
        let options = BatchOptions::new(0).with_max_items(Some(2));

        let report = updater
            .apply(&ids(&["1", "bad", "3", "4", "5"]), &options, |_| {})
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.attempted, 3);
        assert!(catalog.writes_for("4").is_empty());
        assert!(report.attempted <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_run_is_idempotent() {
        let catalog = FakeCatalog::default();
        let updater = BatchUpdater::new(&catalog, "2", ItemType::Show);
        let targets = ids(&["10", "11"]);
        let options = BatchOptions::new(1_000).with_lock(false);

        let first = updater.apply(&targets, &options, |_| {}).await.unwrap();
        let second = updater.apply(&targets, &options, |_| {}).await.unwrap();

        assert_eq!(first, second);
        assert!(catalog.writes().iter().all(|w| w.added_at == 1_000 && !w.lock));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_between_items() {
        let catalog = FakeCatalog::default();
        let cancel = Arc::new(AtomicBool::new(false));
        let updater = BatchUpdater::new(&catalog, "1", ItemType::Movie).with_cancel_flag(cancel.clone());

        let report = updater
            .apply(&ids(&["1", "2", "3"]), &BatchOptions::new(0), |p| {
                if p.index == 1 {
                    cancel.store(true, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(catalog.writes().len(), 1);
    }
}
