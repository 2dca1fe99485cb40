//! Bounded-concurrency rounds over the work set.
//!
//! Round 0 covers every item; each retry round covers only what failed in the
//! round before. Outcomes come back to this task through the join set, so the
//! crawl result has a single writer.

use crate::config::CrawlerConfig;
use crate::crawlers::acquire::{Acquire, AcquireFailure, Acquisition};
use crate::results::CrawlResult;
use crate::site::WorkItem;
use crate::utils::{Sleeper, TokioSleeper};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Concurrency and retry-round settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOptions {
    /// Maximum number of items in flight
    pub concurrency: usize,
    /// Retry rounds after the first pass; zero means a single pass
    pub max_rounds: usize,
    /// Pause before each retry round
    pub round_delay: Duration,
    /// Pause after each item completes, while still holding its slot
    pub item_delay: Duration,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_rounds: 2,
            round_delay: Duration::from_secs(5),
            item_delay: Duration::ZERO,
        }
    }
}

impl RoundOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            concurrency: config.max_concurrency,
            max_rounds: config.max_rounds,
            round_delay: Duration::from_secs(config.round_delay_secs),
            item_delay: Duration::from_millis(config.item_delay_ms),
        }
    }
}

/// Drives acquisitions over the work set across retry rounds
pub struct Orchestrator {
    acquirer: Arc<dyn Acquire>,
    options: RoundOptions,
    sleeper: Arc<dyn Sleeper>,
}

impl Orchestrator {
    pub fn new(acquirer: Arc<dyn Acquire>, options: RoundOptions) -> Self {
        Self {
            acquirer,
            options,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used for round and item delays
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run every round and return the finalized result
    pub async fn run(&self, work: Vec<WorkItem>) -> CrawlResult {
        let mut result = CrawlResult::new();

        let mut seen = HashSet::new();
        let mut pending: Vec<WorkItem> = work
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();

        let mut rounds_run = 0;
        for round in 0..=self.options.max_rounds {
            if pending.is_empty() {
                break;
            }

            if round > 0 {
                ::log::info!(
                    "Retry round {} of {}: {} items, waiting {:?}",
                    round,
                    self.options.max_rounds,
                    pending.len(),
                    self.options.round_delay
                );
                self.sleeper.sleep(self.options.round_delay).await;
            }

            pending = self.run_round(round, &pending, &mut result).await;
            rounds_run += 1;
        }

        if !pending.is_empty() {
            ::log::warn!(
                "{} items still failing after {} rounds: {:?}",
                pending.len(),
                rounds_run,
                pending.iter().map(WorkItem::as_str).collect::<Vec<_>>()
            );
        }

        result.set_failed(pending);
        result.set_rounds_run(rounds_run);
        result
    }

    /// One pass over `items`; returns the items still without a record, in input order
    async fn run_round(
        &self,
        round: usize,
        items: &[WorkItem],
        result: &mut CrawlResult,
    ) -> Vec<WorkItem> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        for item in items {
            if result.contains(item) {
                continue;
            }
            dispatched += 1;

            let acquirer = Arc::clone(&self.acquirer);
            let semaphore = Arc::clone(&semaphore);
            let sleeper = Arc::clone(&self.sleeper);
            let item_delay = self.options.item_delay;
            let item = item.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = acquire_contained(acquirer, item.clone()).await;
                if !item_delay.is_zero() {
                    sleeper.sleep(item_delay).await;
                }
                (item, outcome)
            });
        }

        ::log::debug!("Round {}: dispatched {} items", round, dispatched);

        let mut completed = 0;
        while let Some(joined) = tasks.join_next().await {
            let (item, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    ::log::error!("Round {}: item task lost: {}", round, e);
                    continue;
                }
            };
            completed += 1;

            match outcome.into_result() {
                Ok((record, tier)) => {
                    ::log::info!(
                        "({}/{}) {} -> success: {} [{:?}]",
                        completed,
                        dispatched,
                        item,
                        record.title,
                        tier
                    );
                    if !result.insert_success(item.clone(), record, tier) {
                        ::log::warn!("Duplicate success for {} ignored", item);
                    }
                }
                Err(failure) => {
                    ::log::info!(
                        "({}/{}) {} -> failed: {}",
                        completed,
                        dispatched,
                        item,
                        failure
                    );
                }
            }
        }

        // Lost tasks never reached the result, so they count as failed too
        items
            .iter()
            .filter(|item| !result.contains(item))
            .cloned()
            .collect()
    }
}

/// Runs one acquisition on its own task so a panic becomes an item failure
async fn acquire_contained(acquirer: Arc<dyn Acquire>, item: WorkItem) -> Acquisition {
    let task_item = item.clone();
    match tokio::spawn(async move { acquirer.acquire(&task_item).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            ::log::error!("Acquisition of {} faulted: {}", item, e);
            Acquisition::Failed(AcquireFailure::Fault(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Record, Tier};
    use crate::utils::testing::RecordingSleeper;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Succeed,
        Fail,
        Panic,
    }

    /// Plays a fixed sequence of outcomes per item; the last step repeats
    #[derive(Default)]
    struct ScriptedAcquirer {
        script: Mutex<HashMap<WorkItem, VecDeque<Step>>>,
        calls: Mutex<Vec<WorkItem>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        hold: Duration,
    }

    impl ScriptedAcquirer {
        fn with(mut self, item: &str, steps: &[Step]) -> Self {
            self.script
                .get_mut()
                .unwrap()
                .insert(item.into(), steps.iter().copied().collect());
            self
        }

        fn calls_for(&self, item: &str) -> usize {
            let item = WorkItem::from(item);
            self.calls.lock().unwrap().iter().filter(|c| **c == item).count()
        }

        fn next_step(&self, item: &WorkItem) -> Step {
            let mut script = self.script.lock().unwrap();
            let steps = script.entry(item.clone()).or_default();
            if steps.len() > 1 {
                steps.pop_front().unwrap_or(Step::Fail)
            } else {
                steps.front().copied().unwrap_or(Step::Fail)
            }
        }
    }

    #[async_trait]
    impl Acquire for ScriptedAcquirer {
        async fn acquire(&self, item: &WorkItem) -> Acquisition {
            self.calls.lock().unwrap().push(item.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.hold.is_zero() {
                tokio::time::sleep(self.hold).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.next_step(item) {
                Step::Succeed => Acquisition::Rich(Record::degraded(
                    format!("title of {}", item),
                    format!("https://catalog.example{}", item),
                    None,
                    String::new(),
                )),
                Step::Fail => Acquisition::Failed(AcquireFailure::Fault("scripted".into())),
                Step::Panic => panic!("scripted panic for {}", item),
            }
        }
    }

    fn options(concurrency: usize, max_rounds: usize) -> RoundOptions {
        RoundOptions {
            concurrency,
            max_rounds,
            round_delay: Duration::from_secs(5),
            item_delay: Duration::ZERO,
        }
    }

    fn work(items: &[&str]) -> Vec<WorkItem> {
        items.iter().map(|i| WorkItem::from(*i)).collect()
    }

    #[tokio::test]
    async fn test_only_failures_are_retried() {
        let acquirer = Arc::new(
            ScriptedAcquirer::default()
                .with("/a", &[Step::Succeed])
                .with("/b", &[Step::Fail, Step::Succeed]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator =
            Orchestrator::new(acquirer.clone(), options(2, 2)).with_sleeper(sleeper.clone());

        let result = orchestrator.run(work(&["/a", "/b"])).await;

        assert_eq!(acquirer.calls_for("/a"), 1);
        assert_eq!(acquirer.calls_for("/b"), 2);
        assert_eq!(result.success_count(), 2);
        assert!(result.failed().is_empty());
        // Round 2 had nothing left to do
        assert_eq!(result.rounds_run(), 2);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_single_pass_when_no_retry_rounds() {
        let acquirer = Arc::new(
            ScriptedAcquirer::default()
                .with("/a", &[Step::Fail, Step::Succeed])
                .with("/b", &[Step::Succeed]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator =
            Orchestrator::new(acquirer.clone(), options(1, 0)).with_sleeper(sleeper.clone());

        let result = orchestrator.run(work(&["/a", "/b"])).await;

        assert_eq!(acquirer.calls_for("/a"), 1);
        assert_eq!(result.rounds_run(), 1);
        assert_eq!(result.failed(), work(&["/a"]).as_slice());
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_rounds_surface_failures() {
        let acquirer = Arc::new(
            ScriptedAcquirer::default()
                .with("/ok", &[Step::Succeed])
                .with("/x", &[Step::Fail])
                .with("/y", &[Step::Fail]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator =
            Orchestrator::new(acquirer.clone(), options(3, 2)).with_sleeper(sleeper.clone());

        let result = orchestrator.run(work(&["/y", "/ok", "/x"])).await;

        assert_eq!(acquirer.calls_for("/x"), 3);
        assert_eq!(acquirer.calls_for("/y"), 3);
        assert_eq!(acquirer.calls_for("/ok"), 1);
        assert_eq!(result.rounds_run(), 3);
        // Work-set order, not completion order
        assert_eq!(result.failed(), work(&["/y", "/x"]).as_slice());
        assert!(!result.contains(&"/x".into()));
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_retried() {
        let acquirer = Arc::new(
            ScriptedAcquirer::default()
                .with("/boom", &[Step::Panic, Step::Succeed])
                .with("/fine", &[Step::Succeed]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let orchestrator =
            Orchestrator::new(acquirer.clone(), options(2, 1)).with_sleeper(sleeper);

        let result = orchestrator.run(work(&["/boom", "/fine"])).await;

        assert_eq!(result.success_count(), 2);
        assert_eq!(acquirer.calls_for("/boom"), 2);
        assert_eq!(acquirer.calls_for("/fine"), 1);
        assert!(result.failed().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let mut acquirer = ScriptedAcquirer::default();
        acquirer.hold = Duration::from_millis(20);
        let items: Vec<String> = (0..12).map(|i| format!("/item-{}", i)).collect();
        for item in &items {
            acquirer = acquirer.with(item, &[Step::Succeed]);
        }
        let acquirer = Arc::new(acquirer);
        let orchestrator = Orchestrator::new(acquirer.clone(), options(3, 0))
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        let work_items: Vec<WorkItem> = items.iter().map(|i| WorkItem::from(i.as_str())).collect();
        let result = orchestrator.run(work_items).await;

        assert_eq!(result.success_count(), 12);
        let peak = acquirer.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_item_delay_after_each_completion() {
        let acquirer = Arc::new(
            ScriptedAcquirer::default()
                .with("/a", &[Step::Succeed])
                .with("/b", &[Step::Fail]),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let mut opts = options(2, 0);
        opts.item_delay = Duration::from_millis(250);
        let orchestrator = Orchestrator::new(acquirer, opts).with_sleeper(sleeper.clone());

        orchestrator.run(work(&["/a", "/b"])).await;

        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_millis(250), Duration::from_millis(250)]
        );
    }

    #[tokio::test]
    async fn test_duplicate_work_items_run_once() {
        let acquirer = Arc::new(ScriptedAcquirer::default().with("/a", &[Step::Succeed]));
        let orchestrator = Orchestrator::new(acquirer.clone(), options(2, 0))
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        let result = orchestrator.run(work(&["/a", "/a"])).await;

        assert_eq!(acquirer.calls_for("/a"), 1);
        assert_eq!(result.count_tier(Tier::Rich), 1);
    }

    #[tokio::test]
    async fn test_empty_work_set() {
        let acquirer = Arc::new(ScriptedAcquirer::default());
        let orchestrator = Orchestrator::new(acquirer, RoundOptions::default())
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        let result = orchestrator.run(Vec::new()).await;
        assert_eq!(result.rounds_run(), 0);
        assert_eq!(result.success_count(), 0);
        assert!(result.failed().is_empty());
    }
}
