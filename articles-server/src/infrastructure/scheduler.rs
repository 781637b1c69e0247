use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub enum Schedule {
    /// Runs immediately, then every period.
    FixedRate(Duration),
    Cron(Box<cron::Schedule>),
}

impl Schedule {
    /// Six- or seven-field expression with a leading seconds column, evaluated in UTC.
    pub fn cron(expression: &str) -> Result<Self, cron::error::Error> {
        Ok(Schedule::Cron(Box::new(cron::Schedule::from_str(expression)?)))
    }

    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::FixedRate(period) => {
                chrono::Duration::from_std(*period).ok().map(|p| after + p)
            }
            Schedule::Cron(schedule) => schedule.after(&after).next(),
        }
    }
}

pub struct Scheduler {
    jobs: Vec<(Arc<dyn Job>, Schedule)>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
        }
    }

    pub fn add(&mut self, job: Arc<dyn Job>, schedule: Schedule) {
        self.jobs.push((job, schedule));
    }

    /// Spawns one loop per job. Loops end on [`Scheduler::shutdown`] or when the
    /// scheduler is dropped.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .map(|(job, schedule)| {
                let job = Arc::clone(job);
                let schedule = schedule.clone();
                let shutdown = self.shutdown_tx.subscribe();
                info!(job = job.name(), ?schedule, "scheduling job");
                tokio::spawn(run_loop(job, schedule, shutdown))
            })
            .collect()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_loop(job: Arc<dyn Job>, schedule: Schedule, mut shutdown: broadcast::Receiver<()>) {
    match schedule {
        Schedule::FixedRate(period) => {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => execute(job.as_ref()).await,
                    _ = shutdown.recv() => break,
                }
            }
        }
        schedule @ Schedule::Cron(_) => loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                info!(job = job.name(), "cron schedule exhausted");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(job = job.name(), next_run = %next, "waiting for next run");

            tokio::select! {
                _ = tokio::time::sleep(wait) => execute(job.as_ref()).await,
                _ = shutdown.recv() => break,
            }
        },
    }
    debug!(job = job.name(), "job loop stopped");
}

async fn execute(job: &dyn Job) {
    if let Err(err) = job.run().await {
        error!(job = job.name(), error = %err, "scheduled job failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use super::*;

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(self.runs.load(Ordering::SeqCst) != 2, "second run fails");
            Ok(())
        }
    }

    #[test]
    fn cron_next_run_is_next_1am_utc() {
        let schedule = Schedule::cron("0 0 1 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 10, 13, 30, 0).unwrap();

        assert_eq!(
            schedule.next_after(after),
            Some(Utc.with_ymd_and_hms(2024, 5, 11, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        assert!(Schedule::cron("every day at one").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_rate_job_runs_immediately_then_every_period() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = Scheduler::new();
        scheduler.add(job.clone(), Schedule::FixedRate(Duration::from_secs(10)));

        let handles = scheduler.start();
        tokio::time::sleep(Duration::from_secs(35)).await;

        // the failing second run does not stop the loop
        assert_eq!(job.runs.load(Ordering::SeqCst), 4);

        scheduler.shutdown();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_pending_cron_loop() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = Scheduler::new();
        scheduler.add(job.clone(), Schedule::cron("0 0 1 * * *").unwrap());

        let handles = scheduler.start();
        tokio::task::yield_now().await;
        scheduler.shutdown();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }
}
