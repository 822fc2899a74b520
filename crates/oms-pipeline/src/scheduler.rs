//! Timer-driven triggers for the orchestrators.
//!
//! Jobs run one at a time inside a single select loop, so runs never
//! overlap. Job failures are logged and the loop continues. The
//! orchestrators themselves know nothing about scheduling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use oms_config::OmsConfig;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::calendar::{business_day, lookback_window, previous_day_window};
use crate::collection::CollectionOrchestrator;
use crate::processing::ProcessingOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Collect the rolling lookback window, then drain.
    Collect,
    /// Re-collect the previous business day, then drain.
    DailyRecollect,
    /// Drain only (retries errored raw orders).
    Retry,
    /// Log the stats line.
    DailyStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub lookback_minutes: i64,
    pub daily_recollect: bool,
    pub retry_interval: Duration,
    pub stats_hour: u32,
    pub tz: Tz,
}

impl ScheduleConfig {
    pub fn from_config(cfg: &OmsConfig) -> Result<Self> {
        Ok(Self {
            interval: Duration::from_secs(cfg.collection.interval_secs),
            initial_delay: Duration::from_secs(cfg.collection.initial_delay_secs),
            lookback_minutes: cfg.collection.lookback_minutes,
            daily_recollect: cfg.collection.daily_recollect,
            retry_interval: Duration::from_secs(cfg.processing.retry_interval_secs),
            stats_hour: cfg.processing.stats_hour,
            tz: cfg.business.tz()?,
        })
    }
}

/// Next `hour:00` local time in `tz` strictly after `now`.
pub fn next_daily_at(tz: Tz, now: DateTime<Utc>, hour: u32) -> Result<DateTime<Utc>> {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| anyhow!("invalid hour {hour}"))?;
    let mut day = business_day(tz, now);
    // Two iterations cover "later today" and "tomorrow"; a third skips a
    // local time swallowed by a DST gap.
    for _ in 0..3 {
        if let Some(t) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            let t = t.with_timezone(&Utc);
            if t > now {
                return Ok(t);
            }
        }
        day = day
            .succ_opt()
            .ok_or_else(|| anyhow!("calendar overflow after {day}"))?;
    }
    Err(anyhow!("no {hour}:00 found after {now} in {tz}"))
}

/// Next daily deadline after `now` and every daily job due at it, in run
/// order. Jobs sharing a deadline all run; none is dropped.
pub fn next_daily_jobs(
    cfg: &ScheduleConfig,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Vec<Job>)> {
    let mut due = vec![(next_daily_at(cfg.tz, now, cfg.stats_hour)?, Job::DailyStats)];
    if cfg.daily_recollect {
        due.insert(0, (next_daily_at(cfg.tz, now, 0)?, Job::DailyRecollect));
    }
    let at = due
        .iter()
        .map(|(t, _)| *t)
        .min()
        .ok_or_else(|| anyhow!("no daily job scheduled"))?;
    let jobs = due.into_iter().filter(|(t, _)| *t == at).map(|(_, j)| j).collect();
    Ok((at, jobs))
}

fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

pub struct Scheduler {
    collection: Arc<CollectionOrchestrator>,
    processing: Arc<ProcessingOrchestrator>,
    cfg: ScheduleConfig,
}

impl Scheduler {
    pub fn new(
        collection: Arc<CollectionOrchestrator>,
        processing: Arc<ProcessingOrchestrator>,
        cfg: ScheduleConfig,
    ) -> Self {
        Self {
            collection,
            processing,
            cfg,
        }
    }

    /// Run one job to completion.
    pub async fn run_job(&self, job: Job, now: DateTime<Utc>) -> Result<()> {
        match job {
            Job::Collect => {
                let (start, end) = lookback_window(now, self.cfg.lookback_minutes)?;
                self.collection
                    .collect_all_channels(start, end)
                    .await
                    .context("scheduled collection failed")?;
                let r = self
                    .processing
                    .process_unprocessed_orders()
                    .await
                    .context("scheduled processing failed")?;
                tracing::info!(processed = r.succeeded, failed = r.failed, "scheduled collect done");
            }
            Job::DailyRecollect => {
                let (start, end) = previous_day_window(self.cfg.tz, now)?;
                self.collection
                    .collect_all_channels(start, end)
                    .await
                    .context("daily re-collection failed")?;
                let r = self
                    .processing
                    .process_unprocessed_orders()
                    .await
                    .context("daily processing failed")?;
                tracing::info!(%start, %end, processed = r.succeeded, failed = r.failed, "daily re-collect done");
            }
            Job::Retry => {
                let r = self
                    .processing
                    .process_unprocessed_orders()
                    .await
                    .context("retry processing failed")?;
                if r.succeeded > 0 {
                    tracing::info!(processed = r.succeeded, failed = r.failed, "retry done");
                } else {
                    tracing::debug!(failed = r.failed, "retry: nothing processed");
                }
            }
            Job::DailyStats => {
                let s = self.processing.stats(now).await.context("stats failed")?;
                tracing::info!(
                    total_orders = s.total_orders,
                    today_orders = s.today_orders,
                    unprocessed_orders = s.unprocessed_orders,
                    errored_orders = s.errored_orders,
                    "daily stats"
                );
            }
        }
        Ok(())
    }

    /// Loop until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let start = Instant::now();
        let mut collect = interval_at(start + self.cfg.initial_delay, self.cfg.interval);
        collect.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retry = interval_at(start + self.cfg.retry_interval, self.cfg.retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.cfg.interval.as_secs(),
            initial_delay_secs = self.cfg.initial_delay.as_secs(),
            retry_interval_secs = self.cfg.retry_interval.as_secs(),
            daily_recollect = self.cfg.daily_recollect,
            tz = %self.cfg.tz,
            "scheduler started"
        );

        loop {
            let now = Utc::now();
            let (daily_at, daily_jobs) = next_daily_jobs(&self.cfg, now)?;

            let jobs = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("scheduler stopping");
                    return Ok(());
                }
                _ = collect.tick() => vec![Job::Collect],
                _ = retry.tick() => vec![Job::Retry],
                _ = tokio::time::sleep(until(daily_at, now)) => daily_jobs,
            };

            for job in jobs {
                if let Err(e) = self.run_job(job, Utc::now()).await {
                    tracing::error!(?job, error = %format!("{e:#}"), "scheduled job failed");
                }
            }
        }
    }
}
