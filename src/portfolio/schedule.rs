// src/portfolio/schedule.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDateTime, NaiveTime};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{PortfolioService, SnapshotOutcome};

/// Daily snapshot time when none is configured.
pub const DEFAULT_SNAPSHOT_TIME: NaiveTime = match NaiveTime::from_hms_opt(22, 0, 0) {
    Some(time) => time,
    None => panic!("22:00 is a valid time of day"),
};

/// A job that runs once a day at a fixed local time.
///
/// The first run is today at `at` if that is still ahead, otherwise
/// tomorrow. After each run the next one is the following occurrence of `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    next_run: NaiveDateTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            at,
            next_run: next_occurrence(at, now),
        }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    pub fn mark_ran(&mut self, now: NaiveDateTime) {
        self.next_run = next_occurrence(self.at, now);
    }
}

/// First instant strictly after `now` whose time of day is `at`.
fn next_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Polls the clock and fires the scheduled snapshot when it is due.
pub struct Scheduler {
    service: Arc<PortfolioService>,
    schedule: DailySchedule,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(service: Arc<PortfolioService>, poll_interval: Duration) -> Self {
        let schedule = DailySchedule::new(service.snapshot_time(), service.clock().now());
        Self {
            service,
            schedule,
            poll_interval,
        }
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    /// Run the snapshot if it is due. Returns `None` when nothing ran.
    ///
    /// A failed run still counts as the day's run; the next attempt is the
    /// next day's trigger.
    pub async fn run_pending(&mut self) -> Option<Result<SnapshotOutcome>> {
        let now = self.service.clock().now();
        if !self.schedule.is_due(now) {
            return None;
        }

        let result = self.service.run_scheduled_snapshot().await;
        if let Err(err) = &result {
            warn!(error = %format!("{err:#}"), "scheduled snapshot failed");
        }

        self.schedule.mark_ran(now);
        info!(next_run = %self.schedule.next_run(), "next scheduled snapshot");
        Some(result)
    }

    /// Poll until `shutdown` completes.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            next_run = %self.schedule.next_run(),
            poll_interval = ?self.poll_interval,
            "snapshot scheduler started"
        );

        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(self.poll_interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pending().await;
                }
                _ = &mut shutdown => {
                    info!("snapshot scheduler stopping");
                    break;
                }
            }
        }
    }
}
