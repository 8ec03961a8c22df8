//! Recurring verification jobs, one per user/phone pair.
//!
//! - Each job runs in its own task: first tick immediately, then every `interval`.
//! - Ticks never overlap; a slow completion check delays (and skips) later ticks.
//! - Scheduling an existing key replaces the running job.
//! - A job removes itself from the table when the completion hook reports
//!   `Done`, when the hook fails, or on the first tick at or past `max_duration`.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    domain::{ChatId, MessageId, UserId},
    ports::{JobCompletion, JobStatus},
    Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobConfig {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            max_duration: Duration::from_secs(15 * 60),
        }
    }
}

impl From<&Config> for JobConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            interval: cfg.job_interval,
            max_duration: cfg.job_max_duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey(pub String);

impl JobKey {
    pub fn for_user(user_id: UserId, phone: &str) -> Self {
        Self(format!("check_{}_{}", user_id.0, phone))
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSpec {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub phone: String,
    pub message_id: Option<MessageId>,
}

/// Bookkeeping for an active job.
#[derive(Clone, Debug)]
pub struct JobInfo {
    pub key: JobKey,
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub phone: String,
    pub message_id: Option<MessageId>,
    pub started_at: DateTime<Utc>,
    pub interval: Duration,
    pub max_duration: Duration,
}

/// What a tick sees.
#[derive(Clone, Debug)]
pub struct JobContext {
    pub key: JobKey,
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub phone: String,
    pub message_id: Option<MessageId>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// 1-based tick counter.
    pub tick: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JobEnd {
    Completed,
    Expired,
    Failed,
}

#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    cfg: JobConfig,
    completion: Arc<dyn JobCompletion>,
    state: Mutex<SchedulerState>,
}

#[derive(Default)]
struct SchedulerState {
    jobs: HashMap<JobKey, JobEntry>,
    next_generation: u64,
    stopped: bool,
}

struct JobEntry {
    generation: u64,
    info: JobInfo,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl JobScheduler {
    pub fn new(cfg: JobConfig, completion: Arc<dyn JobCompletion>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                cfg,
                completion,
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Start the recurring check for `spec`, replacing any job with the same key.
    pub async fn schedule(&self, spec: JobSpec) -> Result<JobKey> {
        let key = JobKey::for_user(spec.user_id, &spec.phone);

        let mut st = self.inner.state.lock().await;
        if st.stopped {
            return Err(Error::SchedulerStopped);
        }

        if let Some(old) = st.jobs.remove(&key) {
            old.cancel.cancel();
            old.handle.abort();
            tracing::info!(job = %key, "replacing existing job");
        }

        st.next_generation += 1;
        let generation = st.next_generation;

        let info = JobInfo {
            key: key.clone(),
            user_id: spec.user_id,
            chat_id: spec.chat_id,
            phone: spec.phone,
            message_id: spec.message_id,
            started_at: Utc::now(),
            interval: self.inner.cfg.interval,
            max_duration: self.inner.cfg.max_duration,
        };

        let cancel = CancellationToken::new();
        let started = Instant::now();
        let scheduler = self.clone();
        let task_info = info.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            scheduler
                .job_loop(task_info, generation, started, task_cancel)
                .await;
        });

        st.jobs.insert(
            key.clone(),
            JobEntry {
                generation,
                info,
                cancel,
                handle,
            },
        );

        tracing::info!(
            job = %key,
            interval_secs = self.inner.cfg.interval.as_secs(),
            max_duration_secs = self.inner.cfg.max_duration.as_secs(),
            "job scheduled"
        );
        Ok(key)
    }

    /// Cancel a job. Returns whether it was active.
    pub async fn cancel(&self, key: &JobKey) -> bool {
        let mut st = self.inner.state.lock().await;
        let Some(job) = st.jobs.remove(key) else {
            return false;
        };
        job.cancel.cancel();
        job.handle.abort();
        tracing::info!(job = %key, "job cancelled");
        true
    }

    /// Stop every job and refuse new ones. Returns once all job tasks have exited.
    pub async fn shutdown(&self) {
        let handles = {
            let mut st = self.inner.state.lock().await;
            st.stopped = true;
            st.jobs
                .drain()
                .map(|(_, job)| {
                    job.cancel.cancel();
                    job.handle.abort();
                    job.handle
                })
                .collect::<Vec<_>>()
        };

        let count = handles.len();
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!(stopped_jobs = count, "job scheduler shut down");
    }

    pub async fn contains(&self, key: &JobKey) -> bool {
        self.inner.state.lock().await.jobs.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Active jobs, sorted by key.
    pub async fn jobs(&self) -> Vec<JobInfo> {
        let st = self.inner.state.lock().await;
        let mut out: Vec<JobInfo> = st.jobs.values().map(|j| j.info.clone()).collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    async fn job_loop(
        &self,
        info: JobInfo,
        generation: u64,
        started: Instant,
        cancel: CancellationToken,
    ) {
        let cfg = self.inner.cfg;
        let mut ticker = interval_at(started, cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick = 0u64;

        loop {
            tokio::select! {
              biased;
              _ = cancel.cancelled() => return,
              _ = ticker.tick() => {}
            }
            tick += 1;

            let elapsed = started.elapsed();
            let end = if elapsed >= cfg.max_duration {
                Some(JobEnd::Expired)
            } else {
                let ctx = JobContext {
                    key: info.key.clone(),
                    user_id: info.user_id,
                    chat_id: info.chat_id,
                    phone: info.phone.clone(),
                    message_id: info.message_id,
                    started_at: info.started_at,
                    elapsed,
                    tick,
                };
                match self.inner.completion.check(&ctx).await {
                    Ok(JobStatus::Pending) => None,
                    Ok(JobStatus::Done) => Some(JobEnd::Completed),
                    Err(e) => {
                        tracing::warn!(job = %info.key, error = %e, "job check failed");
                        Some(JobEnd::Failed)
                    }
                }
            };

            if let Some(end) = end {
                self.finish(&info.key, generation, end, tick).await;
                return;
            }
        }
    }

    /// Remove a job's own entry. A job that was already replaced leaves the
    /// newer entry alone.
    async fn finish(&self, key: &JobKey, generation: u64, end: JobEnd, ticks: u64) {
        let mut st = self.inner.state.lock().await;
        let is_current = st
            .jobs
            .get(key)
            .map(|j| j.generation == generation)
            .unwrap_or(false);
        if !is_current {
            return;
        }
        if let Some(job) = st.jobs.remove(key) {
            job.cancel.cancel();
        }
        match end {
            JobEnd::Completed => tracing::info!(job = %key, ticks, "job completed"),
            JobEnd::Expired => tracing::info!(job = %key, ticks, "job expired"),
            JobEnd::Failed => tracing::warn!(job = %key, ticks, "job removed after failure"),
        }
    }
}
