use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use bale_core::{
    config::Config,
    conversation::ConversationStore,
    messaging::{port::BotApi, types::Update},
    ports::Hooks,
    scheduler::{JobConfig, JobScheduler},
    Error, Result,
};

use crate::handlers;

/// Shared, read-only dependencies of the handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub api: Arc<dyn BotApi>,
    pub scheduler: JobScheduler,
    pub hooks: Hooks,
}

/// Owns the update loop, the per-user conversation state and the job table.
pub struct Orchestrator {
    state: AppState,
    conversations: ConversationStore,
    offset: Option<i64>,
}

impl Orchestrator {
    pub fn new(cfg: Arc<Config>, api: Arc<dyn BotApi>, hooks: Hooks) -> Self {
        let scheduler = JobScheduler::new(
            JobConfig::from(cfg.as_ref()),
            hooks.job_completion.clone(),
        );
        Self {
            state: AppState {
                cfg,
                api,
                scheduler,
                hooks,
            },
            conversations: ConversationStore::new(),
            offset: None,
        }
    }

    /// Next update id to request.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.state.scheduler
    }

    /// Poll for updates until `cancel` fires.
    ///
    /// A failed fetch keeps the offset and retries after `poll_retry_delay`.
    /// With `poll_max_retries` set, that many consecutive failures end the loop
    /// with an error.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let timeout_secs = self.state.cfg.poll_timeout.as_secs();
        let retry_delay = self.state.cfg.poll_retry_delay;
        let mut failures = 0u32;

        info!("starting Bale bot polling");

        loop {
            let resp = tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              resp = self.state.api.get_updates(self.offset, timeout_secs) => resp,
            };

            if resp.ok {
                failures = 0;
                self.process_batch(resp.result.unwrap_or_default()).await;
                continue;
            }

            failures += 1;
            error!(
                failures,
                description = resp.description_or_default(),
                "failed to fetch updates"
            );
            if let Some(max) = self.state.cfg.poll_max_retries {
                if failures >= max {
                    return Err(Error::External(format!(
                        "giving up after {failures} consecutive failed update fetches"
                    )));
                }
            }

            tokio::select! {
              biased;
              _ = cancel.cancelled() => break,
              _ = sleep(retry_delay) => {}
            }
        }

        info!("polling stopped");
        Ok(())
    }

    /// Dispatch updates in order. Each one counts as consumed once its handler
    /// returned, whatever the outcome.
    pub async fn process_batch(&mut self, updates: Vec<Update>) {
        for update in updates {
            let update_id = update.update_id;
            if let Err(e) = handlers::dispatch(&self.state, &mut self.conversations, &update).await
            {
                error!(update_id, error = %e, "update handler failed");
            }
            let next = update_id + 1;
            self.offset = Some(self.offset.map_or(next, |cur| cur.max(next)));
        }
    }

    /// Stop the job scheduler, then release the connection.
    pub async fn shutdown(&self) {
        self.state.scheduler.shutdown().await;
        if !self.state.api.close().await {
            warn!("connection was already closed");
        }
        info!("bot resources cleaned up");
    }
}
