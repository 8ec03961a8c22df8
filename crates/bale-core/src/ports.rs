//! Extension points the orchestrator calls into.
//!
//! OTP delivery/verification, payments, document processing, wallet balance and
//! the verification job's completion check all belong to external systems.
//! Each one is a trait here with a no-op default so the conversation flow and
//! the job lifecycle work (and are testable) without those systems.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    messaging::{
        port::BotApi,
        types::{Document, Message},
    },
    scheduler::JobContext,
    Result,
};

/// Delivers a one-time code once a phone number is on record.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send_code(&self, user_id: UserId, phone: &str) -> Result<()>;
}

/// Checks a code the user typed.
#[async_trait]
pub trait OtpVerifier: Send + Sync {
    async fn verify(&self, user_id: UserId, phone: &str, code: &str) -> Result<bool>;
}

/// A `pay_<amount>` button was pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub user_id: UserId,
    pub chat_id: Option<ChatId>,
    pub callback_id: String,
    pub amount: u64,
}

#[async_trait]
pub trait PaymentHandler: Send + Sync {
    async fn handle_payment(&self, req: &PaymentRequest) -> Result<()>;
}

/// Incoming documents. Implementations get the API so they can fetch the file.
#[async_trait]
pub trait DocumentHandler: Send + Sync {
    async fn handle_document(&self, api: &dyn BotApi, msg: &Message, doc: &Document)
        -> Result<()>;
}

#[async_trait]
pub trait WalletService: Send + Sync {
    async fn balance(&self, user_id: UserId) -> Result<u64>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
}

/// Decides whether a verification job has reached its goal.
#[async_trait]
pub trait JobCompletion: Send + Sync {
    async fn check(&self, job: &JobContext) -> Result<JobStatus>;
}

/// Default implementation for every hook.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

#[async_trait]
impl OtpSender for NoopHooks {
    async fn send_code(&self, user_id: UserId, _phone: &str) -> Result<()> {
        tracing::debug!(%user_id, "no OTP sender configured");
        Ok(())
    }
}

#[async_trait]
impl OtpVerifier for NoopHooks {
    async fn verify(&self, _user_id: UserId, _phone: &str, _code: &str) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl PaymentHandler for NoopHooks {
    async fn handle_payment(&self, req: &PaymentRequest) -> Result<()> {
        tracing::info!(user_id = %req.user_id, amount = req.amount, "payment requested (no handler)");
        Ok(())
    }
}

#[async_trait]
impl DocumentHandler for NoopHooks {
    async fn handle_document(
        &self,
        _api: &dyn BotApi,
        msg: &Message,
        doc: &Document,
    ) -> Result<()> {
        tracing::debug!(
            user_id = %msg.user_id(),
            mime_type = doc.mime_type.as_deref().unwrap_or(""),
            "document received (no handler)"
        );
        Ok(())
    }
}

#[async_trait]
impl WalletService for NoopHooks {
    async fn balance(&self, _user_id: UserId) -> Result<u64> {
        Ok(0)
    }
}

#[async_trait]
impl JobCompletion for NoopHooks {
    async fn check(&self, _job: &JobContext) -> Result<JobStatus> {
        Ok(JobStatus::Pending)
    }
}

/// The full set of hooks handed to the orchestrator.
#[derive(Clone)]
pub struct Hooks {
    pub otp_sender: Arc<dyn OtpSender>,
    pub otp_verifier: Arc<dyn OtpVerifier>,
    pub payments: Arc<dyn PaymentHandler>,
    pub documents: Arc<dyn DocumentHandler>,
    pub wallet: Arc<dyn WalletService>,
    pub job_completion: Arc<dyn JobCompletion>,
}

impl Default for Hooks {
    fn default() -> Self {
        let noop = Arc::new(NoopHooks);
        Self {
            otp_sender: noop.clone(),
            otp_verifier: noop.clone(),
            payments: noop.clone(),
            documents: noop.clone(),
            wallet: noop.clone(),
            job_completion: noop,
        }
    }
}
