//! Update handlers.
//!
//! `dispatch` routes an update by shape (first match wins):
//! - message with a contact -> `contact`
//! - message with a document -> `document`
//! - message with text -> menu commands, else the code step while a code is expected
//! - callback query -> `callback`
//!
//! Handlers deal with their own per-user failures (apology + state reset);
//! an `Err` returned here is only logged by the loop.

use tracing::{debug, error, warn};

use bale_core::{
    conversation::{ConversationState, ConversationStore},
    domain::ChatId,
    messaging::types::{Components, Message, Update},
    Result,
};

use crate::router::AppState;

mod callback;
mod commands;
mod contact;
mod document;
mod otp;

pub use commands::Command;
pub use document::fetch_document;

pub(crate) async fn dispatch(
    state: &AppState,
    conversations: &mut ConversationStore,
    update: &Update,
) -> Result<()> {
    if let Some(msg) = &update.message {
        return handle_message(state, conversations, msg).await;
    }
    if let Some(q) = &update.callback_query {
        return callback::handle_callback(state, q).await;
    }
    debug!(update_id = update.update_id, "ignoring update without message or callback");
    Ok(())
}

async fn handle_message(
    state: &AppState,
    conversations: &mut ConversationStore,
    msg: &Message,
) -> Result<()> {
    if msg.contact.is_some() {
        return contact::handle_contact(state, conversations, msg).await;
    }

    if let Some(doc) = &msg.document {
        return document::handle_document(state, msg, doc).await;
    }

    let Some(text) = msg.text.as_deref() else {
        return Ok(());
    };

    match Command::parse(text) {
        Some(Command::Start) => commands::handle_start(state, conversations, msg).await,
        Some(Command::ChargeWallet) => commands::handle_charge_wallet(state, msg).await,
        Some(Command::AccountStatus) => commands::show_account_status(state, msg).await,
        None => {
            if conversations.state(msg.user_id()) == ConversationState::AwaitingCode {
                return otp::handle_otp(state, conversations, msg).await;
            }
            Ok(())
        }
    }
}

/// Send a message; on failure log and try a plain-text apology once.
async fn send_or_apologize(
    state: &AppState,
    chat_id: ChatId,
    text: &str,
    components: Option<Components>,
    apology: &str,
) {
    let resp = state.api.send_message(chat_id, text, components).await;
    if resp.ok {
        return;
    }
    error!(
        %chat_id,
        description = resp.description_or_default(),
        "failed to send message"
    );
    apologize(state, chat_id, apology).await;
}

/// Best-effort notice; a failure here is only logged.
async fn apologize(state: &AppState, chat_id: ChatId, text: &str) {
    let resp = state.api.send_message(chat_id, text, None).await;
    if !resp.ok {
        warn!(
            %chat_id,
            description = resp.description_or_default(),
            "failed to send apology"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use bale_core::{
        config::Config,
        domain::UserId,
        errors::Error,
        messaging::port::BotApi,
        ports::{Hooks, OtpSender, OtpVerifier, PaymentHandler, PaymentRequest, WalletService},
        scheduler::{JobConfig, JobScheduler},
    };

    use super::*;
    use crate::testing::{
        callback_update, contact_update, document_update, text_update, CallbackAnswer, FakeApi,
    };
    use crate::texts;

    struct FailingOtpSender;

    #[async_trait]
    impl OtpSender for FailingOtpSender {
        async fn send_code(&self, _user_id: UserId, _phone: &str) -> Result<()> {
            Err(Error::External("sms gateway down".to_string()))
        }
    }

    struct RejectingVerifier;

    #[async_trait]
    impl OtpVerifier for RejectingVerifier {
        async fn verify(&self, _user_id: UserId, _phone: &str, _code: &str) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct RecordingPayments {
        requests: Mutex<Vec<PaymentRequest>>,
    }

    #[async_trait]
    impl PaymentHandler for RecordingPayments {
        async fn handle_payment(&self, req: &PaymentRequest) -> Result<()> {
            self.requests.lock().unwrap().push(req.clone());
            Ok(())
        }
    }

    struct FixedWallet(u64);

    #[async_trait]
    impl WalletService for FixedWallet {
        async fn balance(&self, _user_id: UserId) -> Result<u64> {
            Ok(self.0)
        }
    }

    fn state_with(api: &Arc<FakeApi>, hooks: Hooks) -> AppState {
        AppState {
            cfg: Arc::new(Config::with_token("t")),
            api: api.clone(),
            scheduler: JobScheduler::new(JobConfig::default(), hooks.job_completion.clone()),
            hooks,
        }
    }

    async fn dispatch_all(state: &AppState, conversations: &mut ConversationStore, updates: &[Update]) {
        for u in updates {
            dispatch(state, conversations, u).await.unwrap();
        }
    }

    #[tokio::test]
    async fn contact_is_ignored_outside_phone_step() {
        let api = Arc::new(FakeApi::new());
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(&state, &mut conversations, &[contact_update(1, 7, "09121234567")]).await;

        assert!(conversations.is_empty());
        assert!(api.sent().is_empty());
    }

    #[tokio::test]
    async fn second_contact_while_awaiting_code_is_ignored() {
        let api = Arc::new(FakeApi::new());
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, "/start"), contact_update(2, 7, "+989121234567")],
        )
        .await;
        assert_eq!(conversations.state(UserId(7)), ConversationState::AwaitingCode);
        let sent_before = api.sent().len();

        dispatch_all(&state, &mut conversations, &[contact_update(3, 7, "09350000000")]).await;

        assert_eq!(conversations.state(UserId(7)), ConversationState::AwaitingCode);
        assert_eq!(conversations.pending_phone(UserId(7)), Some("09121234567"));
        assert_eq!(api.sent().len(), sent_before);
    }

    #[tokio::test]
    async fn invalid_phone_resets_state_and_apologizes() {
        let api = Arc::new(FakeApi::new());
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, "/start"), contact_update(2, 7, "not a phone")],
        )
        .await;

        assert_eq!(conversations.state(UserId(7)), ConversationState::Idle);
        let sent = api.sent();
        assert_eq!(sent.last().unwrap().text, texts::OTP_REQUEST_FAILED);
    }

    #[tokio::test]
    async fn otp_sender_failure_resets_state_and_apologizes() {
        let api = Arc::new(FakeApi::new());
        let hooks = Hooks {
            otp_sender: Arc::new(FailingOtpSender),
            ..Hooks::default()
        };
        let state = state_with(&api, hooks);
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, "/start"), contact_update(2, 7, "+989121234567")],
        )
        .await;

        assert!(conversations.get(UserId(7)).is_none());
        let sent = api.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].text, texts::OTP_REQUEST_FAILED);
        assert!(sent[1].reply_markup.is_none());
    }

    #[tokio::test]
    async fn rejected_code_keeps_waiting_without_scheduling() {
        let api = Arc::new(FakeApi::new());
        let hooks = Hooks {
            otp_verifier: Arc::new(RejectingVerifier),
            ..Hooks::default()
        };
        let state = state_with(&api, hooks);
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[
                text_update(1, 7, "/start"),
                contact_update(2, 7, "09121234567"),
                text_update(3, 7, "000000"),
            ],
        )
        .await;

        assert_eq!(conversations.state(UserId(7)), ConversationState::AwaitingCode);
        assert!(state.scheduler.is_empty().await);
        assert_eq!(api.sent().last().unwrap().text, texts::INVALID_CODE);
    }

    #[tokio::test]
    async fn free_text_while_idle_is_ignored() {
        let api = Arc::new(FakeApi::new());
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(&state, &mut conversations, &[text_update(1, 7, "123456")]).await;

        assert!(api.sent().is_empty());
        assert!(state.scheduler.is_empty().await);
    }

    #[tokio::test]
    async fn charge_wallet_sends_inline_amounts() {
        let api = Arc::new(FakeApi::new());
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, texts::MENU_CHARGE_WALLET)],
        )
        .await;

        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, texts::CHOOSE_AMOUNT);
        let markup: serde_json::Value =
            serde_json::from_str(sent[0].reply_markup.as_deref().unwrap()).unwrap();
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["callback_data"], "pay_50000");
        assert_eq!(rows[1][1]["callback_data"], "pay_500000");
    }

    #[tokio::test]
    async fn charge_wallet_apologizes_when_send_fails() {
        let api = Arc::new(FakeApi::new());
        api.fail_next_sends(1);
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, texts::MENU_CHARGE_WALLET)],
        )
        .await;

        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, texts::CHARGE_FAILED);
        assert!(sent[0].reply_markup.is_none());
    }

    #[tokio::test]
    async fn account_status_shows_formatted_balance_with_menu() {
        let api = Arc::new(FakeApi::new());
        let hooks = Hooks {
            wallet: Arc::new(FixedWallet(1_250_000)),
            ..Hooks::default()
        };
        let state = state_with(&api, hooks);
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[text_update(1, 7, texts::MENU_ACCOUNT_STATUS)],
        )
        .await;

        let sent = api.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("1,250,000"));
        assert!(sent[0]
            .reply_markup
            .as_deref()
            .unwrap()
            .contains(texts::MENU_CHARGE_WALLET));
    }

    #[tokio::test]
    async fn payment_callback_reaches_hook_and_is_answered() {
        let api = Arc::new(FakeApi::new());
        let payments = Arc::new(RecordingPayments::default());
        let hooks = Hooks {
            payments: payments.clone(),
            ..Hooks::default()
        };
        let state = state_with(&api, hooks);
        let mut conversations = ConversationStore::new();

        dispatch_all(
            &state,
            &mut conversations,
            &[
                callback_update(1, 7, "pay_100000"),
                callback_update(2, 7, "pay_lots"),
                callback_update(3, 7, "menu"),
            ],
        )
        .await;

        let requests = payments.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 100_000);
        assert_eq!(requests[0].user_id, UserId(7));
        assert_eq!(requests[0].callback_id, "cb1");

        assert_eq!(
            api.answers(),
            vec![
                CallbackAnswer {
                    id: "cb1".to_string(),
                    text: None,
                    show_alert: false
                },
                CallbackAnswer {
                    id: "cb2".to_string(),
                    text: Some(texts::INVALID_AMOUNT.to_string()),
                    show_alert: true
                },
                CallbackAnswer {
                    id: "cb3".to_string(),
                    text: None,
                    show_alert: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn document_bytes_are_fetched_through_the_api() {
        let api = Arc::new(FakeApi::new());
        api.add_file("doc1", b"%PDF-1.4");
        let state = state_with(&api, Hooks::default());
        let mut conversations = ConversationStore::new();

        let update = document_update(1, 7, "doc1");
        dispatch_all(&state, &mut conversations, std::slice::from_ref(&update)).await;

        let doc = update.message.as_ref().unwrap().document.as_ref().unwrap();
        let bytes = fetch_document(api.as_ref() as &dyn BotApi, doc).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4");

        let missing = document_update(2, 7, "gone");
        let doc = missing.message.as_ref().unwrap().document.as_ref().unwrap();
        assert!(fetch_document(api.as_ref(), doc).await.is_err());
    }
}
