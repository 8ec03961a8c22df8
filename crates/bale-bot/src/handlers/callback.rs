use tracing::{error, warn};

use bale_core::{messaging::types::CallbackQuery, ports::PaymentRequest, Result};

use crate::router::AppState;
use crate::texts;

pub async fn handle_callback(state: &AppState, q: &CallbackQuery) -> Result<()> {
    let data = q.data.as_deref().unwrap_or("");

    if let Some(raw_amount) = data.strip_prefix(texts::PAYMENT_PREFIX) {
        return handle_payment_callback(state, q, raw_amount).await;
    }

    // Always answer, so the client stops its loading indicator.
    answer(state, q, None, false).await;
    Ok(())
}

async fn handle_payment_callback(state: &AppState, q: &CallbackQuery, raw: &str) -> Result<()> {
    let Ok(amount) = raw.parse::<u64>() else {
        warn!(user_id = %q.from.id, data = raw, "invalid payment amount");
        answer(state, q, Some(texts::INVALID_AMOUNT), true).await;
        return Ok(());
    };

    let req = PaymentRequest {
        user_id: q.from.id,
        chat_id: q.message.as_ref().map(|m| m.chat.id),
        callback_id: q.id.clone(),
        amount,
    };

    match state.hooks.payments.handle_payment(&req).await {
        Ok(()) => answer(state, q, None, false).await,
        Err(e) => {
            error!(user_id = %q.from.id, amount, error = %e, "payment handling failed");
            answer(state, q, Some(texts::PAYMENT_FAILED), true).await;
        }
    }
    Ok(())
}

async fn answer(state: &AppState, q: &CallbackQuery, text: Option<&str>, show_alert: bool) {
    let resp = state
        .api
        .answer_callback_query(&q.id, text, show_alert)
        .await;
    if !resp.ok {
        warn!(
            callback_id = %q.id,
            description = resp.description_or_default(),
            "failed to answer callback query"
        );
    }
}
