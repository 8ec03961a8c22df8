use tracing::{error, info};

use bale_core::{
    conversation::ConversationStore,
    messaging::types::Message,
    scheduler::JobSpec,
    Result,
};

use crate::router::AppState;
use crate::texts;

use super::apologize;

/// Handle a code typed while the user is `AwaitingCode`.
///
/// An accepted code starts (or replaces) the user's recurring verification
/// job. The conversation stays in `AwaitingCode`.
pub async fn handle_otp(
    state: &AppState,
    conversations: &mut ConversationStore,
    msg: &Message,
) -> Result<()> {
    let user_id = msg.user_id();
    let Some(phone) = conversations.pending_phone(user_id).map(str::to_string) else {
        return Ok(());
    };
    let Some(code) = msg.text.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(());
    };

    match verify_and_schedule(state, msg, &phone, code).await {
        Ok(true) => {}
        Ok(false) => {
            info!(%user_id, "verification code rejected");
            apologize(state, msg.chat.id, texts::INVALID_CODE).await;
        }
        Err(e) => {
            error!(%user_id, error = %e, "failed to process verification code");
            conversations.remove(user_id);
            apologize(state, msg.chat.id, texts::VERIFICATION_FAILED).await;
        }
    }
    Ok(())
}

async fn verify_and_schedule(
    state: &AppState,
    msg: &Message,
    phone: &str,
    code: &str,
) -> Result<bool> {
    let user_id = msg.user_id();
    if !state.hooks.otp_verifier.verify(user_id, phone, code).await? {
        return Ok(false);
    }

    let key = state
        .scheduler
        .schedule(JobSpec {
            user_id,
            chat_id: msg.chat.id,
            phone: phone.to_string(),
            message_id: Some(msg.message_id),
        })
        .await?;
    info!(%user_id, job = %key, "verification check scheduled");
    Ok(true)
}
