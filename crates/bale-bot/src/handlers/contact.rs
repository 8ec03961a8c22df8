use tracing::{debug, error, info};

use bale_core::{
    conversation::{ConversationState, ConversationStore},
    domain::{ChatId, UserId},
    messaging::types::Message,
    utils::{normalize_phone, validate_phone},
    Result,
};

use crate::router::AppState;
use crate::texts;

use super::apologize;

/// Store the shared phone number and move the user to the code step.
///
/// Only accepted while the user is `AwaitingPhone`. Any failure removes the
/// user's state entirely and sends an apology.
pub async fn handle_contact(
    state: &AppState,
    conversations: &mut ConversationStore,
    msg: &Message,
) -> Result<()> {
    let Some(contact) = &msg.contact else {
        return Ok(());
    };
    let user_id = msg.user_id();

    if conversations.state(user_id) != ConversationState::AwaitingPhone {
        debug!(%user_id, "ignoring contact outside of the phone step");
        return Ok(());
    }

    info!(%user_id, "received contact");

    if let Err(e) = register_phone(
        state,
        conversations,
        user_id,
        msg.chat.id,
        &contact.phone_number,
    )
    .await
    {
        error!(%user_id, error = %e, "failed to request verification code");
        conversations.remove(user_id);
        apologize(state, msg.chat.id, texts::OTP_REQUEST_FAILED).await;
    }

    Ok(())
}

async fn register_phone(
    state: &AppState,
    conversations: &mut ConversationStore,
    user_id: UserId,
    chat_id: ChatId,
    raw_phone: &str,
) -> Result<()> {
    validate_phone(raw_phone)?;
    let phone = normalize_phone(raw_phone);
    conversations.await_code(user_id, phone.clone());

    state.hooks.otp_sender.send_code(user_id, &phone).await?;
    state
        .api
        .send_message(chat_id, texts::ENTER_CODE, None)
        .await
        .into_result("sendMessage")?;
    Ok(())
}
