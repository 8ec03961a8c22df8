use tracing::{error, info};

use bale_core::{
    conversation::ConversationStore,
    messaging::types::{create_keyboard, Button, Message, ReplyMarkup},
    utils::format_thousands,
    Result,
};

use crate::router::AppState;
use crate::texts;

use super::{apologize, send_or_apologize};

/// Reserved texts that bypass the conversation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    ChargeWallet,
    AccountStatus,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        // `/start` may carry a deep-link payload: `/start ref123`.
        let first = text.split_whitespace().next().unwrap_or("");
        if first == "/start" {
            return Some(Command::Start);
        }
        match text {
            texts::MENU_CHARGE_WALLET => Some(Command::ChargeWallet),
            texts::MENU_ACCOUNT_STATUS => Some(Command::AccountStatus),
            _ => None,
        }
    }
}

pub async fn handle_start(
    state: &AppState,
    conversations: &mut ConversationStore,
    msg: &Message,
) -> Result<()> {
    let user_id = msg.user_id();
    conversations.begin(user_id);
    info!(%user_id, "conversation started");

    let keyboard = create_keyboard(
        vec![vec![Button::request_contact(texts::SHARE_PHONE_BUTTON)]],
        false,
    );
    send_or_apologize(
        state,
        msg.chat.id,
        texts::WELCOME,
        Some(keyboard.into()),
        texts::START_FAILED,
    )
    .await;
    Ok(())
}

pub async fn handle_charge_wallet(state: &AppState, msg: &Message) -> Result<()> {
    let rows: Vec<Vec<Button>> = texts::CHARGE_AMOUNTS
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|(label, amount)| {
                    Button::callback(*label, format!("{}{amount}", texts::PAYMENT_PREFIX))
                })
                .collect::<Vec<_>>()
        })
        .collect();
    let keyboard = create_keyboard(rows, true);

    send_or_apologize(
        state,
        msg.chat.id,
        texts::CHOOSE_AMOUNT,
        Some(keyboard.into()),
        texts::CHARGE_FAILED,
    )
    .await;
    Ok(())
}

pub async fn show_account_status(state: &AppState, msg: &Message) -> Result<()> {
    let user_id = msg.user_id();
    let balance = match state.hooks.wallet.balance(user_id).await {
        Ok(b) => b,
        Err(e) => {
            error!(%user_id, error = %e, "failed to load wallet balance");
            apologize(state, msg.chat.id, texts::STATUS_FAILED).await;
            return Ok(());
        }
    };

    let keyboard = main_menu();
    send_or_apologize(
        state,
        msg.chat.id,
        &texts::account_status(&format_thousands(balance)),
        Some(keyboard.into()),
        texts::STATUS_FAILED,
    )
    .await;
    Ok(())
}

fn main_menu() -> ReplyMarkup {
    create_keyboard(
        vec![
            vec![Button::text(texts::MENU_CHARGE_WALLET)],
            vec![Button::text(texts::MENU_ACCOUNT_STATUS)],
        ],
        false,
    )
}
