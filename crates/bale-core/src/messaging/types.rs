use serde::{Deserialize, Serialize};

use crate::{
    domain::{ChatId, MessageId, UserId},
    errors::Error,
    Result,
};

/// Uniform result shape of every Bale API call.
///
/// Transport failures are folded into this shape by the client, so callers
/// only ever inspect `ok`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            description: None,
            error_code: None,
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            description: Some(description.into()),
            error_code: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            ok: self.ok,
            result: self.result.map(f),
            description: self.description,
            error_code: self.error_code,
        }
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("no description")
    }

    /// Convert an application-level failure into `Error::Api`.
    pub fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(Error::Api {
                method: method.to_string(),
                description: self.description_or_default().to_string(),
            });
        }
        self.result.ok_or_else(|| Error::Api {
            method: method.to_string(),
            description: "ok response without result".to_string(),
        })
    }
}

// === Inbound ===

/// Decode a `getUpdates` batch item by item.
///
/// An item that does not fit the model is kept as a bare `Update` carrying
/// only its id, so it is still consumed and the offset moves past it. Items
/// without a numeric `update_id` are dropped.
pub fn decode_updates(raw: Vec<serde_json::Value>) -> Vec<Update> {
    raw.into_iter()
        .filter_map(|item| {
            let update_id = item.get("update_id").and_then(serde_json::Value::as_i64);
            match serde_json::from_value::<Update>(item) {
                Ok(update) => Some(update),
                Err(e) => {
                    let update_id = update_id?;
                    tracing::warn!(update_id, error = %e, "skipping unsupported update");
                    Some(Update {
                        update_id,
                        message: None,
                        callback_query: None,
                    })
                }
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub document: Option<Document>,
}

impl Message {
    /// Sender id; falls back to the chat id for messages without `from`.
    pub fn user_id(&self) -> UserId {
        self.from
            .as_ref()
            .map(|u| u.id)
            .unwrap_or(UserId(self.chat.id.0))
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

/// `getFile` result.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

// === Outbound ===

/// A single keyboard button.
///
/// Reply keyboards use `request_contact`; inline keyboards use `callback_data`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl Button {
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            request_contact: None,
            callback_data: None,
        }
    }

    pub fn request_contact(label: impl Into<String>) -> Self {
        Self {
            request_contact: Some(true),
            ..Self::text(label)
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            callback_data: Some(data.into()),
            ..Self::text(label)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<Button>>,
    },
    Reply {
        keyboard: Vec<Vec<Button>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
}

/// Build a keyboard from a grid of buttons.
///
/// Reply keyboards are always resized and persistent.
pub fn create_keyboard(rows: Vec<Vec<Button>>, inline: bool) -> ReplyMarkup {
    if inline {
        ReplyMarkup::Inline {
            inline_keyboard: rows,
        }
    } else {
        ReplyMarkup::Reply {
            keyboard: rows,
            resize_keyboard: true,
            one_time_keyboard: false,
        }
    }
}

/// What a caller may attach to an outgoing message.
#[derive(Clone, Debug, PartialEq)]
pub enum Components {
    Markup(ReplyMarkup),
    /// Pre-encoded `reply_markup` JSON, sent as-is.
    Raw(String),
}

impl Components {
    /// `reply_markup` is a JSON string on the wire, never a nested object.
    pub fn to_wire(&self) -> Result<String> {
        match self {
            Components::Markup(markup) => Ok(serde_json::to_string(markup)?),
            Components::Raw(raw) => Ok(raw.clone()),
        }
    }
}

impl From<ReplyMarkup> for Components {
    fn from(m: ReplyMarkup) -> Self {
        Components::Markup(m)
    }
}
