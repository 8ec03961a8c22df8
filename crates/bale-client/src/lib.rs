//! Bale bot API adapter (reqwest).
//!
//! Implements the `bale-core` `BotApi` port. Every call folds transport and
//! decoding failures into `ApiResponse { ok: false, description }`.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use bale_core::{
    config::Config,
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::{
        port::BotApi,
        types::{decode_updates, ApiResponse, Components, File, Message, Update},
    },
    Result,
};

pub struct BaleClient {
    token: String,
    base_url: String,
    http: Mutex<Option<reqwest::Client>>,
}

impl BaleClient {
    /// Build the client and its connection pool. The pool lives until `close`.
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self {
            token: cfg.bale_bot_token.clone(),
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            http: Mutex::new(Some(http)),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url,
            self.token,
            file_path.trim_start_matches('/')
        )
    }

    fn http(&self) -> Option<reqwest::Client> {
        self.http
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, body: Value) -> ApiResponse<T> {
        let Some(http) = self.http() else {
            tracing::warn!(method, "bale request after client was closed");
            return ApiResponse::failure("client is closed");
        };

        tracing::debug!(method, body = %body, "bale request");

        let resp = match http.post(self.method_url(method)).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                let e = e.without_url();
                tracing::error!(method, error = %e, "bale request failed");
                return ApiResponse::failure(format!("request error: {e}"));
            }
        };

        let status = resp.status();
        match resp.json::<ApiResponse<T>>().await {
            Ok(parsed) => {
                if !parsed.ok {
                    tracing::warn!(
                        method,
                        %status,
                        description = parsed.description_or_default(),
                        "bale api returned ok=false"
                    );
                }
                parsed
            }
            Err(e) => {
                let e = e.without_url();
                tracing::error!(method, %status, error = %e, "malformed bale response");
                ApiResponse::failure(format!("malformed response ({status}): {e}"))
            }
        }
    }
}

#[async_trait]
impl BotApi for BaleClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> ApiResponse<Vec<Update>> {
        tracing::debug!(?offset, timeout_secs, "getting updates");
        // Items are decoded one by one so a single unsupported update cannot
        // fail the whole batch.
        let resp: ApiResponse<Vec<Value>> = self
            .request("getUpdates", get_updates_body(offset, timeout_secs))
            .await;
        resp.map(decode_updates)
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message> {
        let body = match message_body(chat_id, None, text, components.as_ref()) {
            Ok(b) => b,
            Err(e) => return ApiResponse::failure(format!("invalid reply_markup: {e}")),
        };
        tracing::info!(%chat_id, text = %preview(text), "sending message");
        self.request("sendMessage", body).await
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message> {
        let body = match message_body(chat_id, Some(message_id), text, components.as_ref()) {
            Ok(b) => b,
            Err(e) => return ApiResponse::failure(format!("invalid reply_markup: {e}")),
        };
        tracing::info!(%chat_id, message_id = message_id.0, text = %preview(text), "editing message");
        self.request("editMessageText", body).await
    }

    async fn get_file(&self, file_id: &str) -> ApiResponse<File> {
        self.request("getFile", json!({ "file_id": file_id })).await
    }

    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>> {
        let Some(http) = self.http() else {
            tracing::warn!("file download after client was closed");
            return None;
        };

        let resp = match http.get(self.file_url(file_path)).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(file_path, error = %e.without_url(), "file download failed");
                return None;
            }
        };

        if !resp.status().is_success() {
            tracing::error!(file_path, status = %resp.status(), "file download rejected");
            return None;
        }

        match resp.bytes().await {
            Ok(b) => Some(b.to_vec()),
            Err(e) => {
                tracing::error!(file_path, error = %e.without_url(), "file download interrupted");
                None
            }
        }
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> ApiResponse<bool> {
        self.request(
            "answerCallbackQuery",
            answer_callback_body(callback_query_id, text, show_alert),
        )
        .await
    }

    async fn close(&self) -> bool {
        let taken = self
            .http
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if taken.is_some() {
            tracing::info!("bale http client closed");
            true
        } else {
            false
        }
    }
}

fn get_updates_body(offset: Option<i64>, timeout_secs: u64) -> Value {
    let mut body = Map::new();
    body.insert("timeout".to_string(), json!(timeout_secs));
    if let Some(offset) = offset {
        body.insert("offset".to_string(), json!(offset));
    }
    Value::Object(body)
}

fn message_body(
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: &str,
    components: Option<&Components>,
) -> Result<Value> {
    let mut body = Map::new();
    body.insert("chat_id".to_string(), json!(chat_id.0));
    if let Some(id) = message_id {
        body.insert("message_id".to_string(), json!(id.0));
    }
    body.insert("text".to_string(), json!(text));
    if let Some(c) = components {
        body.insert("reply_markup".to_string(), Value::String(c.to_wire()?));
    }
    Ok(Value::Object(body))
}

fn answer_callback_body(callback_query_id: &str, text: Option<&str>, show_alert: bool) -> Value {
    let mut body = Map::new();
    body.insert("callback_query_id".to_string(), json!(callback_query_id));
    if let Some(t) = text.filter(|t| !t.is_empty()) {
        body.insert("text".to_string(), json!(t));
    }
    if show_alert {
        body.insert("show_alert".to_string(), json!(true));
    }
    Value::Object(body)
}

fn preview(text: &str) -> String {
    const MAX: usize = 50;
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    format!("{}...", text.chars().take(MAX).collect::<String>())
}
