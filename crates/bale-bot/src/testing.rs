//! In-memory `BotApi` and update builders shared by the crate's tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use bale_core::{
    domain::{ChatId, MessageId},
    messaging::{
        port::BotApi,
        types::{decode_updates, ApiResponse, Chat, Components, File, Message, Update},
    },
};

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub reply_markup: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

#[derive(Default)]
pub struct FakeApi {
    batches: Mutex<VecDeque<ApiResponse<Vec<Update>>>>,
    on_drained: Mutex<Option<CancellationToken>>,
    polled: Mutex<Vec<Option<i64>>>,
    sent: Mutex<Vec<SentMessage>>,
    failing_sends: Mutex<usize>,
    answers: Mutex<Vec<CallbackAnswer>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    close_calls: Mutex<usize>,
    next_message_id: Mutex<i64>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, resp: ApiResponse<Vec<Update>>) {
        self.batches.lock().unwrap().push_back(resp);
    }

    /// Queue a batch given as raw wire items, decoded the way the client does.
    pub fn push_raw_batch(&self, items: Vec<serde_json::Value>) {
        self.push_batch(ApiResponse::success(decode_updates(items)));
    }

    /// Cancel `token` on the first poll after the queued batches ran out.
    pub fn cancel_when_drained(&self, token: CancellationToken) {
        *self.on_drained.lock().unwrap() = Some(token);
    }

    pub fn fail_next_sends(&self, n: usize) {
        *self.failing_sends.lock().unwrap() = n;
    }

    /// Serve `bytes` for `file_id` under the path `files/<file_id>`.
    pub fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    pub fn polled_offsets(&self) -> Vec<Option<i64>> {
        self.polled.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<CallbackAnswer> {
        self.answers.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        *self.close_calls.lock().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.close_calls() > 0
    }

    fn take_send_failure(&self) -> bool {
        let mut left = self.failing_sends.lock().unwrap();
        if *left == 0 {
            return false;
        }
        *left -= 1;
        true
    }

    fn record(&self, chat_id: ChatId, text: &str, components: Option<Components>) -> Message {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            reply_markup: components.and_then(|c| c.to_wire().ok()),
        });
        let mut id = self.next_message_id.lock().unwrap();
        *id += 1;
        Message {
            message_id: MessageId(*id),
            from: None,
            chat: Chat { id: chat_id },
            text: Some(text.to_string()),
            contact: None,
            document: None,
        }
    }
}

#[async_trait]
impl BotApi for FakeApi {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout_secs: u64,
    ) -> ApiResponse<Vec<Update>> {
        self.polled.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(resp) => resp,
            None => {
                if let Some(token) = self.on_drained.lock().unwrap().as_ref() {
                    token.cancel();
                }
                ApiResponse::success(Vec::new())
            }
        }
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message> {
        if self.take_send_failure() {
            return ApiResponse::failure("Bad Request: chat not found");
        }
        ApiResponse::success(self.record(chat_id, text, components))
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        _message_id: MessageId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message> {
        ApiResponse::success(self.record(chat_id, text, components))
    }

    async fn get_file(&self, file_id: &str) -> ApiResponse<File> {
        if !self.files.lock().unwrap().contains_key(file_id) {
            return ApiResponse::failure("Bad Request: file not found");
        }
        ApiResponse::success(File {
            file_id: file_id.to_string(),
            file_size: None,
            file_path: Some(format!("files/{file_id}")),
        })
    }

    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>> {
        let file_id = file_path.strip_prefix("files/")?;
        self.files.lock().unwrap().get(file_id).cloned()
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> ApiResponse<bool> {
        self.answers.lock().unwrap().push(CallbackAnswer {
            id: callback_query_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        ApiResponse::success(true)
    }

    async fn close(&self) -> bool {
        let mut calls = self.close_calls.lock().unwrap();
        *calls += 1;
        *calls == 1
    }
}

fn private_message(update_id: i64, user_id: i64, extra: serde_json::Value) -> Update {
    let mut message = json!({
        "message_id": update_id * 10,
        "from": { "id": user_id, "first_name": "Sara" },
        "chat": { "id": user_id },
    });
    if let (Some(msg), Some(extra)) = (message.as_object_mut(), extra.as_object()) {
        msg.extend(extra.clone());
    }
    serde_json::from_value(json!({ "update_id": update_id, "message": message })).unwrap()
}

pub fn text_update(update_id: i64, user_id: i64, text: &str) -> Update {
    private_message(update_id, user_id, json!({ "text": text }))
}

pub fn contact_update(update_id: i64, user_id: i64, phone: &str) -> Update {
    private_message(
        update_id,
        user_id,
        json!({ "contact": { "phone_number": phone, "user_id": user_id } }),
    )
}

pub fn document_update(update_id: i64, user_id: i64, file_id: &str) -> Update {
    private_message(
        update_id,
        user_id,
        json!({ "document": { "file_id": file_id, "file_name": "report.pdf" } }),
    )
}

pub fn callback_update(update_id: i64, user_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb{update_id}"),
            "from": { "id": user_id },
            "data": data,
            "message": {
                "message_id": 1,
                "chat": { "id": user_id },
            },
        },
    }))
    .unwrap()
}
