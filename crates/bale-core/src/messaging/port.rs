use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId},
    messaging::types::{ApiResponse, Components, File, Message, Update},
};

/// Outbound port to the Bale bot API.
///
/// Every network-facing call reports failure through `ApiResponse::ok`
/// (or `None` for downloads); implementations never return transport errors
/// to the caller.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64)
        -> ApiResponse<Vec<Update>>;

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message>;

    async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        components: Option<Components>,
    ) -> ApiResponse<Message>;

    async fn get_file(&self, file_id: &str) -> ApiResponse<File>;

    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>>;

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> ApiResponse<bool>;

    /// Release the underlying connection. Returns `true` only for the call
    /// that actually released it.
    async fn close(&self) -> bool;
}
