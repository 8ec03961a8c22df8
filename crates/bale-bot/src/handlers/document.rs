use tracing::info;

use bale_core::{
    errors::Error,
    messaging::{
        port::BotApi,
        types::{Document, Message},
    },
    Result,
};

use crate::router::AppState;

pub async fn handle_document(state: &AppState, msg: &Message, doc: &Document) -> Result<()> {
    info!(
        user_id = %msg.user_id(),
        mime_type = doc.mime_type.as_deref().unwrap_or(""),
        file_name = doc.file_name.as_deref().unwrap_or(""),
        "document received"
    );
    state
        .hooks
        .documents
        .handle_document(state.api.as_ref(), msg, doc)
        .await
}

/// Resolve a document's path with `getFile` and download its bytes.
pub async fn fetch_document(api: &dyn BotApi, doc: &Document) -> Result<Vec<u8>> {
    let file = api.get_file(&doc.file_id).await.into_result("getFile")?;
    let Some(path) = file.file_path.filter(|p| !p.is_empty()) else {
        return Err(Error::External(format!(
            "file {} has no download path",
            doc.file_id
        )));
    };
    api.download_file(&path)
        .await
        .ok_or_else(|| Error::External(format!("download of {path} failed")))
}
