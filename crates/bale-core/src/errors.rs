/// Core error type for the bot.
///
/// Transport failures never surface here: the gateway client folds them into
/// `ApiResponse` failures. These variants cover configuration, handler-local
/// failures and application errors that a handler chose to propagate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bale api error in {method}: {description}")]
    Api { method: String, description: String },

    #[error("invalid phone number: {0:?}")]
    InvalidPhone(String),

    #[error("job scheduler is stopped")]
    SchedulerStopped,

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
