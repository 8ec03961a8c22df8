//! Core of the Bale verification bot.
//!
//! Framework-agnostic: the Bale HTTP client lives behind the `BotApi` port and
//! unfinished business logic lives behind the hooks in `ports`.

pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod scheduler;
pub mod utils;

pub use errors::{Error, Result};
