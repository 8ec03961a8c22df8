//! Bale bot orchestrator.
//!
//! Runs the long-poll loop over a `BotApi`, routes each update to its handler
//! and owns the conversation state and verification jobs.

pub mod handlers;
pub mod router;
pub mod texts;

#[cfg(test)]
mod testing;

pub use router::{AppState, Orchestrator};
