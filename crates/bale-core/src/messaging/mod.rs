//! Bale wire model and the outbound API port.

pub mod port;
pub mod types;
