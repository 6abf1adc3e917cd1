//! API endpoint handlers.

pub mod health;
pub mod intake;
pub mod queue;
