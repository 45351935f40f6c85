//! Real-time workspace connection handling.

pub mod gateway;
pub mod protocol;

pub use gateway::routes;
