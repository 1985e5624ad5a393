//! Daemon integration test modules

pub mod grace;
pub mod queue_flow;
pub mod rooms;
pub mod shutdown;
