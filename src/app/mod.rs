//! Application module: the `waitline` daemon around the queue core

pub mod cli;
pub mod grace_timer;
pub mod protocol;
pub mod server;
pub mod startup;
