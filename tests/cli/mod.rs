//! CLI integration test modules

pub mod check_config;
