//! Configuration domain

mod app_config;

pub use app_config::{AppConfig, PlatformConfig, DEFAULT_BROADCAST_CAPACITY, DEFAULT_LOG_LEVEL};
