//! Admin console client for the KZGuard ban and whitelist backend.

pub mod models;
pub mod action_lock;
pub mod client;
pub mod config;
pub mod controller;
pub mod cooldown;
pub mod dialog;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod logging;
pub mod notify;
pub mod session;
pub mod utils;

pub use client::ApiClient;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use notify::Notifier;
