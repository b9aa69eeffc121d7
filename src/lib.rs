pub mod app;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod domain;
pub mod drive;
pub mod error;
pub mod failures;
pub mod output;
pub mod pacing;
pub mod platform;
pub mod retry;
pub mod store;
