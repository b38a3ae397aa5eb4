pub mod availability;
pub mod calendar;
pub mod config;
pub mod consent;
pub mod consent_ui;
pub mod errors;
pub mod events;
pub mod loader;
pub mod log;
pub mod storage;
pub mod urls;
