pub mod cli;
pub mod config;
pub mod domain;
pub mod progress_api;
pub mod progress_client;
pub mod progress_store;
pub mod storage;

pub use domain::models::{ProgressPatch, ScenarioProgress};
pub use progress_store::{FallbackReason, ProgressStore, Saved, Served};
