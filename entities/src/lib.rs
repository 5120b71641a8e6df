pub mod scenario_progress;
pub mod user;
