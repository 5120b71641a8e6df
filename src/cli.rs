// Command line surface

use clap::{Parser, Subcommand};

use crate::domain::models::ProgressPatch;

/// Scenario progress for the Dharmasikhara legal simulations
#[derive(Parser)]
#[command(name = "dharma-progress", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the progress API server
    Serve,

    /// Store a bearer token in local storage
    Login {
        token: String,
    },

    /// Remove the stored bearer token
    Logout,

    /// Record progress for a scenario
    Save {
        scenario_id: String,

        #[command(flatten)]
        patch: PatchArgs,
    },

    /// Show progress for one scenario
    Get {
        scenario_id: String,
    },

    /// Show progress for every scenario
    List,

    /// Drop the local copy of one scenario
    Forget {
        scenario_id: String,
    },

    /// Drop every local progress record
    ResetLocal,
}

#[derive(clap::Args, Debug, Default)]
pub struct PatchArgs {
    /// Stage the learner is on, e.g. "bail-draft"
    #[arg(long)]
    pub stage: Option<String>,

    /// A finished stage (repeatable)
    #[arg(long = "completed")]
    pub completed: Vec<String>,

    /// Percentage through the scenario
    #[arg(long)]
    pub progress: Option<f64>,

    /// Assessment score, 0 - 100
    #[arg(long)]
    pub score: Option<f64>,

    /// Seconds spent so far
    #[arg(long)]
    pub time_spent: Option<u64>,

    #[arg(long)]
    pub feedback: Option<String>,
}

impl From<PatchArgs> for ProgressPatch {
    fn from(args: PatchArgs) -> Self {
        ProgressPatch {
            current_stage: args.stage,
            progress: args.progress,
            completed_stages: (!args.completed.is_empty()).then_some(args.completed),
            assessment_score: args.score,
            total_time_spent: args.time_spent,
            feedback: args.feedback,
            scenario_specific_data: None,
        }
    }
}
