mod show;
mod sync;

use crate::error::Result;
use clap::{Parser, Subcommand};

pub use show::ShowResource;
pub use sync::{SyncTarget, UnattendedTarget};

#[derive(Parser, Debug)]
#[command(name = "ynab-sync")]
#[command(about = "Sync transactions from banks to YNAB", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Sync { target } => target.execute().await,
            Commands::Unattended { target } => target.execute().await,
            Commands::Show { resource } => resource.execute().await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync transactions from banks to YNAB
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
    /// Sync using Sync.* environment variables instead of flags, for scheduled runs
    Unattended {
        #[command(subcommand)]
        target: UnattendedTarget,
    },
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}
