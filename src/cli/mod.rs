//! CLI module for Team Gate
//!
//! - `serve`: run the HTTP server
//! - `check-policy`: validate a role policy file and print its grants

pub mod policy;
pub mod serve;

use clap::{Parser, Subcommand};

/// Team Gate - passwordless authentication and team-scoped RBAC
#[derive(Parser)]
#[command(name = "team-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Validate a role policy file
    CheckPolicy(policy::CheckPolicyArgs),
}
