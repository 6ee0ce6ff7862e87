//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - login/logout/whoami: account and stored credentials
//! - scan: submit a URL for auditing
//! - jobs/job: list scan jobs or show one
//! - watch: follow running jobs until they finish

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Auditdash - accessibility audit dashboard client
#[derive(Parser, Debug)]
#[command(name = "auditdash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the issued tokens
    Login {
        /// Account username
        username: String,

        /// Password; read from AUDITDASH_PASSWORD when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored tokens
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Submit a URL for an accessibility scan
    Scan {
        /// Page URL to audit
        url: String,
    },

    /// List scan jobs
    Jobs,

    /// Show one scan job with its results
    Job {
        /// Job ID
        id: String,
    },

    /// Follow running jobs until every one has settled
    Watch {
        /// Also follow this job's detail
        #[arg(short, long)]
        job: Option<String>,
    },
}
