use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "sec-digest")]
#[command(about = "Collects SEC 8-K filings and Yahoo Finance news and writes Korean digests")]
pub struct Args {
    /// Path to TOML configuration file (environment variables still apply)
    #[arg(short, long, env = "SEC_DIGEST_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON logs (for container log collectors)
    #[arg(long)]
    pub json_logs: bool,

    /// Log CPU / memory usage per pipeline stage
    #[arg(long)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the HTTP API and the job scheduler (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Serve the API without running scheduled jobs
        #[arg(long)]
        no_scheduler: bool,
    },
    /// Apply migrations/0001_init.sql and exit
    Migrate {
        #[arg(long, default_value = "migrations/0001_init.sql")]
        file: String,
    },
    /// Run a single job once and exit
    RunJob { name: String },
    /// Print registered jobs and their schedules
    ListJobs,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            host: None,
            port: None,
            no_scheduler: false,
        })
    }
}
