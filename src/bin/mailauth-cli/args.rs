use std::time::Duration;

use clap::{Parser, Subcommand};
use mailauth_check::ValidationOptions;

#[derive(Parser)]
#[command(name = "mailauth-cli", about = "Check SPF and DMARC records")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human", global = true)]
    pub format: String,

    /// write report to file (JSON/NDJSON/CSV per --format)
    #[arg(long, global = true)]
    pub out: Option<String>,

    /// maximum DNS-consuming SPF terms per resolution tree
    #[arg(long, default_value_t = ValidationOptions::DEFAULT_LOOKUP_BUDGET, global = true)]
    pub budget: usize,

    /// per-query DNS timeout (ms)
    #[arg(long = "timeout-ms", default_value_t = 3_000, global = true)]
    pub timeout_ms: u64,

    /// overall deadline per record (ms), 0 disables it
    #[arg(long = "deadline-ms", default_value_t = 0, global = true)]
    pub deadline_ms: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// validate an SPF record as published at --domain
    Spf {
        record: String,
        #[arg(long)]
        domain: String,
    },
    /// validate a DMARC record published for --domain
    Dmarc {
        record: String,
        #[arg(long)]
        domain: String,
    },
    /// look up and validate the SPF and DMARC records of domains
    Domain {
        domains: Vec<String>,
        /// read domains from stdin (one per line)
        #[arg(long)]
        stdin: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn validation_options(&self) -> ValidationOptions {
        let options = ValidationOptions::new().with_lookup_budget(self.budget);
        if self.deadline_ms == 0 {
            options
        } else {
            options.with_deadline(Duration::from_millis(self.deadline_ms))
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
