use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use mailauth_check::{SystemResolver, check_domain, validate_dmarc_with_options, validate_spf_with_options};
use tracing_subscriber::EnvFilter;

#[path = "mailauth-cli/args.rs"]
mod args;
#[path = "mailauth-cli/output.rs"]
mod output;

use args::{Cli, Commands};
use output::Row;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let resolver =
        SystemResolver::with_timeout(cli.query_timeout()).context("initialize DNS resolver")?;
    let options = cli.validation_options();

    let rows = match &cli.cmd {
        Commands::Spf { record, domain } => {
            let result = validate_spf_with_options(&resolver, record, domain, &options);
            vec![Row::new(domain, "spf", Some(record.clone()), result)]
        }
        Commands::Dmarc { record, domain } => {
            let result = validate_dmarc_with_options(&resolver, record, domain, &options);
            vec![Row::new(domain, "dmarc", Some(record.clone()), result)]
        }
        Commands::Domain { domains, stdin } => {
            let mut targets = domains.clone();
            if *stdin {
                for line in io::stdin().lock().lines() {
                    let line = line.context("read stdin")?;
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        targets.push(trimmed.to_string());
                    }
                }
            }
            if targets.is_empty() {
                bail!("no domain given (pass domains as arguments or use --stdin)");
            }
            targets
                .iter()
                .flat_map(|domain| Row::from_report(check_domain(&resolver, domain, &options)))
                .collect()
        }
    };

    output::emit(&rows, &cli.format, cli.out.as_deref())?;

    // exit codes: 0 valid, 2 invalid records, 1 fatal
    if rows.iter().any(|row| !row.result.status) {
        std::process::exit(2);
    }
    Ok(())
}
