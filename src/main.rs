mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the redirect headers or JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = cli.settings.resolve()?;

    match cli.command {
        Command::Checkout {
            amount,
            currency,
            invoice_id,
            form,
        } => commands::cmd_checkout(
            &config,
            &amount,
            &currency,
            invoice_id.as_deref(),
            form.as_deref(),
            cli.json,
        ),
        Command::Process {
            order_id,
            invoice_id,
        } => commands::cmd_process(&config, order_id.as_deref(), invoice_id.as_deref(), cli.json),
        Command::Pending { invoice_id } => commands::cmd_pending(&config, &invoice_id, cli.json),
        Command::Purge => commands::cmd_purge(&config, cli.json),
    }
}
