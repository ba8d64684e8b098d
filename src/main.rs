mod cli;
mod error;
mod identity;
mod output;
mod vault;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::identity::IamLoginData;
use crate::output::OutputMode;
use crate::vault::VaultClient;

#[tokio::main]
pub async fn main() -> ExitCode {
    init_tracing();

    let cli = cli::Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}

/// Writes the fatal error to `out` regardless of the log filter.
fn report_failure<W: Write>(err: &anyhow::Error, out: &mut W) {
    let _ = writeln!(out, "Error: {err:#}");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = cli.vault_config()?;

    let login_data =
        identity::build_login_data(&cli.region, &cli.host, cli.sts_regional_endpoints)
            .await
            .context("failed to build AWS IAM login data")?;

    let client = VaultClient::new(config);
    exchange(
        &client,
        &cli.role,
        &login_data,
        OutputMode::from_flag(cli.only_token),
        &mut std::io::stdout(),
    )
    .await
}

/// Logs in to Vault and writes the rendered result to `out`.
/// Nothing is written unless the whole exchange succeeds.
async fn exchange<W: Write>(
    client: &VaultClient,
    role: &str,
    login_data: &IamLoginData,
    mode: OutputMode,
    out: &mut W,
) -> anyhow::Result<()> {
    let reply = client
        .login(role, login_data)
        .await
        .context("Vault login request failed")?;

    let rendered = output::render(&reply, mode).context("failed to read Vault login response")?;

    writeln!(out, "{rendered}")?;
    out.flush()?;
    Ok(())
}
