//! Binary entry point for the Rigger CLI.

use std::error::Error as _;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use rigger::{
    AzureClient, AzureClientError, AzureConfig, AzureCredentials, ConfigError, DeploymentConfig,
    ProvisionError, Provisioner,
};

mod cli;

use cli::{Cli, Mode};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(AzureClientError),
    #[error(transparent)]
    Provision(#[from] ProvisionError<AzureClientError>),
}

#[tokio::main]
async fn main() {
    let mode = Cli::try_parse().map_or(Mode::Ignore, |cli| cli.mode());
    if mode == Mode::Ignore {
        return;
    }

    init_logging();
    let exit_code = match dispatch(mode).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(mode: Mode) -> Result<(), CliError> {
    match mode {
        Mode::Create => create().await,
        Mode::Delete => delete().await,
        Mode::Ignore => Ok(()),
    }
}

async fn connect() -> Result<AzureClient, CliError> {
    let azure = AzureConfig::load_without_cli_args()?;
    let path = azure.credentials_path()?;
    tracing::info!(auth_location = %path, "loading credentials");
    let credentials = AzureCredentials::from_file(&path).map_err(CliError::Auth)?;
    let client = AzureClient::connect(&credentials)
        .await
        .map_err(CliError::Auth)?;
    Ok(client
        .with_poll_interval(azure.poll_interval())
        .with_operation_timeout(azure.operation_timeout()))
}

async fn create() -> Result<(), CliError> {
    let blueprint = DeploymentConfig::load_without_cli_args()?.as_blueprint()?;
    let provisioner = Provisioner::new(connect().await?);
    let deployment = provisioner.create_and_stop(&blueprint).await?;
    tracing::info!(
        machine = %deployment.virtual_machine.name,
        created = deployment.created.len(),
        "deployment ready and stopped"
    );
    Ok(())
}

async fn delete() -> Result<(), CliError> {
    let config = DeploymentConfig::load_without_cli_args()?;
    let group = config.teardown_group()?;
    let provisioner = Provisioner::new(connect().await?);
    provisioner.delete_group(group).await?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
    let mut source = err.source();
    while let Some(cause) = source {
        writeln!(target, "  caused by: {cause}").ok();
        source = cause.source();
    }
}
