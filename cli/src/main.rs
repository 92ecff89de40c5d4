use std::path::PathBuf;

use aquatherm::config::ConfigError;
use aquatherm::resources::ResourceError;
use aquatherm::session::types::Record;
use aquatherm::{ApiEnvironment, AuthError, ClientConfig, SessionController, SessionState};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "aquatherm", about = "Aquatherm account and thermometer client")]
struct Cli {
    /// Use the local development API instead of production.
    #[arg(long, default_value_t = false)]
    local: bool,

    #[arg(long)]
    api_root: Option<String>,

    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session.
    Login {
        #[arg(long, env = "AQUATHERM_USERNAME")]
        username: String,
        #[arg(long, env = "AQUATHERM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out locally and invalidate the token.
    Logout,
    /// Print the stored session.
    Whoami,
    /// Re-fetch the current user and profile.
    Refresh,
    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AQUATHERM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Testimonials,
    Thermometers,
    Temperatures,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    tracing::debug!(api_root = %config.api_root, state_dir = %config.state_dir.display(), "client configured");

    let controller = SessionController::from_config(&config)?;
    let result = run(&controller, cli.command).await;
    controller.shutdown().await;
    result
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if cli.local {
        config.environment = ApiEnvironment::Local;
        config.api_root = ApiEnvironment::Local.api_root().to_owned();
    }
    if let Some(root) = &cli.api_root {
        config.api_root = format!("{}/", root.trim_end_matches('/'));
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir.clone_from(dir);
    }
    Ok(config)
}

async fn run(controller: &SessionController, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { username, password } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            let state = controller.login_with_cancel(&username, &password, &cancel).await?;
            print_json(&session_json(&state))
        }
        Command::Logout => {
            controller.logout().await;
            print_json(&session_json(&controller.state()))
        }
        Command::Whoami => print_json(&session_json(&controller.state())),
        Command::Refresh => {
            controller.refresh_user().await?;
            controller.refresh_profile().await?;
            print_json(&session_json(&controller.state()))
        }
        Command::Register { username, email, password } => {
            let user = controller.register(&username, &email, &password).await?;
            print_json(&user.into_value())
        }
        Command::Testimonials => print_records(controller.testimonials().await?),
        Command::Thermometers => print_records(controller.thermometers().await?),
        Command::Temperatures => print_records(controller.temperatures().await?),
    }
}

/// Session view without the token.
fn session_json(state: &SessionState) -> Value {
    json!({
        "loggedIn": state.logged_in(),
        "currentUser": state.current_user().fields(),
        "currentProfile": state.current_profile().fields(),
    })
}

fn print_records(records: Vec<Record>) -> Result<(), CliError> {
    let list: Vec<Value> = records.into_iter().map(Record::into_value).collect();
    print_json(&Value::Array(list))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
