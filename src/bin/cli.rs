//! Libris client CLI
//!
//! Command-line front end over the authenticated API client.

use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use libris_client::{
    config,
    error::{AppError, Result},
    models::{ApiRequest, Credentials},
    services::AuthService,
};
use reqwest::Method;

/// libris - Library management API client
#[derive(Parser, Debug)]
#[command(name = "libris", version, about = "Library management API client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "libris.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session tokens
    Login {
        #[arg(short, long)]
        username: String,
        /// Password; read from stdin when neither the flag nor the env var is set
        #[arg(short, long, env = "LIBRIS_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Revoke the session and clear stored tokens
    Logout,

    /// Show the signed-in user's profile
    Profile,

    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Path relative to the API base URL
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Show whether a session is stored
    Session,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_uppercase().as_bytes())
        .map_err(|_| AppError::validation(format!("Unknown HTTP method '{raw}'")))
}

/// Read the password from the first line of `input`.
fn read_password(mut input: impl BufRead) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(AppError::validation("No password given"));
    }
    Ok(password.to_string())
}

fn prompt_password() -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
    }
    read_password(stdin.lock())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = config::load_validated(&cli.config);
    let level = loaded
        .as_ref()
        .map_or("info", |config| config.logging.level.as_str());
    init_logging(cli.verbose, level);

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        let config = loaded.inspect_err(|e| log::error!("Config validation failed: {}", e))?;
        log::info!("✓ Config OK ({})", config.api.base_url);
        return Ok(());
    }

    let config = loaded?;
    let client = Arc::new(config::connect(&config).await?);
    let auth = AuthService::new(Arc::clone(&client), &config.api);

    let result = match cli.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };
            auth.login(&Credentials { username, password })
                .await
                .map(|_| log::info!("Login successful"))
        }

        Command::Logout => {
            auth.logout().await;
            Ok(())
        }

        Command::Profile => auth.profile().await.and_then(|profile| {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }),

        Command::Request { method, path, body } => {
            let mut request = ApiRequest::new(parse_method(&method)?, path);
            if let Some(raw) = body {
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                request = request.json(&value)?;
            }
            client.send(request).await.map(|response| {
                log::debug!("HTTP {}", response.status);
                println!("{}", response.text());
            })
        }

        Command::Session => {
            let store = client.store();
            log::info!("API: {}", client.base_url());
            log::info!(
                "Access token: {}",
                if store.access_token().await.is_some() { "present" } else { "absent" }
            );
            log::info!(
                "Refresh token: {}",
                if store.refresh_token().await.is_some() { "present" } else { "absent" }
            );
            Ok(())
        }

        Command::Validate => Ok(()),
    };

    if let Err(e) = &result {
        if e.requires_login() {
            log::error!("Session expired or invalid. Run 'libris login' again.");
        }
    }
    result
}
