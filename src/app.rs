/*
 * Responsibility
 * - Parse the command line, install logging
 * - Load Config → build AppState (the single SessionService) → run the command
 * - Output formatting only; session behavior lives in the library
 */
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use task_session::config::Config;
use task_session::services::session::{MemorySessionStorage, token_codec};
use task_session::state::AppState;

/// Inspect tokens and drive a login/logout session against the task manager API.
#[derive(Parser, Debug)]
#[command(name = "task-session", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a token and print its claims and expiration (no network).
    Decode {
        #[arg(long)]
        token: String,
    },
    /// Log in, optionally call API paths with the session, optionally log out.
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// API path to GET with the session (relative to API_URL). Repeatable.
        #[arg(long = "get", value_name = "PATH")]
        get: Vec<String>,

        /// Log out before exiting.
        #[arg(long, default_value_t = false)]
        logout: bool,
    },
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Decode { token } => decode(&token),
        Command::Login {
            email,
            password,
            get,
            logout,
        } => {
            let config = Config::from_env()?;
            // Session storage lives as long as this process.
            let state = AppState::new(config, Arc::new(MemorySessionStorage::new()))?;
            login(&state, &email, &password, &get, logout).await
        }
    }
}

fn decode(token: &str) -> Result<()> {
    let claims = match token_codec::try_decode(token) {
        Ok(claims) => claims,
        Err(err) => bail!("token is not decodable: {err}"),
    };

    println!("{}", serde_json::to_string_pretty(claims.as_map())?);
    match token_codec::expires_at(token) {
        Some(at) => println!("expires_at: {}", at.to_rfc3339()),
        None => println!("expires_at: -"),
    }
    println!("expired: {}", token_codec::is_expired(token));
    Ok(())
}

async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    paths: &[String],
    logout: bool,
) -> Result<()> {
    let session = &state.session;

    if let Err(err) = session.login(email, password).await {
        bail!("{}", err.user_message());
    }

    println!("logged in as: {}", session.username());
    match session.expires_at() {
        Some(at) => println!("expires_at: {}", at.to_rfc3339()),
        None => println!("expires_at: -"),
    }
    println!("expired: {}", session.is_expired());

    for path in paths {
        let url = state.config.endpoint(path);
        match state.http.get(&url).await {
            Ok(response) => println!("GET {url} -> {}", response.status()),
            Err(err) => println!("GET {url} -> error: {err}"),
        }
    }

    if logout {
        if let Err(err) = session.logout().await {
            bail!("{}", err.user_message());
        }
        println!("logged out");
    }

    Ok(())
}
