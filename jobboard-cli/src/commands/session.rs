use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use client::{StoredSession, TokenStoreError};
use rpassword::prompt_password;
use shared::{config::ClientConfig, models::LoginRequest};
use tracing::warn;

use super::{anonymous_client, failed, or_dash, token_store};

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Sign in and save the bearer token
    Login(LoginArgs),
    /// Revoke the token on the server and forget it locally
    Logout,
    /// Show who the saved session belongs to
    Whoami,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email; prompted for when omitted
    #[arg(long, short)]
    pub email: Option<String>,
}

pub async fn run(command: SessionCommand, config: &ClientConfig) -> Result<()> {
    match command {
        SessionCommand::Login(args) => login(args, config).await,
        SessionCommand::Logout => logout(config).await,
        SessionCommand::Whoami => whoami(),
    }
}

async fn login(args: LoginArgs, config: &ClientConfig) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if email.trim().is_empty() {
        bail!("email must not be empty");
    }
    let password = prompt_password("Password: ")?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }

    let client = anonymous_client(config)?;
    let response = client
        .login(&LoginRequest {
            email: email.trim().to_string(),
            password,
        })
        .await
        .map_err(failed("signing in"))?;

    let store = token_store();
    let session = StoredSession::new(response.token, &response.user);
    store.save(&session).context("failed to save the session")?;

    println!(
        "Signed in as {} <{}> ({})",
        response.user.name, response.user.email, response.user.role
    );
    println!("Session saved to {}", store.path().display());
    Ok(())
}

async fn logout(config: &ClientConfig) -> Result<()> {
    let store = token_store();
    match store.load() {
        Ok(session) => {
            let client = anonymous_client(config)?.with_token(Some(session.token));
            if let Err(err) = client.logout().await {
                warn!(error = %err, "logout request failed; forgetting the token anyway");
            }
        }
        Err(TokenStoreError::Missing(_)) => {}
        Err(err) => warn!(error = %err, "saved session is unreadable"),
    }

    if store.clear().context("failed to remove the saved session")? {
        println!("Removed session at {}", store.path().display());
    } else {
        println!("No session found at {}", store.path().display());
    }
    Ok(())
}

fn whoami() -> Result<()> {
    let store = token_store();
    let session = super::require_session(&store)?;
    println!("user id: {}", session.user_id);
    println!("email:   {}", or_dash(session.email.as_deref()));
    println!(
        "role:    {}",
        session.role.map_or_else(|| "-".to_string(), |role| role.to_string())
    );
    println!("file:    {}", store.path().display());
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().ok();
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
