//! Authentication commands
//!
//! Thin handlers over [`AuthSession`]: exchange credentials for a token
//! through the gateway, inspect the current state, or clear it. The
//! decoded identity shown here is a local hint; the backend remains the
//! authority on validity.

use std::sync::Arc;

use colored::Colorize;
use rustyline::DefaultEditor;

use crate::auth::{AuthSession, AuthState};
use crate::cli::AuthCommand;
use crate::commands::chat::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::HttpGateway;

/// Handle auth commands
pub async fn handle_auth(config: &Config, command: AuthCommand) -> Result<()> {
    let store = Arc::new(open_store(config)?);
    let mut auth = AuthSession::new(store);
    let gateway = HttpGateway::new(&config.gateway)?;

    match command {
        AuthCommand::Login { email } => {
            let password = prompt_password()?;
            auth.login(&gateway, &email, &password).await?;
            print_identity(&auth);
        }
        AuthCommand::Register { email, username } => {
            let password = prompt_password()?;
            auth.register(&gateway, &email, &username, &password).await?;
            print_identity(&auth);
        }
        AuthCommand::Logout => {
            auth.logout()?;
            println!("{}", "Signed out.".green());
        }
        AuthCommand::Status => {
            if let Err(e) = auth.load() {
                eprintln!("{}", format!("Stored session was reset: {}", e).yellow());
            }
            match auth.state() {
                AuthState::Authenticated(claims) => {
                    println!(
                        "Signed in as {} <{}> (token expires {})",
                        claims.name.cyan(),
                        claims.email,
                        claims.expires_at().format("%Y-%m-%d %H:%M UTC")
                    );
                }
                AuthState::Guest => println!("Guest mode."),
                AuthState::Unauthenticated | AuthState::Expired => {
                    println!("{}", "Not signed in.".yellow())
                }
            }
        }
        AuthCommand::Guest => {
            auth.enter_guest_mode()?;
            println!("{}", "Guest mode enabled.".green());
        }
    }

    Ok(())
}

fn prompt_password() -> Result<String> {
    let mut rl = DefaultEditor::new()?;
    let password = rl.readline("password: ")?;
    Ok(password)
}

fn print_identity(auth: &AuthSession) {
    if let Some(claims) = auth.claims() {
        println!("{}", format!("Signed in as {}", claims.name).green());
    }
}
