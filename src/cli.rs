//! Command-line interface definition for Mitra
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chat, history, authentication, document
//! upload, and connectivity checks.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mitra - conversational AI client
///
/// Chat with a remote assistant while keeping the full conversation
/// history durably on this machine.
#[derive(Parser, Debug, Clone)]
#[command(name = "mitra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the gateway base URL from config
    #[arg(long)]
    pub gateway: Option<String>,

    /// Override the session database path
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Mitra
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Resume a stored conversation by id
        #[arg(short, long)]
        resume: Option<String>,

        /// Enter guest mode (access without an account)
        #[arg(long)]
        guest: bool,
    },

    /// Manage conversation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Manage authentication
    Auth {
        /// Auth subcommand
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Upload a document for retrieval-augmented replies
    Upload {
        /// File to upload
        file: PathBuf,

        /// Associate the upload with a backend session id
        #[arg(long)]
        session: Option<String>,
    },

    /// Probe gateway connectivity
    Health,
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations (pinned above recent)
    List,

    /// Permanently delete a conversation
    Delete {
        /// Conversation id to delete
        id: String,
    },
}

/// Authentication subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Log in with an existing account
    Login {
        /// Account email
        email: String,
    },

    /// Create an account
    Register {
        /// Account email
        email: String,

        /// Display name
        username: String,
    },

    /// Clear the stored token and guest flag
    Logout,

    /// Show the current authentication state
    Status,

    /// Enable guest access without an account
    Guest,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
