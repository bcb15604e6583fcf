//! Conversation history commands

use colored::Colorize;
use prettytable::{format, Table};

use crate::cli::HistoryCommand;
use crate::commands::chat::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::session::Conversation;

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let store = open_store(config)?;

    match command {
        HistoryCommand::List => {
            let partition = store.partition()?;

            if partition.pinned.is_empty() && partition.recent.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            if !partition.pinned.is_empty() {
                println!("\nPinned:");
                print_table(&partition.pinned);
            }

            if !partition.recent.is_empty() {
                println!("\nRecent:");
                print_table(&partition.recent);
            }

            println!();
            println!(
                "Use {} to resume a conversation.",
                "mitra chat --resume <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Delete { id } => {
            // Idempotent at the store level; report what was asked for.
            store.remove(&id)?;
            println!("{}", format!("Deleted conversation {}", id).green());
        }
    }

    Ok(())
}

fn print_table(conversations: &[Conversation]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Starred".bold(),
        "Last Updated".bold()
    ]);

    for conversation in conversations {
        let id_short = &conversation.id[..8.min(conversation.id.len())];
        let title = if conversation.title.chars().count() > 40 {
            let head: String = conversation.title.chars().take(37).collect();
            format!("{}...", head)
        } else if conversation.title.is_empty() {
            "(untitled)".to_string()
        } else {
            conversation.title.clone()
        };
        let starred = if conversation.starred { "yes" } else { "" };
        let updated = conversation.updated_at.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            id_short.cyan(),
            title,
            conversation.messages.len(),
            starred,
            updated
        ]);
    }

    table.printstd();
}
