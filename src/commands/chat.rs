//! Interactive chat session handler
//!
//! Runs a readline-based loop that submits user input to the
//! conversation engine and renders formatted replies. Slash commands
//! manage conversations without leaving the session.
//!
//! The loop reads the next line only after the previous turn settled,
//! which enforces the one-turn-at-a-time rule at the input boundary.

use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::auth::{AuthSession, Route};
use crate::config::Config;
use crate::engine::ConversationEngine;
use crate::error::Result;
use crate::format::Node;
use crate::gateway::HttpGateway;
use crate::session::SessionStore;

/// A slash command entered at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    /// Start a new conversation
    New,
    /// List stored conversations
    List,
    /// Load a stored conversation by id
    Load(String),
    /// Toggle the pinned flag of a conversation
    Pin(String),
    /// Toggle the starred flag of a conversation
    Star(String),
    /// Delete a conversation permanently
    Delete(String),
    /// Show available commands
    Help,
    /// Leave the session
    Quit,
    /// Not a slash command; treat as a message
    None,
}

fn parse_slash_command(input: &str) -> SlashCommand {
    let mut parts = input.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let arg = parts.next().map(|s| s.to_string());

    match (head, arg) {
        ("/new", None) => SlashCommand::New,
        ("/list", None) => SlashCommand::List,
        ("/load", Some(id)) => SlashCommand::Load(id),
        ("/pin", Some(id)) => SlashCommand::Pin(id),
        ("/star", Some(id)) => SlashCommand::Star(id),
        ("/delete", Some(id)) => SlashCommand::Delete(id),
        ("/help", None) => SlashCommand::Help,
        ("/quit", None) | ("/exit", None) => SlashCommand::Quit,
        _ => SlashCommand::None,
    }
}

/// Start an interactive chat session
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `resume` - Optional conversation id to resume
/// * `guest` - Enter guest mode before the access check
pub async fn run_chat(config: Config, resume: Option<String>, guest: bool) -> Result<()> {
    tracing::info!("Starting interactive chat session");

    let store = Arc::new(open_store(&config)?);
    let mut auth = AuthSession::new(store.clone());

    if let Err(e) = auth.load() {
        eprintln!("{}", format!("Stored session was reset: {}", e).yellow());
    }

    if guest && !auth.state().grants_access() {
        auth.enter_guest_mode()?;
    }

    // Route guard: an unauthenticated session is sent to the auth
    // entry flow instead of the chat view.
    if auth.redirect(Route::Chat) == Some(Route::Login) {
        println!(
            "{}",
            "Not signed in. Run `mitra auth login <email>` or `mitra chat --guest`.".yellow()
        );
        return Ok(());
    }

    let mut gateway = HttpGateway::new(&config.gateway)?;
    if let Some(token) = store.load_token()? {
        gateway = gateway.with_token(token);
    }
    let gateway = Arc::new(gateway);

    let mut engine =
        ConversationEngine::new(gateway, store.clone(), config.chat.max_message_length);

    if let Some(id) = resume {
        if engine.load_conversation(&id)? {
            println!("Resumed {}\n", engine.active().title.cyan());
        } else {
            println!("{}", format!("Conversation {} not found", id).yellow());
        }
    }

    print_welcome(&auth);

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed)?;

                match parse_slash_command(trimmed) {
                    SlashCommand::New => {
                        engine.start_new_conversation();
                        println!("Started a new conversation\n");
                        continue;
                    }
                    SlashCommand::List => {
                        print_conversation_list(&store)?;
                        continue;
                    }
                    SlashCommand::Load(id) => {
                        if engine.load_conversation(&id)? {
                            println!("Loaded {}\n", engine.active().title.cyan());
                        } else {
                            println!("{}", format!("Conversation {} not found", id).yellow());
                        }
                        continue;
                    }
                    SlashCommand::Pin(id) => {
                        match engine.toggle_pinned(&id)? {
                            Some(pinned) => {
                                println!("{} {}\n", id, if pinned { "pinned" } else { "unpinned" })
                            }
                            None => println!("{}", format!("Conversation {} not found", id).yellow()),
                        }
                        continue;
                    }
                    SlashCommand::Star(id) => {
                        match engine.toggle_starred(&id)? {
                            Some(starred) => println!(
                                "{} {}\n",
                                id,
                                if starred { "starred" } else { "unstarred" }
                            ),
                            None => println!("{}", format!("Conversation {} not found", id).yellow()),
                        }
                        continue;
                    }
                    SlashCommand::Delete(id) => {
                        engine.delete_conversation(&id)?;
                        println!("Deleted {}\n", id);
                        continue;
                    }
                    SlashCommand::Help => {
                        print_help();
                        continue;
                    }
                    SlashCommand::Quit => break,
                    SlashCommand::None => {}
                }

                match engine.send_message(trimmed).await {
                    Ok(outcome) => {
                        println!("\n{}\n", render_nodes(&outcome.rendered));
                        if let Some(sources) = &outcome.reply.sources {
                            println!("{}\n", format!("Sources: {}", sources.join(", ")).dimmed());
                        }
                    }
                    Err(e) => {
                        // The message stays in the buffer; only this turn failed.
                        eprintln!("{}\n", format!("{}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Open the session store honoring the configured path override
pub fn open_store(config: &Config) -> Result<SessionStore> {
    match &config.storage.path {
        Some(path) => SessionStore::new_with_path(path),
        None => SessionStore::new(),
    }
}

fn print_welcome(auth: &AuthSession) {
    let who = auth
        .claims()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "guest".to_string());
    println!("\nMitra chat — signed in as {}", who.cyan());
    println!("Type '/help' for commands, '/quit' to leave\n");
}

fn print_help() {
    println!("Commands:");
    println!("  /new           start a new conversation");
    println!("  /list          list stored conversations");
    println!("  /load <id>     resume a stored conversation");
    println!("  /pin <id>      toggle pinned");
    println!("  /star <id>     toggle starred");
    println!("  /delete <id>   delete permanently");
    println!("  /quit          leave the session\n");
}

fn print_conversation_list(store: &SessionStore) -> Result<()> {
    let partition = store.partition()?;

    if partition.pinned.is_empty() && partition.recent.is_empty() {
        println!("{}", "No conversations yet.".yellow());
        return Ok(());
    }

    for conversation in &partition.pinned {
        println!(
            "  {} {} {}",
            "*".cyan(),
            &conversation.id[..8],
            conversation.title
        );
    }
    for conversation in &partition.recent {
        println!("    {} {}", &conversation.id[..8], conversation.title);
    }
    println!();
    Ok(())
}

/// Render formatted nodes to terminal text
///
/// The node list is trusted as-is; no markup re-interpretation happens
/// here. Escaped entities are unescaped for display since the terminal
/// has no markup to protect against.
fn render_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();

    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&unescape(text)),
            Node::Bold(text) => out.push_str(&unescape(text).bold().to_string()),
            Node::Italic(text) => out.push_str(&unescape(text).italic().to_string()),
            Node::InlineCode(code) => out.push_str(&unescape(code).yellow().to_string()),
            Node::CodeBlock { language, code } => {
                out.push('\n');
                out.push_str(&format!("[{}]\n", language).dimmed().to_string());
                out.push_str(&unescape(code).dimmed().to_string());
                out.push('\n');
            }
            Node::Break => out.push('\n'),
        }
    }

    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(parse_slash_command("/new"), SlashCommand::New);
        assert_eq!(parse_slash_command("/list"), SlashCommand::List);
        assert_eq!(
            parse_slash_command("/load 01ARZ3"),
            SlashCommand::Load("01ARZ3".to_string())
        );
        assert_eq!(
            parse_slash_command("/pin abc"),
            SlashCommand::Pin("abc".to_string())
        );
        assert_eq!(
            parse_slash_command("/delete abc"),
            SlashCommand::Delete("abc".to_string())
        );
        assert_eq!(parse_slash_command("/quit"), SlashCommand::Quit);
        assert_eq!(parse_slash_command("/exit"), SlashCommand::Quit);
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("hello there"), SlashCommand::None);
        assert_eq!(parse_slash_command("/load"), SlashCommand::None);
        assert_eq!(parse_slash_command("/unknown"), SlashCommand::None);
    }

    #[test]
    fn test_render_plain_nodes() {
        colored::control::set_override(false);
        let nodes = vec![
            Node::Text("a".to_string()),
            Node::Break,
            Node::Text("b".to_string()),
        ];
        assert_eq!(render_nodes(&nodes), "a\nb");
    }

    #[test]
    fn test_render_unescapes_entities() {
        colored::control::set_override(false);
        let nodes = vec![Node::Text("a &lt; b &amp; c".to_string())];
        assert_eq!(render_nodes(&nodes), "a < b & c");
    }

    #[test]
    fn test_render_code_block() {
        colored::control::set_override(false);
        let nodes = vec![Node::CodeBlock {
            language: "rust".to_string(),
            code: "let x = 1;".to_string(),
        }];
        assert_eq!(render_nodes(&nodes), "\n[rust]\nlet x = 1;\n");
    }
}
