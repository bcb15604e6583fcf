/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    — interactive chat session
- `history` — list and delete stored conversations
- `auth`    — login, register, logout, status, guest mode
- `upload`  — send a document to the gateway
- `health`  — gateway connectivity probe

These handlers are intentionally small and use the library components:
the session store, the conversation engine, and the gateway client.
*/

pub mod auth;
pub mod chat;
pub mod health;
pub mod history;
pub mod upload;
