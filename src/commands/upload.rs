//! Document upload command

use std::path::Path;

use colored::Colorize;

use crate::commands::chat::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Gateway, HttpGateway};

/// Upload a document through the gateway
///
/// The stored token, when present, authenticates the upload so the
/// backend can associate the document with the account.
pub async fn run_upload(config: &Config, file: &Path, session_id: Option<&str>) -> Result<()> {
    let store = open_store(config)?;

    let mut gateway = HttpGateway::new(&config.gateway)?;
    if let Some(token) = store.load_token()? {
        gateway = gateway.with_token(token);
    }

    println!("Uploading {}...", file.display());
    let ack = gateway.upload_document(file, session_id).await?;

    if ack.message.is_empty() {
        println!("{}", "Upload accepted.".green());
    } else {
        println!("{}", ack.message.green());
    }
    if let Some(document_id) = ack.document_id {
        println!("Document id: {}", document_id);
    }

    Ok(())
}
