//! Gateway connectivity probe

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Gateway, HttpGateway};

/// Probe the gateway and report its status
pub async fn run_health(config: &Config) -> Result<()> {
    let gateway = HttpGateway::new(&config.gateway)?;

    match gateway.check_health().await {
        Ok(health) => {
            let status = if health.status == "healthy" {
                health.status.green()
            } else {
                health.status.yellow()
            };
            match health.version {
                Some(version) => println!("Gateway status: {} (version {})", status, version),
                None => println!("Gateway status: {}", status),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format!("Gateway unreachable: {}", e).red());
            Err(e)
        }
    }
}
