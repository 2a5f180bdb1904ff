//! rio-echo: a delimiter-framed TCP echo listener
//!
//! Accepts one connection at a time, accumulates plaintext until the
//! `<EOF>` terminator arrives (however the stream is chunked), echoes the
//! full message back, and closes the connection.
//!
//! Features:
//! - Team-number addressing via the roborio-<team>-frc.local mDNS convention
//! - Bounded message size and a per-read deadline
//! - Bounded concurrent sessions with strictly serialized accepts
//! - Configuration via CLI arguments or TOML file

mod addr;
mod buffer;
mod config;
mod protocol;
mod server;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let mut config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // A team number names the target by its mDNS hostname; the listener
    // core only ever takes the resolved literal.
    if let Some(team) = config.team {
        let hostname = addr::team_hostname(team);
        let ip = addr::resolve_host(&hostname).await?;
        info!(team, host = %hostname, ip = %ip, "Resolved team address");
        config.listen = ip.to_string();
    }

    info!(
        listen = %config.listen,
        port = config.port,
        max_sessions = config.max_sessions,
        max_message_size = config.max_message_size,
        read_timeout_secs = config.read_timeout.as_secs(),
        "Starting rio-echo listener"
    );

    let server = Server::new(config);
    server.run().await?;
    Ok(())
}
