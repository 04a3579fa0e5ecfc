use partyroom::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DEFAULT_BIND: &str = "0.0.0.0:4000";

/// Builds the server config from `PARTYROOM_*` variables read through
/// `var`. Unset or unparsable values keep their defaults.
fn config_from(var: impl Fn(&str) -> Option<String>) -> ServerConfig {
    let mut config = ServerConfig {
        bind_addr: DEFAULT_BIND.to_string(),
        ..ServerConfig::default()
    };
    if let Some(addr) = var("PARTYROOM_BIND") {
        config.bind_addr = addr;
    }
    if let Some(required) = var("PARTYROOM_REQUIRE_REJOIN_TOKEN") {
        config.require_rejoin_token = matches!(required.as_str(), "1" | "true");
    }
    let discussion = var("PARTYROOM_DISCUSSION_SECS")
        .and_then(|secs| secs.parse::<u64>().ok())
        .filter(|secs| *secs > 0);
    config.game = config.game.with_discussion_secs(discussion);
    config
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from(|key| std::env::var(key).ok());
    tracing::info!(
        addr = %config.bind_addr,
        rejoin_token = config.require_rejoin_token,
        discussion_secs = ?config.game.discussion_secs,
        "starting party server"
    );

    let server = PartyServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
