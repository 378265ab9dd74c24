//! pairquest game server.
//!
//! ```text
//! pairquest-server --bind 0.0.0.0:4001 --http-bind 0.0.0.0:4002 \
//!     --app-url https://memory.example --redis-url redis://127.0.0.1/
//! ```

use std::time::Duration;

use clap::Parser;
use pairquest::prelude::*;

/// Command-line arguments. Every flag can also be set from the environment.
#[derive(Parser, Debug)]
#[command(name = "pairquest-server", about = "Real-time backend for the multiplayer memory game")]
struct Args {
    /// WebSocket listen address.
    #[arg(long, env = "PAIRQUEST_BIND", default_value = "0.0.0.0:4001")]
    bind: String,

    /// HTTP info/health listen address. Pass an empty string to disable.
    #[arg(long, env = "PAIRQUEST_HTTP_BIND", default_value = "0.0.0.0:4002")]
    http_bind: String,

    /// Link to the game client shown on the info page.
    #[arg(long, env = "APP_URL", default_value = "#")]
    app_url: String,

    /// Redis URL for room records and counters. In-memory when absent.
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` overrides.
    #[arg(long, env = "PAIRQUEST_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Evict rooms with no activity for this many seconds.
    #[arg(long, env = "PAIRQUEST_IDLE_TIMEOUT_SECS", default_value_t = 1800)]
    idle_timeout_secs: u64,

    /// Only the turn holder may flip tiles.
    #[arg(long)]
    enforce_turns: bool,

    /// Only the host may start or restart a game.
    #[arg(long)]
    host_only_controls: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig {
            bind_addr: self.bind.clone(),
            http_addr: Some(self.http_bind.clone()).filter(|addr| !addr.is_empty()),
            app_url: self.app_url.clone(),
            idle_room_timeout: Duration::from_secs(self.idle_timeout_secs),
            ..ServerConfig::default()
        };
        config.rules.enforce_turns = self.enforce_turns;
        config.rules.host_only_controls = self.host_only_controls;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), PairQuestError> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json)?;
    let config = args.server_config();

    match args.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => serve(config, RedisStore::connect(url).await?).await,
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!("built without the redis feature, using the in-memory store");
            serve(config, MemoryStore::new()).await
        }
        None => serve(config, MemoryStore::new()).await,
    }
}

async fn serve<S: KeyValueStore>(config: ServerConfig, store: S) -> Result<(), PairQuestError> {
    let server = PairQuestServerBuilder::new()
        .config(config)
        .build(store)
        .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    }
}
