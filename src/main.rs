/// Makers Community - community platform backend
///
/// Accounts with email verification, post reporting with automatic
/// moderation thresholds, reactions, and an admin dashboard.

mod account;
mod admin;
mod api;
mod config;
mod context;
mod db;
mod error;
mod mailer;
mod moderation;
mod notify;
mod posts;
mod rate_limit;
mod reactions;
mod server;
mod validation;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "makers_community=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    __  ___      __
   /  |/  /___ _/ /_____  __________
  / /|_/ / __ `/ //_/ _ \/ ___/ ___/
 / /  / / /_/ / ,< /  __/ /  (__  )
/_/  /_/\__,_/_/|_|\___/_/  /____/

        Makers Community backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
