//! Run the HTTP service.

use crate::config::Settings;
use crate::server;
use anyhow::Result;
use tracing::info;

pub async fn run(host: &str, port: u16) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("defacewatch=info".parse().unwrap()),
        )
        .init();

    info!("starting defacewatch v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env()?;
    server::run(settings, host, port).await
}
