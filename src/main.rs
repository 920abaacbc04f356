use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gfn_proxy::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gfn_proxy=info")),
        )
        .init();

    let config = Config::from_env();
    let addr = config.listen_addr();
    info!("forwarding to {}", config.target_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, gfn_proxy::app(config)).await?;
    Ok(())
}
