use docscan::config::Settings;
use docscan::context::AppContext;
use docscan::server;

use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr;

    // Context construction builds a blocking HTTP client, so it happens
    // before the async runtime starts.
    let context = AppContext::initialize(settings)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let app = server::router(context);
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!(addr = %bind_addr, "docscan listening");
        axum::serve(listener, app).await?;
        Ok(())
    })
}
