use tracing_subscriber::EnvFilter;
use typerace::{ServerBuilder, TyperaceError};

#[tokio::main]
async fn main() -> Result<(), TyperaceError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let server = ServerBuilder::new()
        .bind(&format!("{host}:{port}"))
        .build()
        .await?;

    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "ready"),
        Err(e) => tracing::warn!(error = %e, "could not read local address"),
    }
    server.run().await
}
