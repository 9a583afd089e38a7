use std::net::SocketAddr;
use std::path::PathBuf;

use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use split_ledger_backend::rest::{create_router, AppState};
use split_ledger_backend::Backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_directory = std::env::var("SPLIT_LEDGER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data"));
    info!("Using data directory {}", data_directory.display());

    let backend = Backend::new(&data_directory)?;
    let state = AppState::new(&backend);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
