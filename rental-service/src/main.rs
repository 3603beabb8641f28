use anyhow::Context;
use rental_service::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    init_tracing(&config);

    let state = AppState::<PgListingStore>::connect(config.clone())
        .await
        .context("connecting to the listings database")?;
    let shutdown = state.shutdown_token().clone();

    let served = Server::new(config)
        .serve(router(state.clone()), shutdown)
        .await;

    state.close().await;
    tracing::info!("Database pool closed");

    served.context("serving HTTP")
}
