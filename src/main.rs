use startpage::{create_router, AppContext, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let addr = format!("0.0.0.0:{}", config.server_port);

    let context = AppContext::new(config);
    let store = context.store.clone();

    // Connect eagerly so a bad DATABASE_URL fails at startup.
    if let Err(e) = store.open().await {
        tracing::error!("Failed to open link store: {}", e);
        std::process::exit(1);
    }

    let app = create_router(context);

    tracing::info!(
        "Starting startpage {} on {}",
        startpage::version::display(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    store.shutdown().await;
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
