use tokio::net::TcpListener;
use tracing::info;
use travelog::config::AppConfig;
use travelog::error::AppError;
use travelog::routes::create_router;
use travelog::services::{storage::StorageService, uploads::UploadService};
use travelog::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let storage = StorageService::new(config.data_root.clone());
    storage.ensure_structure().await?;

    let uploads = UploadService::new(config.uploads_dir());
    tokio::fs::create_dir_all(uploads.dir()).await?;

    let state = AppState::new(config.clone(), storage, uploads);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,travelog=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
