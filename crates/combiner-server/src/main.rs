mod app;
mod page;

use anyhow::{Context, Result};
use combiner::{AssetType, Combiner, Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config_path = std::env::var("COMBINER_CONFIG").unwrap_or_else(|_| "combiner.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(path = %config_path, base_url = %config.base_url, "configuration loaded");

    let manifest = config
        .manifest()
        .context("Invalid file list in configuration")?;

    let combiner = Combiner::from_config(&config).await?;

    for asset_type in AssetType::ALL {
        let asset = combiner.asset_config(asset_type);
        if !asset.enabled {
            info!(%asset_type, "combiner disabled");
            continue;
        }

        if !asset.path.is_dir() {
            warn!(%asset_type, path = %asset.path.display(), "asset directory does not exist");
        }

        info!(
            %asset_type,
            route = asset.route(),
            files = manifest.files(asset_type).len(),
            url = %combiner.url(&manifest, asset_type),
            "combiner enabled"
        );
    }

    let app = app::build_app(combiner, manifest);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
