use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use credit_risk_api::artifact::TrainedArtifact;
use credit_risk_api::config::Config;
use credit_risk_api::dataset::{ensure_downloaded, ClientDataset};
use credit_risk_api::handlers::{self, AppState};
use credit_risk_api::predictor::Predictor;
use credit_risk_api::stats::DatasetStatistics;

/// Main entry point for the prediction API.
///
/// Startup order is fixed: fetch missing dataset files, load the joined
/// dataset, load and verify the trained artifact, compute dashboard
/// statistics, then accept requests. Nothing loaded here is mutated later.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if let Some(ref base_url) = config.dataset_base_url {
        let client = reqwest::Client::new();
        for path in [&config.train_data_path, &config.test_data_path] {
            let path = Path::new(path);
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid dataset path {}", path.display()))?;
            ensure_downloaded(&client, base_url, file_name, path).await?;
        }
    }

    let (train_path, test_path) = (config.train_data_path.clone(), config.test_data_path.clone());
    let dataset =
        tokio::task::spawn_blocking(move || ClientDataset::load(&train_path, &test_path)).await??;
    tracing::info!("Client dataset loaded");

    let artifact = TrainedArtifact::load(&config.artifact_path)?;
    if let Some(auc) = artifact.metrics.roc_auc {
        tracing::info!("Serving model with validation ROC-AUC {:.4}", auc);
    }
    let predictor = Predictor::new(Arc::new(artifact));

    let stats = DatasetStatistics::compute(dataset.train_rows());

    let app_state = Arc::new(AppState {
        dataset,
        predictor,
        stats,
    });

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let app = handlers::router(app_state).layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
