//! Training entrypoint: fits the scaler and classifier on the labelled
//! application file and writes the checksummed artifact.

use std::path::Path;

use credit_risk_api::config::TrainingConfig;
use credit_risk_api::dataset::{ensure_downloaded, read_rows_from_path};
use credit_risk_api::training::{train, TrainingOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_risk_api=info,train=info".into()),
        )
        .init();

    let config = TrainingConfig::from_env()?;

    let train_path = Path::new(&config.train_data_path);
    if let Some(ref base_url) = config.dataset_base_url {
        let file_name = train_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("invalid dataset path {}", train_path.display()))?;
        ensure_downloaded(&reqwest::Client::new(), base_url, file_name, train_path).await?;
    }

    let rows = read_rows_from_path(train_path)?;

    let options = TrainingOptions {
        max_iter: config.max_iter,
        learning_rate: config.learning_rate,
        ..TrainingOptions::default()
    };
    let artifact = train(&rows, &options)?;

    println!(
        "Trained on {} rows, validated on {} rows",
        artifact.metrics.train_rows, artifact.metrics.validation_rows
    );
    match artifact.metrics.roc_auc {
        Some(auc) => println!("Model ROC-AUC Score: {:.4}", auc),
        None => println!("Model ROC-AUC Score: undefined (single-class validation split)"),
    }

    artifact.save(&config.artifact_path)?;
    println!("✓ Artifact written to {}", config.artifact_path);

    Ok(())
}
