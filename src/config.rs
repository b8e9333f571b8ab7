use serde::Deserialize;

/// Configuration of the prediction server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub train_data_path: String,
    pub test_data_path: String,
    pub artifact_path: String,
    /// Where missing dataset files are downloaded from, if set.
    pub dataset_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            train_data_path: path_var("TRAIN_DATA_PATH", "application_train.csv")?,
            test_data_path: path_var("TEST_DATA_PATH", "application_test.csv")?,
            artifact_path: path_var("ARTIFACT_PATH", "model.json")?,
            dataset_base_url: url_var("DATASET_BASE_URL")?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Train data: {}", config.train_data_path);
        tracing::debug!("Test data: {}", config.test_data_path);
        tracing::debug!("Artifact: {}", config.artifact_path);
        if let Some(ref base) = config.dataset_base_url {
            tracing::info!("Dataset download URL configured: {}", base);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Configuration of the `train` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    pub train_data_path: String,
    pub artifact_path: String,
    pub dataset_base_url: Option<String>,
    pub max_iter: usize,
    pub learning_rate: f64,
}

impl TrainingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            train_data_path: path_var("TRAIN_DATA_PATH", "application_train.csv")?,
            artifact_path: path_var("ARTIFACT_PATH", "model.json")?,
            dataset_base_url: url_var("DATASET_BASE_URL")?,
            max_iter: std::env::var("TRAIN_MAX_ITER")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TRAIN_MAX_ITER must be a positive integer"))
                .and_then(|n: usize| {
                    if n == 0 {
                        anyhow::bail!("TRAIN_MAX_ITER must be at least 1");
                    }
                    Ok(n)
                })?,
            learning_rate: std::env::var("TRAIN_LEARNING_RATE")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TRAIN_LEARNING_RATE must be a number"))
                .and_then(|lr: f64| {
                    if !(lr > 0.0 && lr.is_finite()) {
                        anyhow::bail!("TRAIN_LEARNING_RATE must be positive");
                    }
                    Ok(lr)
                })?,
        };

        tracing::info!("Training configuration loaded");
        tracing::debug!("{:?}", config);
        Ok(config)
    }
}

/// Configuration of the `score_client` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub predict_api_url: String,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let predict_api_url = std::env::var("PREDICT_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        if !predict_api_url.starts_with("http://") && !predict_api_url.starts_with("https://") {
            anyhow::bail!("PREDICT_API_URL must start with http:// or https://");
        }

        Ok(Self { predict_api_url })
    }
}

fn path_var(name: &str, default: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).unwrap_or_else(|_| default.to_string());
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

fn url_var(name: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(name).ok().filter(|s| !s.trim().is_empty()) {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            anyhow::bail!("{} must start with http:// or https://", name)
        }
        other => Ok(other),
    }
}
