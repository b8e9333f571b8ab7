//! Dashboard-side client: requests a prediction for one client and prints
//! the overview, or prints the overall dataset statistics.
//!
//! Usage: `score_client <SK_ID_CURR>` or `score_client --stats`

use credit_risk_api::config::ClientConfig;
use credit_risk_api::errors::AppError;
use credit_risk_api::scoring_client::ScoringClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?;
    let client = ScoringClient::new(config.predict_api_url)?;

    let arg = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: score_client <SK_ID_CURR> | --stats"))?;

    if arg == "--stats" {
        let stats = client.statistics().await?;
        println!("=== Overall Dataset Statistics ===\n");
        println!("Rows: {}", stats.total_rows);
        println!(
            "Default rate: {:.2}% default, {:.2}% no default",
            stats.default_rate.default * 100.0,
            stats.default_rate.no_default * 100.0
        );
        for (gender, count) in &stats.gender_distribution {
            println!("Gender {}: {}", gender, count);
        }
        return Ok(());
    }

    let client_id: i64 = arg
        .parse()
        .map_err(|_| anyhow::anyhow!("client id must be an integer, got '{}'", arg))?;

    match client.client_overview(client_id).await {
        Ok(overview) => {
            println!("=== Client Overview: {} ===\n", overview.client_id);
            println!("Prediction: {}", overview.result.prediction);
            println!("Prediction Probability: {:?}", overview.result.probability);
            if !overview.result.zero_filled_features.is_empty() {
                println!(
                    "Warning: zero-filled features {:?}",
                    overview.result.zero_filled_features
                );
            }
            if let Some(credit) = overview.amt_credit {
                println!("Credit amount: {:.2}", credit);
            }
            if let Some(income) = overview.amt_income_total {
                println!("Income: {:.2}", income);
            }
            if let Some(gender) = overview.code_gender {
                println!("Gender: {}", gender);
            }
        }
        Err(AppError::NotFound(msg)) | Err(AppError::PredictionExhausted(msg)) => {
            println!("Error: {}", msg);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
