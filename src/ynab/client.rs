use super::TransactionImporter;
use super::types::{ErrorResponse, SaveTransaction, SaveTransactionsRequest, SaveTransactionsResponse};
use crate::config::YnabConfig;
use crate::error::{AppError, Result};
use crate::models::Transaction;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct YnabClient {
    client: Client,
    api_key: String,
    api_url: Url,
    debug: bool,
}

impl YnabClient {
    pub fn new(config: &YnabConfig, api_key: &str, debug: bool) -> Result<Self> {
        let api_url = Url::parse(&config.api_url).map_err(|e| {
            AppError::Config(format!("Invalid YNAB api_url '{}': {}", config.api_url, e))
        })?;

        if api_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "Invalid YNAB api_url '{}'",
                config.api_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("ynab-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            api_url,
            debug,
        })
    }

    fn transactions_url(&self, budget_id: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("Invalid YNAB api_url '{}'", self.api_url)))?
            .pop_if_empty()
            .extend(["budgets", budget_id, "transactions"]);
        Ok(url)
    }
}

#[async_trait]
impl TransactionImporter for YnabClient {
    #[instrument(name = "Importing into YNAB", skip_all, fields(budget_id = %budget_id))]
    async fn import(&self, budget_id: &str, transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            debug!("Nothing to import");
            return Ok(());
        }

        let request = SaveTransactionsRequest {
            transactions: transactions
                .iter()
                .map(SaveTransaction::try_from)
                .collect::<Result<Vec<_>>>()?,
        };

        let response = self
            .client
            .post(self.transactions_url(budget_id)?)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(e) => format!("{} ({} {})", e.error.detail, e.error.id, e.error.name),
                Err(_) => body,
            };
            return Err(AppError::Import(format!(
                "Failed to create transactions: {} - {}",
                status, detail
            )));
        }

        let saved: SaveTransactionsResponse = response.json().await?;
        let duplicates = &saved.data.duplicate_import_ids;

        if !duplicates.is_empty() {
            warn!(
                count = duplicates.len(),
                "Skipped transactions that were already imported"
            );
            if self.debug {
                for import_id in duplicates {
                    info!(import_id = %import_id, "Duplicate import id");
                }
            }
        }

        debug!(created = saved.data.transaction_ids.len(), "YNAB accepted transactions");

        Ok(())
    }
}
