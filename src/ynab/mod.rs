mod client;
pub mod types;

pub use client::YnabClient;

use crate::error::Result;
use crate::models::Transaction;
use async_trait::async_trait;

#[async_trait]
pub trait TransactionImporter {
    async fn import(&self, budget_id: &str, transactions: &[Transaction]) -> Result<()>;
}
