mod parser;

pub use parser::OfxParser;

use crate::error::Result;
use crate::models::Transaction;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait TransactionParser {
    /// Read a statement file into transactions for `account_id`, in file order.
    async fn parse(&self, account_id: &str, file_path: &Path) -> Result<Vec<Transaction>>;
}
