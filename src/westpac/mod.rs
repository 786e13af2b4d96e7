mod exporter;

pub use exporter::WestpacExporter;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::PathBuf;

pub struct ExportRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub account_name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    pub file_path: PathBuf,
}

#[async_trait]
pub trait TransactionExporter {
    async fn export(&self, request: &ExportRequest<'_>) -> Result<ExportOutput>;
}
