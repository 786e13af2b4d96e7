use crate::error::AppError;
use crate::models::Transaction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const PAYEE_NAME_MAX_CHARS: usize = 50;
const MEMO_MAX_CHARS: usize = 200;

#[derive(Debug, Serialize)]
pub(super) struct SaveTransactionsRequest<'a> {
    pub(super) transactions: Vec<SaveTransaction<'a>>,
}

// https://api.ynab.com/v1#/Transactions/createTransaction
#[derive(Debug, Serialize, PartialEq)]
pub struct SaveTransaction<'a> {
    pub account_id: &'a str,
    pub date: NaiveDate,
    /// Milliunits
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub cleared: ClearedStatus,
    pub approved: bool,
    pub import_id: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ClearedStatus {
    Cleared,
}

impl<'a> TryFrom<&'a Transaction> for SaveTransaction<'a> {
    type Error = AppError;

    fn try_from(t: &'a Transaction) -> Result<Self, Self::Error> {
        let amount = t.milliunits().ok_or_else(|| {
            AppError::Import(format!("Amount {} is out of range for YNAB", t.amount))
        })?;

        Ok(SaveTransaction {
            account_id: &t.account_id,
            date: t.date,
            amount,
            payee_name: t.payee.as_deref().map(|p| truncate(p, PAYEE_NAME_MAX_CHARS)),
            memo: t.memo.as_deref().map(|m| truncate(m, MEMO_MAX_CHARS)),
            // Statement lines have already cleared the bank
            cleared: ClearedStatus::Cleared,
            approved: false,
            import_id: &t.import_id,
        })
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
pub(super) struct SaveTransactionsResponse {
    pub(super) data: SaveTransactionsData,
}

#[derive(Debug, Deserialize)]
pub struct SaveTransactionsData {
    #[serde(default)]
    pub transaction_ids: Vec<String>,
    #[serde(default)]
    pub duplicate_import_ids: Vec<String>,
}

// https://api.ynab.com/#errors
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub(super) error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    pub(super) id: String,
    pub(super) name: String,
    #[serde(default)]
    pub(super) detail: String,
}
