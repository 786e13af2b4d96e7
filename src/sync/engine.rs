use crate::error::{AppError, Result};
use crate::ofx::TransactionParser;
use crate::sync::{DateRange, SyncParameters};
use crate::westpac::{ExportRequest, TransactionExporter};
use crate::ynab::TransactionImporter;
use chrono::{Local, NaiveDate};
use indicatif::ProgressStyle;
use std::path::PathBuf;
use tracing::{Span, info, instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const STEPS: u64 = 3;
const DISPLAY_DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub range: DateRange,
    pub file_path: PathBuf,
    pub imported: usize,
}

/// Runs export, parse and import strictly one after another.
///
/// The first failing step ends the run and its error is returned unchanged. Nothing is
/// retried and nothing is rolled back.
pub struct SyncEngine<E, P, I> {
    params: SyncParameters,
    exporter: E,
    parser: P,
    importer: I,
}

impl<E, P, I> SyncEngine<E, P, I>
where
    E: TransactionExporter + Sync,
    P: TransactionParser + Sync,
    I: TransactionImporter + Sync,
{
    pub fn new(params: SyncParameters, exporter: E, parser: P, importer: I) -> Self {
        Self {
            params,
            exporter,
            parser,
            importer,
        }
    }

    pub async fn sync(&self) -> Result<SyncReport> {
        self.sync_as_of(Local::now().date_naive()).await
    }

    #[instrument(name = "Sync", skip_all)]
    pub async fn sync_as_of(&self, today: NaiveDate) -> Result<SyncReport> {
        let span = Span::current();
        span.pb_set_style(
            &ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| AppError::Other(e.into()))?,
        );
        span.pb_set_length(STEPS);

        let range = self.params.date_range(today)?;

        span.pb_set_message("Exporting");
        info!(
            "Exporting westpac transactions with date range of '{}' to '{}'",
            range.start.format(DISPLAY_DATE_FORMAT),
            range.effective_end(today).format(DISPLAY_DATE_FORMAT)
        );
        let output = self
            .exporter
            .export(&ExportRequest {
                username: &self.params.westpac_username,
                password: &self.params.westpac_password,
                account_name: &self.params.westpac_account_name,
                start_date: range.start,
                end_date: range.end,
                debug: self.params.debug,
            })
            .await?;
        let file_path = output.file_path;
        info!(
            "Transactions exported successfully to '{}'",
            file_path.display()
        );
        span.pb_inc(1);

        span.pb_set_message("Parsing");
        info!("Parsing transactions from '{}'", file_path.display());
        let transactions = self
            .parser
            .parse(&self.params.ynab_account_id, &file_path)
            .await?;
        info!(
            "Parsed '{}' transactions from '{}'",
            transactions.len(),
            file_path.display()
        );
        span.pb_inc(1);

        span.pb_set_message("Importing");
        info!("Importing '{}' transactions into YNAB", transactions.len());
        self.importer
            .import(&self.params.ynab_budget_id, &transactions)
            .await?;
        info!(
            "Imported '{}' transactions into YNAB successfully",
            transactions.len()
        );
        span.pb_inc(1);

        Ok(SyncReport {
            range,
            file_path,
            imported: transactions.len(),
        })
    }
}

#[cfg(test)]
mod mocks {
    use super::*;
    use crate::models::Transaction;
    use crate::westpac::ExportOutput;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Export {
            username: String,
            password: String,
            account_name: String,
            start_date: NaiveDate,
            end_date: Option<NaiveDate>,
            debug: bool,
        },
        Parse {
            account_id: String,
            file_path: PathBuf,
        },
        Import {
            budget_id: String,
            transactions: Vec<Transaction>,
        },
    }

    pub(crate) type CallLog = Arc<Mutex<Vec<Call>>>;

    #[derive(Clone, Copy, PartialEq)]
    pub(crate) enum Failing {
        Nothing,
        Export,
        Parse,
        Import,
    }

    pub(crate) async fn sync_against_mocks(
        params: SyncParameters,
        today: NaiveDate,
        transactions: Vec<Transaction>,
        failing: Failing,
    ) -> (Result<SyncReport>, Vec<Call>) {
        let calls = CallLog::default();
        let engine = SyncEngine::new(
            params,
            MockExporter {
                calls: calls.clone(),
                file_path: PathBuf::from("/tmp/stmt.ofx"),
                fail: failing == Failing::Export,
            },
            MockParser {
                calls: calls.clone(),
                transactions,
                fail: failing == Failing::Parse,
            },
            MockImporter {
                calls: calls.clone(),
                fail: failing == Failing::Import,
            },
        );

        let result = engine.sync_as_of(today).await;
        let calls = calls.lock().unwrap().clone();
        (result, calls)
    }

    pub(crate) struct MockExporter {
        pub calls: CallLog,
        pub file_path: PathBuf,
        pub fail: bool,
    }

    #[async_trait]
    impl TransactionExporter for MockExporter {
        async fn export(&self, request: &ExportRequest<'_>) -> Result<ExportOutput> {
            self.calls.lock().unwrap().push(Call::Export {
                username: request.username.to_string(),
                password: request.password.to_string(),
                account_name: request.account_name.to_string(),
                start_date: request.start_date,
                end_date: request.end_date,
                debug: request.debug,
            });
            if self.fail {
                return Err(AppError::Export("login rejected".to_string()));
            }
            Ok(ExportOutput {
                file_path: self.file_path.clone(),
            })
        }
    }

    pub(crate) struct MockParser {
        pub calls: CallLog,
        pub transactions: Vec<Transaction>,
        pub fail: bool,
    }

    #[async_trait]
    impl TransactionParser for MockParser {
        async fn parse(&self, account_id: &str, file_path: &Path) -> Result<Vec<Transaction>> {
            self.calls.lock().unwrap().push(Call::Parse {
                account_id: account_id.to_string(),
                file_path: file_path.to_path_buf(),
            });
            if self.fail {
                return Err(AppError::Parse("No <OFX> element found".to_string()));
            }
            Ok(self.transactions.clone())
        }
    }

    pub(crate) struct MockImporter {
        pub calls: CallLog,
        pub fail: bool,
    }

    #[async_trait]
    impl TransactionImporter for MockImporter {
        async fn import(&self, budget_id: &str, transactions: &[Transaction]) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Import {
                budget_id: budget_id.to_string(),
                transactions: transactions.to_vec(),
            });
            if self.fail {
                return Err(AppError::Import("401 Unauthorized".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{Call, Failing, sync_against_mocks};
    use super::*;
    use crate::models::Transaction;
    use crate::models::transaction::test_helpers::{mock_date, mock_transaction};
    use crate::sync::params::test_helpers::mock_params;
    use rust_decimal::prelude::dec;

    fn five_transactions() -> Vec<Transaction> {
        (1..=5)
            .map(|i| {
                mock_transaction(
                    &format!("tx_{i}"),
                    dec!(-10) * rust_decimal::Decimal::from(i),
                    mock_date(2024, 3, 3 + i),
                )
            })
            .collect()
    }

    fn export_call(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Call {
        Call::Export {
            username: "12345678".to_string(),
            password: "hunter2".to_string(),
            account_name: "Westpac Choice".to_string(),
            start_date,
            end_date,
            debug: false,
        }
    }

    fn parse_call() -> Call {
        Call::Parse {
            account_id: "ynab-account-1".to_string(),
            file_path: PathBuf::from("/tmp/stmt.ofx"),
        }
    }

    #[tokio::test]
    async fn test_sync_exports_parses_and_imports() {
        let transactions = five_transactions();

        let (result, calls) = sync_against_mocks(
            mock_params(),
            mock_date(2024, 3, 10),
            transactions.clone(),
            Failing::Nothing,
        )
        .await;

        assert_eq!(
            calls,
            vec![
                export_call(mock_date(2024, 3, 3), None),
                parse_call(),
                Call::Import {
                    budget_id: "budget-1".to_string(),
                    transactions,
                },
            ]
        );
        assert_eq!(
            result.unwrap(),
            SyncReport {
                range: DateRange {
                    start: mock_date(2024, 3, 3),
                    end: None,
                },
                file_path: PathBuf::from("/tmp/stmt.ofx"),
                imported: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_sync_passes_explicit_dates() {
        let params = SyncParameters {
            number_of_days_to_sync: 90,
            start_date: Some(mock_date(2024, 1, 1)),
            end_date: Some(mock_date(2024, 1, 31)),
            debug: true,
            ..mock_params()
        };

        let (result, calls) =
            sync_against_mocks(params, mock_date(2024, 3, 10), vec![], Failing::Nothing).await;

        assert_eq!(result.unwrap().imported, 0);
        assert_eq!(
            calls[0],
            Call::Export {
                username: "12345678".to_string(),
                password: "hunter2".to_string(),
                account_name: "Westpac Choice".to_string(),
                start_date: mock_date(2024, 1, 1),
                end_date: Some(mock_date(2024, 1, 31)),
                debug: true,
            }
        );
        assert_eq!(
            calls.len(),
            3,
            "an empty statement should still be handed to the importer"
        );
    }

    #[tokio::test]
    async fn test_export_failure_stops_sync() {
        let (result, calls) = sync_against_mocks(
            mock_params(),
            mock_date(2024, 3, 10),
            five_transactions(),
            Failing::Export,
        )
        .await;

        assert!(matches!(result, Err(AppError::Export(_))));
        assert_eq!(
            calls,
            vec![export_call(mock_date(2024, 3, 3), None)],
            "parse and import must not run after a failed export"
        );
    }

    #[tokio::test]
    async fn test_parse_failure_stops_sync() {
        let (result, calls) = sync_against_mocks(
            mock_params(),
            mock_date(2024, 3, 10),
            five_transactions(),
            Failing::Parse,
        )
        .await;

        assert!(matches!(result, Err(AppError::Parse(_))));
        assert_eq!(
            calls,
            vec![export_call(mock_date(2024, 3, 3), None), parse_call()]
        );
    }

    #[tokio::test]
    async fn test_import_failure_happens_last() {
        let (result, calls) = sync_against_mocks(
            mock_params(),
            mock_date(2024, 3, 10),
            five_transactions(),
            Failing::Import,
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "YNAB import failed: 401 Unauthorized");
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], Call::Export { .. }));
        assert!(matches!(calls[1], Call::Parse { .. }));
        assert!(matches!(calls[2], Call::Import { .. }));
    }
}
