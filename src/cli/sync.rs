use crate::config::Config;
use crate::error::Result;
use crate::ofx::OfxParser;
use crate::sync::params::DEFAULT_DAYS_TO_SYNC;
use crate::sync::{ProcessEnv, SyncEngine, SyncParameters};
use crate::westpac::WestpacExporter;
use crate::ynab::YnabClient;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use tracing::info;

const DATE_FORMAT_ERROR: &str = "Date must be in format 'yyyy-MM-dd'";

#[derive(Subcommand, Debug)]
pub enum SyncTarget {
    /// Sync Westpac Australia transactions to YNAB
    #[command(alias = "westpac-au")]
    Westpac(WestpacArgs),
}

impl SyncTarget {
    pub async fn execute(&self) -> Result<()> {
        match self {
            SyncTarget::Westpac(args) => sync_westpac(args.clone().into()).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum UnattendedTarget {
    /// Sync Westpac Australia transactions to YNAB using Sync.Westpac.* variables
    #[command(alias = "westpac-au")]
    Westpac,
}

impl UnattendedTarget {
    pub async fn execute(&self) -> Result<()> {
        match self {
            UnattendedTarget::Westpac => sync_westpac(SyncParameters::from_env(&ProcessEnv)?).await,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct WestpacArgs {
    /// Westpac username
    #[arg(long, value_name = "USERNAME")]
    westpac_username: String,

    /// Westpac password
    #[arg(long, value_name = "PASSWORD")]
    westpac_password: String,

    /// Name of Westpac account to sync from
    #[arg(long, value_name = "ACCOUNT_NAME")]
    westpac_account_name: String,

    /// Number of days of transactions to sync
    #[arg(long, default_value_t = DEFAULT_DAYS_TO_SYNC)]
    number_of_days_to_sync: u32,

    /// Start date to sync from (yyyy-MM-dd). If this is set then --number-of-days-to-sync is ignored
    #[arg(long, value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// End date to sync to (yyyy-MM-dd). If this is set then --number-of-days-to-sync counts back from it
    #[arg(long, value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// YNAB API key
    #[arg(long)]
    ynab_api_key: String,

    /// Id of YNAB budget to import into
    #[arg(long)]
    ynab_budget_id: String,

    /// Id of YNAB account to import into
    #[arg(long)]
    ynab_account_id: String,

    /// Whether to run in debug mode
    #[arg(long)]
    debug: bool,
}

impl From<WestpacArgs> for SyncParameters {
    fn from(args: WestpacArgs) -> Self {
        SyncParameters {
            westpac_username: args.westpac_username,
            westpac_password: args.westpac_password,
            westpac_account_name: args.westpac_account_name,
            number_of_days_to_sync: args.number_of_days_to_sync,
            start_date: args.start_date,
            end_date: args.end_date,
            debug: args.debug,
            ynab_api_key: args.ynab_api_key,
            ynab_budget_id: args.ynab_budget_id,
            ynab_account_id: args.ynab_account_id,
        }
    }
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| DATE_FORMAT_ERROR.to_string())
}

async fn sync_westpac(params: SyncParameters) -> Result<()> {
    let config = Config::load()?;
    let exporter = WestpacExporter::new(&config.westpac)?;
    let parser = OfxParser::new(params.debug);
    let importer = YnabClient::new(&config.ynab, &params.ynab_api_key, params.debug)?;

    let engine = SyncEngine::new(params, exporter, parser, importer);
    let report = engine.sync().await?;

    info!(
        imported = report.imported,
        from = %report.range.start,
        statement = %report.file_path.display(),
        "Sync completed"
    );

    Ok(())
}
