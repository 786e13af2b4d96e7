use crate::error::{AppError, Result};
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_DAYS_TO_SYNC: u32 = 7;

pub const ENV_NUMBER_OF_DAYS: &str = "Sync.Westpac.NumberOfDays";
pub const ENV_DEBUG: &str = "Sync.Westpac.Debug";
pub const ENV_USERNAME: &str = "Sync.Westpac.Username";
pub const ENV_PASSWORD: &str = "Sync.Westpac.Password";
pub const ENV_ACCOUNT_NAME: &str = "Sync.Westpac.AccountName";
pub const ENV_YNAB_ACCOUNT_ID: &str = "Sync.Westpac.YnabAccountId";
pub const ENV_YNAB_API_KEY: &str = "Sync.Westpac.YnabApiKey";
pub const ENV_YNAB_BUDGET_ID: &str = "Sync.Westpac.YnabBudgetId";

/// Everything a single Westpac to YNAB run needs.
#[derive(Clone, PartialEq)]
pub struct SyncParameters {
    pub westpac_username: String,
    pub westpac_password: String,
    pub westpac_account_name: String,
    pub number_of_days_to_sync: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub debug: bool,
    pub ynab_api_key: String,
    pub ynab_budget_id: String,
    pub ynab_account_id: String,
}

impl fmt::Debug for SyncParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncParameters")
            .field("westpac_username", &self.westpac_username)
            .field("westpac_password", &"<redacted>")
            .field("westpac_account_name", &self.westpac_account_name)
            .field("number_of_days_to_sync", &self.number_of_days_to_sync)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("debug", &self.debug)
            .field("ynab_api_key", &"<redacted>")
            .field("ynab_budget_id", &self.ynab_budget_id)
            .field("ynab_account_id", &self.ynab_account_id)
            .finish()
    }
}

/// Date range handed to the exporter.
///
/// `end` is only set when the caller asked for one; an open range means "up to today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn effective_end(&self, today: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(today)
    }
}

impl SyncParameters {
    /// Resolve the export range relative to `today`.
    ///
    /// The day count is subtracted from the explicit end date when there is one,
    /// otherwise from today. An explicit start date always wins.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let end = self.end_date;
        let effective_end = end.unwrap_or(today);

        let start = match self.start_date {
            Some(start) => start,
            None => effective_end
                .checked_sub_days(Days::new(u64::from(self.number_of_days_to_sync)))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Cannot sync {} days back from {}",
                        self.number_of_days_to_sync, effective_end
                    ))
                })?,
        };

        Ok(DateRange { start, end })
    }

    /// Build parameters for an unattended run.
    ///
    /// Each variable falls back to its `#{name}` deployment placeholder and then to a
    /// default. A placeholder that was never substituted counts as unset, so it is
    /// never sent to Westpac or YNAB as a credential.
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> Result<Self> {
        let number_of_days_to_sync = match lookup(env, ENV_NUMBER_OF_DAYS) {
            Some(value) => value.trim().parse::<u32>().map_err(|_| {
                AppError::Validation(format!(
                    "{} must be a non-negative whole number, got '{}'",
                    ENV_NUMBER_OF_DAYS, value
                ))
            })?,
            None => DEFAULT_DAYS_TO_SYNC,
        };

        let debug = match lookup(env, ENV_DEBUG) {
            Some(value) => parse_bool(&value).ok_or_else(|| {
                AppError::Validation(format!(
                    "{} must be 'true' or 'false', got '{}'",
                    ENV_DEBUG, value
                ))
            })?,
            None => false,
        };

        let mut missing = Vec::new();
        let mut required = |name: &'static str| {
            lookup(env, name).unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };

        let params = Self {
            westpac_username: required(ENV_USERNAME),
            westpac_password: required(ENV_PASSWORD),
            westpac_account_name: required(ENV_ACCOUNT_NAME),
            number_of_days_to_sync,
            start_date: None,
            end_date: None,
            debug,
            ynab_api_key: required(ENV_YNAB_API_KEY),
            ynab_budget_id: required(ENV_YNAB_BUDGET_ID),
            ynab_account_id: required(ENV_YNAB_ACCOUNT_ID),
        };

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(params)
    }
}

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// The real process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

fn lookup<E: EnvSource + ?Sized>(env: &E, name: &str) -> Option<String> {
    env.var(name)
        .filter(|value| !value.is_empty() && !is_placeholder(value))
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("#{") && value.ends_with('}')
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
