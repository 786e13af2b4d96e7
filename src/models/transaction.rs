use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A statement line, normalised for import into a YNAB account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub account_id: String,
    pub date: NaiveDate,
    /// Signed amount in the account currency, negative for outflows.
    pub amount: Decimal,
    pub payee: Option<String>,
    pub memo: Option<String>,
    /// Bank-assigned identifier, when the statement carries one.
    pub fitid: Option<String>,
    pub import_id: String,
}

impl Transaction {
    /// Amount in YNAB milliunits (1.00 == 1000).
    pub fn milliunits(&self) -> Option<i64> {
        to_milliunits(self.amount)
    }
}

pub(crate) fn to_milliunits(amount: Decimal) -> Option<i64> {
    amount.checked_mul(Decimal::ONE_THOUSAND)?.round().to_i64()
}

/// Generates import ids in YNAB's own format, `YNAB:<milliunits>:<date>:<occurrence>`,
/// so re-importing an overlapping date range is deduplicated server side.
#[derive(Debug, Default)]
pub struct ImportIdGenerator {
    occurrences: HashMap<(i64, NaiveDate), u32>,
}

impl ImportIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, milliunits: i64, date: NaiveDate) -> String {
        let occurrence = self.occurrences.entry((milliunits, date)).or_insert(0);
        *occurrence += 1;
        format!(
            "YNAB:{}:{}:{}",
            milliunits,
            date.format("%Y-%m-%d"),
            occurrence
        )
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub(crate) fn mock_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    pub(crate) fn mock_transaction(id: &str, amount: Decimal, date: NaiveDate) -> Transaction {
        let milliunits = to_milliunits(amount).unwrap();
        Transaction {
            account_id: "ynab-account-1".to_string(),
            date,
            amount,
            payee: Some(format!("mock payee: {id}")),
            memo: None,
            fitid: Some(id.to_string()),
            import_id: format!("YNAB:{}:{}:1", milliunits, date.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::dec;

    #[test]
    fn test_milliunits() {
        let tx = test_helpers::mock_transaction(
            "tx_1",
            dec!(-12.34),
            test_helpers::mock_date(2024, 3, 1),
        );
        assert_eq!(tx.milliunits(), Some(-12340));
        assert_eq!(to_milliunits(dec!(0.0005)), Some(0));
        assert_eq!(to_milliunits(dec!(1500)), Some(1_500_000));
        assert_eq!(to_milliunits(Decimal::MAX), None);
    }

    #[test]
    fn test_import_id_occurrences() {
        let date = test_helpers::mock_date(2024, 3, 1);
        let other_date = test_helpers::mock_date(2024, 3, 2);
        let mut ids = ImportIdGenerator::new();

        assert_eq!(ids.next_id(-5000, date), "YNAB:-5000:2024-03-01:1");
        assert_eq!(ids.next_id(-5000, date), "YNAB:-5000:2024-03-01:2");
        assert_eq!(ids.next_id(-5000, other_date), "YNAB:-5000:2024-03-02:1");
        assert_eq!(ids.next_id(2500, date), "YNAB:2500:2024-03-01:1");
    }

    #[test]
    fn test_transaction_serialization() {
        let tx = test_helpers::mock_transaction(
            "tx_1",
            dec!(99.95),
            test_helpers::mock_date(2024, 3, 1),
        );
        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx, deserialized);
    }
}
