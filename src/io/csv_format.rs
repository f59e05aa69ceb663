//! CSV format handling for replay input and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - OperationCsvRecord and AccountCsvRecord structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account and ledger output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use std::io::Write;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::types::{
    Account, AccountNumber, AccountStatus, Operation, TransactionKind, TransactionRecord,
    TransactionResult, UserId,
};

/// CSV record structure for operation rows
///
/// Matches the input CSV format with columns: op, user, account, amount, ref.
/// Numeric fields are read as strings so a bad value yields a conversion error
/// naming the offending field.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OperationCsvRecord {
    pub op: String,
    pub user: Option<String>,
    pub account: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// CSV record structure for the accounts seed file
///
/// Columns: account, owner, status, balance.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub account: AccountNumber,
    pub owner: UserId,
    pub status: AccountStatus,
    pub balance: u64,
}

impl From<AccountCsvRecord> for Account {
    fn from(record: AccountCsvRecord) -> Self {
        Account {
            number: record.account,
            owner: record.owner,
            status: record.status,
            balance: record.balance,
        }
    }
}

impl From<&Account> for AccountCsvRecord {
    fn from(account: &Account) -> Self {
        AccountCsvRecord {
            account: account.number.clone(),
            owner: account.owner,
            status: account.status,
            balance: account.balance,
        }
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(field: Option<String>, name: &str, op: &str) -> Result<String, String> {
    non_empty(field).ok_or_else(|| format!("'{}' operation requires {}", op, name))
}

fn parse_number(value: &str, name: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("Invalid {} '{}'", name, value))
}

/// Convert an OperationCsvRecord to an Operation
///
/// This function:
/// - Parses the op string (case-insensitive) into an Operation variant
/// - Checks that the fields each operation needs are present
/// - Parses user ids and amounts as unsigned integers
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(Operation) - Successfully converted operation
/// - Err(String) - Error message describing the conversion failure
pub fn convert_operation_record(csv_record: OperationCsvRecord) -> Result<Operation, String> {
    let op = csv_record.op.trim().to_lowercase();

    match op.as_str() {
        "use" => {
            let user = required(csv_record.user, "a user", &op)?;
            let account = required(csv_record.account, "an account", &op)?;
            let amount = required(csv_record.amount, "an amount", &op)?;
            Ok(Operation::Use {
                user: parse_number(&user, "user")?,
                account,
                amount: parse_number(&amount, "amount")?,
                label: non_empty(csv_record.reference),
            })
        }
        "cancel" => {
            let account = required(csv_record.account, "an account", &op)?;
            let amount = required(csv_record.amount, "an amount", &op)?;
            Ok(Operation::Cancel {
                account,
                amount: parse_number(&amount, "amount")?,
                reference: required(csv_record.reference, "a ref", &op)?,
            })
        }
        "query" => Ok(Operation::Query {
            reference: required(csv_record.reference, "a ref", &op)?,
        }),
        _ => Err(format!("Invalid operation: '{}'", csv_record.op)),
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: account, owner, status, balance.
/// Accounts are sorted by account number for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer
        .write_record(["account", "owner", "status", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.number.cmp(&b.number));

    for account in sorted_accounts {
        writer
            .serialize(AccountCsvRecord::from(account))
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

fn kind_label(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Use => "use",
        TransactionKind::Cancel => "cancel",
    }
}

fn result_label(result: TransactionResult) -> &'static str {
    match result {
        TransactionResult::Success => "success",
        TransactionResult::Failure => "failure",
    }
}

/// Write ledger records to CSV format
///
/// Columns: transaction_id, kind, result, account, amount, balance_snapshot,
/// transacted_at (RFC 3339, microsecond precision). Records are written in
/// the order given.
pub fn write_ledger_csv(records: &[TransactionRecord], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record([
            "transaction_id",
            "kind",
            "result",
            "account",
            "amount",
            "balance_snapshot",
            "transacted_at",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for record in records {
        writer
            .write_record(&[
                record.transaction_id.clone(),
                kind_label(record.kind).to_string(),
                result_label(record.result).to_string(),
                record.account_number.clone(),
                record.amount.to_string(),
                record.balance_snapshot.to_string(),
                record
                    .transacted_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ])
            .map_err(|e| format!("Failed to write ledger record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn csv_record(op: &str, user: &str, account: &str, amount: &str, reference: &str) -> OperationCsvRecord {
        let field = |s: &str| Some(s.to_string());
        OperationCsvRecord {
            op: op.to_string(),
            user: field(user),
            account: field(account),
            amount: field(amount),
            reference: field(reference),
        }
    }

    #[rstest]
    #[case::labelled("use", "t1", Some("t1"))]
    #[case::unlabelled("use", "", None)]
    #[case::upper_case("USE", " t2 ", Some("t2"))]
    fn test_convert_use(#[case] op: &str, #[case] reference: &str, #[case] label: Option<&str>) {
        let operation = convert_operation_record(csv_record(op, "1", "1000000000", "250", reference)).unwrap();

        assert_eq!(
            operation,
            Operation::Use {
                user: 1,
                account: "1000000000".to_string(),
                amount: 250,
                label: label.map(str::to_string),
            }
        );
    }

    #[test]
    fn test_convert_cancel_ignores_user() {
        let operation = convert_operation_record(csv_record("cancel", "", "1000000000", "250", "t1")).unwrap();

        assert_eq!(
            operation,
            Operation::Cancel {
                account: "1000000000".to_string(),
                amount: 250,
                reference: "t1".to_string(),
            }
        );
    }

    #[test]
    fn test_convert_query_needs_only_ref() {
        let record = OperationCsvRecord {
            op: "Query".to_string(),
            user: None,
            account: None,
            amount: None,
            reference: Some("t1".to_string()),
        };

        assert_eq!(
            convert_operation_record(record).unwrap(),
            Operation::Query {
                reference: "t1".to_string()
            }
        );
    }

    #[rstest]
    #[case::invalid_op(csv_record("deposit", "1", "1", "10", ""), "Invalid operation")]
    #[case::use_missing_user(csv_record("use", "", "1", "10", ""), "requires a user")]
    #[case::use_missing_amount(csv_record("use", "1", "1", " ", ""), "requires an amount")]
    #[case::use_bad_amount(csv_record("use", "1", "1", "1.5", ""), "Invalid amount '1.5'")]
    #[case::use_negative_amount(csv_record("use", "1", "1", "-10", ""), "Invalid amount")]
    #[case::use_bad_user(csv_record("use", "x", "1", "10", ""), "Invalid user 'x'")]
    #[case::cancel_missing_ref(csv_record("cancel", "", "1", "10", ""), "requires a ref")]
    #[case::cancel_missing_account(csv_record("cancel", "", "", "10", "t1"), "requires an account")]
    #[case::query_missing_ref(csv_record("query", "", "", "", ""), "requires a ref")]
    fn test_convert_errors(#[case] record: OperationCsvRecord, #[case] expected_error: &str) {
        let result = convert_operation_record(record);

        assert!(result.is_err());
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[rstest]
    #[case::sorted_by_number(
        vec![
            Account::new("2000000000", 2, 500),
            Account::new("1000000000", 1, 10_000),
        ],
        "account,owner,status,balance\n1000000000,1,active,10000\n2000000000,2,active,500\n"
    )]
    #[case::closed_account(
        vec![Account {
            number: "3000000000".to_string(),
            owner: 3,
            status: AccountStatus::Closed,
            balance: 0,
        }],
        "account,owner,status,balance\n3000000000,3,closed,0\n"
    )]
    #[case::empty_accounts(vec![], "account,owner,status,balance\n")]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_ledger_csv() {
        let record = TransactionRecord {
            transaction_id: "0123456789abcdef0123456789abcdef".to_string(),
            kind: TransactionKind::Cancel,
            result: TransactionResult::Failure,
            account_number: "1000000000".to_string(),
            amount: 1_000,
            balance_snapshot: 9_000,
            transacted_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };

        let mut output = Vec::new();
        write_ledger_csv(&[record], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "transaction_id,kind,result,account,amount,balance_snapshot,transacted_at\n\
             0123456789abcdef0123456789abcdef,cancel,failure,1000000000,1000,9000,2026-01-02T03:04:05.000000Z\n"
        );
    }

    #[test]
    fn test_account_record_round_trips_into_account() {
        let account: Account = AccountCsvRecord {
            account: "1000000000".to_string(),
            owner: 1,
            status: AccountStatus::Active,
            balance: 10,
        }
        .into();

        assert_eq!(account, Account::new("1000000000", 1, 10));
    }
}
