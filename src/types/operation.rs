//! Replay operations
//!
//! One `Operation` per row of a replay input file. Cancels and queries name
//! their target either by a label bound by an earlier `Use` or by a literal
//! transaction id.

use super::account::{AccountNumber, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Debit `amount` from `account` on behalf of `user`
    Use {
        user: UserId,
        account: AccountNumber,
        amount: u64,
        /// Name under which the produced transaction id is remembered
        label: Option<String>,
    },

    /// Cancel the use named by `reference`
    Cancel {
        account: AccountNumber,
        amount: u64,
        reference: String,
    },

    /// Look up the transaction named by `reference`
    Query { reference: String },
}

impl Operation {
    /// The account a mutating operation targets; `None` for queries
    pub fn account(&self) -> Option<&str> {
        match self {
            Operation::Use { account, .. } | Operation::Cancel { account, .. } => Some(account),
            Operation::Query { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Use { .. } => "use",
            Operation::Cancel { .. } => "cancel",
            Operation::Query { .. } => "query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_for_each_operation() {
        let use_op = Operation::Use {
            user: 1,
            account: "1000000000".to_string(),
            amount: 100,
            label: None,
        };
        let cancel = Operation::Cancel {
            account: "2000000000".to_string(),
            amount: 100,
            reference: "t1".to_string(),
        };
        let query = Operation::Query {
            reference: "t1".to_string(),
        };

        assert_eq!(use_op.account(), Some("1000000000"));
        assert_eq!(cancel.account(), Some("2000000000"));
        assert_eq!(query.account(), None);
        assert_eq!(query.name(), "query");
    }
}
