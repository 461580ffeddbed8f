use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Income or expense, as the backend's `transaction_type` field spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// A single income/expense entry as returned by `/transactions/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(deserialize_with = "crate::models::amount_from_number_or_string")]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    /// Category id; the backend nulls this when the category was deleted
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub transaction_type: TransactionType,
}

impl Transaction {
    /// Amount with its sign: income positive, expense negative.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Body for `POST /transactions/`. The backend assigns id and date.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub amount: f64,
    pub description: String,
    pub category: Option<String>,
    pub transaction_type: TransactionType,
}

/// Net balance over a transaction list: income adds, expense subtracts.
pub fn net_balance(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(Transaction::signed_amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Transaction {
        serde_json::from_str(json).expect("Failed to parse transaction test JSON")
    }

    #[test]
    fn parses_string_amount() {
        let tx = parse(
            r#"{
                "id": "3f1d2c9a-9e2b-4a7f-8c3d-2b1a0e9f8d7c",
                "amount": "42.50",
                "description": "groceries",
                "date": "2025-11-02T18:30:00Z",
                "category": null,
                "transaction_type": "expense"
            }"#,
        );
        assert_eq!(tx.amount, 42.50);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.signed_amount(), -42.50);
    }

    #[test]
    fn parses_numeric_amount_and_category_name() {
        let tx = parse(
            r#"{
                "id": "a1",
                "amount": 1200,
                "date": "2025-11-01T09:00:00Z",
                "category": "c1",
                "category_name": "Salary",
                "transaction_type": "income"
            }"#,
        );
        assert_eq!(tx.amount, 1200.0);
        assert_eq!(tx.category_name.as_deref(), Some("Salary"));
        assert_eq!(tx.description, "");
    }

    #[test]
    fn net_balance_adds_income_and_subtracts_expense() {
        let txs: Vec<Transaction> = serde_json::from_str(
            r#"[
                {"id": "1", "amount": "100.00", "date": "2025-11-01T00:00:00Z",
                 "category": null, "transaction_type": "income"},
                {"id": "2", "amount": "30.25", "date": "2025-11-02T00:00:00Z",
                 "category": null, "transaction_type": "expense"},
                {"id": "3", "amount": "9.75", "date": "2025-11-03T00:00:00Z",
                 "category": null, "transaction_type": "expense"}
            ]"#,
        )
        .unwrap();
        assert_eq!(net_balance(&txs), 60.0);
    }

    #[test]
    fn new_transaction_serializes_type_lowercase() {
        let body = NewTransaction {
            amount: 5.0,
            description: "coffee".into(),
            category: None,
            transaction_type: TransactionType::Expense,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["transaction_type"], "expense");
    }
}
