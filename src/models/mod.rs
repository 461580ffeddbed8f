//! Data models for the Expense Tracker API.
//!
//! These mirror the backend's serialized shapes. Amount fields are
//! tolerant of the backend's two decimal encodings (JSON number or
//! decimal string).

pub mod category;
pub mod transaction;
pub mod user;

pub use category::{Category, NewCategory};
pub use transaction::{net_balance, NewTransaction, Transaction, TransactionType};
pub use user::{MonthlyReport, NewUser, UserProfile};

use serde::{Deserialize, Deserializer};

/// The backend serializes decimal amounts as strings ("42.50"); older
/// responses used plain numbers. Accept both.
pub(crate) fn amount_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
