use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The authenticated user's profile, from `GET /users/`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserProfile {
    /// "First Last", falling back to the email when no name is set.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}

/// Body for `POST /users/register/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Current-month totals from `GET /users/monthly-report/`.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyReport {
    #[serde(deserialize_with = "crate::models::amount_from_number_or_string")]
    pub total_income: f64,
    #[serde(deserialize_with = "crate::models::amount_from_number_or_string")]
    pub total_expense: f64,
    #[serde(deserialize_with = "crate::models::amount_from_number_or_string")]
    pub total_balance: f64,
    /// Per-category spend, keyed by category name ("Uncategorized" for none)
    #[serde(default)]
    pub category_summary: BTreeMap<String, f64>,
}
