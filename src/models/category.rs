use serde::{Deserialize, Serialize};

/// A spending category as returned by `/categories/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Default categories are seeded by the backend and shared across users
    #[serde(default)]
    pub is_default: bool,
}

/// Body for `POST /categories/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCategory {
    pub name: String,
}
