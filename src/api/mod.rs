//! REST API client module for the Expense Tracker backend.
//!
//! The backend uses JWT bearer token authentication obtained through
//! `/users/login/` or the third-party identity-provider redirect. All
//! protected requests carry `Authorization: Bearer <access>` and funnel
//! through one request layer, so an expired token always surfaces as
//! `ApiError::Unauthorized`.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
