//! Client library for the Expense Tracker API.
//!
//! Covers the authentication session lifecycle (credential login,
//! third-party identity-provider callback capture, logout) and the
//! protected transaction/category endpoints. The backend is an external
//! service; this crate only consumes its HTTP contract.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthFlow, CallbackParams, Credentials, Redirect, SessionStore, TokenPair};
pub use config::Config;
