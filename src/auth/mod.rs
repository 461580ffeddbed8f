//! Authentication: session storage and the login/logout state machine.
//!
//! This module provides:
//! - `SessionStore`: file-backed persistence of the access/refresh pair
//! - `AuthFlow`: the state machine driving credential login, third-party
//!   callback capture, and logout
//!
//! Being "logged in" is derived purely from the presence of a stored
//! token pair; expiry is discovered reactively when a protected call is
//! refused.

pub mod flow;
pub mod session;

pub use flow::{AuthError, AuthFlow, AuthState, CallbackParams, Credentials, Redirect};
pub use session::{SessionStore, TokenPair};
