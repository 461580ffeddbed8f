//! The authentication session lifecycle.
//!
//! `AuthFlow` is a small state machine with three entry paths: direct
//! credential login, third-party identity-provider callback capture, and
//! logout. Every transition ends in a consistent terminal state, either
//! authenticated with a stored token pair or redirected to login.
//!
//! Transitions never navigate anywhere themselves; they return a
//! [`Redirect`] for the frontend to act on, which keeps the whole machine
//! testable without a UI. The network-free parts of each transition
//! (`complete_login`, `receive_callback`) are separate functions for the
//! same reason.

use anyhow::Result;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, LoginResponse};

use super::{SessionStore, TokenPair};

/// Fallback error message when a rejected login carries no backend message
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Username/password submitted once per login attempt; never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the frontend should send the user after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// The protected area
    Dashboard,
    /// The login entry point
    Login,
}

/// Auth flow states. `CallbackPending` covers the window between
/// navigating away to the identity provider and the redirect back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    CallbackPending,
}

/// Errors surfaced to the user from a failed login attempt.
///
/// These are the only user-visible auth errors: an incomplete callback is
/// deliberately silent (indistinguishable from someone typing the callback
/// URL by hand), and storage trouble degrades to anonymous.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend answered 2xx but without a complete token pair
    #[error("Token missing")]
    TokenMissing,

    /// The backend rejected the attempt or was unreachable
    #[error("{0}")]
    LoginFailed(String),
}

/// Token values extracted from the identity-provider redirect URL.
/// Consumed exactly once to populate a [`TokenPair`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl CallbackParams {
    /// Extract `access` and `refresh` from a callback URL's query string.
    /// Empty values count as absent; a URL that does not parse yields an
    /// empty set of params, which downstream treats as an incomplete
    /// callback.
    pub fn from_url(url: &str) -> Self {
        let parsed = match reqwest::Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                debug!(error = %e, "Callback URL did not parse");
                return Self::default();
            }
        };

        let mut params = Self::default();
        for (key, value) in parsed.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "access" => params.access = Some(value.into_owned()),
                "refresh" => params.refresh = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    fn into_pair(self) -> Option<TokenPair> {
        match (self.access, self.refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        }
    }
}

/// Drives the three auth entry paths against a [`SessionStore`] and an
/// [`ApiClient`]. Owns both; the client's bearer token is kept in step
/// with the stored pair.
pub struct AuthFlow {
    api: ApiClient,
    store: SessionStore,
    state: AuthState,
}

impl AuthFlow {
    /// Build the flow, resuming a stored session when a complete pair is
    /// already present.
    pub fn new(mut api: ApiClient, store: SessionStore) -> Self {
        let state = match store.read() {
            Some(pair) => {
                debug!("Resuming stored session");
                api.set_token(pair.access_token);
                AuthState::Authenticated
            }
            None => AuthState::Anonymous,
        };
        Self { api, store, state }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Authenticated iff a complete token pair is held.
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// The API client carrying the current bearer token, for protected
    /// calls made outside the flow.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Submit credentials to the backend.
    ///
    /// One request per call; no automatic retry. The caller is expected
    /// not to issue a second call while one is in flight (the surrounding
    /// frontend disables resubmission, as the state is `Authenticating`).
    pub async fn submit_credentials(&mut self, creds: &Credentials) -> Result<Redirect, AuthError> {
        self.state = AuthState::Authenticating;

        match self.api.login(&creds.username, &creds.password).await {
            Ok(response) => self.complete_login(response),
            Err(e) => {
                self.state = AuthState::Anonymous;
                Err(AuthError::LoginFailed(login_failure_message(&e)))
            }
        }
    }

    /// Finish a login attempt from the backend's 2xx response body.
    ///
    /// A response missing either token is malformed and treated exactly
    /// like a rejected login: back to anonymous, store untouched.
    pub fn complete_login(&mut self, response: LoginResponse) -> Result<Redirect, AuthError> {
        let pair = match (response.access_token, response.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                TokenPair::new(access, refresh)
            }
            _ => {
                self.state = AuthState::Anonymous;
                return Err(AuthError::TokenMissing);
            }
        };

        self.establish_session(pair);
        info!("Credential login succeeded");
        Ok(Redirect::Dashboard)
    }

    /// Begin third-party login. Returns the identity-provider URL the
    /// user must be navigated to; control returns later through
    /// [`receive_callback`](Self::receive_callback).
    pub fn initiate_third_party_login(&mut self) -> String {
        self.state = AuthState::CallbackPending;
        self.api.third_party_login_url()
    }

    /// Consume the parameters carried by the identity-provider redirect.
    ///
    /// A complete pair establishes the session; anything less falls back
    /// to login silently, with no error surfaced and no store mutation.
    pub fn receive_callback(&mut self, params: CallbackParams) -> Redirect {
        match params.into_pair() {
            Some(pair) => {
                self.establish_session(pair);
                info!("Third-party login succeeded");
                Redirect::Dashboard
            }
            None => {
                debug!("Incomplete callback, falling back to login");
                self.state = AuthState::Anonymous;
                Redirect::Login
            }
        }
    }

    /// Log out: clear the stored pair and return to login.
    ///
    /// Purely local; never fails and never consults the backend.
    pub fn logout(&mut self) -> Redirect {
        self.store.clear();
        self.api.clear_token();
        self.state = AuthState::Anonymous;
        info!("Logged out");
        Redirect::Login
    }

    /// Recovery transition for protected calls that came back
    /// unauthorized: the session is no longer usable, return to login.
    /// The stored pair is left in place; only logout destroys it.
    pub fn expire_session(&mut self) -> Redirect {
        debug!("Protected call was refused, treating session as expired");
        self.state = AuthState::Anonymous;
        Redirect::Login
    }

    /// Map a protected-call error to the recovery redirect when the
    /// backend refused the token. Non-auth errors are left to the caller.
    pub fn recover(&mut self, err: &anyhow::Error) -> Option<Redirect> {
        match err.downcast_ref::<ApiError>() {
            Some(e) if e.is_unauthorized() => Some(self.expire_session()),
            _ => None,
        }
    }

    fn establish_session(&mut self, pair: TokenPair) {
        self.store.save(&pair);
        self.api.set_token(pair.access_token);
        self.state = AuthState::Authenticated;
    }
}

/// User-facing message for a failed login request: the backend's own
/// message when it sent one, otherwise a generic fallback.
fn login_failure_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<ApiError>()
        .and_then(ApiError::server_message)
        .unwrap_or(INVALID_CREDENTIALS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::DEFAULT_BASE_URL;

    fn test_flow(name: &str) -> AuthFlow {
        let dir = std::env::temp_dir().join(format!("fintrack-flow-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        AuthFlow::new(
            ApiClient::new(DEFAULT_BASE_URL).unwrap(),
            SessionStore::new(dir),
        )
    }

    fn login_response(access: Option<&str>, refresh: Option<&str>) -> LoginResponse {
        serde_json::from_value(serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
        }))
        .unwrap()
    }

    #[test]
    fn starts_anonymous_without_stored_session() {
        let flow = test_flow("fresh");
        assert_eq!(flow.state(), AuthState::Anonymous);
        assert!(!flow.is_authenticated());
    }

    #[test]
    fn complete_login_stores_pair_and_redirects_to_dashboard() {
        let mut flow = test_flow("login-ok");
        let redirect = flow
            .complete_login(login_response(Some("A"), Some("B")))
            .unwrap();
        assert_eq!(redirect, Redirect::Dashboard);
        assert_eq!(flow.state(), AuthState::Authenticated);
        assert_eq!(flow.store.read(), Some(TokenPair::new("A", "B")));
    }

    #[test]
    fn malformed_login_response_leaves_store_untouched() {
        let mut flow = test_flow("login-malformed");
        let err = flow
            .complete_login(login_response(None, Some("B")))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenMissing));
        assert_eq!(err.to_string(), "Token missing");
        assert_eq!(flow.state(), AuthState::Anonymous);
        assert_eq!(flow.store.read(), None);
    }

    #[test]
    fn login_response_with_missing_refresh_is_malformed() {
        let mut flow = test_flow("login-no-refresh");
        let err = flow
            .complete_login(login_response(Some("A"), None))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenMissing));
        assert_eq!(flow.store.read(), None);
    }

    #[test]
    fn initiate_third_party_login_enters_callback_pending() {
        let mut flow = test_flow("sso");
        let url = flow.initiate_third_party_login();
        assert_eq!(flow.state(), AuthState::CallbackPending);
        assert!(url.ends_with("/users/login/okta/"));
    }

    #[test]
    fn complete_callback_stores_tokens_and_redirects_to_dashboard() {
        let mut flow = test_flow("callback-ok");
        flow.initiate_third_party_login();
        let params = CallbackParams::from_url(
            "http://localhost:5173/auth/callback?access=X&refresh=Y",
        );
        assert_eq!(flow.receive_callback(params), Redirect::Dashboard);
        assert_eq!(flow.state(), AuthState::Authenticated);
        assert_eq!(flow.store.read(), Some(TokenPair::new("X", "Y")));
    }

    #[test]
    fn incomplete_callback_falls_back_to_login_silently() {
        let mut flow = test_flow("callback-incomplete");
        flow.initiate_third_party_login();
        let params =
            CallbackParams::from_url("http://localhost:5173/auth/callback?access=X");
        assert_eq!(flow.receive_callback(params), Redirect::Login);
        assert_eq!(flow.state(), AuthState::Anonymous);
        assert_eq!(flow.store.read(), None);
    }

    #[test]
    fn callback_with_empty_values_is_incomplete() {
        let params =
            CallbackParams::from_url("http://localhost:5173/auth/callback?access=&refresh=Y");
        assert_eq!(params.access, None);
        assert_eq!(params.refresh.as_deref(), Some("Y"));
    }

    #[test]
    fn callback_url_decodes_percent_encoding() {
        let params = CallbackParams::from_url(
            "http://localhost:5173/auth/callback?access=a%2Fb&refresh=r%3Ds",
        );
        assert_eq!(params.access.as_deref(), Some("a/b"));
        assert_eq!(params.refresh.as_deref(), Some("r=s"));
    }

    #[test]
    fn unparseable_callback_url_is_incomplete() {
        let params = CallbackParams::from_url("not a url");
        assert_eq!(params, CallbackParams::default());
    }

    #[test]
    fn logout_clears_store_and_redirects_to_login() {
        let mut flow = test_flow("logout");
        flow.complete_login(login_response(Some("A"), Some("B")))
            .unwrap();
        assert_eq!(flow.logout(), Redirect::Login);
        assert_eq!(flow.state(), AuthState::Anonymous);
        assert_eq!(flow.store.read(), None);
    }

    #[test]
    fn logout_from_anonymous_is_harmless() {
        let mut flow = test_flow("logout-anon");
        assert_eq!(flow.logout(), Redirect::Login);
        assert_eq!(flow.state(), AuthState::Anonymous);
    }

    #[test]
    fn resumes_session_from_store() {
        let dir = std::env::temp_dir().join(format!("fintrack-flow-resume-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = SessionStore::new(dir.clone());
        store.save(&TokenPair::new("A", "B"));

        let flow = AuthFlow::new(
            ApiClient::new(DEFAULT_BASE_URL).unwrap(),
            SessionStore::new(dir),
        );
        assert!(flow.is_authenticated());
    }

    #[test]
    fn recover_maps_unauthorized_to_login_redirect() {
        let mut flow = test_flow("recover");
        flow.complete_login(login_response(Some("A"), Some("B")))
            .unwrap();

        let err: anyhow::Error = ApiError::Unauthorized.into();
        assert_eq!(flow.recover(&err), Some(Redirect::Login));
        assert_eq!(flow.state(), AuthState::Anonymous);
        // The stored pair survives; only logout destroys it
        assert_eq!(flow.store.read(), Some(TokenPair::new("A", "B")));
    }

    #[test]
    fn recover_ignores_non_auth_errors() {
        let mut flow = test_flow("recover-other");
        flow.complete_login(login_response(Some("A"), Some("B")))
            .unwrap();

        let err: anyhow::Error = ApiError::NotFound("missing".into()).into();
        assert_eq!(flow.recover(&err), None);
        assert!(flow.is_authenticated());
    }

    #[test]
    fn login_failure_message_prefers_backend_message() {
        let err: anyhow::Error = ApiError::Rejected {
            status: 400,
            message: Some("Invalid credentials.".into()),
        }
        .into();
        assert_eq!(login_failure_message(&err), "Invalid credentials.");

        let err: anyhow::Error = ApiError::ServerError("boom".into()).into();
        assert_eq!(login_failure_message(&err), "Invalid credentials");
    }
}
