//! Auth gateway: the remote side of the session.
//!
//! DESIGN
//! ======
//! Login is a strictly sequential three-step handshake:
//!
//! 1. `POST api-auth/login/` with `{username, password}` yields `{key}`.
//! 2. `GET api-auth/user/` with `Authorization: Token <key>` yields the user,
//!    which carries a `profile` reference (usually an absolute URL).
//! 3. `GET <profile>` with the same token yields the profile.
//!
//! Each step consumes the previous step's output, so there is nothing to run
//! in parallel. Step 1 failures map to [`AuthError::Authentication`]; steps 2
//! and 3 map to [`AuthError::Protocol`]. The gateway never retries and never
//! swallows an error; it also never touches session state. Applying a
//! successful result is the controller's job.

pub mod transport;
pub mod types;

use std::sync::Arc;

use reqwest::Url;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::ClientConfig;
use crate::session::types::{AuthenticatedSession, ProfileRecord, Record, UserRecord};
use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
use types::{AuthError, HandshakeStep};

const LOGIN_PATH: &str = "api-auth/login/";
const LOGOUT_PATH: &str = "api-auth/logout/";
const USER_PATH: &str = "api-auth/user/";
const USERS_PATH: &str = "users/";

#[derive(serde::Deserialize)]
struct LoginResponse {
    key: String,
}

pub struct AuthGateway {
    transport: Arc<dyn HttpTransport>,
    api_root: String,
}

impl AuthGateway {
    /// `api_root` must end with `/`; endpoint paths are appended to it.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, api_root: impl Into<String>) -> Self {
        Self { transport, api_root: api_root.into() }
    }

    /// Build a gateway backed by `reqwest` from client config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        let transport =
            ReqwestTransport::new(config.timeouts).map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self::new(Arc::new(transport), config.api_root.clone()))
    }

    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub(crate) fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    /// Resolve a record reference (absolute URL or root-relative path)
    /// against the API root.
    pub(crate) fn resolve(&self, reference: &str) -> Option<String> {
        let root = Url::parse(&self.api_root).ok()?;
        root.join(reference).ok().map(String::from)
    }

    // =========================================================================
    // LOGIN HANDSHAKE
    // =========================================================================

    /// Run the full handshake and return the composed session.
    ///
    /// # Errors
    ///
    /// [`AuthError::Authentication`] if the credential exchange fails,
    /// [`AuthError::Protocol`] if the user or profile fetch fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedSession, AuthError> {
        let token = self.exchange_credentials(username, password).await?;
        debug!(username, "credential exchange accepted");

        let user = self.fetch_user(&token).await?;
        debug!(username, "user record fetched");

        let profile_ref = user
            .profile_ref()
            .ok_or_else(|| AuthError::protocol(HandshakeStep::Profile, "user record has no profile reference"))?;
        let profile = self.fetch_profile(&token, profile_ref).await?;
        debug!(username, "profile record fetched");

        Ok(AuthenticatedSession { user, profile, token })
    }

    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let request = ApiRequest::post(
            self.endpoint(LOGIN_PATH),
            json!({ "username": username, "password": password }),
        );
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::Authentication(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::Authentication(format!("credentials rejected with status {}", response.status)));
        }

        let login: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|_| AuthError::Authentication("login response carried no token".into()))?;
        Ok(login.key)
    }

    /// Fetch the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Protocol`] at [`HandshakeStep::User`] on any failure.
    pub async fn fetch_user(&self, token: &str) -> Result<UserRecord, AuthError> {
        let request = ApiRequest::get(self.endpoint(USER_PATH)).with_token(token);
        self.fetch_record(request, HandshakeStep::User).await
    }

    /// Fetch a profile by its reference.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Protocol`] at [`HandshakeStep::Profile`] on any failure.
    pub async fn fetch_profile(&self, token: &str, profile_ref: &str) -> Result<ProfileRecord, AuthError> {
        let url = self
            .resolve(profile_ref)
            .ok_or_else(|| AuthError::protocol(HandshakeStep::Profile, format!("invalid profile reference '{profile_ref}'")))?;
        let request = ApiRequest::get(url).with_token(token);
        self.fetch_record(request, HandshakeStep::Profile).await
    }

    async fn fetch_record(&self, request: ApiRequest, step: HandshakeStep) -> Result<Record, AuthError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::protocol(step, e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::protocol(step, format!("status {}", response.status)));
        }

        parse_record(&response).ok_or_else(|| AuthError::protocol(step, "response is not a JSON object"))
    }

    // =========================================================================
    // ACCOUNT
    // =========================================================================

    /// Invalidate the token server-side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let request = ApiRequest::post(self.endpoint(LOGOUT_PATH), json!({})).with_token(token);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::Rejected { operation: "logout", status: response.status, body: response.body });
        }
        Ok(())
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, is rejected, or the created
    /// user is not a JSON object.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let request = ApiRequest::post(
            self.endpoint(USERS_PATH),
            json!({ "username": username, "email": email, "password": password }),
        );
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::Rejected { operation: "registration", status: response.status, body: response.body });
        }
        parse_record(&response).ok_or(AuthError::Rejected {
            operation: "registration",
            status: response.status,
            body: "created user is not a JSON object".into(),
        })
    }
}

fn parse_record(response: &ApiResponse) -> Option<Record> {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(Record::from_value)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
