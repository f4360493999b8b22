//! Signed-in user session and the Google sign-in handshake.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::db::{Database, DbResult, USER_KEY};
use crate::models::User;

/// Google's OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested at sign-in.
pub const GOOGLE_SCOPES: &str =
    "https://www.googleapis.com/auth/userinfo.email https://www.googleapis.com/auth/userinfo.profile";

/// Sign-in errors.
#[derive(Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),

    #[error("No authorization code in callback")]
    MissingCode,

    #[error("Sign-in was denied: {0}")]
    Denied(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Google OAuth client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleOAuth {
    pub client_id: String,
    pub redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// URL to send the user to. `state` is echoed back on the callback.
    pub fn authorization_url(&self, state: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", GOOGLE_SCOPES),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
    }
}

/// Pull the authorization code out of the redirect the provider sent back.
///
/// A callback without a code sends the user back to the start.
pub fn authorization_code(callback_url: &str) -> AuthResult<String> {
    let url = Url::parse(callback_url)
        .map_err(|e| AuthError::InvalidCallback(format!("{}: {}", callback_url, e)))?;

    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match &*key {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (Some(code), _) => Ok(code),
        (None, Some(error)) => Err(AuthError::Denied(error)),
        (None, None) => Err(AuthError::MissingCode),
    }
}

/// The signed-in user, persisted across launches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    /// Load whoever was signed in last time.
    pub fn restore(db: &Database) -> DbResult<Self> {
        let user: Option<User> = db.read_state(USER_KEY)?;
        if let Some(user) = &user {
            tracing::debug!(email = %user.email, "session restored");
        }
        Ok(Self { user })
    }

    pub fn login(&mut self, db: &Database, user: User) -> DbResult<()> {
        db.write_state(USER_KEY, &user)?;
        self.user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self, db: &Database) -> DbResult<()> {
        db.clear_state(USER_KEY)?;
        self.user = None;
        Ok(())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Email sent with API requests.
    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.email.as_str())
    }
}
