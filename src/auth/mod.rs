//! Authentication boundary: the observed session and the provider that owns it.
//!
//! The provider pushes session changes through a `watch` channel; consumers
//! never poll it. [`LocalAuthProvider`] keeps the session in-process,
//! [`HttpAuthProvider`] additionally talks to the auth service.

mod http;
pub mod token;

pub use http::HttpAuthProvider;

use crate::error::AppError;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Authenticated => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub status: SessionStatus,
    pub access_token: Option<String>,
    /// Session-level expiry as sent by the provider (RFC 3339 or epoch ms).
    pub expires: Option<String>,
}

impl Session {
    pub fn loading() -> Self {
        Self::default()
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            access_token: None,
            expires: None,
        }
    }

    pub fn authenticated(access_token: Option<String>, expires: Option<String>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            access_token,
            expires,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignOutOptions {
    pub redirect_immediately: bool,
}

pub trait AuthProvider: Send + Sync + 'static {
    fn session(&self) -> watch::Receiver<Session>;

    fn sign_out(&self, options: SignOutOptions) -> BoxFuture<'_, Result<(), AppError>>;
}

#[derive(Debug)]
pub struct LocalAuthProvider {
    session: watch::Sender<Session>,
}

impl Default for LocalAuthProvider {
    fn default() -> Self {
        Self::new(Session::loading())
    }
}

impl LocalAuthProvider {
    pub fn new(initial: Session) -> Self {
        let (session, _) = watch::channel(initial);
        Self { session }
    }

    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn set_session(&self, next: Session) {
        tracing::debug!(status = next.status.as_str(), "session updated");
        self.session.send_replace(next);
    }

    pub fn sign_in(&self, access_token: Option<String>, expires: Option<String>) {
        self.set_session(Session::authenticated(access_token, expires));
    }

    pub fn clear(&self) {
        self.set_session(Session::unauthenticated());
    }
}

impl AuthProvider for LocalAuthProvider {
    fn session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    fn sign_out(&self, _options: SignOutOptions) -> BoxFuture<'_, Result<(), AppError>> {
        self.clear();
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_provider_payload() {
        let mut payload =
            br#"{"status":"authenticated","accessToken":"abc","expires":"2030-01-01T00:00:00Z"}"#
                .to_vec();
        let session: Session = simd_json::from_slice(&mut payload).expect("session payload");

        assert!(session.is_authenticated());
        assert_eq!(session.access_token.as_deref(), Some("abc"));
        assert_eq!(session.expires.as_deref(), Some("2030-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn local_provider_publishes_changes_and_signs_out() {
        let provider = LocalAuthProvider::default();
        let mut receiver = provider.session();
        assert_eq!(receiver.borrow().status, SessionStatus::Loading);

        provider.sign_in(Some("token".to_string()), None);
        receiver.changed().await.expect("sender alive");
        assert_eq!(receiver.borrow_and_update().status, SessionStatus::Authenticated);

        provider
            .sign_out(SignOutOptions::default())
            .await
            .expect("local sign-out never fails");
        receiver.changed().await.expect("sender alive");
        assert_eq!(provider.current(), Session::unauthenticated());
    }
}
