use crate::auth::{AuthProvider, LocalAuthProvider, Session, SignOutOptions};
use crate::error::AppError;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tokio::sync::watch;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionWire {
    user: Option<IgnoredAny>,
    access_token: Option<String>,
    expires: Option<String>,
}

fn session_from_wire(wire: SessionWire) -> Session {
    if wire.user.is_none() && wire.access_token.is_none() {
        return Session::unauthenticated();
    }
    Session::authenticated(wire.access_token, wire.expires)
}

/// Auth-service backed provider. Session state is still published locally.
#[derive(Debug)]
pub struct HttpAuthProvider {
    client: Client,
    base_url: String,
    local: LocalAuthProvider,
}

impl HttpAuthProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            local: LocalAuthProvider::default(),
        }
    }

    fn session_endpoint(&self) -> String {
        format!("{}/api/auth/session", self.base_url)
    }

    fn sign_out_endpoint(&self) -> String {
        format!("{}/api/auth/signout", self.base_url)
    }

    pub fn local(&self) -> &LocalAuthProvider {
        &self.local
    }

    /// Fetches the current session from the auth service and publishes it.
    pub async fn refresh_session(&self) -> Result<Session, AppError> {
        let response = self
            .client
            .get(self.session_endpoint())
            .send()
            .await?
            .error_for_status()?;
        let session = session_from_wire(response.json::<SessionWire>().await?);
        self.local.set_session(session.clone());
        Ok(session)
    }

    async fn remote_sign_out(&self, options: SignOutOptions) -> Result<(), AppError> {
        let redirect = if options.redirect_immediately { "true" } else { "false" };
        self.client
            .post(self.sign_out_endpoint())
            .form(&[("redirect", redirect), ("json", "true")])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl AuthProvider for HttpAuthProvider {
    fn session(&self) -> watch::Receiver<Session> {
        self.local.session()
    }

    fn sign_out(&self, options: SignOutOptions) -> BoxFuture<'_, Result<(), AppError>> {
        Box::pin(async move {
            let remote = self.remote_sign_out(options).await;
            self.local.clear();
            remote.map_err(|error| AppError::SignOut(error.to_string()))
        })
    }
}
