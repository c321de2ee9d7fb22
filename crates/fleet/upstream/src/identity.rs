//! Client-credential token exchange.

use color_eyre::eyre::WrapErr as _;

use crate::{AccessToken, TokenSource, check};

/// Scope requested for graph access.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Default identity endpoint base URL.
pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";

const SERVICE: &str = "identity";

/// Identity endpoint client for one tenant and application.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    login_url: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl IdentityClient {
    /// Create a client against a login base URL such as
    /// `https://login.microsoftonline.com`.
    pub fn new(
        http: reqwest::Client,
        login_url: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            login_url: login_url.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url.trim_end_matches('/'),
            urlencoding::encode(&self.tenant_id)
        )
    }
}

impl TokenSource for IdentityClient {
    async fn acquire_token(&self) -> color_eyre::eyre::Result<AccessToken> {
        tracing::debug!(tenant = %self.tenant_id, "requesting graph token");

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .wrap_err("token request failed")?;

        let token: TokenResponse = check(SERVICE, response)
            .await?
            .json()
            .await
            .wrap_err("failed to parse token response")?;

        Ok(AccessToken::new(token.access_token))
    }
}
