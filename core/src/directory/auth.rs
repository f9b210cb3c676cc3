use std::env;

use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use crate::{
    config::CredentialRef,
    directory::error::{DirectoryError, authentication, invalid_request},
};

const TOKEN_GRACE_PERIOD: Duration = Duration::minutes(5);

pub fn resolve_credential(
    field: &str,
    reference: &CredentialRef,
) -> Result<String, DirectoryError> {
    match reference {
        CredentialRef::Env { var } => {
            let value = env::var(var).map_err(|_| {
                authentication(format!(
                    "missing credential environment variable {var} for graph.{field}"
                ))
            })?;
            if value.trim().is_empty() {
                return Err(authentication(format!(
                    "credential environment variable {var} for graph.{field} is empty"
                )));
            }
            Ok(value)
        }
        CredentialRef::Inline { value } => {
            if value.trim().is_empty() {
                return Err(invalid_request(format!(
                    "inline credential for graph.{field} cannot be empty"
                )));
            }
            Ok(value.clone())
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: OffsetDateTime,
}

impl CachedToken {
    fn is_expired(&self, now: OffsetDateTime, grace_period: Duration) -> bool {
        now + grace_period >= self.expires_at
    }
}

/// Client-credentials token source with an in-process cache.
pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    scope: String,
    credentials: ClientCredentials,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(
        http: reqwest::Client,
        login_endpoint: &str,
        graph_endpoint: &str,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                login_endpoint.trim_end_matches('/'),
                credentials.tenant_id
            ),
            scope: format!("{}/.default", graph_endpoint.trim_end_matches('/')),
            credentials,
            cached: RwLock::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, DirectoryError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref()
                && !token.is_expired(OffsetDateTime::now_utc(), TOKEN_GRACE_PERIOD)
            {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.acquire().await?;
        let access_token = token.access_token.clone();
        *self.cached.write().await = Some(token);
        Ok(access_token)
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn acquire(&self) -> Result<CachedToken, DirectoryError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| authentication(format!("token request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(240).collect::<String>();
            return Err(
                authentication(format!("token request failed with status {status}: {body}"))
                    .with_http_status(status.as_u16()),
            );
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| authentication(format!("failed to parse token response: {err}")))?;

        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(token.expires_in);
        tracing::debug!(
            target: "directory",
            tenant_id = %self.credentials.tenant_id,
            expires_at = %expires_at,
            "graph_token_acquired"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at,
        })
    }
}
