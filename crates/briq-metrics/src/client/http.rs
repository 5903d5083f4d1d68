//! HTTP implementation of [`ListUsers`].

use async_trait::async_trait;
use reqwest::header;
use snafu::{ensure, ResultExt};

use std::fmt;

use super::{
    error::{
        BuildHttpClientSnafu, DeserializeResponseSnafu, EmptySecretKeySnafu, SendRequestSnafu,
        UnexpectedStatusSnafu,
    },
    BoxError, Error, ListUsers, ListUsersRequest, UserList,
};

/// Base URL of the public Briq API.
pub const DEFAULT_API_URL: &str = "https://www.briq.it/api/v0";

/// Maximum number of chars from an erroneous response body kept in [`Error::UnexpectedStatus`].
const MAX_ERROR_BODY_LEN: usize = 512;

/// Briq API client authenticated with a secret key.
///
/// The key is sent as the user name of HTTP basic auth. The client doesn't retry
/// and doesn't set its own timeouts; callers bound each call as they see fit.
#[derive(Clone)]
pub struct BriqClient {
    http: reqwest::Client,
    users_url: String,
    secret_key: String,
}

impl fmt::Debug for BriqClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BriqClient")
            .field("users_url", &self.users_url)
            .finish_non_exhaustive()
    }
}

impl BriqClient {
    /// Creates a client for the API rooted at `api_url` (e.g., [`DEFAULT_API_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if `secret_key` is empty or the HTTP client cannot be initialized.
    pub fn new(secret_key: impl Into<String>, api_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(BuildHttpClientSnafu)?;
        Self::with_http_client(http, secret_key, api_url)
    }

    /// Creates a client with the provided HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if `secret_key` is empty.
    pub fn with_http_client(
        http: reqwest::Client,
        secret_key: impl Into<String>,
        api_url: &str,
    ) -> Result<Self, Error> {
        let secret_key = secret_key.into();
        ensure!(!secret_key.is_empty(), EmptySecretKeySnafu);

        Ok(Self {
            http,
            users_url: format!("{}/users", api_url.trim_end_matches('/')),
            secret_key,
        })
    }

    /// Lists users, reporting a typed error on failure.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success response status or malformed response.
    pub async fn fetch_users(&self) -> Result<UserList, Error> {
        let url = &self.users_url;
        let response = self
            .http
            .get(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .context(SendRequestSnafu { url })?;

        let status = response.status();
        let body = response.bytes().await.context(SendRequestSnafu { url })?;
        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_LEN)
                .collect();
            return UnexpectedStatusSnafu { url, status, body }.fail();
        }

        serde_json::from_slice(&body).context(DeserializeResponseSnafu { url })
    }
}

#[async_trait]
impl ListUsers for BriqClient {
    async fn list_users(&self, _request: ListUsersRequest) -> Result<UserList, BoxError> {
        Ok(self.fetch_users().await?)
    }
}
