use serde::Deserialize;

use super::query_utils::EmptyQuery;
use super::{MalClient, Response, Result};

/// Account the client credentials belong to
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub username: String,
}

/// Handles the account methods of the legacy API
#[derive(Debug, Clone, Copy)]
pub struct AccountService<'a> {
    pub(crate) client: &'a MalClient,
}

impl AccountService<'_> {
    /// Checks the configured username and password. Wrong credentials come
    /// back as [`Error::RequestFailed`](super::Error::RequestFailed) with status 401
    #[tracing::instrument(skip(self))]
    pub async fn verify_credentials(&self) -> Result<(User, Response)> {
        self.client
            .legacy_query("api/account/verify_credentials.xml", &EmptyQuery {})
            .await
    }
}
