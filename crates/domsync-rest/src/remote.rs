//! REST-backed remote store.

use async_trait::async_trait;
use tracing::{debug, instrument};

use domsync_core::Result;
use domsync_core::error::RemoteError;
use domsync_core::traits::RemoteStore;
use domsync_core::types::{DEFAULT_IDENTITY_FIELD, Payload, RemoteUrl, TableName};

use crate::client::RestClient;

/// A remote store that upserts over the hosted backend's REST interface.
#[derive(Debug, Clone)]
pub struct RestRemote {
    client: RestClient,
    identity_field: String,
}

impl RestRemote {
    /// Create a remote for the backend at `base`.
    pub fn new(base: RemoteUrl, api_key: Option<&str>) -> Result<Self> {
        Ok(Self::from_client(RestClient::new(base, api_key)?))
    }

    /// Create a remote over an existing client.
    pub fn from_client(client: RestClient) -> Self {
        Self {
            client,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
        }
    }

    /// Resolve upsert conflicts on a different column.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Returns the backend URL.
    pub fn url(&self) -> &RemoteUrl {
        self.client.base()
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    #[instrument(skip(self, payload), fields(%target))]
    async fn submit(
        &self,
        target: &TableName,
        payload: &Payload,
    ) -> std::result::Result<Payload, RemoteError> {
        let rows = self
            .client
            .upsert(target, &self.identity_field, payload.as_value())
            .await?;

        // The backend echoes the stored row; fall back to what was sent.
        let stored = match rows.into_iter().next() {
            Some(row) => Payload::new(row).unwrap_or_else(|_| payload.clone()),
            None => payload.clone(),
        };
        debug!("Upserted record");
        Ok(stored)
    }
}
