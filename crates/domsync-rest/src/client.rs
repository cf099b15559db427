//! HTTP client for the hosted backend's REST interface.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use domsync_core::Result;
use domsync_core::error::{Error, InvalidInputError, RemoteError};
use domsync_core::types::{RemoteUrl, TableName};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Conflict resolution requested on every upsert.
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

/// Error body returned by the REST layer on failure.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RestErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

/// HTTP client bound to one backend project.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base: RemoteUrl,
    headers: HeaderMap,
}

impl RestClient {
    /// Create a client for `base`, authenticating with `api_key` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not a network URL or the key cannot be
    /// sent as a header.
    pub fn new(base: RemoteUrl, api_key: Option<&str>) -> Result<Self> {
        Self::with_timeout(base, api_key, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base: RemoteUrl, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        if !base.is_network() {
            return Err(InvalidInputError::RemoteUrl {
                value: base.to_string(),
                reason: "REST remote needs an http(s) URL".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("domsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::InvalidInput(InvalidInputError::Other {
                    message: format!("Failed to build HTTP client: {}", e),
                })
            })?;

        Ok(Self {
            client,
            base,
            headers: Self::default_headers(api_key)?,
        })
    }

    /// Returns the backend URL this client is configured for.
    pub fn base(&self) -> &RemoteUrl {
        &self.base
    }

    fn default_headers(api_key: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static(PREFER_UPSERT),
        );

        if let Some(key) = api_key {
            let invalid = |_| {
                Error::InvalidInput(InvalidInputError::Other {
                    message: "API key contains invalid header characters".to_string(),
                })
            };
            let mut apikey = HeaderValue::from_str(key).map_err(invalid)?;
            apikey.set_sensitive(true);
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(invalid)?;
            bearer.set_sensitive(true);
            headers.insert(HeaderName::from_static("apikey"), apikey);
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(headers)
    }

    /// Upsert `body` into `table`, resolving conflicts on `on_conflict`.
    ///
    /// Returns the rows the backend reports as stored. A success response
    /// without a JSON body yields no rows.
    #[instrument(skip(self, body), fields(base = %self.base))]
    pub async fn upsert(
        &self,
        table: &TableName,
        on_conflict: &str,
        body: &Value,
    ) -> std::result::Result<Vec<Value>, RemoteError> {
        let url = self.base.table_url(table);
        debug!(%url, "REST upsert");

        let response = self
            .client
            .post(&url)
            .query(&[("on_conflict", on_conflict)])
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    /// Handle a REST response, parsing the rows or error.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<Vec<Value>, RemoteError> {
        let status = response.status();
        trace!(status = %status, "REST response");

        if status.is_success() {
            let text = response.text().await.map_err(transport_error)?;
            Ok(parse_rows(&text))
        } else {
            let body = self.parse_error_response(response).await;
            Err(classify_status(status, body))
        }
    }

    async fn parse_error_response(&self, response: reqwest::Response) -> RestErrorResponse {
        response
            .json::<RestErrorResponse>()
            .await
            .unwrap_or_default()
    }
}

fn parse_rows(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(rows)) => rows,
        Ok(Value::Null) | Err(_) => Vec::new(),
        Ok(row) => vec![row],
    }
}

/// Map a failed request to a remote error. Anything that kept the request
/// from completing counts as the remote being unavailable.
pub(crate) fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::unavailable(format!("request timed out: {}", err))
    } else if err.is_connect() {
        RemoteError::unavailable(format!("connection failed: {}", err))
    } else {
        RemoteError::unavailable(err.to_string())
    }
}

/// Map an error status to a remote error.
///
/// Timeouts, rate limiting and server errors are transient; every other
/// status means the backend refused this particular write.
pub(crate) fn classify_status(status: StatusCode, body: RestErrorResponse) -> RemoteError {
    let transient = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();

    let mut message = body
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    if let Some(details) = body.details {
        message = format!("{} ({})", message, details);
    }
    if let Some(hint) = body.hint {
        message = format!("{}; hint: {}", message, hint);
    }

    if transient {
        RemoteError::unavailable(format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        RemoteError::Rejected {
            status: Some(status.as_u16()),
            code: body.code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str, message: &str) -> RestErrorResponse {
        RestErrorResponse {
            code: Some(code.to_string()),
            message: Some(message.to_string()),
            ..RestErrorResponse::default()
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(classify_status(status, RestErrorResponse::default()).is_unavailable());
        }
    }

    #[test]
    fn client_errors_are_rejections() {
        let err = classify_status(StatusCode::CONFLICT, body("23505", "duplicate key"));
        match err {
            RemoteError::Rejected {
                status,
                code,
                message,
            } => {
                assert_eq!(status, Some(409));
                assert_eq!(code.as_deref(), Some("23505"));
                assert_eq!(message, "duplicate key");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn rejection_without_body_uses_reason_phrase() {
        let err = classify_status(StatusCode::BAD_REQUEST, RestErrorResponse::default());
        assert_eq!(err.to_string(), "remote rejected write (HTTP 400): Bad Request");
    }

    #[test]
    fn rows_parse_leniently() {
        assert_eq!(parse_rows(r#"[{"id":1}]"#).len(), 1);
        assert_eq!(parse_rows(r#"{"id":1}"#).len(), 1);
        assert!(parse_rows("").is_empty());
        assert!(parse_rows("[]").is_empty());
    }

    #[test]
    fn file_url_is_refused() {
        let base = RemoteUrl::new("file:///tmp/store").unwrap();
        assert!(RestClient::new(base, None).is_err());
    }

    #[test]
    fn api_key_with_newline_is_refused() {
        let base = RemoteUrl::new("https://demo.supabase.co").unwrap();
        assert!(RestClient::new(base, Some("bad\nkey")).is_err());
    }
}
