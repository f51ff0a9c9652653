//! HTTP client for the dashboard API.
//!
//! Only one endpoint is needed: the per-role conversation list used to seed
//! the cache after enabling.

use huddle_proto::{ConversationSummary, Role};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::DaemonError;

/// Path of the conversation list endpoint, relative to the API base.
const CONVERSATIONS_PATH: &str = "chat/conversations";

/// Conversation list responses come either bare or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConversationsBody {
    List(Vec<ConversationSummary>),
    Wrapped { data: Vec<ConversationSummary> },
}

impl ConversationsBody {
    fn into_list(self) -> Vec<ConversationSummary> {
        match self {
            Self::List(list) | Self::Wrapped { data: list } => list,
        }
    }
}

/// Client for the dashboard HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidUrl`] unless `base_url` is an absolute
    /// `http` or `https` URL.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, DaemonError> {
        let mut base = Url::parse(base_url).map_err(|e| DaemonError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DaemonError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", base.scheme()),
            });
        }

        // Relative joins replace the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { client: reqwest::Client::new(), base, token })
    }

    /// URL of the conversation list for `role`.
    pub fn conversations_url(&self, role: Role) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{CONVERSATIONS_PATH}", self.base.path()));
        url.query_pairs_mut().append_pair("role", role.as_str());
        url
    }

    /// Fetch the conversation list for `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body is not a conversation list.
    pub async fn conversations(&self, role: Role) -> Result<Vec<ConversationSummary>, DaemonError> {
        let url = self.conversations_url(role);

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(%role, %status, "conversation fetch failed");
            return Err(DaemonError::ApiStatus { status: status.as_u16(), url: url.to_string() });
        }

        let list = resp.json::<ConversationsBody>().await?.into_list();
        debug!(%role, count = list.len(), "fetched conversations");
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversations_url_keeps_base_path() {
        let api = ApiClient::new("http://localhost:5000/api", None).unwrap();
        assert_eq!(
            api.conversations_url(Role::Teacher).as_str(),
            "http://localhost:5000/api/chat/conversations?role=teacher"
        );

        let api = ApiClient::new("https://dash.example/api/", None).unwrap();
        assert_eq!(
            api.conversations_url(Role::Student).as_str(),
            "https://dash.example/api/chat/conversations?role=student"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(matches!(
            ApiClient::new("ws://localhost/api", None),
            Err(DaemonError::InvalidUrl { .. })
        ));
        assert!(matches!(ApiClient::new("not a url", None), Err(DaemonError::InvalidUrl { .. })));
    }

    #[test]
    fn accepts_bare_and_wrapped_lists() {
        let bare: ConversationsBody =
            serde_json::from_str(r#"[{"_id":"c1","unreadCount":2}]"#).unwrap();
        let wrapped: ConversationsBody =
            serde_json::from_str(r#"{"data":[{"_id":"c1","unreadCount":2}]}"#).unwrap();

        assert_eq!(bare.into_list(), wrapped.into_list());
    }
}
