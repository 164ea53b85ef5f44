//! Outbound message dispatch.
//!
//! The chat platform is an external collaborator behind the [`Messenger`]
//! trait; the scheduler and command layer only decide WHICH of the two
//! send operations to call, based on the identity variant. Send failures
//! are logged by the caller and never retried in-process.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use crate::error::{CoreError, UpstreamError};
use crate::identity::ChatIdentity;
use crate::storage::MessengerConfig;

/// Message-send operations the chat platform must provide.
pub trait Messenger: Send + Sync + 'static {
    /// Deliver a private message to a user.
    fn send_to_user(
        &self,
        user_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Deliver a message to a group.
    fn send_to_group(
        &self,
        group_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Route to exactly one send operation based on the identity variant.
    fn dispatch(
        &self,
        identity: &ChatIdentity,
        text: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        async move {
            match identity {
                ChatIdentity::User(id) => self.send_to_user(id, text).await,
                ChatIdentity::Group(id) => self.send_to_group(id, text).await,
            }
        }
    }
}

/// Messenger posting JSON to a OneBot-style HTTP send API.
pub struct HttpMessenger {
    http: Client,
    endpoint: String,
}

impl HttpMessenger {
    pub fn new(config: &MessengerConfig) -> Result<Self, CoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(UpstreamError::Network)?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), CoreError> {
        let url = format!("{}/{path}", self.endpoint);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::Network)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(UpstreamError::Parse(format!("send failed (HTTP {status}): {text}")).into())
        }
    }
}

impl Messenger for HttpMessenger {
    async fn send_to_user(&self, user_id: &str, text: &str) -> Result<(), CoreError> {
        self.post(
            "send_private_msg",
            json!({ "user_id": user_id, "message": text }),
        )
        .await
    }

    async fn send_to_group(&self, group_id: &str, text: &str) -> Result<(), CoreError> {
        self.post(
            "send_group_msg",
            json!({ "group_id": group_id, "message": text }),
        )
        .await
    }
}
