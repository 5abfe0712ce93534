use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    clients::transport::{InboxIdentity, InboxTransport, MutationKind, PageDirection},
    models::page::NotificationPage,
};

const AUTH_HEADER: &str = "X-Inbox-Auth";

/// Reqwest-backed implementation of the transport contract, talking to the
/// inbox service's REST surface.
pub struct HttpTransport {
    http_client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        let base_url = base_url.into();
        info!(base_url = %base_url, "Inbox HTTP transport initialized");

        Ok(Self {
            http_client,
            base_url,
        })
    }
}

#[async_trait]
impl InboxTransport for HttpTransport {
    async fn request_page(
        &self,
        identity: &InboxIdentity,
        cursor: Option<&str>,
        page_size: usize,
        direction: PageDirection,
    ) -> Result<NotificationPage, Error> {
        let url = format!("{}/inbox/{}", self.base_url, identity.scope());

        debug!(
            scope = %identity.scope(),
            cursor = cursor.unwrap_or("<none>"),
            page_size,
            direction = direction.as_str(),
            "Requesting inbox page"
        );

        let mut request = self.http_client.get(&url).query(&[
            ("pageSize", page_size.to_string()),
            ("direction", direction.as_str().to_string()),
        ]);

        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        if let Some(auth_key) = identity.auth_key() {
            request = request.header(AUTH_HEADER, auth_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(anyhow!("Inbox service returned status {}", status));
        }

        let page: NotificationPage = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse inbox page JSON: {}", e))?;

        Ok(page)
    }

    async fn submit_mutation(
        &self,
        identity: &InboxIdentity,
        identifier: &str,
        kind: MutationKind,
    ) -> Result<(), Error> {
        let url = format!("{}/inbox/{}/mutations", self.base_url, identity.scope());

        debug!(
            scope = %identity.scope(),
            identifier,
            kind = kind.as_str(),
            "Submitting notification mutation"
        );

        let mut request = self.http_client.post(&url).json(&json!({
            "notificationId": identifier,
            "kind": kind.as_str(),
        }));

        if let Some(auth_key) = identity.auth_key() {
            request = request.header(AUTH_HEADER, auth_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(anyhow!("Mutation submission returned status {}", status));
        }

        Ok(())
    }
}
