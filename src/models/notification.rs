use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin of a notification, as reported by the server. Unrecognized
/// values fall back to `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSource {
    Campaign,
    Transactional,
    Trigger,
    #[default]
    #[serde(other)]
    Unknown,
}

/// User-visible display content. Absent on silent notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
}

/// A single fetched notification plus its locally mutable read/deleted state.
///
/// `identifier` is server-assigned and opaque: do not make assumptions about
/// its format. `is_unread` and `is_deleted` are local-authoritative until the
/// next refresh; the server may lag behind them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub identifier: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: HashMap<String, serde_json::Value>,
    pub message: Option<NotificationMessage>,
    pub source: NotificationSource,
    pub attachment_url: Option<String>,
    pub is_unread: bool,
    pub is_deleted: bool,

    // Arrival sequence assigned by the store, used to keep timestamp ties
    // in a stable order. Not part of the public contract.
    #[serde(skip)]
    pub(crate) arrival: u64,
}

impl NotificationRecord {
    pub fn new(identifier: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            occurred_at,
            payload: HashMap::new(),
            message: None,
            source: NotificationSource::Unknown,
            attachment_url: None,
            is_unread: true,
            is_deleted: false,
            arrival: 0,
        }
    }

    pub fn with_message(mut self, message: NotificationMessage) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_payload(mut self, payload: HashMap<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_source(mut self, source: NotificationSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_unread(mut self, unread: bool) -> Self {
        self.is_unread = unread;
        self
    }

    /// A notification is silent when it carries no user-visible message.
    pub fn is_silent(&self) -> bool {
        self.message.is_none()
    }

    /// Compatibility projection of the deprecated flat `title` field.
    pub fn legacy_title(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.title.as_deref())
    }

    /// Compatibility projection of the deprecated flat `body` field.
    /// Silent notifications project to the empty string so that callers
    /// which never check `message` keep working.
    pub fn legacy_body(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.body.as_deref())
            .unwrap_or("")
    }
}
