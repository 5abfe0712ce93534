use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{
    error::InboxError,
    notification::{NotificationMessage, NotificationRecord, NotificationSource},
};

/// One notification as returned by the inbox service, before it is turned
/// into a cacheable record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub notification_id: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub send_time: DateTime<Utc>,

    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,

    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,

    #[serde(default = "default_unread")]
    pub unread: bool,

    #[serde(default)]
    pub source: NotificationSource,

    pub attachment_url: Option<String>,
}

fn default_unread() -> bool {
    true
}

impl RawNotification {
    pub fn into_record(self) -> NotificationRecord {
        let message = if self.title.is_none() && self.subtitle.is_none() && self.body.is_none() {
            None
        } else {
            Some(NotificationMessage {
                title: self.title,
                subtitle: self.subtitle,
                body: self.body,
            })
        };

        NotificationRecord {
            identifier: self.notification_id,
            occurred_at: self.send_time,
            payload: self.payload,
            message,
            source: self.source,
            attachment_url: self.attachment_url,
            is_unread: self.unread,
            is_deleted: false,
            arrival: 0,
        }
    }
}

/// One page of the remote inbox, newest entry first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<RawNotification>,
    pub next_cursor: Option<String>,
}

impl NotificationPage {
    /// Checks that the page is self-consistent: identifiers present and
    /// unique, timestamps non-increasing in newest-first order.
    pub fn validate(&self) -> Result<(), InboxError> {
        let mut seen = HashSet::with_capacity(self.notifications.len());

        for notification in &self.notifications {
            if notification.notification_id.is_empty() {
                return Err(InboxError::MalformedPage(
                    "empty notification identifier".to_string(),
                ));
            }

            if !seen.insert(notification.notification_id.as_str()) {
                return Err(InboxError::MalformedPage(format!(
                    "duplicate identifier '{}'",
                    notification.notification_id
                )));
            }
        }

        for pair in self.notifications.windows(2) {
            if pair[0].send_time < pair[1].send_time {
                return Err(InboxError::MalformedPage(format!(
                    "timestamps out of order around '{}'",
                    pair[1].notification_id
                )));
            }
        }

        Ok(())
    }
}
