use anyhow::{Error, Result};
use async_trait::async_trait;

use crate::models::page::NotificationPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// The newest page, no cursor. Used by refreshes.
    Newest,
    /// Records older than the cursor. Used by forward pagination.
    Older,
}

impl PageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageDirection::Newest => "newest",
            PageDirection::Older => "older",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Read,
    Deleted,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Read => "read",
            MutationKind::Deleted => "deleted",
        }
    }
}

/// Whose inbox a fetcher is bound to. The authentication key of a
/// user-scoped identity is assumed to have been validated upstream; it is
/// only carried through to the transport.
#[derive(Debug, Clone)]
pub enum InboxIdentity {
    Installation { installation_id: String },
    UserIdentifier { identifier: String, auth_key: String },
}

impl InboxIdentity {
    /// Stable label used in logs and request paths.
    pub fn scope(&self) -> String {
        match self {
            InboxIdentity::Installation { installation_id } => {
                format!("install/{}", installation_id)
            }
            InboxIdentity::UserIdentifier { identifier, .. } => {
                format!("user/{}", identifier)
            }
        }
    }

    pub fn auth_key(&self) -> Option<&str> {
        match self {
            InboxIdentity::Installation { .. } => None,
            InboxIdentity::UserIdentifier { auth_key, .. } => Some(auth_key),
        }
    }
}

/// Contract of the transport/auth collaborator the fetcher drives. The
/// fetcher never inspects failures beyond propagating them, and never
/// observes mutation acknowledgments.
#[async_trait]
pub trait InboxTransport: Send + Sync {
    async fn request_page(
        &self,
        identity: &InboxIdentity,
        cursor: Option<&str>,
        page_size: usize,
        direction: PageDirection,
    ) -> Result<NotificationPage, Error>;

    async fn submit_mutation(
        &self,
        identity: &InboxIdentity,
        identifier: &str,
        kind: MutationKind,
    ) -> Result<(), Error>;
}
