use thiserror::Error;

/// Errors surfaced through fetch completions. None of them poisons the
/// fetcher: it stays usable after any of these.
#[derive(Debug, Error)]
pub enum InboxError {
    /// Network or server failure reported by the transport collaborator.
    /// The store is left untouched.
    #[error("transport request failed: {0}")]
    Transport(#[source] anyhow::Error),

    /// Forward pagination was requested after the end of the inbox was
    /// reached. Informational, not fatal.
    #[error("all notifications have already been fetched")]
    NoMoreData,

    /// A page fetch was requested while another one was still in flight.
    #[error("another fetch is already in progress")]
    FetchInProgress,

    /// A configuration setter was called after the first fetch.
    #[error("configuration cannot be changed after the first fetch")]
    InvalidConfiguration,

    /// The server returned a page that failed self-consistency validation.
    /// The store is left untouched.
    #[error("server returned an inconsistent page: {0}")]
    MalformedPage(String),
}
