pub mod clients;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod store;
pub mod utils;

pub use clients::http::HttpTransport;
pub use clients::transport::{InboxIdentity, InboxTransport, MutationKind, PageDirection};
pub use config::InboxConfig;
pub use fetcher::InboxFetcher;
pub use models::error::InboxError;
pub use models::fetch::{FetchResult, PageResult};
pub use models::notification::{NotificationMessage, NotificationRecord, NotificationSource};
pub use models::page::{NotificationPage, RawNotification};
pub use store::{MergeMode, NotificationStore};
