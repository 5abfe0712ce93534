use crate::models::notification::NotificationRecord;

/// Completion payload of a refresh ("fetch newest") operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Whether the fetch brought at least one record the store did not
    /// already hold. When false, the snapshot is guaranteed unchanged.
    pub found_new_notifications: bool,
    /// Snapshot of the visible records after the merge, newest first.
    pub notifications: Vec<NotificationRecord>,
    pub end_reached: bool,
}

/// Completion payload of a "fetch next page" operation.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Snapshot of the visible records after the merge, newest first.
    pub notifications: Vec<NotificationRecord>,
    pub end_reached: bool,
}
