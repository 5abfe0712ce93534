/// Hard ceiling on the per-page record count accepted by the server.
pub const PAGE_SIZE_CEILING: usize = 100;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default cap on how many records a fetcher will ever hold.
pub const DEFAULT_LIMIT: usize = 200;

/// Fetcher configuration. All fields must be settled before the first
/// fetch; the fetcher rejects later changes.
#[derive(Clone, Debug)]
pub struct InboxConfig {
    /// When true (the default), notifications without user-visible content
    /// are excluded from snapshots and fetch completions.
    pub filter_silent_notifications: bool,

    /// Requested page size. Clamped to `[1, PAGE_SIZE_CEILING]` when used;
    /// the server may still return fewer records than requested.
    pub max_page_size: usize,

    /// Maximum number of non-deleted records the store will hold.
    /// 0 means unlimited.
    pub limit: usize,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            filter_silent_notifications: true,
            max_page_size: DEFAULT_PAGE_SIZE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl InboxConfig {
    pub fn page_size(&self) -> usize {
        self.max_page_size.clamp(1, PAGE_SIZE_CEILING)
    }
}
