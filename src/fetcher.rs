use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use tracing::{debug, info, warn};

use crate::{
    clients::transport::{InboxIdentity, InboxTransport, MutationKind, PageDirection},
    config::InboxConfig,
    models::{
        error::InboxError,
        fetch::{FetchResult, PageResult},
        notification::NotificationRecord,
        page::RawNotification,
    },
    store::{MergeMode, NotificationStore},
    utils::{RetryConfig, retry_with_backoff},
};

// Clears the in-flight flag when a fetch resolves, on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Stateful client for one inbox: drives paginated requests against the
/// transport, merges pages into its store, repairs ordering gaps on
/// refresh, and applies optimistic read/delete mutations.
///
/// The cache lives exactly as long as the fetcher, so instances should be
/// tied to the lifecycle of whatever consumes them. A record can only be
/// marked read or deleted through the fetcher that fetched it.
///
/// Configuration must be settled before the first fetch; the setters fail
/// with [`InboxError::InvalidConfiguration`] afterwards. One page fetch may
/// be in flight at a time; an overlapping request is rejected with
/// [`InboxError::FetchInProgress`]. Mutations may be issued while a fetch
/// is outstanding.
pub struct InboxFetcher {
    transport: Arc<dyn InboxTransport>,
    identity: InboxIdentity,
    config: Mutex<InboxConfig>,
    store: Mutex<NotificationStore>,
    cursor: Mutex<Option<String>>,
    // Whether the last successful fetch returned fewer records than
    // requested. Tracked separately from the limit so an end caused only
    // by the limit can be re-derived when deletions free up room.
    server_exhausted: AtomicBool,
    started: AtomicBool,
    fetch_in_flight: AtomicBool,
    retry_config: RetryConfig,
}

impl InboxFetcher {
    /// Fetcher for the current installation's inbox.
    pub fn for_installation(
        transport: Arc<dyn InboxTransport>,
        installation_id: impl Into<String>,
    ) -> Self {
        Self::with_identity(
            transport,
            InboxIdentity::Installation {
                installation_id: installation_id.into(),
            },
        )
    }

    /// Fetcher for a specific user identifier. The authentication key must
    /// have been validated upstream; it is only forwarded to the transport.
    pub fn for_user_identifier(
        transport: Arc<dyn InboxTransport>,
        identifier: impl Into<String>,
        auth_key: impl Into<String>,
    ) -> Self {
        Self::with_identity(
            transport,
            InboxIdentity::UserIdentifier {
                identifier: identifier.into(),
                auth_key: auth_key.into(),
            },
        )
    }

    pub fn with_identity(transport: Arc<dyn InboxTransport>, identity: InboxIdentity) -> Self {
        let config = InboxConfig::default();

        info!(scope = %identity.scope(), "Inbox fetcher initialized");

        Self {
            transport,
            identity,
            store: Mutex::new(NotificationStore::new(config.limit)),
            config: Mutex::new(config),
            cursor: Mutex::new(None),
            server_exhausted: AtomicBool::new(false),
            started: AtomicBool::new(false),
            fetch_in_flight: AtomicBool::new(false),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn set_filter_silent_notifications(&self, filter: bool) -> Result<(), InboxError> {
        self.ensure_not_started()?;
        self.lock_config().filter_silent_notifications = filter;
        Ok(())
    }

    pub fn set_max_page_size(&self, max_page_size: usize) -> Result<(), InboxError> {
        self.ensure_not_started()?;
        self.lock_config().max_page_size = max_page_size;
        Ok(())
    }

    pub fn set_limit(&self, limit: usize) -> Result<(), InboxError> {
        self.ensure_not_started()?;
        self.lock_config().limit = limit;
        self.lock_store().set_limit(limit);
        Ok(())
    }

    /// Current visible records, newest first. A full copy: re-call to
    /// observe later fetches or mutations.
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        let filter_silent = self.lock_config().filter_silent_notifications;
        self.lock_store().snapshot(filter_silent)
    }

    /// Whether forward pagination is exhausted, either because the server
    /// has no older records or because the record limit has been reached.
    pub fn end_reached(&self) -> bool {
        let store = self.lock_store();
        self.compute_end_reached(&store)
    }

    /// Fetches the newest page and reconciles it with the cache. Cached
    /// history is kept when the page connects to it (a shared identifier);
    /// otherwise a gap is assumed and the cache is replaced with the page,
    /// trading completeness for correctness.
    pub async fn fetch_new_notifications(&self) -> Result<FetchResult, InboxError> {
        let _guard = self.begin_fetch()?;
        self.refresh().await
    }

    /// Fetches the page after the current cursor (older records). Fails
    /// with [`InboxError::NoMoreData`] once the end is reached, without
    /// touching the network. Before any page has been fetched this behaves
    /// exactly like [`Self::fetch_new_notifications`].
    pub async fn fetch_next_page(&self) -> Result<PageResult, InboxError> {
        let _guard = self.begin_fetch()?;

        if self.end_reached() {
            debug!(scope = %self.identity.scope(), "Next page requested after end of inbox");
            return Err(InboxError::NoMoreData);
        }

        let cursor = self.lock_cursor().clone();
        let Some(cursor) = cursor else {
            let result = self.refresh().await?;
            return Ok(PageResult {
                notifications: result.notifications,
                end_reached: result.end_reached,
            });
        };

        self.started.store(true, Ordering::SeqCst);

        let (page_size, filter_silent, limit) = {
            let config = self.lock_config();
            (
                config.page_size(),
                config.filter_silent_notifications,
                config.limit,
            )
        };

        // Never request past the record limit: a compliant server then
        // cannot overshoot it and force a truncation.
        let requested = if limit > 0 {
            let remaining = limit.saturating_sub(self.lock_store().size()).max(1);
            page_size.min(remaining)
        } else {
            page_size
        };

        let page = self
            .transport
            .request_page(
                &self.identity,
                Some(&cursor),
                requested,
                PageDirection::Older,
            )
            .await
            .map_err(InboxError::Transport)?;
        page.validate()?;

        let returned = page.notifications.len();
        let next_cursor = page.next_cursor.clone();
        let records: Vec<NotificationRecord> = page
            .notifications
            .into_iter()
            .map(RawNotification::into_record)
            .collect();

        let (added, dropped, end_reached, snapshot) = {
            let mut store = self.lock_store();
            let added = store.merge(records, MergeMode::Append);
            let dropped = store.last_merge_dropped();
            self.server_exhausted
                .store(returned < requested, Ordering::SeqCst);
            let end_reached = self.compute_end_reached(&store);
            (added, dropped, end_reached, store.snapshot(filter_silent))
        };

        if dropped > 0 {
            // The cursor points past records the store no longer holds;
            // resuming from it would skip them. Rewind so pagination
            // restarts from the newest boundary via a refresh.
            warn!(
                scope = %self.identity.scope(),
                dropped,
                "Merge overshot the record limit, rewinding pagination cursor"
            );
            *self.lock_cursor() = None;
        } else if next_cursor.is_some() {
            *self.lock_cursor() = next_cursor;
        }

        info!(
            scope = %self.identity.scope(),
            returned,
            added,
            end_reached,
            "Next page merged"
        );

        Ok(PageResult {
            notifications: snapshot,
            end_reached,
        })
    }

    /// Marks one notification as read. The local flag flips immediately;
    /// the server is notified best-effort in the background and may still
    /// report the record unread on the next refresh until it catches up.
    ///
    /// Background submission runs on the ambient tokio runtime. Called
    /// outside one, the local change still applies and the submission is
    /// skipped with a warning.
    pub fn mark_notification_as_read(&self, identifier: &str) -> bool {
        let changed = self.lock_store().mark_read(identifier);

        if changed {
            debug!(identifier, "Notification marked as read locally");
            self.spawn_mutation(identifier.to_string(), MutationKind::Read);
        }

        changed
    }

    /// Marks every visible notification as read. Returns how many records
    /// transitioned. Same consistency window as
    /// [`Self::mark_notification_as_read`].
    pub fn mark_all_notifications_as_read(&self) -> usize {
        let identifiers = self.lock_store().mark_all_read();
        let count = identifiers.len();

        if count > 0 {
            debug!(count, "All notifications marked as read locally");
        }

        for identifier in identifiers {
            self.spawn_mutation(identifier, MutationKind::Read);
        }

        count
    }

    /// Marks one notification as deleted. It disappears from snapshots
    /// immediately; the record is evicted from the cache on the next
    /// refresh, and the server is notified best-effort in the background
    /// (same runtime behavior as [`Self::mark_notification_as_read`]).
    pub fn mark_notification_as_deleted(&self, identifier: &str) -> bool {
        let changed = self.lock_store().mark_deleted(identifier);

        if changed {
            debug!(identifier, "Notification marked as deleted locally");
            self.spawn_mutation(identifier.to_string(), MutationKind::Deleted);
        }

        changed
    }

    async fn refresh(&self) -> Result<FetchResult, InboxError> {
        self.started.store(true, Ordering::SeqCst);

        let (page_size, filter_silent) = {
            let config = self.lock_config();
            (config.page_size(), config.filter_silent_notifications)
        };
        let cursor_missing = self.lock_cursor().is_none();

        let page = self
            .transport
            .request_page(&self.identity, None, page_size, PageDirection::Newest)
            .await
            .map_err(InboxError::Transport)?;
        page.validate()?;

        let returned = page.notifications.len();
        let next_cursor = page.next_cursor.clone();
        let records: Vec<NotificationRecord> = page
            .notifications
            .into_iter()
            .map(RawNotification::into_record)
            .collect();

        let (found_new, reset_cursor, dropped, end_reached, snapshot) = {
            let mut store = self.lock_store();
            let store_was_empty = store.is_empty();
            let records_empty = records.is_empty();
            let gap = !store_was_empty && !records_empty && !store.overlaps(&records);

            let added = if records_empty {
                // Nothing returned: no overlap evidence either way, so the
                // cache is kept rather than wiped.
                0
            } else if gap {
                warn!(
                    scope = %self.identity.scope(),
                    fetched = records.len(),
                    "Refresh page does not connect to cached records, discarding cache"
                );
                store.merge(records, MergeMode::Refresh)
            } else {
                store.merge(records, MergeMode::Append)
            };

            let dropped = if records_empty {
                0
            } else {
                store.last_merge_dropped()
            };

            self.server_exhausted
                .store(returned < page_size, Ordering::SeqCst);
            let end_reached = self.compute_end_reached(&store);

            (
                added > 0,
                store_was_empty || gap || cursor_missing,
                dropped,
                end_reached,
                store.snapshot(filter_silent),
            )
        };

        // The cursor tracks the oldest fetched boundary, which a contiguous
        // refresh leaves in place. It moves when pagination (re)starts from
        // this page, and is rewound when a truncation dropped records it
        // pointed past.
        if dropped > 0 {
            warn!(
                scope = %self.identity.scope(),
                dropped,
                "Merge overshot the record limit, rewinding pagination cursor"
            );
            *self.lock_cursor() = None;
        } else if reset_cursor && next_cursor.is_some() {
            *self.lock_cursor() = next_cursor;
        }

        info!(
            scope = %self.identity.scope(),
            returned,
            found_new,
            end_reached,
            "Refresh merged"
        );

        Ok(FetchResult {
            found_new_notifications: found_new,
            notifications: snapshot,
            end_reached,
        })
    }

    // Fire-and-forget server notification of a local mutation. Failures are
    // logged and never rolled back into the store. Needs an ambient tokio
    // runtime; without one the submission is skipped, not panicked on.
    fn spawn_mutation(&self, identifier: String, kind: MutationKind) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                identifier = %identifier,
                kind = kind.as_str(),
                "No async runtime available, skipping mutation submission"
            );
            return;
        };

        let transport = Arc::clone(&self.transport);
        let identity = self.identity.clone();
        let retry_config = self.retry_config.clone();

        handle.spawn(async move {
            let result = retry_with_backoff(&retry_config, || {
                let transport = Arc::clone(&transport);
                let identity = identity.clone();
                let identifier = identifier.clone();
                async move { transport.submit_mutation(&identity, &identifier, kind).await }
            })
            .await;

            if let Err(e) = result {
                warn!(
                    identifier = %identifier,
                    kind = kind.as_str(),
                    error = %e,
                    "Mutation submission failed, keeping local state"
                );
            }
        });
    }

    fn begin_fetch(&self) -> Result<FlightGuard<'_>, InboxError> {
        if self
            .fetch_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(InboxError::FetchInProgress);
        }
        Ok(FlightGuard(&self.fetch_in_flight))
    }

    fn ensure_not_started(&self) -> Result<(), InboxError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(InboxError::InvalidConfiguration);
        }
        Ok(())
    }

    fn compute_end_reached(&self, store: &NotificationStore) -> bool {
        self.server_exhausted.load(Ordering::SeqCst) || store.limit_reached()
    }

    fn lock_store(&self) -> MutexGuard<'_, NotificationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_config(&self) -> MutexGuard<'_, InboxConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cursor(&self) -> MutexGuard<'_, Option<String>> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
