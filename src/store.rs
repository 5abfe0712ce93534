use std::collections::HashSet;

use tracing::debug;

use crate::models::notification::NotificationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Discard everything currently held, then insert the incoming records.
    /// This is the gap-repair path; it also evicts locally deleted records.
    Refresh,
    /// Insert incoming records, skipping identifiers the store already
    /// holds. Used both for older pages and for contiguous refreshes.
    Append,
}

/// Canonical, deduplicated, ordered collection of fetched notifications and
/// their local read/deleted state. Owns no network logic.
///
/// Records are kept sorted by `occurred_at` descending; ties keep their
/// arrival order. Deleted records stay in the collection, hidden from
/// snapshots, until the next `Refresh` merge.
#[derive(Debug)]
pub struct NotificationStore {
    records: Vec<NotificationRecord>,
    next_arrival: u64,
    limit: usize,
    last_merge_dropped: usize,
}

impl NotificationStore {
    pub fn new(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            next_arrival: 0,
            limit,
            last_merge_dropped: 0,
        }
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Merges a newest-first batch of records. Returns how many of them the
    /// store did not already hold.
    pub fn merge(&mut self, incoming: Vec<NotificationRecord>, mode: MergeMode) -> usize {
        self.last_merge_dropped = 0;

        if mode == MergeMode::Refresh && !self.records.is_empty() {
            debug!(
                discarded = self.records.len(),
                "Refresh merge, discarding cached records"
            );
            self.records.clear();
        }

        let mut known: HashSet<String> = self
            .records
            .iter()
            .map(|record| record.identifier.clone())
            .collect();

        let mut added = 0;
        for mut record in incoming {
            if !known.insert(record.identifier.clone()) {
                continue;
            }
            record.arrival = self.next_arrival;
            self.next_arrival += 1;
            self.records.push(record);
            added += 1;
        }

        self.records.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(a.arrival.cmp(&b.arrival))
        });
        self.enforce_limit();

        added
    }

    /// Whether any incoming record is already held, deleted ones included.
    /// A shared identifier means a refresh page connects to the cached
    /// history without a gap.
    pub fn overlaps(&self, incoming: &[NotificationRecord]) -> bool {
        let held: HashSet<&str> = self
            .records
            .iter()
            .map(|record| record.identifier.as_str())
            .collect();

        incoming
            .iter()
            .any(|record| held.contains(record.identifier.as_str()))
    }

    /// Full materialization of the visible records, newest first. Not a
    /// live view: callers re-snapshot to observe later mutations.
    pub fn snapshot(&self, filter_silent: bool) -> Vec<NotificationRecord> {
        self.records
            .iter()
            .filter(|record| !record.is_deleted)
            .filter(|record| !(filter_silent && record.is_silent()))
            .cloned()
            .collect()
    }

    /// Moves one record unread -> read. Returns true only when the flag
    /// actually changed.
    pub fn mark_read(&mut self, identifier: &str) -> bool {
        match self
            .records
            .iter_mut()
            .find(|record| record.identifier == identifier && !record.is_deleted)
        {
            Some(record) if record.is_unread => {
                record.is_unread = false;
                true
            }
            _ => false,
        }
    }

    /// Marks every visible record as read, returning the identifiers that
    /// transitioned.
    pub fn mark_all_read(&mut self) -> Vec<String> {
        self.records
            .iter_mut()
            .filter(|record| !record.is_deleted && record.is_unread)
            .map(|record| {
                record.is_unread = false;
                record.identifier.clone()
            })
            .collect()
    }

    /// Hides one record from snapshots. The record itself is retained until
    /// the next refresh so a concurrent fetch never sees the list shrink
    /// under it. Returns true only when the flag actually changed.
    pub fn mark_deleted(&mut self, identifier: &str) -> bool {
        match self
            .records
            .iter_mut()
            .find(|record| record.identifier == identifier && !record.is_deleted)
        {
            Some(record) => {
                record.is_deleted = true;
                true
            }
            None => false,
        }
    }

    /// Count of non-deleted records; this is the figure the limit applies to.
    pub fn size(&self) -> usize {
        self.records
            .iter()
            .filter(|record| !record.is_deleted)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit_reached(&self) -> bool {
        self.limit > 0 && self.size() >= self.limit
    }

    /// How many records the most recent merge dropped to stay under the
    /// limit. A truncating merge leaves the pagination cursor pointing past
    /// records the store no longer holds, so the fetcher rewinds it.
    pub fn last_merge_dropped(&self) -> usize {
        self.last_merge_dropped
    }

    // Drops the oldest records so the non-deleted count never exceeds the
    // limit. Deleted records past the cut point go with them.
    fn enforce_limit(&mut self) {
        if self.limit == 0 {
            return;
        }

        let mut visible = 0;
        let mut cut = self.records.len();
        for (index, record) in self.records.iter().enumerate() {
            if !record.is_deleted {
                visible += 1;
                if visible > self.limit {
                    cut = index;
                    break;
                }
            }
        }

        if cut < self.records.len() {
            let dropped = self.records.len() - cut;
            debug!(
                dropped,
                limit = self.limit,
                "Store reached its record limit, dropping oldest records"
            );
            self.records.truncate(cut);
            self.last_merge_dropped = dropped;
        }
    }
}
