//! Chat history list and sidebar time-bucketing.
//!
//! The [`ChatHistoryStore`] mirrors the `/chat/history` listing in
//! memory so sidebar renders never block on the backend. Handlers that
//! create, rename, or delete chats write to the store directly, so the
//! sidebar and the creator can never disagree.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Days, Local, NaiveDate};

use crate::backend::types::ChatSessionSummary;

/// Relative-time category for the sidebar, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketLabel {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
}

impl BucketLabel {
    /// Sidebar heading text.
    pub fn display(self) -> &'static str {
        match self {
            Self::Today => "Hôm nay",
            Self::Yesterday => "Hôm qua",
            Self::Last7Days => "7 ngày qua",
            Self::Last30Days => "30 ngày qua",
        }
    }
}

/// One non-empty sidebar section.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub label: BucketLabel,
    pub sessions: Vec<ChatSessionSummary>,
}

/// Group sessions by `updated_at` against local calendar-day
/// boundaries computed from `now`. Day boundaries, not rolling 24h
/// windows. Empty buckets are omitted; sessions older than 30 days are
/// not listed.
pub fn bucket(sessions: &[ChatSessionSummary], now: DateTime<Local>) -> Vec<Bucket> {
    let today = now.date_naive();
    let yesterday = prior_day(today, 1);
    let week_start = prior_day(today, 7);
    let month_start = prior_day(today, 30);

    let mut buckets: [(BucketLabel, Vec<ChatSessionSummary>); 4] = [
        (BucketLabel::Today, Vec::new()),
        (BucketLabel::Yesterday, Vec::new()),
        (BucketLabel::Last7Days, Vec::new()),
        (BucketLabel::Last30Days, Vec::new()),
    ];

    for session in sessions {
        let day = session.updated_at.with_timezone(&Local).date_naive();
        let slot = if day >= today {
            0
        } else if day >= yesterday {
            1
        } else if day >= week_start {
            2
        } else if day >= month_start {
            3
        } else {
            continue;
        };
        buckets[slot].1.push(session.clone());
    }

    buckets
        .into_iter()
        .filter(|(_, sessions)| !sessions.is_empty())
        .map(|(label, sessions)| Bucket { label, sessions })
        .collect()
}

fn prior_day(day: NaiveDate, back: u64) -> NaiveDate {
    // NaiveDate covers a far larger range than any plausible clock, so
    // the subtraction cannot fail for real inputs.
    day.checked_sub_days(Days::new(back)).unwrap_or(day)
}

/// Shared in-memory list of chat summaries, newest first.
///
/// Cheap to clone; all clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct ChatHistoryStore {
    inner: Arc<RwLock<Vec<ChatSessionSummary>>>,
}

impl ChatHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh server fetch.
    pub fn set(&self, sessions: Vec<ChatSessionSummary>) {
        let mut list = self.inner.write().unwrap();
        *list = sessions;
    }

    /// Prepend a newly created chat.
    pub fn add(&self, session: ChatSessionSummary) {
        let mut list = self.inner.write().unwrap();
        list.insert(0, session);
    }

    /// Bump a chat after a completed exchange and move it to the front.
    /// An exchange appends two messages, the user's and the assistant's.
    pub fn touch(&self, chat_id: &str, updated_at: DateTime<chrono::Utc>) {
        let mut list = self.inner.write().unwrap();
        if let Some(pos) = list.iter().position(|s| s.id == chat_id) {
            let mut session = list.remove(pos);
            session.updated_at = updated_at;
            session.message_count += 2;
            list.insert(0, session);
        }
    }

    pub fn remove(&self, chat_id: &str) {
        let mut list = self.inner.write().unwrap();
        list.retain(|s| s.id != chat_id);
    }

    /// Snapshot of the current summaries.
    pub fn all(&self) -> Vec<ChatSessionSummary> {
        self.inner.read().unwrap().clone()
    }

    pub fn get(&self, chat_id: &str) -> Option<ChatSessionSummary> {
        let list = self.inner.read().unwrap();
        list.iter().find(|s| s.id == chat_id).cloned()
    }

    /// Snapshot bucketed for the sidebar.
    pub fn bucketed(&self, now: DateTime<Local>) -> Vec<Bucket> {
        bucket(&self.all(), now)
    }
}
