//! Session Management
//!
//! Owns the mapping from session id to bounded conversation history.
//!
//! All access goes through [`SessionStore`]; callers only ever receive
//! copies of a session's history. One `RwLock` guards the map: lookups and
//! history reads share it, while appends, clears, creation and the sweep
//! take it exclusively. The store never awaits while holding the lock.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use assistant_core::Message;

/// Snapshot of one session, detached from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
    /// Oldest first
    pub history: Vec<Message>,
}

struct SessionRecord {
    created_at: DateTime<Utc>,
    /// Unix millis; atomic so readers holding the shared lock can touch it
    last_access_ms: AtomicI64,
    history: VecDeque<Message>,
}

impl SessionRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_access_ms: AtomicI64::new(now.timestamp_millis()),
            history: VecDeque::new(),
        }
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_access_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }

    fn last_access(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.last_access_ms.load(Ordering::Relaxed))
            .single()
            .unwrap_or(self.created_at)
    }

    fn snapshot(&self, id: &str) -> Session {
        Session {
            id: id.to_string(),
            created_at: self.created_at,
            last_access_at: self.last_access(),
            history: self.history.iter().cloned().collect(),
        }
    }
}

/// Concurrency-safe store of bounded conversation histories
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    max_history: usize,
}

impl SessionStore {
    /// Create a store keeping at most `max_history` messages per session
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history: max_history.max(1),
        }
    }

    /// Start a background task that sweeps inactive sessions every `interval`.
    ///
    /// Returns a shutdown sender; sending `true` stops the task.
    pub fn start_sweep_task(
        self: &Arc<Self>,
        interval: Duration,
        max_age: Duration,
    ) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            interval_timer.tick().await;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = store.sweep(max_age);
                        let remaining = store.count();
                        metrics::gauge!("assistant_sessions_active").set(remaining as f64);
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining,
                                "Session sweep removed inactive sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session sweep task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Return the session for `id`, creating a fresh one when `id` is empty
    /// or unknown. A fresh session gets a newly generated id.
    pub fn get_or_create(&self, id: &str) -> Session {
        let now = Utc::now();

        if !id.is_empty() {
            let sessions = self.sessions.read();
            if let Some(record) = sessions.get(id) {
                record.touch(now);
                return record.snapshot(id);
            }
        }

        let new_id = generate_session_id();
        let mut sessions = self.sessions.write();
        let record = sessions
            .entry(new_id.clone())
            .or_insert_with(|| SessionRecord::new(now));

        tracing::debug!(session_id = %new_id, "Created session");

        record.snapshot(&new_id)
    }

    /// Whether `id` names a live session
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Append `turns` as one update, evicting the oldest messages beyond the
    /// bound. Each turn's timestamp is set here.
    ///
    /// Returns `false` without doing anything when `id` is unknown.
    pub fn append_turns(&self, id: &str, turns: Vec<Message>) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let Some(record) = sessions.get_mut(id) else {
            tracing::debug!(session_id = %id, "Append to unknown session ignored");
            return false;
        };

        for mut turn in turns {
            turn.timestamp = now;
            record.history.push_back(turn);
        }
        while record.history.len() > self.max_history {
            record.history.pop_front();
        }
        record.touch(now);

        true
    }

    /// Copy of the session's history; empty for an unknown id
    pub fn get_history(&self, id: &str) -> Vec<Message> {
        let sessions = self.sessions.read();
        match sessions.get(id) {
            Some(record) => {
                record.touch(Utc::now());
                record.history.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Empty the history, keeping the session itself
    pub fn clear(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(id) {
            Some(record) => {
                record.history.clear();
                record.touch(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Remove every session not accessed within `max_age`
    pub fn sweep(&self, max_age: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.sweep_before(cutoff)
    }

    /// Remove every session last accessed strictly before `cutoff`
    pub fn sweep_before(&self, cutoff: DateTime<Utc>) -> usize {
        let cutoff_ms = cutoff.timestamp_millis();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, record| {
            let keep = record.last_access_ms.load(Ordering::Relaxed) >= cutoff_ms;
            if !keep {
                tracing::debug!(session_id = %id, "Swept inactive session");
            }
            keep
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    #[cfg(test)]
    fn set_last_access(&self, id: &str, at: DateTime<Utc>) {
        if let Some(record) = self.sessions.read().get(id) {
            record.touch(at);
        }
    }
}

/// 128 random bits, hex encoded
fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
